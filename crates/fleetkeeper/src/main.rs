//! `fleetk` - CLI for fleetkeeper
//!
//! This binary provides the command-line interface for recording services,
//! saving tire inspections and viewing the fleet dashboards.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use tracing::warn;

use fleetkeeper::cli::{Cli, Command, ConfigCommand, ServiceCommand, TireCommand, TireSetCommand};
use fleetkeeper::service::SheetFailure;
use fleetkeeper::sheet::TireSheet;
use fleetkeeper::tire::{ImageFormat, TirePosition};
use fleetkeeper::{init_logging, open_store, Config, FleetService, ServiceEntry, TireInput};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands work even when the store cannot be opened
    if let Command::Config(cmd) = cli.command {
        return handle_config(cli.config, cmd);
    }

    let mut config = Config::load_from(cli.config.clone()).context("loading configuration")?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }

    let store = open_store(&config).context("opening fleet store")?;
    let service = FleetService::new(store, &config);
    if config.storage.seed_on_open {
        service.seed()?;
    }

    match cli.command {
        Command::Vehicles(out) => handle_vehicles(&service, out.json),
        Command::Maintenance(out) => handle_maintenance(&service, out.json),
        Command::Service(cmd) => handle_service(&service, &cmd),
        Command::History(args) => handle_history(&service, &args.vehicle, args.json),
        Command::Tires(args) => handle_tires(&service, &args.vehicle, args.json),
        Command::Tire(cmd) => handle_tire(&service, &config, cmd),
        Command::Stats(out) => handle_stats(&service, out.json),
        Command::Config(_) => unreachable!("handled before the store is opened"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn opt(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn handle_vehicles(service: &FleetService, json: bool) -> Result<()> {
    let overview = service.vehicle_overview()?;
    if json {
        return print_json(&overview);
    }

    println!(
        "{:<10} {:<13} {:>5} {:>9} {:>10} {:>8} {:>8} {:>9}",
        "Vehicle", "Registration", "Tires", "Avg cond", "KMs run", "Current", "Due", "Remaining"
    );
    for row in &overview {
        println!(
            "{:<10} {:<13} {:>5} {:>8.1}% {:>10} {:>8} {:>8} {:>9}",
            row.vehicle_id,
            row.registration,
            row.tire_count,
            row.average_condition,
            row.total_kms_run,
            opt(row.current_counter),
            opt(row.due_counter),
            opt(row.remaining),
        );
    }
    Ok(())
}

fn handle_maintenance(service: &FleetService, json: bool) -> Result<()> {
    let dashboard = service.maintenance_dashboard()?;
    if json {
        return print_json(&dashboard);
    }

    println!("Tipper Maintenance");
    println!("==================");
    println!(
        "Tippers: {}   Overdue: {}   Due soon: {}",
        dashboard.totals.tippers, dashboard.totals.overdue, dashboard.totals.due_soon
    );
    println!();
    println!(
        "  {:<25} {:<16} {:>8} {:>8} {:>8} {:>9}  Status",
        "Tipper", "Last service", "Last", "Due", "Current", "Remaining"
    );
    for row in &dashboard.rows {
        let marker = if row.status.is_alert() { '!' } else { ' ' };
        println!(
            "{marker} {:<25} {:<16} {:>8} {:>8} {:>8} {:>9}  {}",
            row.display_name,
            row.service_type,
            row.last_service_counter,
            row.due_counter,
            row.current_counter,
            row.remaining,
            row.status
        );
    }

    for (title, rows) in [
        ("Overdue maintenance", &dashboard.overdue),
        ("Maintenance due soon", &dashboard.due_soon),
    ] {
        if rows.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for row in rows {
            println!(
                "  {:<25} current {:>6}  due {:>6}  remaining {:>6}",
                row.display_name, row.current_counter, row.due_counter, row.remaining
            );
        }
    }

    println!();
    println!("Filter replacement:");
    println!(
        "  {:<25} {:>5} {:>5} {:>5} {:>10}",
        "Tipper", "Q1", "QII", "Fust", "<1000hrs"
    );
    for row in &dashboard.filters {
        println!(
            "  {:<25} {:>5} {:>5} {:>5} {:>10}",
            row.display_name,
            yes_no(row.filters.expires_q1),
            yes_no(row.filters.expires_qii_filter),
            yes_no(row.filters.fust_filter),
            yes_no(row.parts_under_1000hrs)
        );
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn handle_service(service: &FleetService, cmd: &ServiceCommand) -> Result<()> {
    let date = cmd.date.unwrap_or_else(|| Local::now().date_naive());
    let entry = ServiceEntry::new(&cmd.service_type, date).with_notes(&cmd.notes);
    let record = service.log_service(&cmd.vehicle, &entry)?;

    println!(
        "Logged {} for {} on {} at counter {}.",
        entry.service_type, cmd.vehicle, date, record.last_service_counter
    );
    println!(
        "Next service due at {} ({}).",
        record.due_counter,
        record.status()
    );
    Ok(())
}

fn handle_history(service: &FleetService, vehicle: &str, json: bool) -> Result<()> {
    let history = service.service_history(vehicle)?;
    if json {
        return print_json(&history);
    }

    if history.is_empty() {
        println!("No services logged for {vehicle}.");
        return Ok(());
    }
    for entry in &history {
        println!(
            "{}  {:<16} counter {:>6}  {}",
            entry.service_date, entry.service_type, entry.counter_at_service, entry.notes
        );
    }
    Ok(())
}

fn handle_tires(service: &FleetService, vehicle: &str, json: bool) -> Result<()> {
    let dashboard = service.tire_dashboard(vehicle)?;
    if json {
        return print_json(&dashboard);
    }

    println!("Tires for {}", dashboard.vehicle.display_name());
    if dashboard.tires.is_empty() {
        println!("No tire records.");
        return Ok(());
    }

    println!(
        "{:<15} {:<8} {:>5} {:<5} {:<10} {:>9} {:>9} {:>8} {:>6}",
        "Position", "Tire", "Cond", "Band", "Installed", "Start", "Current", "KMs run", "Photos"
    );
    for tire in &dashboard.tires {
        println!(
            "{:<15} {:<8} {:>4}% {:<5} {:<10} {:>9} {:>9} {:>8} {:>6}",
            tire.position.label(),
            tire.tire_number,
            tire.condition_percent,
            tire.band,
            tire.date_installed,
            tire.starting_distance,
            tire.current_distance,
            tire.kms_run,
            tire.images
        );
    }

    if !dashboard.attention.is_empty() {
        println!();
        println!(
            "Tires below {}% needing attention:",
            dashboard.attention_threshold
        );
        for entry in &dashboard.attention {
            println!(
                "  [{:<8}] {:<15} {:<8} {:>3}%  {} km",
                entry.severity,
                entry.position.label(),
                entry.tire_number,
                entry.condition_percent,
                entry.kms_run
            );
        }
    }
    Ok(())
}

fn handle_tire(service: &FleetService, config: &Config, cmd: TireCommand) -> Result<()> {
    match cmd {
        TireCommand::Set(cmd) => handle_tire_set(service, config, &cmd),
        TireCommand::Attach {
            vehicle,
            position,
            file,
        } => {
            let data = read_image(config, &file)?;
            if !service.attach_image(&vehicle, position, &data)? {
                bail!(
                    "no {} stored on {}; save the tire first",
                    position.tire_number(),
                    vehicle
                );
            }
            println!(
                "Attached {} to {} on {}.",
                file.display(),
                position.tire_number(),
                vehicle
            );
            Ok(())
        }
        TireCommand::Sheet {
            vehicle,
            file,
            json,
        } => handle_tire_sheet(service, config, &vehicle, &file, json),
        TireCommand::Images {
            vehicle,
            position,
            json,
        } => handle_tire_images(service, &vehicle, position, json),
    }
}

fn handle_tire_sheet(
    service: &FleetService,
    config: &Config,
    vehicle: &str,
    file: &Path,
    json: bool,
) -> Result<()> {
    let sheet = TireSheet::load(file)?;

    // An unreadable photo only costs that photo, the tire is still saved
    let mut unread = Vec::new();
    let entries: Vec<_> = sheet
        .tires
        .into_iter()
        .map(|row| {
            let image = match row.image.as_deref().map(|path| read_image(config, path)) {
                Some(Ok(data)) => Some(data),
                Some(Err(e)) => {
                    warn!("Skipping photo for {}: {:#}", row.position, e);
                    unread.push(SheetFailure {
                        position: row.position,
                        message: format!("{e:#}"),
                    });
                    None
                }
                None => None,
            };
            row.into_entry(image)
        })
        .collect();

    let mut report = service.save_tire_sheet(vehicle, &entries)?;
    report.failures.extend(unread);
    if json {
        return print_json(&report);
    }

    println!(
        "Saved {} tires and {} photos on {}.",
        report.tires_saved, report.images_saved, vehicle
    );
    for failure in &report.failures {
        println!("  {:<15} {}", failure.position.label(), failure.message);
    }
    if !report.is_complete() {
        bail!("{} positions had problems", report.failures.len());
    }
    Ok(())
}

fn handle_tire_set(service: &FleetService, config: &Config, cmd: &TireSetCommand) -> Result<()> {
    let image = cmd
        .image
        .as_deref()
        .map(|path| read_image(config, path))
        .transpose()?;

    let input = TireInput {
        vehicle_id: cmd.vehicle.clone(),
        position: cmd.position,
        condition_percent: cmd.condition,
        date_installed: cmd.installed,
        starting_distance: cmd.start,
        current_distance: cmd.current,
    };
    let outcome = service.save_tire_with_image(&input, image.as_deref())?;
    println!(
        "Saved {} ({}) on {}: {:?}.",
        cmd.position.tire_number(),
        cmd.position,
        cmd.vehicle,
        outcome
    );
    if image.is_some() {
        println!("Attached photo.");
    }
    Ok(())
}

fn handle_tire_images(
    service: &FleetService,
    vehicle: &str,
    position: TirePosition,
    json: bool,
) -> Result<()> {
    let Some(tire) = service.tire(vehicle, position)? else {
        bail!("no {} stored on {}", position.tire_number(), vehicle);
    };
    if json {
        return print_json(&tire.images);
    }

    if tire.images.is_empty() {
        println!("No photos for {} on {}.", tire.tire_number, vehicle);
        return Ok(());
    }
    println!("Photos of {} on {}, newest first:", tire.tire_number, vehicle);
    for (i, image) in tire.images.iter().enumerate() {
        let format = match image.format() {
            Some(format) => format!("{format:?}").to_lowercase(),
            None => {
                warn!(
                    "Image {} of {} on {} is not a recognised JPEG or PNG",
                    i + 1,
                    tire.tire_number,
                    vehicle
                );
                "unknown".to_string()
            }
        };
        println!(
            "{:>2}. {}  {:>9} bytes  {:<7} {}",
            i + 1,
            image.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
            image.len(),
            format,
            image.digest
        );
    }
    Ok(())
}

/// Read an image file after checking its extension and size.
fn read_image(config: &Config, path: &Path) -> Result<Vec<u8>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if ImageFormat::from_extension(ext).is_none() {
        bail!(
            "{} is not a jpg, jpeg or png file",
            path.display()
        );
    }

    let size = std::fs::metadata(path)
        .with_context(|| format!("reading {}", path.display()))?
        .len();
    if size > config.tires.max_image_bytes {
        bail!(
            "{} is {} bytes, above the limit of {} bytes",
            path.display(),
            size,
            config.tires.max_image_bytes
        );
    }

    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn handle_stats(service: &FleetService, json: bool) -> Result<()> {
    let stats = service.stats()?;
    if json {
        return print_json(&stats);
    }

    println!("fleetk storage");
    println!("--------------");
    println!("Backend:          {}", stats.backend);
    if let Some(location) = &stats.location {
        println!("Database:         {}", location.display());
        println!("Size:             {} bytes", stats.db_size_bytes);
    }
    println!("Vehicles:         {}", stats.vehicles);
    println!("Tires:            {}", stats.tires);
    println!("Images:           {}", stats.images);
    println!("Maintenance rows: {}", stats.maintenance_records);
    println!("Services logged:  {}", stats.service_log_entries);
    Ok(())
}

fn handle_config(config_path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("loading configuration")?;
            if json {
                return print_json(&config);
            }
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[Storage]");
            println!("  Backend:             {}", config.storage.backend);
            println!("  Database path:       {}", config.database_path().display());
            println!("  Pool size:           {}", config.storage.pool_size);
            println!("  Seed on open:        {}", config.storage.seed_on_open);
            println!();
            println!("[Fleet]");
            println!("  Registration format: {}", config.fleet.registration_pattern);
            for vehicle in &config.fleet.vehicles {
                println!("  {}", vehicle.display_name());
            }
            println!();
            println!("[Tires]");
            println!("  Attention below:     {}%", config.tires.attention_threshold);
            println!("  Max image size:      {} bytes", config.tires.max_image_bytes);
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
