//! Fleet operations on top of a [`FleetStore`].
//!
//! [`FleetService`] validates operator input, applies the configured
//! thresholds and assembles the dashboard views. It owns no state of its own
//! besides the injected store and a copy of the relevant configuration.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{Config, FleetConfig, TireConfig};
use crate::error::{Error, Result};
use crate::maintenance::{
    default_schedule, FilterFlags, MaintenanceRecord, ServiceEntry, ServiceLogEntry,
};
use crate::status::ServiceStatus;
use crate::storage::{FleetStore, SeedReport, StoreStats};
use crate::tire::{ConditionBand, TireInput, TirePosition, TireRecord, UpsertOutcome};
use crate::vehicle::Vehicle;

/// Condition below which an attention entry is critical.
pub const CRITICAL_CONDITION: u8 = 20;

/// Condition below which an attention entry is high severity.
pub const HIGH_CONDITION: u8 = 30;

/// How urgently a worn tire needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Below 20%.
    Critical,
    /// Below 30%.
    High,
    /// Below the attention threshold.
    Elevated,
}

impl Severity {
    /// Severity for a condition already known to be below the threshold.
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        if percent < CRITICAL_CONDITION {
            Self::Critical
        } else if percent < HIGH_CONDITION {
            Self::High
        } else {
            Self::Elevated
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Elevated => write!(f, "elevated"),
        }
    }
}

/// One line of the maintenance dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceRow {
    /// Vehicle identifier.
    pub vehicle_id: String,
    /// `"<id> - <registration>"`.
    pub display_name: String,
    /// Kind of the last service.
    pub service_type: String,
    /// Meter reading at the last service.
    pub last_service_counter: i64,
    /// Meter reading at which the next service is due.
    pub due_counter: i64,
    /// Latest meter reading.
    pub current_counter: i64,
    /// `due_counter - current_counter`.
    pub remaining: i64,
    /// Derived status.
    pub status: ServiceStatus,
    /// Remaining hours clamped at zero.
    pub hours_until_service: i64,
}

impl MaintenanceRow {
    fn new(record: &MaintenanceRecord, display_name: String) -> Self {
        Self {
            vehicle_id: record.vehicle_id.clone(),
            display_name,
            service_type: record.service_type.clone(),
            last_service_counter: record.last_service_counter,
            due_counter: record.due_counter,
            current_counter: record.current_counter,
            remaining: record.remaining(),
            status: record.status(),
            hours_until_service: record.hours_until_service(),
        }
    }
}

/// Headline counts for the maintenance dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceTotals {
    /// Tippers with a maintenance record.
    pub tippers: usize,
    /// Rows with status `OVERDUE`.
    pub overdue: usize,
    /// Rows with status `DUE SOON`.
    pub due_soon: usize,
}

/// Filter replacement state for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRow {
    /// `"<id> - <registration>"`.
    pub display_name: String,
    /// Filter flags.
    #[serde(flatten)]
    pub filters: FilterFlags,
    /// Parts with fewer than 1000 hours fitted.
    pub parts_under_1000hrs: bool,
}

/// Everything shown on the maintenance dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceDashboard {
    /// All maintenance rows.
    pub rows: Vec<MaintenanceRow>,
    /// Headline counts.
    pub totals: MaintenanceTotals,
    /// Rows that are overdue.
    pub overdue: Vec<MaintenanceRow>,
    /// Rows that are due soon.
    pub due_soon: Vec<MaintenanceRow>,
    /// Filter replacement table.
    pub filters: Vec<FilterRow>,
}

/// One tire on the tire dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TireRow {
    /// Mounting slot.
    pub position: TirePosition,
    /// Fixed tire number.
    pub tire_number: String,
    /// Tread condition, 0 to 100.
    pub condition_percent: u8,
    /// Colour-coding band.
    pub band: ConditionBand,
    /// Date the tire was fitted.
    pub date_installed: NaiveDate,
    /// Odometer reading when fitted.
    pub starting_distance: i64,
    /// Latest odometer reading.
    pub current_distance: i64,
    /// Kilometres covered since fitting.
    pub kms_run: i64,
    /// Number of attached photos.
    pub images: usize,
}

impl From<&TireRecord> for TireRow {
    fn from(tire: &TireRecord) -> Self {
        Self {
            position: tire.position,
            tire_number: tire.tire_number.clone(),
            condition_percent: tire.condition_percent,
            band: tire.condition_band(),
            date_installed: tire.date_installed,
            starting_distance: tire.starting_distance,
            current_distance: tire.current_distance,
            kms_run: tire.kms_run(),
            images: tire.images.len(),
        }
    }
}

/// A tire below the attention threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttentionEntry {
    /// Mounting slot.
    pub position: TirePosition,
    /// Fixed tire number.
    pub tire_number: String,
    /// Tread condition, 0 to 100.
    pub condition_percent: u8,
    /// Kilometres covered since fitting.
    pub kms_run: i64,
    /// How urgent the replacement is.
    pub severity: Severity,
}

/// Tire status for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TireDashboard {
    /// The vehicle.
    pub vehicle: Vehicle,
    /// Tires in slot order.
    pub tires: Vec<TireRow>,
    /// Tires below the attention threshold, in slot order.
    pub attention: Vec<AttentionEntry>,
    /// Threshold used to build `attention`.
    pub attention_threshold: u8,
}

/// Summary line of the vehicle overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    /// Vehicle identifier.
    pub vehicle_id: String,
    /// Registration number.
    pub registration: String,
    /// Stored tires.
    pub tire_count: usize,
    /// Mean tire condition, 0 with no tires.
    pub average_condition: f64,
    /// Sum of kilometres run over all tires.
    pub total_kms_run: i64,
    /// Latest meter reading, if the vehicle has a maintenance record.
    pub current_counter: Option<i64>,
    /// Next service threshold, if known.
    pub due_counter: Option<i64>,
    /// `due_counter - current_counter`, if known.
    pub remaining: Option<i64>,
}

/// One position on a tire sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TireSheetEntry {
    /// Mounting slot.
    pub position: TirePosition,
    /// Tread condition, 0 to 100.
    pub condition_percent: u8,
    /// Date the tire was fitted.
    pub date_installed: NaiveDate,
    /// Odometer reading when fitted.
    pub starting_distance: i64,
    /// Latest odometer reading.
    pub current_distance: i64,
    /// Photo to attach after the save.
    pub image: Option<Vec<u8>>,
}

/// A position that could not be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetFailure {
    /// Mounting slot.
    pub position: TirePosition,
    /// What went wrong.
    pub message: String,
}

/// Outcome of [`FleetService::save_tire_sheet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    /// Tires upserted.
    pub tires_saved: usize,
    /// Images attached.
    pub images_saved: usize,
    /// Positions that failed.
    pub failures: Vec<SheetFailure>,
}

impl SheetReport {
    /// Whether every position was saved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fleet operations over an injected store.
#[derive(Debug)]
pub struct FleetService {
    store: Box<dyn FleetStore>,
    fleet: FleetConfig,
    tires: TireConfig,
}

impl FleetService {
    /// Wrap a store with the thresholds from `config`.
    #[must_use]
    pub fn new(store: Box<dyn FleetStore>, config: &Config) -> Self {
        Self {
            store,
            fleet: config.fleet.clone(),
            tires: config.tires.clone(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn FleetStore {
        self.store.as_ref()
    }

    /// Seed the configured registry and the default maintenance schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn seed(&self) -> Result<SeedReport> {
        let report = self
            .store
            .seed(&self.fleet.vehicles, &default_schedule(Utc::now()))?;
        if report.is_empty() {
            debug!("Store already seeded");
        } else {
            info!(
                "Seeded {} vehicles and {} maintenance records",
                report.vehicles_added, report.maintenance_added
            );
        }
        Ok(report)
    }

    /// All registered vehicles.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn vehicles(&self) -> Result<Vec<Vehicle>> {
        self.store.vehicles()
    }

    fn require_vehicle(&self, vehicle_id: &str) -> Result<Vehicle> {
        self.store
            .vehicle(vehicle_id)?
            .ok_or_else(|| Error::vehicle_not_found(vehicle_id))
    }

    /// Validate and save one tire.
    ///
    /// An update keeps the stored starting distance, so the new current
    /// distance is checked against that instead of the submitted one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for bad input,
    /// [`Error::VehicleNotFound`] for an unregistered vehicle, or a storage
    /// error.
    pub fn save_tire(&self, input: &TireInput) -> Result<UpsertOutcome> {
        input.validate()?;
        self.require_vehicle(&input.vehicle_id)?;

        if let Some(existing) = self.store.tire(&input.vehicle_id, input.position)? {
            if input.current_distance < existing.starting_distance {
                return Err(Error::invalid_input(
                    "current_distance",
                    format!(
                        "{} is below the stored starting distance {}",
                        input.current_distance, existing.starting_distance
                    ),
                ));
            }
        }

        let outcome = self.store.upsert_tire(input)?;
        info!(
            "Saved {} on {} ({:?})",
            input.position.tire_number(),
            input.vehicle_id,
            outcome
        );
        Ok(outcome)
    }

    /// Attach a photo to an existing tire.
    ///
    /// Returns `false` if no tire is stored at the position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or oversized image, or a
    /// storage error.
    pub fn attach_image(&self, vehicle_id: &str, position: TirePosition, data: &[u8]) -> Result<bool> {
        let len = self.check_image(data)?;
        let attached = self.store.attach_image(vehicle_id, position, data)?;
        if attached {
            info!(
                "Attached {} byte image to {} on {}",
                len,
                position.tire_number(),
                vehicle_id
            );
        } else {
            warn!(
                "No {} stored on {}, image not attached",
                position.tire_number(),
                vehicle_id
            );
        }
        Ok(attached)
    }

    fn check_image(&self, data: &[u8]) -> Result<u64> {
        if data.is_empty() {
            return Err(Error::invalid_input("image", "must not be empty"));
        }
        let len = u64::try_from(data.len()).unwrap_or(u64::MAX);
        if len > self.tires.max_image_bytes {
            return Err(Error::invalid_input(
                "image",
                format!(
                    "{len} bytes exceeds the limit of {} bytes",
                    self.tires.max_image_bytes
                ),
            ));
        }
        Ok(len)
    }

    /// Save one tire and optionally attach a photo to it.
    ///
    /// The photo is checked before anything is written, so a rejected photo
    /// leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::save_tire`] and [`Self::attach_image`],
    /// or [`Error::Internal`] if the saved tire cannot be found to take the
    /// photo.
    pub fn save_tire_with_image(
        &self,
        input: &TireInput,
        image: Option<&[u8]>,
    ) -> Result<UpsertOutcome> {
        if let Some(data) = image {
            self.check_image(data)?;
        }

        let outcome = self.save_tire(input)?;
        if let Some(data) = image {
            if !self.attach_image(&input.vehicle_id, input.position, data)? {
                return Err(Error::internal(format!(
                    "{} on {} was saved but could not take the photo",
                    input.position.tire_number(),
                    input.vehicle_id
                )));
            }
        }
        Ok(outcome)
    }

    /// Save a full tire sheet for one vehicle.
    ///
    /// Each position is saved on its own; a failure is logged, recorded in
    /// the report and the remaining positions are still processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VehicleNotFound`] if the vehicle is not registered.
    pub fn save_tire_sheet(&self, vehicle_id: &str, entries: &[TireSheetEntry]) -> Result<SheetReport> {
        self.require_vehicle(vehicle_id)?;
        let mut report = SheetReport::default();

        for entry in entries {
            let input = TireInput {
                vehicle_id: vehicle_id.to_string(),
                position: entry.position,
                condition_percent: entry.condition_percent,
                date_installed: entry.date_installed,
                starting_distance: entry.starting_distance,
                current_distance: entry.current_distance,
            };

            if let Err(e) = self.save_tire(&input) {
                error!("Failed to save {} on {}: {}", entry.position, vehicle_id, e);
                report.failures.push(SheetFailure {
                    position: entry.position,
                    message: e.to_string(),
                });
                continue;
            }
            report.tires_saved += 1;

            let Some(image) = &entry.image else {
                continue;
            };
            match self.attach_image(vehicle_id, entry.position, image) {
                Ok(true) => report.images_saved += 1,
                Ok(false) => report.failures.push(SheetFailure {
                    position: entry.position,
                    message: "tire not found for image".to_string(),
                }),
                Err(e) => {
                    error!(
                        "Failed to attach image to {} on {}: {}",
                        entry.position, vehicle_id, e
                    );
                    report.failures.push(SheetFailure {
                        position: entry.position,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Tire sheet for {}: {} tires, {} images, {} failures",
            vehicle_id,
            report.tires_saved,
            report.images_saved,
            report.failures.len()
        );
        Ok(report)
    }

    /// Record a completed service.
    ///
    /// The due threshold is not moved. A vehicle that was overdue before
    /// the service is still overdue afterwards; this is logged at warn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty service type,
    /// [`Error::VehicleNotFound`] if the vehicle has no maintenance record,
    /// or a storage error.
    pub fn log_service(&self, vehicle_id: &str, entry: &ServiceEntry) -> Result<MaintenanceRecord> {
        if entry.service_type.trim().is_empty() {
            return Err(Error::invalid_input("service_type", "must not be empty"));
        }

        let record = self.store.mark_serviced(vehicle_id, entry)?;
        info!(
            "Logged {} for {} at counter {}",
            entry.service_type, vehicle_id, record.last_service_counter
        );
        if record.status() == ServiceStatus::Overdue {
            warn!(
                "{} is still overdue after servicing: due counter {} is below current {}",
                vehicle_id, record.due_counter, record.current_counter
            );
        }
        Ok(record)
    }

    /// Service history for one vehicle, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VehicleNotFound`] for an unregistered vehicle, or a
    /// storage error.
    pub fn service_history(&self, vehicle_id: &str) -> Result<Vec<ServiceLogEntry>> {
        self.require_vehicle(vehicle_id)?;
        self.store.service_history(vehicle_id)
    }

    /// Build the maintenance dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn maintenance_dashboard(&self) -> Result<MaintenanceDashboard> {
        let names: HashMap<String, String> = self
            .store
            .vehicles()?
            .into_iter()
            .map(|v| (v.id.clone(), v.display_name()))
            .collect();

        let mut dashboard = MaintenanceDashboard::default();
        for record in self.store.maintenance_records()? {
            let display_name = names
                .get(&record.vehicle_id)
                .cloned()
                .unwrap_or_else(|| record.vehicle_id.clone());
            let row = MaintenanceRow::new(&record, display_name.clone());

            match row.status {
                ServiceStatus::Overdue => dashboard.overdue.push(row.clone()),
                ServiceStatus::DueSoon => dashboard.due_soon.push(row.clone()),
                ServiceStatus::Ok => {}
            }
            dashboard.filters.push(FilterRow {
                display_name,
                filters: record.filters,
                parts_under_1000hrs: record.parts_under_1000hrs,
            });
            dashboard.rows.push(row);
        }

        dashboard.totals = MaintenanceTotals {
            tippers: dashboard.rows.len(),
            overdue: dashboard.overdue.len(),
            due_soon: dashboard.due_soon.len(),
        };
        Ok(dashboard)
    }

    /// Build the tire dashboard for one vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VehicleNotFound`] for an unregistered vehicle, or a
    /// storage error.
    pub fn tire_dashboard(&self, vehicle_id: &str) -> Result<TireDashboard> {
        let vehicle = self.require_vehicle(vehicle_id)?;
        let mut tires = self.store.tires(vehicle_id)?;
        tires.sort_by_key(|t| t.position);

        let threshold = self.tires.attention_threshold;
        let attention = tires
            .iter()
            .filter(|t| t.condition_percent < threshold)
            .map(|t| AttentionEntry {
                position: t.position,
                tire_number: t.tire_number.clone(),
                condition_percent: t.condition_percent,
                kms_run: t.kms_run(),
                severity: Severity::from_percent(t.condition_percent),
            })
            .collect();

        Ok(TireDashboard {
            vehicle,
            tires: tires.iter().map(TireRow::from).collect(),
            attention,
            attention_threshold: threshold,
        })
    }

    /// Stored tires for one vehicle, with their images.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VehicleNotFound`] for an unregistered vehicle, or a
    /// storage error.
    pub fn tires(&self, vehicle_id: &str) -> Result<Vec<TireRecord>> {
        self.require_vehicle(vehicle_id)?;
        self.store.tires(vehicle_id)
    }

    /// One stored tire, with its images.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn tire(&self, vehicle_id: &str, position: TirePosition) -> Result<Option<TireRecord>> {
        self.store.tire(vehicle_id, position)
    }

    /// Per-vehicle summary of tires and counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn vehicle_overview(&self) -> Result<Vec<VehicleSummary>> {
        let mut summaries = Vec::new();
        for vehicle in self.store.vehicles()? {
            let tires = self.store.tires(&vehicle.id)?;
            let maintenance = self.store.maintenance(&vehicle.id)?;

            let total_condition: u32 = tires.iter().map(|t| u32::from(t.condition_percent)).sum();
            #[allow(clippy::cast_precision_loss)]
            let average_condition = if tires.is_empty() {
                0.0
            } else {
                f64::from(total_condition) / tires.len() as f64
            };

            summaries.push(VehicleSummary {
                tire_count: tires.len(),
                average_condition,
                total_kms_run: tires.iter().map(TireRecord::kms_run).sum(),
                current_counter: maintenance.as_ref().map(|m| m.current_counter),
                due_counter: maintenance.as_ref().map(|m| m.due_counter),
                remaining: maintenance.as_ref().map(MaintenanceRecord::remaining),
                vehicle_id: vehicle.id,
                registration: vehicle.registration,
            });
        }
        Ok(summaries)
    }

    /// Row counts for the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::storage::{Backend, MemoryStore, SqliteStore};

    /// Memory store whose tires never accept photos.
    #[derive(Debug, Default)]
    struct NoPhotoStore(MemoryStore);

    impl FleetStore for NoPhotoStore {
        fn backend(&self) -> Backend {
            self.0.backend()
        }
        fn seed(&self, vehicles: &[Vehicle], schedule: &[MaintenanceRecord]) -> Result<SeedReport> {
            self.0.seed(vehicles, schedule)
        }
        fn vehicles(&self) -> Result<Vec<Vehicle>> {
            self.0.vehicles()
        }
        fn vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>> {
            self.0.vehicle(vehicle_id)
        }
        fn tires(&self, vehicle_id: &str) -> Result<Vec<TireRecord>> {
            self.0.tires(vehicle_id)
        }
        fn tire(&self, vehicle_id: &str, position: TirePosition) -> Result<Option<TireRecord>> {
            self.0.tire(vehicle_id, position)
        }
        fn upsert_tire(&self, input: &TireInput) -> Result<UpsertOutcome> {
            self.0.upsert_tire(input)
        }
        fn attach_image(&self, _: &str, _: TirePosition, _: &[u8]) -> Result<bool> {
            Ok(false)
        }
        fn maintenance_records(&self) -> Result<Vec<MaintenanceRecord>> {
            self.0.maintenance_records()
        }
        fn maintenance(&self, vehicle_id: &str) -> Result<Option<MaintenanceRecord>> {
            self.0.maintenance(vehicle_id)
        }
        fn mark_serviced(&self, vehicle_id: &str, entry: &ServiceEntry) -> Result<MaintenanceRecord> {
            self.0.mark_serviced(vehicle_id, entry)
        }
        fn service_history(&self, vehicle_id: &str) -> Result<Vec<ServiceLogEntry>> {
            self.0.service_history(vehicle_id)
        }
        fn stats(&self) -> Result<StoreStats> {
            self.0.stats()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn services() -> Vec<FleetService> {
        init_test_logging();
        let config = Config::default();
        let stores: Vec<Box<dyn FleetStore>> = vec![
            Box::new(SqliteStore::open_in_memory().unwrap()),
            Box::new(MemoryStore::new()),
        ];
        stores
            .into_iter()
            .map(|store| {
                let service = FleetService::new(store, &config);
                service.seed().unwrap();
                service
            })
            .collect()
    }

    /// Services seeded with two test vehicles and hand-picked counters.
    fn counter_services() -> Vec<FleetService> {
        init_test_logging();
        let mut config = Config::default();
        config.fleet.vehicles = vec![
            Vehicle::new("V-1", "AP39UQ-0001"),
            Vehicle::new("V-2", "AP39UQ-0002"),
            Vehicle::new("V-3", "AP39UQ-0003"),
        ];
        let record = |id: &str, due, current| MaintenanceRecord {
            vehicle_id: id.to_string(),
            last_service_counter: 0,
            service_type: String::new(),
            due_counter: due,
            current_counter: current,
            filters: FilterFlags::default(),
            parts_under_1000hrs: false,
            last_updated: Utc::now(),
        };
        let schedule = vec![
            record("V-1", 2500, 2600),
            record("V-2", 2500, 2450),
            record("V-3", 2500, 1000),
        ];

        let stores: Vec<Box<dyn FleetStore>> = vec![
            Box::new(SqliteStore::open_in_memory().unwrap()),
            Box::new(MemoryStore::new()),
        ];
        stores
            .into_iter()
            .map(|store| {
                store.seed(&config.fleet.vehicles, &schedule).unwrap();
                FleetService::new(store, &config)
            })
            .collect()
    }

    fn input(position: TirePosition, condition: u8, start: i64, current: i64) -> TireInput {
        TireInput {
            vehicle_id: "TIPPEG-4".to_string(),
            position,
            condition_percent: condition,
            date_installed: date(),
            starting_distance: start,
            current_distance: current,
        }
    }

    fn sheet_entry(position: TirePosition, condition: u8) -> TireSheetEntry {
        TireSheetEntry {
            position,
            condition_percent: condition,
            date_installed: date(),
            starting_distance: 1000,
            current_distance: 2000,
            image: None,
        }
    }

    #[test]
    fn test_severity() {
        assert_eq!(Severity::from_percent(0), Severity::Critical);
        assert_eq!(Severity::from_percent(19), Severity::Critical);
        assert_eq!(Severity::from_percent(20), Severity::High);
        assert_eq!(Severity::from_percent(29), Severity::High);
        assert_eq!(Severity::from_percent(30), Severity::Elevated);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_seed_is_idempotent() {
        for service in services() {
            let again = service.seed().unwrap();
            assert!(again.is_empty());
            assert_eq!(service.vehicles().unwrap().len(), 9);
        }
    }

    #[test]
    fn test_save_tire_reports_kms_run() {
        for service in services() {
            let outcome = service
                .save_tire(&input(TirePosition::FrontLeft, 80, 1000, 5000))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Inserted);

            let dashboard = service.tire_dashboard("TIPPEG-4").unwrap();
            assert_eq!(dashboard.tires.len(), 1);
            assert_eq!(dashboard.tires[0].kms_run, 4000);
            assert_eq!(dashboard.tires[0].band, ConditionBand::Good);
        }
    }

    #[test]
    fn test_save_tire_twice_updates() {
        for service in services() {
            service
                .save_tire(&input(TirePosition::FrontLeft, 80, 1000, 5000))
                .unwrap();
            let outcome = service
                .save_tire(&input(TirePosition::FrontLeft, 60, 3000, 6000))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Updated);

            let tire = service
                .tire("TIPPEG-4", TirePosition::FrontLeft)
                .unwrap()
                .unwrap();
            assert_eq!(tire.condition_percent, 60);
            assert_eq!(tire.starting_distance, 1000);
            assert_eq!(tire.current_distance, 6000);
        }
    }

    #[test]
    fn test_save_tire_rejects_invalid_input() {
        for service in services() {
            let err = service
                .save_tire(&input(TirePosition::FrontLeft, 101, 0, 0))
                .unwrap_err();
            assert!(err.is_invalid_input());

            let err = service
                .save_tire(&input(TirePosition::FrontLeft, 50, 5000, 1000))
                .unwrap_err();
            assert!(err.is_invalid_input());
            assert!(service.tires("TIPPEG-4").unwrap().is_empty());
        }
    }

    #[test]
    fn test_update_checks_stored_starting_distance() {
        for service in services() {
            service
                .save_tire(&input(TirePosition::FrontLeft, 80, 1000, 5000))
                .unwrap();

            let err = service
                .save_tire(&input(TirePosition::FrontLeft, 70, 0, 500))
                .unwrap_err();
            assert!(err.is_invalid_input());
            assert!(err.to_string().contains("stored starting distance 1000"));

            let tire = service
                .tire("TIPPEG-4", TirePosition::FrontLeft)
                .unwrap()
                .unwrap();
            assert_eq!(tire.condition_percent, 80);
            assert_eq!(tire.current_distance, 5000);
            assert_eq!(tire.kms_run(), 4000);
        }
    }

    #[test]
    fn test_save_tire_unknown_vehicle() {
        for service in services() {
            let mut tire = input(TirePosition::FrontLeft, 50, 0, 10);
            tire.vehicle_id = "TIPPEG-99".to_string();
            let err = service.save_tire(&tire).unwrap_err();
            assert!(err.is_vehicle_not_found());
        }
    }

    #[test]
    fn test_attach_image_limits() {
        let mut config = Config::default();
        config.tires.max_image_bytes = 4;
        let service = FleetService::new(Box::new(MemoryStore::new()), &config);
        service.seed().unwrap();
        service
            .save_tire(&input(TirePosition::MiddleLeft1, 70, 0, 100))
            .unwrap();

        assert!(service
            .attach_image("TIPPEG-4", TirePosition::MiddleLeft1, b"abcd")
            .unwrap());
        assert!(service
            .attach_image("TIPPEG-4", TirePosition::MiddleLeft1, b"abcde")
            .unwrap_err()
            .is_invalid_input());
        assert!(service
            .attach_image("TIPPEG-4", TirePosition::MiddleLeft1, b"")
            .unwrap_err()
            .is_invalid_input());
    }

    #[test]
    fn test_save_tire_with_image() {
        for service in services() {
            let outcome = service
                .save_tire_with_image(&input(TirePosition::FrontRight, 90, 0, 100), Some(b"photo"))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Inserted);

            let tire = service
                .tire("TIPPEG-4", TirePosition::FrontRight)
                .unwrap()
                .unwrap();
            assert_eq!(tire.images.len(), 1);
            assert_eq!(tire.images[0].data, b"photo");
        }
    }

    #[test]
    fn test_rejected_image_leaves_store_untouched() {
        let mut config = Config::default();
        config.tires.max_image_bytes = 4;
        let service = FleetService::new(Box::new(MemoryStore::new()), &config);
        service.seed().unwrap();

        let err = service
            .save_tire_with_image(&input(TirePosition::FrontRight, 90, 0, 100), Some(b"too big"))
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(service.tires("TIPPEG-4").unwrap().is_empty());
    }

    #[test]
    fn test_save_tire_with_image_reports_unattached_photo() {
        let service = FleetService::new(Box::new(NoPhotoStore::default()), &Config::default());
        service.seed().unwrap();

        let err = service
            .save_tire_with_image(&input(TirePosition::FrontRight, 90, 0, 100), Some(b"photo"))
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(err.to_string().contains("could not take the photo"));
    }

    #[test]
    fn test_attach_image_to_missing_tire() {
        for service in services() {
            let attached = service
                .attach_image("TIPPEG-4", TirePosition::RearRight2, b"\x89PNG")
                .unwrap();
            assert!(!attached);
            assert!(service.tires("TIPPEG-4").unwrap().is_empty());
        }
    }

    #[test]
    fn test_tire_dashboard_attention() {
        for service in services() {
            for (position, condition) in [
                (TirePosition::FrontLeft, 15),
                (TirePosition::FrontRight, 25),
                (TirePosition::MiddleLeft1, 35),
                (TirePosition::MiddleRight1, 40),
                (TirePosition::RearRight2, 90),
            ] {
                service
                    .save_tire(&input(position, condition, 0, 100))
                    .unwrap();
            }

            let dashboard = service.tire_dashboard("TIPPEG-4").unwrap();
            assert_eq!(dashboard.tires.len(), 5);
            assert_eq!(dashboard.attention_threshold, 40);

            let severities: Vec<_> = dashboard.attention.iter().map(|a| a.severity).collect();
            assert_eq!(
                severities,
                vec![Severity::Critical, Severity::High, Severity::Elevated]
            );
            assert_eq!(dashboard.tires[3].band, ConditionBand::Fair);
            assert_eq!(dashboard.tires[0].band, ConditionBand::Poor);
        }
    }

    #[test]
    fn test_tire_dashboard_custom_threshold() {
        let mut config = Config::default();
        config.tires.attention_threshold = 20;
        let service = FleetService::new(Box::new(MemoryStore::new()), &config);
        service.seed().unwrap();
        service
            .save_tire(&input(TirePosition::FrontLeft, 25, 0, 100))
            .unwrap();

        assert!(service.tire_dashboard("TIPPEG-4").unwrap().attention.is_empty());
    }

    #[test]
    fn test_tire_dashboard_unknown_vehicle() {
        for service in services() {
            assert!(service
                .tire_dashboard("nope")
                .unwrap_err()
                .is_vehicle_not_found());
        }
    }

    #[test]
    fn test_save_tire_sheet_continues_past_failures() {
        for service in services() {
            let mut entries: Vec<_> = TirePosition::ALL
                .iter()
                .map(|&p| sheet_entry(p, 75))
                .collect();
            entries[2].condition_percent = 150;
            entries[0].image = Some(b"\xFF\xD8\xFFjpeg".to_vec());
            entries[5].image = Some(Vec::new());

            let report = service.save_tire_sheet("TIPPEG-5", &entries).unwrap();
            assert_eq!(report.tires_saved, 9);
            assert_eq!(report.images_saved, 1);
            assert_eq!(report.failures.len(), 2);
            assert_eq!(report.failures[0].position, TirePosition::ALL[2]);
            assert_eq!(report.failures[1].position, TirePosition::ALL[5]);
            assert!(!report.is_complete());

            assert_eq!(service.tires("TIPPEG-5").unwrap().len(), 9);
        }
    }

    #[test]
    fn test_save_tire_sheet_unknown_vehicle() {
        for service in services() {
            let entries = vec![sheet_entry(TirePosition::FrontLeft, 50)];
            assert!(service
                .save_tire_sheet("TIPPEG-99", &entries)
                .unwrap_err()
                .is_vehicle_not_found());
        }
    }

    #[test]
    fn test_maintenance_dashboard_scenarios() {
        for service in counter_services() {
            let dashboard = service.maintenance_dashboard().unwrap();
            assert_eq!(
                dashboard.totals,
                MaintenanceTotals {
                    tippers: 3,
                    overdue: 1,
                    due_soon: 1,
                }
            );

            assert_eq!(dashboard.overdue[0].vehicle_id, "V-1");
            assert_eq!(dashboard.overdue[0].remaining, -100);
            assert_eq!(dashboard.overdue[0].hours_until_service, 0);
            assert_eq!(dashboard.overdue[0].display_name, "V-1 - AP39UQ-0001");

            assert_eq!(dashboard.due_soon[0].vehicle_id, "V-2");
            assert_eq!(dashboard.due_soon[0].remaining, 50);
            assert_eq!(dashboard.filters.len(), 3);
        }
    }

    #[test]
    fn test_default_dashboard() {
        for service in services() {
            let dashboard = service.maintenance_dashboard().unwrap();
            assert_eq!(dashboard.totals.tippers, 5);
            assert!(dashboard.filters.iter().all(|f| f.filters == FilterFlags::all()));
        }
    }

    #[test]
    fn test_log_service_keeps_due_counter() {
        for service in counter_services() {
            let entry = ServiceEntry::new("1000hrs Service", date()).with_notes("oil");
            let record = service.log_service("V-1", &entry).unwrap();

            assert_eq!(record.last_service_counter, 2600);
            assert_eq!(record.due_counter, 2500);
            assert_eq!(record.status(), ServiceStatus::Overdue);

            let history = service.service_history("V-1").unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].notes, "oil");
            assert_eq!(history[0].counter_at_service, 2600);
        }
    }

    #[test]
    fn test_log_service_rejects_empty_type() {
        for service in counter_services() {
            let entry = ServiceEntry::new("  ", date());
            assert!(service
                .log_service("V-1", &entry)
                .unwrap_err()
                .is_invalid_input());
            assert!(service.service_history("V-1").unwrap().is_empty());
        }
    }

    #[test]
    fn test_log_service_unknown_vehicle() {
        for service in counter_services() {
            let entry = ServiceEntry::new("Other", date());
            assert!(service
                .log_service("V-9", &entry)
                .unwrap_err()
                .is_vehicle_not_found());
        }
    }

    #[test]
    fn test_vehicle_overview() {
        for service in services() {
            service
                .save_tire(&input(TirePosition::FrontLeft, 80, 1000, 5000))
                .unwrap();
            service
                .save_tire(&input(TirePosition::FrontRight, 61, 0, 500))
                .unwrap();

            let overview = service.vehicle_overview().unwrap();
            assert_eq!(overview.len(), 9);

            let v4 = overview.iter().find(|s| s.vehicle_id == "TIPPEG-4").unwrap();
            assert_eq!(v4.tire_count, 2);
            assert!((v4.average_condition - 70.5).abs() < f64::EPSILON);
            assert_eq!(v4.total_kms_run, 4500);
            assert_eq!(v4.current_counter, Some(2817));
            assert_eq!(v4.remaining, Some(1000 - 2817));

            let v12 = overview.iter().find(|s| s.vehicle_id == "TIPPEG-12").unwrap();
            assert_eq!(v12.tire_count, 0);
            assert!(v12.average_condition.abs() < f64::EPSILON);
            assert_eq!(v12.total_kms_run, 0);
            assert!(v12.current_counter.is_none());
            assert!(v12.remaining.is_none());
        }
    }

    #[test]
    fn test_stats() {
        for service in services() {
            service
                .save_tire(&input(TirePosition::FrontLeft, 80, 0, 10))
                .unwrap();
            let stats = service.stats().unwrap();
            assert_eq!(stats.vehicles, 9);
            assert_eq!(stats.tires, 1);
            assert_eq!(stats.maintenance_records, 5);
        }
    }
}
