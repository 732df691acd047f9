//! Command-line interface for fleetkeeper.
//!
//! This module provides the CLI structure for the `fleetk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BackendArg, ConfigCommand, OutputArgs, ServiceCommand, TireCommand, TireSetCommand,
    VehicleArgs,
};

/// fleetk - Tire and maintenance records for a tipper fleet
///
/// Tracks service counters, tire condition and tire photos per vehicle,
/// and shows which tippers are overdue for service.
#[derive(Debug, Parser)]
#[command(name = "fleetk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Override the configured storage backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show every vehicle with tire and counter totals
    Vehicles(OutputArgs),

    /// Show the maintenance dashboard
    Maintenance(OutputArgs),

    /// Record a completed service
    Service(ServiceCommand),

    /// Show the service history of a vehicle
    History(VehicleArgs),

    /// Show the tire dashboard of a vehicle
    Tires(VehicleArgs),

    /// Save, photograph or inspect a single tire
    #[command(subcommand)]
    Tire(TireCommand),

    /// Show storage statistics
    Stats(OutputArgs),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
