//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::builder::PossibleValuesParser;
use clap::{Args, Subcommand, ValueEnum};

use crate::maintenance::SERVICE_TYPES;
use crate::storage::Backend;
use crate::tire::TirePosition;

/// Output switch shared by the listing commands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Service logging arguments.
#[derive(Debug, Args)]
pub struct ServiceCommand {
    /// Vehicle identifier, e.g. TIPPEG-4
    pub vehicle: String,

    /// Kind of service
    #[arg(
        short = 't',
        long = "type",
        value_parser = PossibleValuesParser::new(SERVICE_TYPES.iter().copied())
    )]
    pub service_type: String,

    /// Date of the service (YYYY-MM-DD), defaults to today
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Free-form notes
    #[arg(short, long, default_value = "")]
    pub notes: String,
}

/// Per-vehicle listing arguments.
#[derive(Debug, Args)]
pub struct VehicleArgs {
    /// Vehicle identifier, e.g. TIPPEG-4
    pub vehicle: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Single-tire commands.
#[derive(Debug, Subcommand)]
pub enum TireCommand {
    /// Save one tire, creating or updating it
    Set(TireSetCommand),

    /// Attach a photo to a stored tire
    Attach {
        /// Vehicle identifier
        vehicle: String,

        /// Position label, name or tire number (e.g. "Front Left", front-left, Tire-1, 1)
        #[arg(value_parser = parse_position)]
        position: TirePosition,

        /// JPEG or PNG file
        file: PathBuf,
    },

    /// Save every tire of a vehicle from a TOML or JSON sheet
    Sheet {
        /// Vehicle identifier
        vehicle: String,

        /// Sheet file (.toml or .json)
        file: PathBuf,

        /// Output the report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the photos attached to a tire, newest first
    Images {
        /// Vehicle identifier
        vehicle: String,

        /// Position label, name or tire number
        #[arg(value_parser = parse_position)]
        position: TirePosition,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments for saving a tire.
#[derive(Debug, Args)]
pub struct TireSetCommand {
    /// Vehicle identifier
    pub vehicle: String,

    /// Position label, name or tire number
    #[arg(value_parser = parse_position)]
    pub position: TirePosition,

    /// Tread condition in percent (0-100)
    #[arg(long)]
    pub condition: u8,

    /// Installation date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub installed: NaiveDate,

    /// Odometer reading when fitted
    #[arg(long)]
    pub start: i64,

    /// Latest odometer reading
    #[arg(long)]
    pub current: i64,

    /// Photo to attach after saving
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Storage backend override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// `SQLite` database file
    Sqlite,
    /// In-process memory, nothing is kept
    Memory,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sqlite => Backend::Sqlite,
            BackendArg::Memory => Backend::Memory,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_position(s: &str) -> Result<TirePosition, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_arg_conversion() {
        assert_eq!(Backend::from(BackendArg::Sqlite), Backend::Sqlite);
        assert_eq!(Backend::from(BackendArg::Memory), Backend::Memory);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-05-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
        );
        assert!(parse_date("01/05/2025").is_err());
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("Tire-3").unwrap(), TirePosition::MiddleLeft1);
        assert_eq!(parse_position("Front Right").unwrap(), TirePosition::FrontRight);
        assert!(parse_position("Tire-11").is_err());
    }
}
