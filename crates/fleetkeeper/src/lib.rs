//! `fleetkeeper` - Tire and maintenance record keeping for a tipper fleet
//!
//! This library tracks per-vehicle service counters, derives service status,
//! and stores tire condition records with attached photos in a pluggable
//! backend (`SQLite` or in-memory).

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod maintenance;
pub mod service;
pub mod sheet;
pub mod status;
pub mod storage;
pub mod tire;
pub mod vehicle;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use maintenance::{MaintenanceRecord, ServiceEntry, ServiceLogEntry};
pub use service::FleetService;
pub use status::ServiceStatus;
pub use storage::{open_store, FleetStore, MemoryStore, SqliteStore, StoreStats};
pub use tire::{TireImage, TireInput, TirePosition, TireRecord};
pub use vehicle::Vehicle;
