//! Storage layer for fleetkeeper.
//!
//! Vehicles, tires, images and maintenance records live behind the
//! [`FleetStore`] trait. Two interchangeable implementations exist:
//!
//! - [`SqliteStore`]: persistent `SQLite` database behind a small connection pool
//! - [`MemoryStore`]: process-local collections, lost on restart
//!
//! Every operation is one unit of work. Writes run in a single transaction
//! (or under a single lock), so a failed write leaves nothing behind.
//! Concurrent writes to the same record are last-writer-wins.

mod memory;
pub mod migrations;
pub mod pool;
pub mod schema;
mod sqlite;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::maintenance::{MaintenanceRecord, ServiceEntry, ServiceLogEntry};
use crate::tire::{TireInput, TirePosition, TireRecord, UpsertOutcome};
use crate::vehicle::Vehicle;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Which storage implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `SQLite` database file.
    #[default]
    Sqlite,
    /// In-process memory.
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Rows added by [`FleetStore::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Vehicles inserted.
    pub vehicles_added: usize,
    /// Maintenance rows inserted.
    pub maintenance_added: usize,
}

impl SeedReport {
    /// Whether seeding changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles_added == 0 && self.maintenance_added == 0
    }
}

/// Row counts for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Backend in use.
    pub backend: Backend,
    /// Database path, `None` for the memory backend.
    pub location: Option<PathBuf>,
    /// Registered vehicles.
    pub vehicles: i64,
    /// Stored tire records.
    pub tires: i64,
    /// Attached tire images.
    pub images: i64,
    /// Maintenance records.
    pub maintenance_records: i64,
    /// Service history entries.
    pub service_log_entries: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Persistence interface shared by all backends.
///
/// Stores do not validate operator input; that happens in
/// [`FleetService`](crate::service::FleetService) before a call reaches here.
pub trait FleetStore: Send + Sync + std::fmt::Debug {
    /// The implementation behind this store.
    fn backend(&self) -> Backend;

    /// Insert the registry and maintenance schedule if their tables are empty.
    ///
    /// Maintenance rows for vehicles that are not registered are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn seed(&self, vehicles: &[Vehicle], schedule: &[MaintenanceRecord]) -> Result<SeedReport>;

    /// All vehicles ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn vehicles(&self) -> Result<Vec<Vehicle>>;

    /// Look up a vehicle.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>>;

    /// Tires of a vehicle in slot order, images included newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn tires(&self, vehicle_id: &str) -> Result<Vec<TireRecord>>;

    /// A single tire, images included newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn tire(&self, vehicle_id: &str, position: TirePosition) -> Result<Option<TireRecord>>;

    /// Insert or update the tire at `(vehicle_id, position)`.
    ///
    /// An update overwrites position, condition, install date and current
    /// distance and refreshes `last_checked`; the starting distance and
    /// images are kept. An insert stores every field with no images.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails. Nothing is written
    /// in that case.
    fn upsert_tire(&self, input: &TireInput) -> Result<UpsertOutcome>;

    /// Append an image to a tire.
    ///
    /// Returns `false`, changing nothing, if the tire does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn attach_image(&self, vehicle_id: &str, position: TirePosition, data: &[u8]) -> Result<bool>;

    /// All maintenance records ordered by vehicle id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn maintenance_records(&self) -> Result<Vec<MaintenanceRecord>>;

    /// The maintenance record of one vehicle.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn maintenance(&self, vehicle_id: &str) -> Result<Option<MaintenanceRecord>>;

    /// Mark a vehicle as serviced now and log the service.
    ///
    /// See [`MaintenanceRecord::mark_serviced`] for the counter semantics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VehicleNotFound`](crate::Error::VehicleNotFound) if
    /// the vehicle has no maintenance record, or an error if the storage
    /// operation fails.
    fn mark_serviced(&self, vehicle_id: &str, entry: &ServiceEntry) -> Result<MaintenanceRecord>;

    /// Service history of a vehicle, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn service_history(&self, vehicle_id: &str) -> Result<Vec<ServiceLogEntry>>;

    /// Row counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn stats(&self) -> Result<StoreStats>;
}

/// Open the store selected by the configuration.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
pub fn open_store(config: &Config) -> Result<Box<dyn FleetStore>> {
    let store: Box<dyn FleetStore> = match config.storage.backend {
        Backend::Sqlite => Box::new(SqliteStore::open(
            config.database_path(),
            config.storage.pool_size,
        )?),
        Backend::Memory => Box::new(MemoryStore::new()),
    };
    info!("Using {} storage backend", store.backend());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::maintenance::{default_schedule, FilterFlags};
    use crate::status::ServiceStatus;
    use crate::vehicle::default_registry;

    fn backends() -> Vec<Box<dyn FleetStore>> {
        vec![
            Box::new(SqliteStore::open_in_memory().expect("failed to create sqlite store")),
            Box::new(MemoryStore::new()),
        ]
    }

    fn seeded_backends() -> Vec<Box<dyn FleetStore>> {
        let stores = backends();
        for store in &stores {
            store
                .seed(&default_registry(), &default_schedule(Utc::now()))
                .unwrap();
        }
        stores
    }

    fn tire_input(position: TirePosition, condition: u8, start: i64, current: i64) -> TireInput {
        TireInput {
            vehicle_id: "TIPPEG-4".to_string(),
            position,
            condition_percent: condition,
            date_installed: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            starting_distance: start,
            current_distance: current,
        }
    }

    fn counters(vehicle_id: &str, due: i64, current: i64) -> MaintenanceRecord {
        MaintenanceRecord {
            vehicle_id: vehicle_id.to_string(),
            last_service_counter: 0,
            service_type: String::new(),
            due_counter: due,
            current_counter: current,
            filters: FilterFlags::default(),
            parts_under_1000hrs: false,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_seed_populates_registry_and_schedule() {
        for store in backends() {
            let report = store
                .seed(&default_registry(), &default_schedule(Utc::now()))
                .unwrap();
            assert_eq!(report.vehicles_added, 9, "{}", store.backend());
            assert_eq!(report.maintenance_added, 5, "{}", store.backend());
            assert_eq!(store.vehicles().unwrap().len(), 9);
            assert_eq!(store.maintenance_records().unwrap().len(), 5);
        }
    }

    #[test]
    fn test_seed_twice_does_not_duplicate() {
        for store in seeded_backends() {
            let report = store
                .seed(&default_registry(), &default_schedule(Utc::now()))
                .unwrap();
            assert!(report.is_empty(), "{}", store.backend());
            assert_eq!(store.vehicles().unwrap().len(), 9);
            assert_eq!(store.maintenance_records().unwrap().len(), 5);
        }
    }

    #[test]
    fn test_seed_skips_schedule_for_unknown_vehicle() {
        for store in backends() {
            let report = store
                .seed(
                    &[crate::Vehicle::new("V-1", "REG-1")],
                    &[counters("V-1", 2500, 2600), counters("GHOST", 1, 1)],
                )
                .unwrap();
            assert_eq!(report.maintenance_added, 1, "{}", store.backend());
            assert!(store.maintenance("GHOST").unwrap().is_none());
        }
    }

    #[test]
    fn test_vehicle_lookup() {
        for store in seeded_backends() {
            let vehicle = store.vehicle("TIPPEG-6").unwrap().unwrap();
            assert_eq!(vehicle.registration, "AP39UQ-0051");
            assert!(store.vehicle("TIPPEG-99").unwrap().is_none());
        }
    }

    #[test]
    fn test_upsert_new_position_creates_one_record() {
        for store in seeded_backends() {
            let outcome = store
                .upsert_tire(&tire_input(TirePosition::RearLeft1, 80, 1000, 5000))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Inserted);

            let tires = store.tires("TIPPEG-4").unwrap();
            assert_eq!(tires.len(), 1, "{}", store.backend());
            assert_eq!(tires[0].tire_number, "Tire-7");
            assert_eq!(tires[0].kms_run(), 4000);
            assert!(tires[0].images.is_empty());
        }
    }

    #[test]
    fn test_upsert_twice_keeps_starting_distance() {
        for store in seeded_backends() {
            store
                .upsert_tire(&tire_input(TirePosition::FrontLeft, 80, 1000, 5000))
                .unwrap();
            let first = store.tire("TIPPEG-4", TirePosition::FrontLeft).unwrap().unwrap();

            let outcome = store
                .upsert_tire(&tire_input(TirePosition::FrontLeft, 35, 4200, 6500))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Updated);

            let tires = store.tires("TIPPEG-4").unwrap();
            assert_eq!(tires.len(), 1, "{}", store.backend());
            let tire = &tires[0];
            assert_eq!(tire.condition_percent, 35);
            assert_eq!(tire.starting_distance, 1000);
            assert_eq!(tire.current_distance, 6500);
            assert_eq!(tire.kms_run(), 5500);
            assert!(tire.last_checked >= first.last_checked);
        }
    }

    #[test]
    fn test_upsert_keeps_images() {
        for store in seeded_backends() {
            store
                .upsert_tire(&tire_input(TirePosition::FrontRight, 90, 0, 10))
                .unwrap();
            assert!(store
                .attach_image("TIPPEG-4", TirePosition::FrontRight, b"first")
                .unwrap());
            store
                .upsert_tire(&tire_input(TirePosition::FrontRight, 60, 0, 20))
                .unwrap();

            let tire = store.tire("TIPPEG-4", TirePosition::FrontRight).unwrap().unwrap();
            assert_eq!(tire.images.len(), 1, "{}", store.backend());
            assert_eq!(tire.images[0].data, b"first");
        }
    }

    #[test]
    fn test_tires_sorted_by_slot() {
        for store in seeded_backends() {
            for position in [
                TirePosition::RearRight2,
                TirePosition::FrontLeft,
                TirePosition::MiddleLeft2,
            ] {
                store.upsert_tire(&tire_input(position, 70, 0, 0)).unwrap();
            }
            let slots: Vec<_> = store
                .tires("TIPPEG-4")
                .unwrap()
                .iter()
                .map(|t| t.position.slot())
                .collect();
            assert_eq!(slots, vec![1, 5, 10], "{}", store.backend());
        }
    }

    #[test]
    fn test_tires_are_per_vehicle() {
        for store in seeded_backends() {
            store
                .upsert_tire(&tire_input(TirePosition::FrontLeft, 70, 0, 0))
                .unwrap();
            let mut other = tire_input(TirePosition::FrontLeft, 20, 0, 0);
            other.vehicle_id = "TIPPEG-5".to_string();
            store.upsert_tire(&other).unwrap();

            assert_eq!(store.tires("TIPPEG-4").unwrap()[0].condition_percent, 70);
            assert_eq!(store.tires("TIPPEG-5").unwrap()[0].condition_percent, 20);
        }
    }

    #[test]
    fn test_attach_image_to_missing_tire_fails() {
        for store in seeded_backends() {
            let before = store.stats().unwrap();
            let attached = store
                .attach_image("TIPPEG-4", TirePosition::RearRight2, b"orphan")
                .unwrap();
            assert!(!attached, "{}", store.backend());

            let after = store.stats().unwrap();
            assert_eq!(before.images, after.images);
            assert_eq!(before.tires, after.tires);
            assert!(store.tire("TIPPEG-4", TirePosition::RearRight2).unwrap().is_none());
        }
    }

    #[test]
    fn test_images_are_listed_newest_first() {
        for store in seeded_backends() {
            store
                .upsert_tire(&tire_input(TirePosition::MiddleRight1, 75, 0, 0))
                .unwrap();
            for blob in [b"one".as_slice(), b"two".as_slice(), b"three".as_slice()] {
                assert!(store
                    .attach_image("TIPPEG-4", TirePosition::MiddleRight1, blob)
                    .unwrap());
            }

            let tire = store
                .tire("TIPPEG-4", TirePosition::MiddleRight1)
                .unwrap()
                .unwrap();
            let blobs: Vec<_> = tire.images.iter().map(|i| i.data.clone()).collect();
            assert_eq!(
                blobs,
                vec![b"three".to_vec(), b"two".to_vec(), b"one".to_vec()],
                "{}",
                store.backend()
            );
            assert_eq!(
                tire.images[1].digest,
                crate::tire::TireImage::compute_digest(b"two")
            );
        }
    }

    #[test]
    fn test_maintenance_scenarios() {
        for store in backends() {
            store
                .seed(
                    &[
                        crate::Vehicle::new("V-1", "REG-1"),
                        crate::Vehicle::new("V-2", "REG-2"),
                    ],
                    &[counters("V-1", 2500, 2600), counters("V-2", 2500, 2450)],
                )
                .unwrap();

            let v1 = store.maintenance("V-1").unwrap().unwrap();
            assert_eq!(v1.remaining(), -100);
            assert_eq!(v1.status(), ServiceStatus::Overdue);

            let v2 = store.maintenance("V-2").unwrap().unwrap();
            assert_eq!(v2.remaining(), 50);
            assert_eq!(v2.status(), ServiceStatus::DueSoon);
        }
    }

    #[test]
    fn test_mark_serviced_rolls_counter_and_logs() {
        for store in seeded_backends() {
            let before = store.maintenance("TIPPEG-5").unwrap().unwrap();
            let entry = ServiceEntry::new(
                "2500hrs Service",
                NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
            )
            .with_notes("filters replaced");

            let after = store.mark_serviced("TIPPEG-5", &entry).unwrap();
            assert_eq!(after.last_service_counter, before.current_counter);
            assert_eq!(after.due_counter, before.due_counter);
            assert_eq!(after.service_type, "2500hrs Service");
            assert!(after.last_updated >= before.last_updated);
            assert_eq!(store.maintenance("TIPPEG-5").unwrap().unwrap(), after);

            let history = store.service_history("TIPPEG-5").unwrap();
            assert_eq!(history.len(), 1, "{}", store.backend());
            assert_eq!(history[0].notes, "filters replaced");
            assert_eq!(history[0].counter_at_service, 2322);
            assert!(store.service_history("TIPPEG-4").unwrap().is_empty());
        }
    }

    #[test]
    fn test_mark_serviced_unknown_vehicle() {
        for store in seeded_backends() {
            let entry = ServiceEntry::new("Other", NaiveDate::from_ymd_opt(2025, 5, 20).unwrap());
            let err = store.mark_serviced("TIPPEG-12", &entry).unwrap_err();
            assert!(err.is_vehicle_not_found(), "{}", store.backend());
            assert!(store.service_history("TIPPEG-12").unwrap().is_empty());
        }
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        for store in seeded_backends() {
            let input = tire_input(TirePosition::RearLeft2, 42, 1234, 5678);
            store.upsert_tire(&input).unwrap();
            let tire = store.tire("TIPPEG-4", TirePosition::RearLeft2).unwrap().unwrap();

            assert_eq!(tire.vehicle_id, "TIPPEG-4");
            assert_eq!(tire.position, TirePosition::RearLeft2);
            assert_eq!(tire.condition_percent, 42);
            assert_eq!(tire.date_installed, input.date_installed);
            assert_eq!(tire.starting_distance, 1234);
            assert_eq!(tire.current_distance, 5678);

            let record = store.maintenance("TIPPEG-6").unwrap().unwrap();
            assert_eq!(record.service_type, "1000hrs Service");
            assert_eq!(record.filters, FilterFlags::all());
            assert!(record.parts_under_1000hrs);
        }
    }

    #[test]
    fn test_stats_counts() {
        for store in seeded_backends() {
            store
                .upsert_tire(&tire_input(TirePosition::FrontLeft, 80, 0, 0))
                .unwrap();
            store
                .attach_image("TIPPEG-4", TirePosition::FrontLeft, b"x")
                .unwrap();

            let stats = store.stats().unwrap();
            assert_eq!(stats.backend, store.backend());
            assert_eq!(stats.vehicles, 9);
            assert_eq!(stats.tires, 1);
            assert_eq!(stats.images, 1);
            assert_eq!(stats.maintenance_records, 5);
            assert_eq!(stats.service_log_entries, 0);
        }
    }

    #[test]
    fn test_open_store_memory_backend() {
        let mut config = Config::default();
        config.storage.backend = Backend::Memory;
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), Backend::Memory);
    }

    #[test]
    fn test_open_store_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path = Some(dir.path().join("fleet.db"));
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), Backend::Sqlite);
    }

    #[test]
    fn test_backend_display_and_serde() {
        assert_eq!(Backend::Sqlite.to_string(), "sqlite");
        assert_eq!(Backend::Memory.to_string(), "memory");
        assert_eq!(serde_json::to_string(&Backend::Memory).unwrap(), "\"memory\"");
        assert_eq!(Backend::default(), Backend::Sqlite);
    }
}
