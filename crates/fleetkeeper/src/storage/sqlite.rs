//! `SQLite`-backed fleet store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::maintenance::{FilterFlags, MaintenanceRecord, ServiceEntry, ServiceLogEntry};
use crate::tire::{TireImage, TireInput, TirePosition, TireRecord, UpsertOutcome};
use crate::vehicle::Vehicle;

use super::migrations;
use super::pool::{self, ConnectionPool, PoolTarget};
use super::{Backend, FleetStore, SeedReport, StoreStats};

const TIRE_COLUMNS: &str = r"
    vehicle_id, tire_number, slot, condition_percent, date_installed,
    starting_distance, current_distance, last_checked
";

const MAINTENANCE_COLUMNS: &str = r"
    vehicle_id, last_service_counter, service_type, due_counter, current_counter,
    expires_q1, expires_qii_filter, fust_filter, parts_under_1000hrs, last_updated
";

/// Fleet store persisted in a `SQLite` database.
#[derive(Debug)]
pub struct SqliteStore {
    pool: ConnectionPool,
    target: PoolTarget,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, pool_size: usize) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening database at {}", path.display());
        let store = Self {
            pool: pool::file_pool(path, pool_size)?,
            target: PoolTarget::File(path.to_path_buf()),
        };
        store.initialize()?;
        info!("Database opened successfully at {}", path.display());
        Ok(store)
    }

    /// Create a store on a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            pool: pool::memory_pool()?,
            target: PoolTarget::Memory,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.pool.get()?;
        migrations::initialize_schema(&conn)
    }

    /// Path of the database file, `:memory:` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.target.display_path()
    }

    fn count(conn: &Connection, table: &str) -> Result<i64> {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }

    fn load_images(
        conn: &Connection,
        vehicle_id: &str,
        tire_number: &str,
    ) -> Result<Vec<TireImage>> {
        let mut stmt = conn.prepare(
            r"
            SELECT image_data, digest, upload_time FROM tire_images
            WHERE vehicle_id = ?1 AND tire_number = ?2
            ORDER BY id DESC
            ",
        )?;
        let images = stmt
            .query_map(params![vehicle_id, tire_number], |row| {
                Ok(TireImage {
                    data: row.get(0)?,
                    digest: row.get(1)?,
                    uploaded_at: parse_timestamp(row, 2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(images)
    }

    fn find_maintenance(conn: &Connection, vehicle_id: &str) -> Result<Option<MaintenanceRecord>> {
        let record = conn
            .query_row(
                &format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenance WHERE vehicle_id = ?1"),
                [vehicle_id],
                Self::row_to_maintenance,
            )
            .optional()?;
        Ok(record)
    }

    /// Convert a database row to a tire record without images.
    fn row_to_tire(row: &Row) -> rusqlite::Result<TireRecord> {
        let slot: u8 = row.get(2)?;
        let position = TirePosition::from_slot(slot).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Integer,
                format!("tire slot {slot} out of range").into(),
            )
        })?;

        Ok(TireRecord {
            vehicle_id: row.get(0)?,
            tire_number: row.get(1)?,
            position,
            condition_percent: row.get(3)?,
            date_installed: parse_date(row, 4)?,
            starting_distance: row.get(5)?,
            current_distance: row.get(6)?,
            last_checked: parse_timestamp(row, 7)?,
            images: Vec::new(),
        })
    }

    /// Convert a database row to a maintenance record.
    fn row_to_maintenance(row: &Row) -> rusqlite::Result<MaintenanceRecord> {
        Ok(MaintenanceRecord {
            vehicle_id: row.get(0)?,
            last_service_counter: row.get(1)?,
            service_type: row.get(2)?,
            due_counter: row.get(3)?,
            current_counter: row.get(4)?,
            filters: FilterFlags {
                expires_q1: row.get(5)?,
                expires_qii_filter: row.get(6)?,
                fust_filter: row.get(7)?,
            },
            parts_under_1000hrs: row.get(8)?,
            last_updated: parse_timestamp(row, 9)?,
        })
    }
}

impl FleetStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn seed(&self, vehicles: &[Vehicle], schedule: &[MaintenanceRecord]) -> Result<SeedReport> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut report = SeedReport::default();

        if Self::count(&tx, "vehicles")? == 0 {
            for vehicle in vehicles {
                tx.execute(
                    "INSERT INTO vehicles (vehicle_id, registration) VALUES (?1, ?2)",
                    params![vehicle.id, vehicle.registration],
                )?;
                report.vehicles_added += 1;
            }
        }

        if Self::count(&tx, "maintenance")? == 0 {
            for record in schedule {
                let known: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM vehicles WHERE vehicle_id = ?1)",
                    [&record.vehicle_id],
                    |row| row.get(0),
                )?;
                if !known {
                    warn!(
                        "Skipping maintenance seed for unregistered vehicle {}",
                        record.vehicle_id
                    );
                    continue;
                }
                tx.execute(
                    r"
                    INSERT INTO maintenance (
                        vehicle_id, last_service_counter, service_type, due_counter,
                        current_counter, expires_q1, expires_qii_filter, fust_filter,
                        parts_under_1000hrs, last_updated
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ",
                    params![
                        record.vehicle_id,
                        record.last_service_counter,
                        record.service_type,
                        record.due_counter,
                        record.current_counter,
                        record.filters.expires_q1,
                        record.filters.expires_qii_filter,
                        record.filters.fust_filter,
                        record.parts_under_1000hrs,
                        record.last_updated.to_rfc3339(),
                    ],
                )?;
                report.maintenance_added += 1;
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn vehicles(&self) -> Result<Vec<Vehicle>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT vehicle_id, registration FROM vehicles ORDER BY vehicle_id")?;
        let vehicles = stmt
            .query_map([], |row| Ok(Vehicle::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vehicles)
    }

    fn vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>> {
        let conn = self.pool.get()?;
        let vehicle = conn
            .query_row(
                "SELECT vehicle_id, registration FROM vehicles WHERE vehicle_id = ?1",
                [vehicle_id],
                |row| Ok(Vehicle::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(vehicle)
    }

    fn tires(&self, vehicle_id: &str) -> Result<Vec<TireRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TIRE_COLUMNS} FROM tires WHERE vehicle_id = ?1 ORDER BY slot"
        ))?;
        let mut tires = stmt
            .query_map([vehicle_id], Self::row_to_tire)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for tire in &mut tires {
            tire.images = Self::load_images(&conn, &tire.vehicle_id, &tire.tire_number)?;
        }
        Ok(tires)
    }

    fn tire(&self, vehicle_id: &str, position: TirePosition) -> Result<Option<TireRecord>> {
        let conn = self.pool.get()?;
        let tire = conn
            .query_row(
                &format!("SELECT {TIRE_COLUMNS} FROM tires WHERE vehicle_id = ?1 AND tire_number = ?2"),
                params![vehicle_id, position.tire_number()],
                Self::row_to_tire,
            )
            .optional()?;

        match tire {
            Some(mut tire) => {
                tire.images = Self::load_images(&conn, &tire.vehicle_id, &tire.tire_number)?;
                Ok(Some(tire))
            }
            None => Ok(None),
        }
    }

    fn upsert_tire(&self, input: &TireInput) -> Result<UpsertOutcome> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let tire_number = input.position.tire_number();
        let now = Utc::now().to_rfc3339();

        let exists = tx
            .query_row(
                "SELECT 1 FROM tires WHERE vehicle_id = ?1 AND tire_number = ?2",
                params![input.vehicle_id, tire_number],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let outcome = if exists {
            tx.execute(
                r"
                UPDATE tires SET
                    position = ?1,
                    slot = ?2,
                    condition_percent = ?3,
                    date_installed = ?4,
                    current_distance = ?5,
                    last_checked = ?6
                WHERE vehicle_id = ?7 AND tire_number = ?8
                ",
                params![
                    input.position.label(),
                    input.position.slot(),
                    input.condition_percent,
                    input.date_installed.to_string(),
                    input.current_distance,
                    now,
                    input.vehicle_id,
                    tire_number,
                ],
            )?;
            UpsertOutcome::Updated
        } else {
            tx.execute(
                r"
                INSERT INTO tires (
                    vehicle_id, tire_number, position, slot, condition_percent,
                    date_installed, starting_distance, current_distance, last_checked
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
                params![
                    input.vehicle_id,
                    tire_number,
                    input.position.label(),
                    input.position.slot(),
                    input.condition_percent,
                    input.date_installed.to_string(),
                    input.starting_distance,
                    input.current_distance,
                    now,
                ],
            )?;
            UpsertOutcome::Inserted
        };

        tx.commit()?;
        debug!(
            "Upserted {} on {} ({:?})",
            tire_number, input.vehicle_id, outcome
        );
        Ok(outcome)
    }

    fn attach_image(&self, vehicle_id: &str, position: TirePosition, data: &[u8]) -> Result<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let tire_number = position.tire_number();

        let exists = tx
            .query_row(
                "SELECT 1 FROM tires WHERE vehicle_id = ?1 AND tire_number = ?2",
                params![vehicle_id, tire_number],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            debug!("No {} on {}, image not attached", tire_number, vehicle_id);
            return Ok(false);
        }

        let image = TireImage::new(data.to_vec());
        tx.execute(
            r"
            INSERT INTO tire_images (
                vehicle_id, tire_number, position, image_data, digest, upload_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                vehicle_id,
                tire_number,
                position.label(),
                image.data,
                image.digest,
                image.uploaded_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn maintenance_records(&self) -> Result<Vec<MaintenanceRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance ORDER BY vehicle_id"
        ))?;
        let records = stmt
            .query_map([], Self::row_to_maintenance)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn maintenance(&self, vehicle_id: &str) -> Result<Option<MaintenanceRecord>> {
        let conn = self.pool.get()?;
        Self::find_maintenance(&conn, vehicle_id)
    }

    fn mark_serviced(&self, vehicle_id: &str, entry: &ServiceEntry) -> Result<MaintenanceRecord> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let mut record = Self::find_maintenance(&tx, vehicle_id)?
            .ok_or_else(|| Error::vehicle_not_found(vehicle_id))?;
        record.mark_serviced(&entry.service_type, Utc::now());

        tx.execute(
            r"
            UPDATE maintenance SET
                last_service_counter = ?1,
                service_type = ?2,
                last_updated = ?3
            WHERE vehicle_id = ?4
            ",
            params![
                record.last_service_counter,
                record.service_type,
                record.last_updated.to_rfc3339(),
                vehicle_id,
            ],
        )?;

        let log = ServiceLogEntry::for_record(&record, entry);
        tx.execute(
            r"
            INSERT INTO service_log (
                vehicle_id, service_type, service_date, notes, counter_at_service, logged_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                log.vehicle_id,
                log.service_type,
                log.service_date.to_string(),
                log.notes,
                log.counter_at_service,
                log.logged_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(record)
    }

    fn service_history(&self, vehicle_id: &str) -> Result<Vec<ServiceLogEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            r"
            SELECT vehicle_id, service_type, service_date, notes, counter_at_service, logged_at
            FROM service_log WHERE vehicle_id = ?1
            ORDER BY id ASC
            ",
        )?;
        let entries = stmt
            .query_map([vehicle_id], |row| {
                Ok(ServiceLogEntry {
                    vehicle_id: row.get(0)?,
                    service_type: row.get(1)?,
                    service_date: parse_date(row, 2)?,
                    notes: row.get(3)?,
                    counter_at_service: row.get(4)?,
                    logged_at: parse_timestamp(row, 5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.pool.get()?;
        let path = self.path();
        let db_size_bytes = match &self.target {
            PoolTarget::Memory => 0,
            PoolTarget::File(file) => std::fs::metadata(file).map(|m| m.len()).unwrap_or(0),
        };

        Ok(StoreStats {
            backend: Backend::Sqlite,
            location: Some(path),
            vehicles: Self::count(&conn, "vehicles")?,
            tires: Self::count(&conn, "tires")?,
            images: Self::count(&conn, "tire_images")?,
            maintenance_records: Self::count(&conn, "maintenance")?,
            service_log_entries: Self::count(&conn, "service_log")?,
            db_size_bytes,
        })
    }
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
