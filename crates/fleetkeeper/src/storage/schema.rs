//! `SQLite` schema definitions for fleetkeeper.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the vehicles table.
pub const CREATE_VEHICLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id TEXT PRIMARY KEY,
    registration TEXT NOT NULL
)
";

/// SQL statement to create the tires table.
///
/// `slot` mirrors `position` as its 1-based slot number so rows sort in
/// mounting order.
pub const CREATE_TIRES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS tires (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id TEXT NOT NULL,
    tire_number TEXT NOT NULL,
    position TEXT NOT NULL,
    slot INTEGER NOT NULL,
    condition_percent INTEGER NOT NULL,
    date_installed TEXT NOT NULL,
    starting_distance INTEGER NOT NULL,
    current_distance INTEGER NOT NULL,
    last_checked TEXT NOT NULL,
    UNIQUE (vehicle_id, tire_number)
)
";

/// SQL statement to create the tire images table.
pub const CREATE_TIRE_IMAGES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS tire_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id TEXT NOT NULL,
    tire_number TEXT NOT NULL,
    position TEXT NOT NULL,
    image_data BLOB NOT NULL,
    digest TEXT NOT NULL,
    upload_time TEXT NOT NULL,
    FOREIGN KEY (vehicle_id, tire_number)
        REFERENCES tires (vehicle_id, tire_number) ON DELETE CASCADE
)
";

/// SQL statement to create an index for loading a tire's images.
pub const CREATE_TIRE_IMAGES_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_tire_images_tire ON tire_images(vehicle_id, tire_number)
";

/// SQL statement to create the maintenance table.
pub const CREATE_MAINTENANCE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS maintenance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id TEXT NOT NULL UNIQUE,
    last_service_counter INTEGER NOT NULL,
    service_type TEXT NOT NULL DEFAULT '',
    due_counter INTEGER NOT NULL,
    current_counter INTEGER NOT NULL,
    expires_q1 INTEGER NOT NULL DEFAULT 0,
    expires_qii_filter INTEGER NOT NULL DEFAULT 0,
    fust_filter INTEGER NOT NULL DEFAULT 0,
    parts_under_1000hrs INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL,
    FOREIGN KEY (vehicle_id) REFERENCES vehicles (vehicle_id)
)
";

/// SQL statement to create the service history table.
pub const CREATE_SERVICE_LOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS service_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id TEXT NOT NULL,
    service_type TEXT NOT NULL,
    service_date TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    counter_at_service INTEGER NOT NULL,
    logged_at TEXT NOT NULL,
    FOREIGN KEY (vehicle_id) REFERENCES vehicles (vehicle_id)
)
";

/// SQL statement to create an index on `vehicle_id` for history lookups.
pub const CREATE_SERVICE_LOG_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_service_log_vehicle ON service_log(vehicle_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_VEHICLES_TABLE,
    CREATE_TIRES_TABLE,
    CREATE_TIRE_IMAGES_TABLE,
    CREATE_TIRE_IMAGES_INDEX,
    CREATE_MAINTENANCE_TABLE,
    CREATE_SERVICE_LOG_TABLE,
    CREATE_SERVICE_LOG_INDEX,
    CREATE_METADATA_TABLE,
];
