//! Error types for fleetkeeper.
//!
//! This module defines all error types used throughout the fleetkeeper crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fleetkeeper operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A pooled connection could not be obtained.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Fleet Errors ===
    /// The vehicle is not in the registry, or has no maintenance record.
    #[error("unknown vehicle: {vehicle_id}")]
    VehicleNotFound {
        /// Identifier that was looked up.
        vehicle_id: String,
    },

    /// Operator input was rejected before reaching storage.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === File Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A tire sheet file could not be read or parsed.
    #[error("failed to load tire sheet {path}: {source}")]
    SheetLoad {
        /// Path of the sheet file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<figment::Error>,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fleetkeeper operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an unknown-vehicle error.
    #[must_use]
    pub fn vehicle_not_found(vehicle_id: impl Into<String>) -> Self {
        Self::VehicleNotFound {
            vehicle_id: vehicle_id.into(),
        }
    }

    /// Create an input validation error for the named field.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Check if this error is an unknown-vehicle error.
    #[must_use]
    pub fn is_vehicle_not_found(&self) -> bool {
        matches!(self, Self::VehicleNotFound { .. })
    }

    /// Check if this error was raised by input validation.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}
