//! Configuration management for fleetkeeper.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::HashSet;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::Backend;
use crate::vehicle::{default_registry, Vehicle};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fleetkeeper";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "fleet.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLEETKEEPER_`, sections split on `__`)
/// 2. TOML config file at `~/.config/fleetkeeper/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Fleet registry configuration.
    pub fleet: FleetConfig,
    /// Tire handling configuration.
    pub tires: TireConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: Backend,
    /// Path to the database file.
    /// Defaults to `~/.local/share/fleetkeeper/fleet.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of open database connections.
    pub pool_size: usize,
    /// Seed the registry and maintenance schedule into an empty store.
    pub seed_on_open: bool,
}

/// Vehicle registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Pattern every registration number must match.
    pub registration_pattern: String,
    /// Vehicles seeded into an empty store.
    pub vehicles: Vec<Vehicle>,
}

/// Tire-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireConfig {
    /// Tires below this condition are listed as needing attention.
    pub attention_threshold: u8,
    /// Largest image accepted for upload, in bytes.
    pub max_image_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database_path: None, // Will be resolved to default at runtime
            pool_size: 4,
            seed_on_open: true,
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            registration_pattern: r"^[A-Z]{2}\d{2}[A-Z]{1,2}-\d{4}$".to_string(),
            vehicles: default_registry(),
        }
    }
}

impl Default for TireConfig {
    fn default() -> Self {
        Self {
            attention_threshold: 40,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLEETKEEPER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.pool_size == 0 {
            return Err(Error::ConfigValidation {
                message: "pool_size must be greater than 0".to_string(),
            });
        }

        if self.tires.attention_threshold > 100 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "attention_threshold ({}) cannot exceed 100",
                    self.tires.attention_threshold
                ),
            });
        }

        if self.tires.max_image_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_image_bytes must be greater than 0".to_string(),
            });
        }

        let pattern =
            Regex::new(&self.fleet.registration_pattern).map_err(|_| Error::ConfigValidation {
                message: format!(
                    "invalid regex pattern: {}",
                    self.fleet.registration_pattern
                ),
            })?;

        let mut seen = HashSet::new();
        for vehicle in &self.fleet.vehicles {
            if vehicle.id.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "vehicle id must not be empty".to_string(),
                });
            }
            if !seen.insert(vehicle.id.as_str()) {
                return Err(Error::ConfigValidation {
                    message: format!("duplicate vehicle id: {}", vehicle.id),
                });
            }
            if !pattern.is_match(&vehicle.registration) {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "registration {} of {} does not match {}",
                        vehicle.registration, vehicle.id, self.fleet.registration_pattern
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
