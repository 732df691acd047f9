//! Tire sheet files.
//!
//! A sheet records every tire of one vehicle in a single TOML or JSON file,
//! one `[[tires]]` entry per position:
//!
//! ```toml
//! [[tires]]
//! position = "Front Left"
//! condition_percent = 85
//! date_installed = "2025-05-01"
//! starting_distance = 1000
//! current_distance = 5000
//! image = "front-left.jpg"
//! ```
//!
//! Relative image paths are taken from the sheet's own directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use figment::{
    providers::{Format, Json, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::service::TireSheetEntry;
use crate::tire::TirePosition;

/// One position as written in a sheet file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetRow {
    /// Label, name or tire number, as accepted on the command line.
    #[serde(deserialize_with = "position_from_str")]
    pub position: TirePosition,
    /// Tread condition, 0 to 100.
    pub condition_percent: u8,
    /// Date the tire was fitted.
    pub date_installed: NaiveDate,
    /// Odometer reading when fitted.
    pub starting_distance: i64,
    /// Latest odometer reading.
    pub current_distance: i64,
    /// Photo to attach.
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl SheetRow {
    /// Turn the row into a service entry carrying the photo bytes.
    #[must_use]
    pub fn into_entry(self, image: Option<Vec<u8>>) -> TireSheetEntry {
        TireSheetEntry {
            position: self.position,
            condition_percent: self.condition_percent,
            date_installed: self.date_installed,
            starting_distance: self.starting_distance,
            current_distance: self.current_distance,
            image,
        }
    }
}

/// A parsed tire sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TireSheet {
    /// Rows in file order.
    pub tires: Vec<SheetRow>,
}

impl TireSheet {
    /// Load a sheet. Files ending in `.json` are read as JSON, anything else
    /// as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SheetLoad`] if the file is missing or malformed, or
    /// [`Error::InvalidInput`] if a position is listed twice.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(sheet_error(path, figment::Error::from("file not found".to_string())));
        }

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let figment = if is_json {
            Figment::from(Json::file(path))
        } else {
            Figment::from(Toml::file(path))
        };

        let mut sheet: Self = figment.extract().map_err(|e| sheet_error(path, e))?;

        let mut seen = HashSet::new();
        for row in &sheet.tires {
            if !seen.insert(row.position) {
                return Err(Error::invalid_input(
                    "tires",
                    format!("{} is listed more than once", row.position),
                ));
            }
        }

        if let Some(dir) = path.parent() {
            for row in &mut sheet.tires {
                if let Some(image) = row.image.as_mut() {
                    if image.is_relative() {
                        *image = dir.join(&*image);
                    }
                }
            }
        }

        Ok(sheet)
    }
}

fn sheet_error(path: &Path, source: figment::Error) -> Error {
    Error::SheetLoad {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

fn position_from_str<'de, D>(deserializer: D) -> std::result::Result<TirePosition, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}
