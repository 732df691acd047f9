//! Tire records and their mounting positions.
//!
//! Every vehicle has ten fixed mounting slots. A slot always carries the same
//! tire number (`Tire-1` for the front left, up to `Tire-10` for the rear
//! right), so either the position or the tire number identifies a tire on a
//! given vehicle.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Condition at or above which a tire is considered good.
pub const GOOD_CONDITION: u8 = 70;

/// Condition at or above which a tire is considered fair.
pub const FAIR_CONDITION: u8 = 40;

/// One of the ten tire mounting slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TirePosition {
    /// Slot 1.
    #[serde(rename = "Front Left")]
    FrontLeft,
    /// Slot 2.
    #[serde(rename = "Front Right")]
    FrontRight,
    /// Slot 3.
    #[serde(rename = "Middle Left 1")]
    MiddleLeft1,
    /// Slot 4.
    #[serde(rename = "Middle Right 1")]
    MiddleRight1,
    /// Slot 5.
    #[serde(rename = "Middle Left 2")]
    MiddleLeft2,
    /// Slot 6.
    #[serde(rename = "Middle Right 2")]
    MiddleRight2,
    /// Slot 7.
    #[serde(rename = "Rear Left 1")]
    RearLeft1,
    /// Slot 8.
    #[serde(rename = "Rear Right 1")]
    RearRight1,
    /// Slot 9.
    #[serde(rename = "Rear Left 2")]
    RearLeft2,
    /// Slot 10.
    #[serde(rename = "Rear Right 2")]
    RearRight2,
}

impl TirePosition {
    /// All positions in slot order.
    pub const ALL: [Self; 10] = [
        Self::FrontLeft,
        Self::FrontRight,
        Self::MiddleLeft1,
        Self::MiddleRight1,
        Self::MiddleLeft2,
        Self::MiddleRight2,
        Self::RearLeft1,
        Self::RearRight1,
        Self::RearLeft2,
        Self::RearRight2,
    ];

    /// 1-based slot number.
    #[must_use]
    pub fn slot(self) -> u8 {
        match self {
            Self::FrontLeft => 1,
            Self::FrontRight => 2,
            Self::MiddleLeft1 => 3,
            Self::MiddleRight1 => 4,
            Self::MiddleLeft2 => 5,
            Self::MiddleRight2 => 6,
            Self::RearLeft1 => 7,
            Self::RearRight1 => 8,
            Self::RearLeft2 => 9,
            Self::RearRight2 => 10,
        }
    }

    /// Look up a position by its 1-based slot number.
    #[must_use]
    pub fn from_slot(slot: u8) -> Option<Self> {
        Self::ALL.get(usize::from(slot).checked_sub(1)?).copied()
    }

    /// The fixed tire number for this slot, e.g. `Tire-3`.
    #[must_use]
    pub fn tire_number(self) -> String {
        format!("Tire-{}", self.slot())
    }

    /// Human-readable label, e.g. `Middle Left 1`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FrontLeft => "Front Left",
            Self::FrontRight => "Front Right",
            Self::MiddleLeft1 => "Middle Left 1",
            Self::MiddleRight1 => "Middle Right 1",
            Self::MiddleLeft2 => "Middle Left 2",
            Self::MiddleRight2 => "Middle Right 2",
            Self::RearLeft1 => "Rear Left 1",
            Self::RearRight1 => "Rear Right 1",
            Self::RearLeft2 => "Rear Left 2",
            Self::RearRight2 => "Rear Right 2",
        }
    }
}

impl std::fmt::Display for TirePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TirePosition {
    type Err = Error;

    /// Accepts a label (`"Rear Left 2"`, `"rear-left-2"`), a tire number
    /// (`"Tire-9"`) or a bare slot number (`"9"`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        let slot = normalized
            .strip_prefix("tire")
            .unwrap_or(&normalized)
            .parse::<u8>()
            .ok();
        if let Some(position) = slot.and_then(Self::from_slot) {
            return Ok(position);
        }

        Self::ALL
            .into_iter()
            .find(|p| p.label().replace(' ', "").to_ascii_lowercase() == normalized)
            .ok_or_else(|| Error::invalid_input("position", format!("unknown tire position '{s}'")))
    }
}

/// Coarse condition grouping used for colour coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionBand {
    /// 70% and above.
    Good,
    /// 40% to 69%.
    Fair,
    /// Below 40%.
    Poor,
}

impl ConditionBand {
    /// Classify a condition percentage.
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        if percent >= GOOD_CONDITION {
            Self::Good
        } else if percent >= FAIR_CONDITION {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for ConditionBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Image container formats recognised by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (`FF D8 FF`).
    Jpeg,
    /// PNG (`89 50 4E 47 0D 0A 1A 0A`).
    Png,
}

impl ImageFormat {
    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

    /// Sniff the format of an image blob.
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&Self::PNG_MAGIC) {
            Some(Self::Png)
        } else if data.starts_with(&Self::JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// Map a file extension (without the dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// A photo attached to a tire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireImage {
    /// Raw image bytes, stored opaquely.
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,
    /// BLAKE3 digest of `data`.
    pub digest: String,
    /// When the image was attached.
    pub uploaded_at: DateTime<Utc>,
}

impl TireImage {
    /// Wrap freshly uploaded bytes, computing the digest and stamping now.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let digest = Self::compute_digest(&data);
        Self {
            data,
            digest,
            uploaded_at: Utc::now(),
        }
    }

    /// Compute the BLAKE3 digest of an image blob.
    #[must_use]
    pub fn compute_digest(data: &[u8]) -> String {
        blake3::hash(data).to_hex().to_string()
    }

    /// Size of the blob in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sniffed format, `None` if the bytes are not a recognised image.
    #[must_use]
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::detect(&self.data)
    }
}

/// Operator input for saving one tire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireInput {
    /// Vehicle the tire is mounted on.
    pub vehicle_id: String,
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
}

impl TireInput {
    /// Check the input before it reaches storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the condition exceeds 100, a
    /// distance is negative, or the current reading is below the starting one.
    pub fn validate(&self) -> Result<()> {
        if self.vehicle_id.trim().is_empty() {
            return Err(Error::invalid_input("vehicle_id", "must not be empty"));
        }
        if self.condition_percent > 100 {
            return Err(Error::invalid_input(
                "condition_percent",
                format!("{} is outside 0..=100", self.condition_percent),
            ));
        }
        if self.starting_distance < 0 {
            return Err(Error::invalid_input(
                "starting_distance",
                "must not be negative",
            ));
        }
        if self.current_distance < self.starting_distance {
            return Err(Error::invalid_input(
                "current_distance",
                format!(
                    "{} is below the starting distance {}",
                    self.current_distance, self.starting_distance
                ),
            ));
        }
        Ok(())
    }
}

/// A stored tire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireRecord {
    /// Vehicle the tire is mounted on.
    pub vehicle_id: String,
    /// Fixed tire number for the slot.
    pub tire_number: String,
    /// Mounting slot.
    pub position: TirePosition,
    /// Tread condition, 0 to 100.
    pub condition_percent: u8,
    /// Date the tire was fitted.
    pub date_installed: NaiveDate,
    /// Odometer reading when fitted. Never changed by later saves.
    pub starting_distance: i64,
    /// Latest odometer reading.
    pub current_distance: i64,
    /// When the record was last saved.
    pub last_checked: DateTime<Utc>,
    /// Attached photos, newest first.
    pub images: Vec<TireImage>,
}

impl TireRecord {
    /// Build a new record from input, with no images.
    #[must_use]
    pub fn from_input(input: &TireInput, now: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: input.vehicle_id.clone(),
            tire_number: input.position.tire_number(),
            position: input.position,
            condition_percent: input.condition_percent,
            date_installed: input.date_installed,
            starting_distance: input.starting_distance,
            current_distance: input.current_distance,
            last_checked: now,
            images: Vec::new(),
        }
    }

    /// Overwrite the mutable fields from a later save.
    ///
    /// `starting_distance` and `images` are kept.
    pub fn apply_update(&mut self, input: &TireInput, now: DateTime<Utc>) {
        self.position = input.position;
        self.condition_percent = input.condition_percent;
        self.date_installed = input.date_installed;
        self.current_distance = input.current_distance;
        self.last_checked = now;
    }

    /// Kilometres covered since the tire was fitted.
    #[must_use]
    pub fn kms_run(&self) -> i64 {
        self.current_distance - self.starting_distance
    }

    /// Colour-coding band for the condition.
    #[must_use]
    pub fn condition_band(&self) -> ConditionBand {
        ConditionBand::from_percent(self.condition_percent)
    }
}

/// Whether an upsert created or modified a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No record existed for the position.
    Inserted,
    /// An existing record was overwritten.
    Updated,
}
