//! Service status derivation.
//!
//! Maintenance counters are compared against their due threshold to decide
//! whether a vehicle is overdue, due soon, or fine. Everything here is pure.

use serde::{Deserialize, Serialize};

/// Counter units left before a service is flagged as due soon.
pub const DUE_SOON_WINDOW: i64 = 100;

/// Service state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    /// The due counter has been passed.
    Overdue,
    /// Fewer than [`DUE_SOON_WINDOW`] units remain.
    DueSoon,
    /// Nothing to do yet.
    Ok,
}

impl ServiceStatus {
    /// Derive the status from the current and due counters.
    #[must_use]
    pub fn from_counters(current: i64, due: i64) -> Self {
        Self::from_remaining(remaining(due, current))
    }

    /// Derive the status from an already computed remaining value.
    #[must_use]
    pub fn from_remaining(remaining: i64) -> Self {
        if remaining < 0 {
            Self::Overdue
        } else if remaining < DUE_SOON_WINDOW {
            Self::DueSoon
        } else {
            Self::Ok
        }
    }

    /// Whether this status should raise a dashboard alert.
    #[must_use]
    pub fn is_alert(self) -> bool {
        !matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overdue => write!(f, "OVERDUE"),
            Self::DueSoon => write!(f, "DUE SOON"),
            Self::Ok => write!(f, "OK"),
        }
    }
}

/// Counter units left until the service is due. Negative when overdue.
#[must_use]
pub fn remaining(due: i64, current: i64) -> i64 {
    due.saturating_sub(current)
}

/// Hours until the next service, clamped at zero.
#[must_use]
pub fn hours_until_service(due: i64, current: i64) -> i64 {
    remaining(due, current).max(0)
}
