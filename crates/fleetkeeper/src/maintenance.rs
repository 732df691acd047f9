//! Maintenance records and service history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{self, ServiceStatus};

/// Filter replacement flags tracked per vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterFlags {
    /// Q1 filter expiry.
    pub expires_q1: bool,
    /// QII filter expiry.
    pub expires_qii_filter: bool,
    /// Fuel/dust filter.
    pub fust_filter: bool,
}

impl FilterFlags {
    /// All flags set.
    #[must_use]
    pub fn all() -> Self {
        Self {
            expires_q1: true,
            expires_qii_filter: true,
            fust_filter: true,
        }
    }
}

/// Service-interval counters for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// Vehicle the record belongs to.
    pub vehicle_id: String,
    /// Meter reading at the last service.
    pub last_service_counter: i64,
    /// Kind of the last service, empty if unknown.
    pub service_type: String,
    /// Meter reading at which the next service is due.
    pub due_counter: i64,
    /// Latest meter reading.
    pub current_counter: i64,
    /// Filter replacement flags.
    pub filters: FilterFlags,
    /// Parts with fewer than 1000 hours fitted.
    pub parts_under_1000hrs: bool,
    /// When the record was last written.
    pub last_updated: DateTime<Utc>,
}

impl MaintenanceRecord {
    /// Counter units left until the service is due. Negative when overdue.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        status::remaining(self.due_counter, self.current_counter)
    }

    /// Derived service status.
    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus::from_counters(self.current_counter, self.due_counter)
    }

    /// Hours until the next service, clamped at zero.
    #[must_use]
    pub fn hours_until_service(&self) -> i64 {
        status::hours_until_service(self.due_counter, self.current_counter)
    }

    /// Roll the record forward as "serviced now".
    ///
    /// `last_service_counter` moves to the current reading. `due_counter` is
    /// deliberately left alone, so a vehicle that was overdue stays overdue
    /// until its threshold is changed elsewhere.
    pub fn mark_serviced(&mut self, service_type: &str, now: DateTime<Utc>) {
        self.last_service_counter = self.current_counter;
        self.service_type = service_type.to_string();
        self.last_updated = now;
    }
}

/// Service details supplied when logging a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Kind of service, e.g. `1000hrs Service`.
    pub service_type: String,
    /// Date the work was carried out.
    pub service_date: NaiveDate,
    /// Free-form notes.
    pub notes: String,
}

impl ServiceEntry {
    /// Create an entry with no notes.
    #[must_use]
    pub fn new(service_type: impl Into<String>, service_date: NaiveDate) -> Self {
        Self {
            service_type: service_type.into(),
            service_date,
            notes: String::new(),
        }
    }

    /// Attach notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// A logged service in a vehicle's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLogEntry {
    /// Vehicle that was serviced.
    pub vehicle_id: String,
    /// Kind of service.
    pub service_type: String,
    /// Date the work was carried out.
    pub service_date: NaiveDate,
    /// Free-form notes.
    pub notes: String,
    /// Meter reading recorded as the service point.
    pub counter_at_service: i64,
    /// When the entry was written.
    pub logged_at: DateTime<Utc>,
}

impl ServiceLogEntry {
    /// Build the history entry for a service applied to `record`.
    #[must_use]
    pub fn for_record(record: &MaintenanceRecord, entry: &ServiceEntry) -> Self {
        Self {
            vehicle_id: record.vehicle_id.clone(),
            service_type: entry.service_type.clone(),
            service_date: entry.service_date,
            notes: entry.notes.clone(),
            counter_at_service: record.last_service_counter,
            logged_at: record.last_updated,
        }
    }
}

/// Service types offered to operators.
pub const SERVICE_TYPES: &[&str] = &["1000hrs Service", "2500hrs Service", "Other"];

/// Maintenance rows seeded into an empty store.
#[must_use]
pub fn default_schedule(now: DateTime<Utc>) -> Vec<MaintenanceRecord> {
    [
        ("TIPPEG-4", 1000, "", 1000, 2817),
        ("TIPPEG-5", 1000, "", 2500, 2322),
        ("TIPPEG-6", 1757, "1000hrs Service", 2759, 1025),
        ("TIPPEG-7", 0, "", 1000, 1007),
        ("TIPPEG-8", 0, "", 1000, 1005),
    ]
    .into_iter()
    .map(
        |(vehicle_id, last_service, service_type, due, current)| MaintenanceRecord {
            vehicle_id: vehicle_id.to_string(),
            last_service_counter: last_service,
            service_type: service_type.to_string(),
            due_counter: due,
            current_counter: current,
            filters: FilterFlags::all(),
            parts_under_1000hrs: true,
            last_updated: now,
        },
    )
    .collect()
}
