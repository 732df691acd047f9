//! In-process fleet store.
//!
//! Holds everything in ordinary collections behind a mutex. Nothing survives
//! a restart; this backend exists for demos and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::maintenance::{MaintenanceRecord, ServiceEntry, ServiceLogEntry};
use crate::tire::{TireImage, TireInput, TirePosition, TireRecord, UpsertOutcome};
use crate::vehicle::Vehicle;

use super::{Backend, FleetStore, SeedReport, StoreStats};

#[derive(Debug, Default)]
struct MemoryState {
    vehicles: BTreeMap<String, Vehicle>,
    tires: BTreeMap<String, BTreeMap<TirePosition, TireRecord>>,
    maintenance: BTreeMap<String, MaintenanceRecord>,
    service_log: Vec<ServiceLogEntry>,
}

/// Fleet store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }
}

impl FleetStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn seed(&self, vehicles: &[Vehicle], schedule: &[MaintenanceRecord]) -> Result<SeedReport> {
        let mut state = self.lock()?;
        let mut report = SeedReport::default();

        if state.vehicles.is_empty() {
            for vehicle in vehicles {
                state.vehicles.insert(vehicle.id.clone(), vehicle.clone());
                report.vehicles_added += 1;
            }
        }

        if state.maintenance.is_empty() {
            for record in schedule {
                if !state.vehicles.contains_key(&record.vehicle_id) {
                    warn!(
                        "Skipping maintenance seed for unregistered vehicle {}",
                        record.vehicle_id
                    );
                    continue;
                }
                state
                    .maintenance
                    .insert(record.vehicle_id.clone(), record.clone());
                report.maintenance_added += 1;
            }
        }

        Ok(report)
    }

    fn vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.lock()?.vehicles.values().cloned().collect())
    }

    fn vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>> {
        Ok(self.lock()?.vehicles.get(vehicle_id).cloned())
    }

    fn tires(&self, vehicle_id: &str) -> Result<Vec<TireRecord>> {
        Ok(self
            .lock()?
            .tires
            .get(vehicle_id)
            .map(|by_position| by_position.values().cloned().collect())
            .unwrap_or_default())
    }

    fn tire(&self, vehicle_id: &str, position: TirePosition) -> Result<Option<TireRecord>> {
        Ok(self
            .lock()?
            .tires
            .get(vehicle_id)
            .and_then(|by_position| by_position.get(&position))
            .cloned())
    }

    fn upsert_tire(&self, input: &TireInput) -> Result<UpsertOutcome> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let by_position = state.tires.entry(input.vehicle_id.clone()).or_default();

        let outcome = match by_position.get_mut(&input.position) {
            Some(existing) => {
                existing.apply_update(input, now);
                UpsertOutcome::Updated
            }
            None => {
                by_position.insert(input.position, TireRecord::from_input(input, now));
                UpsertOutcome::Inserted
            }
        };

        debug!(
            "Upserted {} on {} ({:?})",
            input.position.tire_number(),
            input.vehicle_id,
            outcome
        );
        Ok(outcome)
    }

    fn attach_image(&self, vehicle_id: &str, position: TirePosition, data: &[u8]) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(tire) = state
            .tires
            .get_mut(vehicle_id)
            .and_then(|by_position| by_position.get_mut(&position))
        else {
            debug!(
                "No {} on {}, image not attached",
                position.tire_number(),
                vehicle_id
            );
            return Ok(false);
        };

        tire.images.insert(0, TireImage::new(data.to_vec()));
        Ok(true)
    }

    fn maintenance_records(&self) -> Result<Vec<MaintenanceRecord>> {
        Ok(self.lock()?.maintenance.values().cloned().collect())
    }

    fn maintenance(&self, vehicle_id: &str) -> Result<Option<MaintenanceRecord>> {
        Ok(self.lock()?.maintenance.get(vehicle_id).cloned())
    }

    fn mark_serviced(&self, vehicle_id: &str, entry: &ServiceEntry) -> Result<MaintenanceRecord> {
        let mut state = self.lock()?;
        let record = state
            .maintenance
            .get_mut(vehicle_id)
            .ok_or_else(|| Error::vehicle_not_found(vehicle_id))?;

        record.mark_serviced(&entry.service_type, Utc::now());
        let updated = record.clone();
        state
            .service_log
            .push(ServiceLogEntry::for_record(&updated, entry));
        Ok(updated)
    }

    fn service_history(&self, vehicle_id: &str) -> Result<Vec<ServiceLogEntry>> {
        Ok(self
            .lock()?
            .service_log
            .iter()
            .filter(|entry| entry.vehicle_id == vehicle_id)
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<StoreStats> {
        let state = self.lock()?;
        let tires = state.tires.values().map(BTreeMap::len).sum::<usize>();
        let images = state
            .tires
            .values()
            .flat_map(BTreeMap::values)
            .map(|tire| tire.images.len())
            .sum::<usize>();

        Ok(StoreStats {
            backend: Backend::Memory,
            location: None,
            vehicles: to_count(state.vehicles.len()),
            tires: to_count(tires),
            images: to_count(images),
            maintenance_records: to_count(state.maintenance.len()),
            service_log_entries: to_count(state.service_log.len()),
            db_size_bytes: 0,
        })
    }
}

fn to_count(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
