//! Vehicle registry.

use serde::{Deserialize, Serialize};

/// A tipper tracked by the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vehicle {
    /// Fleet identifier, e.g. `TIPPEG-4`.
    pub id: String,
    /// Road registration number.
    pub registration: String,
}

impl Vehicle {
    /// Create a new vehicle entry.
    #[must_use]
    pub fn new(id: impl Into<String>, registration: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            registration: registration.into(),
        }
    }

    /// Name shown to operators: `"<id> - <registration>"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.id, self.registration)
    }
}

/// The tippers seeded into an empty store.
#[must_use]
pub fn default_registry() -> Vec<Vehicle> {
    [
        ("TIPPEG-4", "AP39UQ-0095"),
        ("TIPPEG-5", "AP39UQ-0097"),
        ("TIPPEG-6", "AP39UQ-0051"),
        ("TIPPEG-7", "AP39UQ-0052"),
        ("TIPPEG-8", "AP39UQ-0080"),
        ("TIPPEG-9", "AP39UQ-0081"),
        ("TIPPEG-10", "AP39UQ-0026"),
        ("TIPPEG-11", "AP39UQ-0027"),
        ("TIPPEG-12", "AP39UQ-0028"),
    ]
    .into_iter()
    .map(|(id, registration)| Vehicle::new(id, registration))
    .collect()
}
