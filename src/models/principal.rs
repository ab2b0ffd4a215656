use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller of a booking mutation.
///
/// Patients and nurses are distinct principal types: a patient id never
/// grants nurse rights even if the raw ids collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    Patient(Uuid),
    Nurse(Uuid),
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Patient(id) | Principal::Nurse(id) => *id,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Principal::Patient(_) => "patient",
            Principal::Nurse(_) => "nurse",
        }
    }
}
