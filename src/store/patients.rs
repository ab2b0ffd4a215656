use std::sync::Mutex;

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::patient::Patient;

/// Minimal patient records, used for the creation-time reference check.
#[derive(Default)]
pub struct PatientRegistry {
    patients: DashMap<Uuid, Patient>,
    create_lock: Mutex<()>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `patient` unless another record already uses its email
    /// (case-insensitive). Check and insert happen under one lock.
    pub fn register(&self, patient: Patient) -> Result<Patient, AppError> {
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| AppError::Internal("patient create lock poisoned".to_string()))?;

        let taken = self
            .patients
            .iter()
            .any(|entry| entry.value().email.eq_ignore_ascii_case(&patient.email));
        if taken {
            return Err(AppError::Conflict(
                "patient with this email already exists".to_string(),
            ));
        }

        self.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    pub fn get(&self, id: &Uuid) -> Option<Patient> {
        self.patients.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.patients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}
