use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::nurse::{Gender, Location, NurseProfile};

/// Read-only view of the nurse directory used by ranking and bookings.
#[async_trait]
pub trait NurseDirectory: Send + Sync {
    /// Profiles for the ids that exist. Unknown ids are simply absent.
    async fn resolve(&self, ids: &[Uuid]) -> Result<Vec<NurseProfile>, AppError>;

    async fn get(&self, id: &Uuid) -> Result<Option<NurseProfile>, AppError> {
        Ok(self.resolve(std::slice::from_ref(id)).await?.into_iter().next())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNurse {
    pub name: String,
    pub specialization: String,
    pub experience_years: u32,
    pub language: String,
    pub gender: Gender,
    pub phone: String,
    pub email: String,
    #[serde(default = "default_available")]
    pub available: bool,
    pub location: Location,
}

fn default_available() -> bool {
    true
}

/// Directory owned by this process. Nurses are added through the admin routes.
///
/// `add` holds `create_lock` across the duplicate-contact check and the insert.
#[derive(Default)]
pub struct InMemoryNurseDirectory {
    nurses: DashMap<Uuid, NurseProfile>,
    create_lock: Mutex<()>,
}

impl InMemoryNurseDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, new: NewNurse) -> Result<NurseProfile, AppError> {
        let required = [
            ("name", &new.name),
            ("specialization", &new.specialization),
            ("language", &new.language),
            ("phone", &new.phone),
            ("email", &new.email),
            ("location.address", &new.location.address),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::Validation(format!("{field} cannot be empty")));
        }

        let email = new.email.trim();
        let phone = new.phone.trim();

        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| AppError::Internal("nurse create lock poisoned".to_string()))?;

        let duplicate = self.nurses.iter().any(|entry| {
            let existing = entry.value();
            existing.email.eq_ignore_ascii_case(email) || existing.phone == phone
        });
        if duplicate {
            return Err(AppError::Conflict(
                "nurse with this email or phone already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let nurse = NurseProfile {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            specialization: new.specialization.trim().to_string(),
            experience_years: new.experience_years,
            language: new.language.trim().to_string(),
            gender: new.gender,
            phone: phone.to_string(),
            email: email.to_string(),
            available: new.available,
            location: new.location,
            created_at: now,
            updated_at: now,
        };

        self.nurses.insert(nurse.id, nurse.clone());
        Ok(nurse)
    }

    pub fn list(&self) -> Vec<NurseProfile> {
        let mut nurses: Vec<NurseProfile> = self
            .nurses
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        nurses.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        nurses
    }

    pub fn set_availability(&self, id: &Uuid, available: bool) -> Result<NurseProfile, AppError> {
        let mut nurse = self
            .nurses
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("nurse {id} not found")))?;

        nurse.available = available;
        nurse.updated_at = Utc::now();

        Ok(nurse.clone())
    }

    pub fn len(&self) -> usize {
        self.nurses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nurses.is_empty()
    }
}

#[async_trait]
impl NurseDirectory for InMemoryNurseDirectory {
    async fn resolve(&self, ids: &[Uuid]) -> Result<Vec<NurseProfile>, AppError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.nurses.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use uuid::Uuid;

    use super::{InMemoryNurseDirectory, NewNurse, NurseDirectory};
    use crate::error::AppError;
    use crate::models::nurse::{Coordinate, Gender, Location};

    fn new_nurse(email: &str, phone: &str) -> NewNurse {
        NewNurse {
            name: "Asha".to_string(),
            specialization: "Cardiac Care".to_string(),
            experience_years: 7,
            language: "Hindi".to_string(),
            gender: Gender::Female,
            phone: phone.to_string(),
            email: email.to_string(),
            available: true,
            location: Location {
                coordinate: Coordinate {
                    lat: 19.05,
                    lng: 72.85,
                },
                address: "Bandra, Mumbai".to_string(),
            },
        }
    }

    #[test]
    fn duplicate_contact_is_rejected() {
        let directory = InMemoryNurseDirectory::new();
        directory.add(new_nurse("asha@example.com", "111")).unwrap();

        let by_email = directory.add(new_nurse("ASHA@example.com", "222")).unwrap_err();
        let by_phone = directory.add(new_nurse("other@example.com", "111")).unwrap_err();

        assert!(matches!(by_email, AppError::Conflict(_)));
        assert!(matches!(by_phone, AppError::Conflict(_)));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn concurrent_adds_claim_an_email_once() {
        for _ in 0..50 {
            let directory = Arc::new(InMemoryNurseDirectory::new());
            let barrier = Arc::new(Barrier::new(8));

            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let directory = directory.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        directory.add(new_nurse("shared@example.com", &format!("90000{i}")))
                    })
                })
                .collect();

            let created = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(Result::is_ok)
                .count();

            assert_eq!(created, 1);
            assert_eq!(directory.len(), 1);
        }
    }

    #[test]
    fn blank_required_field_is_a_validation_error() {
        let directory = InMemoryNurseDirectory::new();
        let mut nurse = new_nurse("a@example.com", "1");
        nurse.specialization = "  ".to_string();

        let err = directory.add(nurse).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("specialization")));
    }

    #[tokio::test]
    async fn resolve_skips_unknown_ids() {
        let directory = InMemoryNurseDirectory::new();
        let known = directory.add(new_nurse("a@example.com", "1")).unwrap();

        let found = directory.resolve(&[Uuid::new_v4(), known.id]).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, known.id);
        assert!(directory.get(&Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn availability_toggle_updates_profile() {
        let directory = InMemoryNurseDirectory::new();
        let nurse = directory.add(new_nurse("a@example.com", "1")).unwrap();

        let updated = directory.set_availability(&nurse.id, false).unwrap();

        assert!(!updated.available);
        assert!(updated.updated_at >= nurse.updated_at);
    }
}
