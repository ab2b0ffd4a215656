use dashmap::DashMap;
use uuid::Uuid;

use crate::models::patient::IntakeRecord;

/// Append-only intake history, grouped by patient.
#[derive(Default)]
pub struct IntakeLog {
    by_patient: DashMap<Uuid, Vec<IntakeRecord>>,
}

impl IntakeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: IntakeRecord) -> IntakeRecord {
        self.by_patient
            .entry(record.patient_id)
            .or_default()
            .push(record.clone());
        record
    }

    /// Entries in the order they were appended.
    pub fn for_patient(&self, patient_id: &Uuid) -> Vec<IntakeRecord> {
        self.by_patient
            .get(patient_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_patient.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;
    use uuid::Uuid;

    use super::IntakeLog;
    use crate::models::patient::{Intake, IntakeRecord, Language};

    fn record(patient: u128, disease: &str) -> IntakeRecord {
        IntakeRecord {
            id: Uuid::new_v4(),
            patient_id: Uuid::from_u128(patient),
            nurse_id: Uuid::from_u128(100),
            intake: Intake {
                disease: disease.to_string(),
                duration_months: 3,
                symptoms: vec!["cough".to_string()],
                pain_level: 2,
                prior_diagnosis: false,
                comorbidity: None,
                preferred_language: Language::English,
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn entries_are_kept_per_patient_in_order() {
        let log = IntakeLog::new();
        log.append(record(1, "asthma"));
        log.append(record(2, "arthritis"));
        log.append(record(1, "diabetes"));

        let diseases: Vec<String> = log
            .for_patient(&Uuid::from_u128(1))
            .into_iter()
            .map(|r| r.intake.disease)
            .collect();

        assert_eq!(diseases, vec!["asthma", "diabetes"]);
        assert_eq!(log.len(), 3);
        assert!(log.for_patient(&Uuid::from_u128(9)).is_empty());
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let log = Arc::new(IntakeLog::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = log.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        log.append(record(1, "asthma"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.for_patient(&Uuid::from_u128(1)).len(), 200);
    }
}
