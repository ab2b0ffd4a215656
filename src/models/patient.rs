use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    English,
    Hindi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub preferred_language: Language,
    pub created_at: DateTime<Utc>,
}

/// Intake answers forwarded to the compatibility prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    #[serde(alias = "condition")]
    pub disease: String,
    pub duration_months: u32,
    pub symptoms: Vec<String>,
    pub pain_level: u8,
    pub prior_diagnosis: bool,
    #[serde(default)]
    pub comorbidity: Option<String>,
    pub preferred_language: Language,
}

/// One intake log entry: the answers a patient gave and the nurse they chose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub nurse_id: Uuid,
    #[serde(flatten)]
    pub intake: Intake,
    pub created_at: DateTime<Utc>,
}
