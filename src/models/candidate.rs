use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::nurse::NurseProfile;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub nurse_id: Uuid,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub nurse_id: Uuid,
    pub probability: f64,
    pub distance_km: Option<f64>,
    pub nurse: NurseProfile,
}
