use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::patient::{Intake, IntakeRecord};
use crate::state::AppState;

const MAX_PAIN_LEVEL: u8 = 10;

#[derive(Debug, Deserialize)]
pub struct NewIntake {
    pub nurse_id: Uuid,
    pub intake: Intake,
}

/// Logs a patient's intake answers together with the nurse they picked.
pub async fn record_intake(
    state: &AppState,
    patient_id: &Uuid,
    request: NewIntake,
) -> Result<IntakeRecord, AppError> {
    let result = append_intake(state, patient_id, request).await;

    match &result {
        Ok(record) => info!(
            intake_id = %record.id,
            patient_id = %record.patient_id,
            nurse_id = %record.nurse_id,
            disease = %record.intake.disease,
            "intake recorded"
        ),
        Err(err) => warn!(patient_id = %patient_id, error = %err, "intake rejected"),
    }

    result
}

async fn append_intake(
    state: &AppState,
    patient_id: &Uuid,
    request: NewIntake,
) -> Result<IntakeRecord, AppError> {
    let mut intake = request.intake;
    intake.disease = intake.disease.trim().to_string();
    if intake.disease.is_empty() {
        return Err(AppError::Validation("disease is required".to_string()));
    }
    if intake.pain_level > MAX_PAIN_LEVEL {
        return Err(AppError::Validation(format!(
            "pain_level must be between 0 and {MAX_PAIN_LEVEL}"
        )));
    }
    intake.comorbidity = intake
        .comorbidity
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    if !state.patients.contains(patient_id) {
        return Err(AppError::NotFound(format!("patient {patient_id} not found")));
    }
    if state.directory.get(&request.nurse_id).await?.is_none() {
        return Err(AppError::NotFound(format!("nurse {} not found", request.nurse_id)));
    }

    Ok(state.intakes.append(IntakeRecord {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        nurse_id: request.nurse_id,
        intake,
        created_at: Utc::now(),
    }))
}

/// Oldest first; an unknown patient has an empty history.
pub fn intakes_for_patient(state: &AppState, patient_id: &Uuid) -> Vec<IntakeRecord> {
    state.intakes.for_patient(patient_id)
}
