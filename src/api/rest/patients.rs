use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{json_body, path_id};
use crate::engine::intakes::{intakes_for_patient, record_intake, NewIntake};
use crate::error::AppError;
use crate::models::patient::{IntakeRecord, Language, Patient};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/patients", post(register_patient))
        .route("/patients/:id", get(get_patient))
        .route("/patients/:id/intakes", post(create_intake).get(list_intakes))
}

#[derive(Deserialize)]
pub struct RegisterPatientRequest {
    pub name: String,
    pub email: String,
    pub preferred_language: Language,
}

async fn register_patient(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterPatientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    let request = json_body(payload)?;

    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("email cannot be empty".to_string()));
    }

    let patient = state.patients.register(Patient {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
        preferred_language: request.preferred_language,
        created_at: Utc::now(),
    })?;
    info!(patient_id = %patient.id, "patient registered");

    Ok((StatusCode::CREATED, Json(patient)))
}

async fn get_patient(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Patient>, AppError> {
    let id = path_id(id)?;
    state
        .patients
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("patient {id} not found")))
}

async fn create_intake(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<NewIntake>, JsonRejection>,
) -> Result<(StatusCode, Json<IntakeRecord>), AppError> {
    let patient_id = path_id(id)?;
    let record = record_intake(&state, &patient_id, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_intakes(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<IntakeRecord>>, AppError> {
    let patient_id = path_id(id)?;
    Ok(Json(intakes_for_patient(&state, &patient_id)))
}
