use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{json_body, path_id};
use crate::directory::NewNurse;
use crate::error::AppError;
use crate::models::nurse::NurseProfile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/nurses", post(create_nurse).get(list_nurses))
        .route("/nurses/:id", get(get_nurse))
        .route("/nurses/:id/availability", patch(update_availability))
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: bool,
}

async fn create_nurse(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewNurse>, JsonRejection>,
) -> Result<(StatusCode, Json<NurseProfile>), AppError> {
    let nurse = state.nurses.add(json_body(payload)?)?;
    info!(nurse_id = %nurse.id, specialization = %nurse.specialization, "nurse added");

    Ok((StatusCode::CREATED, Json(nurse)))
}

async fn list_nurses(State(state): State<Arc<AppState>>) -> Json<Vec<NurseProfile>> {
    Json(state.nurses.list())
}

async fn get_nurse(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<NurseProfile>, AppError> {
    let id = path_id(id)?;
    state
        .directory
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("nurse {id} not found")))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateAvailabilityRequest>, JsonRejection>,
) -> Result<Json<NurseProfile>, AppError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;

    let nurse = state.nurses.set_availability(&id, request.available)?;
    info!(nurse_id = %nurse.id, available = nurse.available, "nurse availability changed");

    Ok(Json(nurse))
}
