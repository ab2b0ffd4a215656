use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::{json_body, path_id};
use crate::engine::lifecycle::{
    cancel_booking, complete_booking, confirm_booking, create_booking, get_booking,
    list_for_patient, reschedule_booking, NewBooking,
};
use crate::error::AppError;
use crate::models::booking::{Booking, BookingView};
use crate::models::principal::Principal;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create))
        .route("/bookings/:id", get(fetch))
        .route("/bookings/:id/reschedule", post(reschedule))
        .route("/bookings/:id/cancel", post(cancel))
        .route("/bookings/:id/confirm", post(confirm))
        .route("/bookings/:id/complete", post(complete))
        .route("/patients/:id/bookings", get(list_patient_bookings))
}

#[derive(Serialize)]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub booking: Booking,
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub requester: Principal,
    pub scheduled_date: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub requester: Principal,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub requester: Principal,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub requester: Principal,
    #[serde(default)]
    pub feedback: Option<String>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let booking = create_booking(&state, json_body(payload)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id: booking.id,
            booking,
        }),
    ))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(get_booking(&state, &path_id(id)?)?))
}

async fn reschedule(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;

    let booking = reschedule_booking(
        &state,
        &id,
        &request.requester,
        request.scheduled_date.as_deref(),
    )?;
    Ok(Json(booking))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;

    let booking = cancel_booking(&state, &id, &request.requester, request.reason.as_deref())?;
    Ok(Json(booking))
}

async fn confirm(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;

    Ok(Json(confirm_booking(&state, &id, &request.requester)?))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;

    let booking =
        complete_booking(&state, &id, &request.requester, request.feedback.as_deref())?;
    Ok(Json(booking))
}

async fn list_patient_bookings(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let patient_id = path_id(id)?;
    Ok(Json(list_for_patient(&state, &patient_id).await?))
}
