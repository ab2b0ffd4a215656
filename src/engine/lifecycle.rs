use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::authorization::ensure_authorized;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, BookingView, Transition};
use crate::models::principal::Principal;
use crate::state::AppState;

/// Raw create request. Every field is required; they are optional here so a
/// missing field surfaces as a validation error rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct NewBooking {
    pub patient_id: Option<String>,
    pub nurse_id: Option<String>,
    #[serde(alias = "disease")]
    pub condition: Option<String>,
    pub scheduled_date: Option<String>,
}

pub async fn create_booking(state: &AppState, request: NewBooking) -> Result<Booking, AppError> {
    let result = insert_booking(state, request).await;

    match &result {
        Ok(booking) => {
            state.metrics.record_booking_operation("create", "success");
            state.metrics.active_bookings.inc();
            state.publish("created", booking);
            info!(
                booking_id = %booking.id,
                patient_id = %booking.patient_id,
                nurse_id = %booking.nurse_id,
                scheduled_date = %booking.scheduled_date.to_rfc3339(),
                "booking created"
            );
        }
        Err(err) => {
            state.metrics.record_booking_operation("create", err.kind());
            warn!(error = %err, "booking create rejected");
        }
    }

    result
}

async fn insert_booking(state: &AppState, request: NewBooking) -> Result<Booking, AppError> {
    let patient_id = parse_id("patient_id", required("patient_id", request.patient_id)?)?;
    let nurse_id = parse_id("nurse_id", required("nurse_id", request.nurse_id)?)?;
    let condition = required("condition", request.condition)?;
    let scheduled_date = parse_instant(&required("scheduled_date", request.scheduled_date)?)?;

    if !state.patients.contains(&patient_id) {
        return Err(AppError::NotFound(format!("patient {patient_id} not found")));
    }
    if state.directory.get(&nurse_id).await?.is_none() {
        return Err(AppError::NotFound(format!("nurse {nurse_id} not found")));
    }

    let now = Utc::now();
    let booking = Booking {
        id: Uuid::new_v4(),
        patient_id,
        nurse_id,
        condition,
        scheduled_date,
        status: BookingStatus::Pending,
        reason: None,
        feedback: None,
        created_at: now,
        updated_at: now,
    };

    state.bookings.insert(booking, state.slot_window)
}

pub fn reschedule_booking(
    state: &AppState,
    booking_id: &Uuid,
    requester: &Principal,
    scheduled_date: Option<&str>,
) -> Result<Booking, AppError> {
    apply_transition(state, booking_id, requester, Transition::Reschedule, |booking| {
        let raw = scheduled_date
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| AppError::Validation("scheduled_date is required".to_string()))?;
        booking.scheduled_date = parse_instant(raw)?;
        Ok(())
    })
}

pub fn cancel_booking(
    state: &AppState,
    booking_id: &Uuid,
    requester: &Principal,
    reason: Option<&str>,
) -> Result<Booking, AppError> {
    apply_transition(state, booking_id, requester, Transition::Cancel, |booking| {
        booking.reason = non_blank(reason);
        Ok(())
    })
}

pub fn confirm_booking(
    state: &AppState,
    booking_id: &Uuid,
    requester: &Principal,
) -> Result<Booking, AppError> {
    apply_transition(state, booking_id, requester, Transition::Confirm, |_| Ok(()))
}

pub fn complete_booking(
    state: &AppState,
    booking_id: &Uuid,
    requester: &Principal,
    feedback: Option<&str>,
) -> Result<Booking, AppError> {
    apply_transition(state, booking_id, requester, Transition::Complete, |booking| {
        booking.feedback = non_blank(feedback);
        Ok(())
    })
}

/// The single mutation path: transition legality, then authorization, then
/// the operation's own field changes. All three run inside the store's
/// atomic update, so the status check cannot go stale before the write.
fn apply_transition<F>(
    state: &AppState,
    booking_id: &Uuid,
    requester: &Principal,
    transition: Transition,
    mutate: F,
) -> Result<Booking, AppError>
where
    F: FnOnce(&mut Booking) -> Result<(), AppError>,
{
    let result = state.bookings.update(booking_id, |booking| {
        let next = booking.status.apply(transition).ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "cannot {} booking {} in status {}",
                transition.label(),
                booking.id,
                booking.status
            ))
        })?;
        ensure_authorized(booking, requester, transition)?;
        mutate(booking)?;

        booking.status = next;
        booking.updated_at = Utc::now();
        Ok(())
    });

    let operation = transition.label();
    match &result {
        Ok(booking) => {
            state.metrics.record_booking_operation(operation, "success");
            if booking.status.is_terminal() {
                state.metrics.active_bookings.dec();
            }
            state.publish(event_kind(transition), booking);
            info!(
                booking_id = %booking.id,
                role = requester.role(),
                requester_id = %requester.id(),
                status = %booking.status,
                "booking {operation} applied"
            );
        }
        Err(err) => {
            state.metrics.record_booking_operation(operation, err.kind());
            warn!(booking_id = %booking_id, error = %err, "booking {operation} rejected");
        }
    }

    result
}

fn event_kind(transition: Transition) -> &'static str {
    match transition {
        Transition::Confirm => "confirmed",
        Transition::Reschedule => "rescheduled",
        Transition::Cancel => "cancelled",
        Transition::Complete => "completed",
    }
}

pub fn get_booking(state: &AppState, booking_id: &Uuid) -> Result<Booking, AppError> {
    state
        .bookings
        .get(booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))
}

/// Most recent first. An unknown patient or a patient without bookings
/// gets an empty list.
pub async fn list_for_patient(
    state: &AppState,
    patient_id: &Uuid,
) -> Result<Vec<BookingView>, AppError> {
    let mut bookings = state.bookings.for_patient(patient_id);
    bookings.sort_by(|a, b| {
        b.scheduled_date
            .cmp(&a.scheduled_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut nurse_ids: Vec<Uuid> = bookings.iter().map(|b| b.nurse_id).collect();
    nurse_ids.sort();
    nurse_ids.dedup();

    let nurses: HashMap<Uuid, _> = state
        .directory
        .resolve(&nurse_ids)
        .await?
        .into_iter()
        .map(|nurse| (nurse.id, nurse))
        .collect();

    Ok(bookings
        .into_iter()
        .map(|booking| {
            let nurse = nurses.get(&booking.nurse_id).cloned();
            BookingView { booking, nurse }
        })
        .collect())
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn parse_id(field: &str, raw: String) -> Result<Uuid, AppError> {
    Uuid::parse_str(&raw)
        .map_err(|err| AppError::Validation(format!("{field} is not a valid id: {err}")))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accepts RFC 3339, a naive date-time (read as UTC) or a bare date
/// (midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(AppError::Validation(format!(
        "scheduled_date {raw:?} is not a valid ISO-8601 instant"
    )))
}
