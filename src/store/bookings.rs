use std::sync::Mutex;

use chrono::Duration;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::Booking;

/// Booking records keyed by id. Bookings are never removed.
///
/// `update` holds the row's write lock for the whole read-modify-write, so a
/// check made inside the closure is still true when the write lands.
#[derive(Default)]
pub struct BookingStore {
    bookings: DashMap<Uuid, Booking>,
    create_lock: Mutex<()>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new booking. With `slot_window` set, rejects it when an open
    /// booking for the same nurse is scheduled closer than the window.
    pub fn insert(
        &self,
        booking: Booking,
        slot_window: Option<Duration>,
    ) -> Result<Booking, AppError> {
        let Some(window) = slot_window else {
            self.bookings.insert(booking.id, booking.clone());
            return Ok(booking);
        };

        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| AppError::Internal("booking create lock poisoned".to_string()))?;

        let clash = self.bookings.iter().find_map(|entry| {
            let existing = entry.value();
            let overlaps = existing.nurse_id == booking.nurse_id
                && !existing.status.is_terminal()
                && (existing.scheduled_date - booking.scheduled_date).abs() < window;
            overlaps.then_some(existing.id)
        });

        if let Some(existing_id) = clash {
            return Err(AppError::Conflict(format!(
                "nurse {} already has booking {} within {} minutes of {}",
                booking.nurse_id,
                existing_id,
                window.num_minutes(),
                booking.scheduled_date.to_rfc3339()
            )));
        }

        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    pub fn get(&self, id: &Uuid) -> Option<Booking> {
        self.bookings.get(id).map(|entry| entry.value().clone())
    }

    /// Atomic read-modify-write of one booking. The closure works on a copy;
    /// nothing is stored unless it returns `Ok`.
    pub fn update<F>(&self, id: &Uuid, apply: F) -> Result<Booking, AppError>
    where
        F: FnOnce(&mut Booking) -> Result<(), AppError>,
    {
        let mut entry = self
            .bookings
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

        let mut draft = entry.value().clone();
        apply(&mut draft)?;
        *entry.value_mut() = draft.clone();

        Ok(draft)
    }

    pub fn for_patient(&self, patient_id: &Uuid) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|entry| entry.value().patient_id == *patient_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.bookings
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .count()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}
