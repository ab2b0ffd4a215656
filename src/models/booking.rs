use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::nurse::NurseProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Confirm,
    Reschedule,
    Cancel,
    Complete,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// The lifecycle table. `None` means the transition is illegal from `self`.
    pub fn apply(self, transition: Transition) -> Option<BookingStatus> {
        use BookingStatus::*;

        match (self, transition) {
            (Pending, Transition::Confirm) => Some(Confirmed),
            (Pending | Confirmed, Transition::Reschedule) => Some(self),
            (Pending | Confirmed, Transition::Cancel) => Some(Cancelled),
            (Pending | Confirmed, Transition::Complete) => Some(Completed),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

impl Transition {
    pub fn label(self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Reschedule => "reschedule",
            Transition::Cancel => "cancel",
            Transition::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub nurse_id: Uuid,
    pub condition: String,
    pub scheduled_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub reason: Option<String>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking as listed to its patient, with the assigned nurse embedded.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub nurse: Option<NurseProfile>,
}
