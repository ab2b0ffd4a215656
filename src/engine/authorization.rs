use tracing::warn;

use crate::error::AppError;
use crate::models::booking::{Booking, Transition};
use crate::models::principal::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Patients may reschedule and cancel their own bookings. The assigned nurse
/// may do the same, and is the only principal allowed to confirm or complete.
pub fn authorize(booking: &Booking, principal: &Principal, transition: Transition) -> Decision {
    let allowed = match (principal, transition) {
        (Principal::Patient(id), Transition::Reschedule | Transition::Cancel) => {
            *id == booking.patient_id
        }
        (Principal::Patient(_), Transition::Confirm | Transition::Complete) => false,
        (Principal::Nurse(id), _) => *id == booking.nurse_id,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

pub fn ensure_authorized(
    booking: &Booking,
    principal: &Principal,
    transition: Transition,
) -> Result<(), AppError> {
    match authorize(booking, principal, transition) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            warn!(
                booking_id = %booking.id,
                role = principal.role(),
                requester_id = %principal.id(),
                action = transition.label(),
                "booking mutation denied"
            );
            Err(AppError::Forbidden(format!(
                "{} {} may not {} booking {}",
                principal.role(),
                principal.id(),
                transition.label(),
                booking.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{authorize, Decision};
    use crate::models::booking::{Booking, BookingStatus, Transition};
    use crate::models::principal::Principal;

    fn booking() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            patient_id: Uuid::from_u128(1),
            nurse_id: Uuid::from_u128(2),
            condition: "hypertension".to_string(),
            scheduled_date: Utc::now(),
            status: BookingStatus::Pending,
            reason: None,
            feedback: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_patient_and_assigned_nurse_may_cancel() {
        let b = booking();
        assert_eq!(
            authorize(&b, &Principal::Patient(b.patient_id), Transition::Cancel),
            Decision::Allow
        );
        assert_eq!(
            authorize(&b, &Principal::Nurse(b.nurse_id), Transition::Reschedule),
            Decision::Allow
        );
    }

    #[test]
    fn strangers_are_always_denied() {
        let b = booking();
        let stranger = Uuid::from_u128(77);
        for transition in [
            Transition::Confirm,
            Transition::Reschedule,
            Transition::Cancel,
            Transition::Complete,
        ] {
            assert_eq!(authorize(&b, &Principal::Patient(stranger), transition), Decision::Deny);
            assert_eq!(authorize(&b, &Principal::Nurse(stranger), transition), Decision::Deny);
        }
    }

    #[test]
    fn roles_are_not_interchangeable() {
        let b = booking();
        // right id, wrong role
        assert_eq!(
            authorize(&b, &Principal::Patient(b.nurse_id), Transition::Cancel),
            Decision::Deny
        );
        assert_eq!(
            authorize(&b, &Principal::Nurse(b.patient_id), Transition::Cancel),
            Decision::Deny
        );
    }

    #[test]
    fn only_the_nurse_confirms_and_completes() {
        let b = booking();
        let patient = Principal::Patient(b.patient_id);
        let nurse = Principal::Nurse(b.nurse_id);

        assert_eq!(authorize(&b, &patient, Transition::Confirm), Decision::Deny);
        assert_eq!(authorize(&b, &patient, Transition::Complete), Decision::Deny);
        assert_eq!(authorize(&b, &nurse, Transition::Confirm), Decision::Allow);
        assert_eq!(authorize(&b, &nurse, Transition::Complete), Decision::Allow);
    }
}
