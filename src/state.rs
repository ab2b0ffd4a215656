use std::sync::Arc;

use chrono::TimeDelta;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::directory::{InMemoryNurseDirectory, NurseDirectory};
use crate::error::AppError;
use crate::models::booking::Booking;
use crate::observability::metrics::Metrics;
use crate::prediction::PredictionClient;
use crate::store::{BookingStore, IntakeLog, PatientRegistry};

#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: &'static str,
    pub booking: Booking,
}

pub struct AppState {
    pub bookings: BookingStore,
    pub patients: PatientRegistry,
    pub intakes: IntakeLog,
    pub nurses: Arc<InMemoryNurseDirectory>,
    pub directory: Arc<dyn NurseDirectory>,
    pub predictor: Arc<dyn PredictionClient>,
    pub booking_events_tx: broadcast::Sender<BookingEvent>,
    pub slot_window: Option<TimeDelta>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config, predictor: Arc<dyn PredictionClient>) -> Result<Self, AppError> {
        let nurses = Arc::new(InMemoryNurseDirectory::new());
        let directory: Arc<dyn NurseDirectory> = nurses.clone();
        Self::with_directory(config, predictor, nurses, directory)
    }

    /// Like `new`, but lookups go through `directory` instead of the local roster.
    pub fn with_directory(
        config: &Config,
        predictor: Arc<dyn PredictionClient>,
        nurses: Arc<InMemoryNurseDirectory>,
        directory: Arc<dyn NurseDirectory>,
    ) -> Result<Self, AppError> {
        let (booking_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));
        let metrics = Metrics::new()
            .map_err(|err| AppError::Internal(format!("failed to register metrics: {err}")))?;

        Ok(Self {
            bookings: BookingStore::new(),
            patients: PatientRegistry::new(),
            intakes: IntakeLog::new(),
            nurses,
            directory,
            predictor,
            booking_events_tx,
            slot_window: config.slot_window()?,
            metrics,
        })
    }

    pub fn publish(&self, kind: &'static str, booking: &Booking) {
        let _ = self.booking_events_tx.send(BookingEvent {
            kind,
            booking: booking.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::AppState;
    use crate::config::Config;
    use crate::error::AppError;
    use crate::models::candidate::CandidateScore;
    use crate::models::patient::Intake;
    use crate::prediction::PredictionClient;

    struct NoPredictions;

    #[async_trait]
    impl PredictionClient for NoPredictions {
        async fn predict(&self, _intake: &Intake) -> Result<Vec<CandidateScore>, AppError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn oversized_slot_window_fails_construction() {
        let config = Config {
            slot_conflict_check: true,
            slot_minutes: i64::MAX,
            ..Config::default()
        };

        let result = AppState::new(&config, Arc::new(NoPredictions));

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn slot_window_follows_config() {
        let config = Config {
            slot_conflict_check: true,
            slot_minutes: 30,
            ..Config::default()
        };
        let state = AppState::new(&config, Arc::new(NoPredictions)).unwrap();
        assert_eq!(state.slot_window.map(|w| w.num_minutes()), Some(30));

        let state = AppState::new(&Config::default(), Arc::new(NoPredictions)).unwrap();
        assert!(state.slot_window.is_none());
    }
}
