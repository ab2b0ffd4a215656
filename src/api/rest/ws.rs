use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::{AppState, BookingEvent};

/// Optional filters; with none set the socket receives every booking event.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct EventFilter {
    pub patient_id: Option<Uuid>,
    pub nurse_id: Option<Uuid>,
}

impl EventFilter {
    pub fn matches(&self, event: &BookingEvent) -> bool {
        self.patient_id.is_none_or(|id| id == event.booking.patient_id)
            && self.nurse_id.is_none_or(|id| id == event.booking.nurse_id)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(filter): Query<EventFilter>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, filter: EventFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.booking_events_tx.subscribe();

    info!(
        patient_id = ?filter.patient_id,
        nurse_id = ?filter.nurse_id,
        "booking event subscriber connected"
    );

    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "booking event subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !filter.matches(&event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize booking event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    join_first(send_task, recv_task).await;

    info!("booking event subscriber disconnected");
}

/// Waits for either task to end, then aborts the other so its half of the
/// socket (and the broadcast subscription) is released right away.
async fn join_first(mut send_task: JoinHandle<()>, mut recv_task: JoinHandle<()>) {
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    use super::{join_first, EventFilter};
    use crate::models::booking::{Booking, BookingStatus};
    use crate::state::BookingEvent;

    fn event(patient: u128, nurse: u128) -> BookingEvent {
        BookingEvent {
            kind: "created",
            booking: Booking {
                id: Uuid::new_v4(),
                patient_id: Uuid::from_u128(patient),
                nurse_id: Uuid::from_u128(nurse),
                condition: "arthritis".to_string(),
                scheduled_date: Utc::now(),
                status: BookingStatus::Pending,
                reason: None,
                feedback: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(EventFilter::default().matches(&event(1, 2)));
    }

    #[test]
    fn patient_filter_only_matches_own_bookings() {
        let filter = EventFilter {
            patient_id: Some(Uuid::from_u128(1)),
            nurse_id: None,
        };
        assert!(filter.matches(&event(1, 2)));
        assert!(!filter.matches(&event(3, 2)));
    }

    #[tokio::test]
    async fn finished_half_releases_the_subscription() {
        let (tx, _keep_open) = broadcast::channel::<BookingEvent>(4);
        let mut rx = tx.subscribe();
        assert_eq!(tx.receiver_count(), 2);

        let send_task = tokio::spawn(async move {
            while rx.recv().await.is_ok() {}
        });
        let recv_task = tokio::spawn(async {});

        join_first(send_task, recv_task).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            while tx.receiver_count() > 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("send half still subscribed");
    }
}
