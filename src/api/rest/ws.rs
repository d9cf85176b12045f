use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::event::DispatchEvent;
use crate::state::AppState;

/// Optional narrowing of the event stream. Both filters must match when set.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct EventFilter {
    pub trip_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
}

impl EventFilter {
    fn accepts(&self, event: &DispatchEvent) -> bool {
        let trip_ok = self.trip_id.is_none_or(|id| event.trip_id() == Some(id));
        let driver_ok = self.driver_id.is_none_or(|id| event.driver_id() == Some(id));
        trip_ok && driver_ok
    }
}

fn admit(
    result: Result<DispatchEvent, BroadcastStreamRecvError>,
    filter: &EventFilter,
) -> Option<DispatchEvent> {
    match result {
        Ok(event) => filter.accepts(&event).then_some(event),
        Err(err) => {
            warn!(error = %err, "websocket subscriber lagged; events dropped");
            None
        }
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
    let mut events = Box::pin(
        BroadcastStream::new(state.events_tx.subscribe())
            .filter_map(move |result| futures::future::ready(admit(result, &filter))),
    );

    info!(?filter, "websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize dispatch event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::EventFilter;
    use crate::models::event::DispatchEvent;
    use crate::models::offer::DispatchAttempt;

    #[test]
    fn filter_matches_offer_by_driver_and_trip() {
        let (trip_id, driver_id) = (Uuid::new_v4(), Uuid::new_v4());
        let event = DispatchEvent::OfferSent {
            attempt: DispatchAttempt::new(trip_id, driver_id, Utc::now()),
        };

        assert!(EventFilter::default().accepts(&event));
        assert!(EventFilter {
            trip_id: Some(trip_id),
            driver_id: Some(driver_id),
        }
        .accepts(&event));
        assert!(!EventFilter {
            trip_id: None,
            driver_id: Some(Uuid::new_v4()),
        }
        .accepts(&event));
    }
}
