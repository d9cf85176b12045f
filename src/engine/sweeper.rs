use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::dispatch::expire_if_due_locked;
use crate::models::trip::TripStatus;
use crate::state::AppState;

/// Times out every pending offer older than the configured window and moves
/// its trip on to the next candidate. Returns how many offers expired.
pub async fn sweep_expired_offers(state: &AppState) -> usize {
    let now = state.now();
    let timeout = state.settings.offer_timeout;

    let due: Vec<(Uuid, Uuid)> = state
        .attempts
        .iter()
        .filter(|entry| entry.is_pending() && entry.sent_at + timeout <= now)
        .filter(|entry| {
            state
                .trips
                .get(&entry.trip_id)
                .is_some_and(|trip| trip.status == TripStatus::Requested)
        })
        .map(|entry| (entry.id, entry.trip_id))
        .collect();

    let mut expired = 0;
    for (attempt_id, trip_id) in due {
        let _guard = state.trip_locks.lock(trip_id).await;
        match expire_if_due_locked(state, attempt_id) {
            Ok(true) => expired += 1,
            Ok(false) => {}
            Err(err) => {
                error!(attempt_id = %attempt_id, error = %err, "failed to expire offer");
            }
        }
    }

    expired
}

pub async fn run_offer_sweeper(state: Arc<AppState>, every: Duration) {
    info!(every_ms = every.as_millis() as u64, "offer sweeper started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let expired = sweep_expired_offers(&state).await;
        if expired > 0 {
            info!(expired, "swept timed-out offers");
        }
    }
}
