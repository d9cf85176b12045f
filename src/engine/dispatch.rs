use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::eligibility::{find_candidates, EligibilitySnapshot};
use crate::engine::lifecycle;
use crate::error::AppError;
use crate::models::event::DispatchEvent;
use crate::models::offer::{DispatchAttempt, OfferResponse};
use crate::models::trip::{Trip, TripStatus};
use crate::state::AppState;

/// Result of a driver's answer to an offer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OfferOutcome {
    Accepted {
        attempt: DispatchAttempt,
        trip: Trip,
    },
    Rejected {
        attempt: DispatchAttempt,
        next_offer: Option<DispatchAttempt>,
    },
}

pub async fn create_first_offer(
    state: &AppState,
    trip_id: Uuid,
) -> Result<Option<DispatchAttempt>, AppError> {
    let _guard = state.trip_locks.lock(trip_id).await;
    let trip = state.trip(trip_id)?;
    ensure_offerable(&trip)?;

    if state.attempts.iter().any(|entry| entry.trip_id == trip_id) {
        return Err(AppError::Conflict(format!(
            "trip {trip_id} already has offers"
        )));
    }

    Ok(offer_to_first_candidate(state, &trip, &HashSet::new()))
}

pub async fn send_next_offer(
    state: &AppState,
    trip_id: Uuid,
) -> Result<Option<DispatchAttempt>, AppError> {
    let _guard = state.trip_locks.lock(trip_id).await;
    let trip = state.trip(trip_id)?;
    ensure_offerable(&trip)?;

    if state
        .attempts
        .iter()
        .any(|entry| entry.trip_id == trip_id && entry.is_pending())
    {
        return Err(AppError::Conflict(format!(
            "trip {trip_id} already has an offer pending"
        )));
    }

    Ok(offer_next_locked(state, &trip))
}

pub async fn respond(
    state: &AppState,
    attempt_id: Uuid,
    driver_id: Uuid,
    accept: bool,
) -> Result<OfferOutcome, AppError> {
    let trip_id = state
        .attempts
        .get(&attempt_id)
        .map(|entry| entry.trip_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {attempt_id} not found")))?;

    let _guard = state.trip_locks.lock(trip_id).await;

    let mut attempt = state
        .attempts
        .get(&attempt_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("offer {attempt_id} not found")))?;

    if attempt.driver_id != driver_id {
        return Err(AppError::NotYourOffer);
    }

    let trip = state.trip(trip_id)?;
    ensure_offerable(&trip)?;

    if let Some(response) = attempt.response {
        return Err(AppError::TripNotOfferable(format!(
            "offer already resolved as {response:?}"
        )));
    }

    let now = state.now();
    if now >= attempt.sent_at + state.settings.offer_timeout {
        expire_locked(state, &trip, attempt);
        return Err(AppError::TripNotOfferable("offer expired".to_string()));
    }

    if accept {
        // Assignment re-validates the driver and writes nothing on failure,
        // so the offer stays pending when it is refused.
        let assigned = match lifecycle::assign_locked(state, &trip, driver_id).await {
            Ok(assigned) => assigned,
            Err(err) => {
                warn!(
                    trip_id = %trip_id,
                    attempt_id = %attempt_id,
                    driver_id = %driver_id,
                    error = %err,
                    "accept refused; offer left pending"
                );
                return Err(err);
            }
        };

        attempt.resolve(OfferResponse::Accepted, now);
        state.attempts.insert(attempt.id, attempt.clone());
        state.metrics.offer("accepted");
        state.publish(DispatchEvent::OfferResolved {
            attempt: attempt.clone(),
        });

        info!(trip_id = %trip_id, driver_id = %driver_id, "offer accepted");
        return Ok(OfferOutcome::Accepted {
            attempt,
            trip: assigned,
        });
    }

    attempt.resolve(OfferResponse::Rejected, now);
    state.attempts.insert(attempt.id, attempt.clone());
    state.metrics.offer("rejected");
    state.publish(DispatchEvent::OfferResolved {
        attempt: attempt.clone(),
    });
    info!(trip_id = %trip_id, driver_id = %driver_id, "offer rejected");

    let next_offer = offer_next_locked(state, &trip);

    Ok(OfferOutcome::Rejected {
        attempt,
        next_offer,
    })
}

/// Unresolved offers addressed to the driver whose trip is still open.
pub fn pending_offers(state: &AppState, driver_id: Uuid) -> Vec<DispatchAttempt> {
    let mut offers: Vec<DispatchAttempt> = state
        .attempts
        .iter()
        .filter(|entry| entry.driver_id == driver_id && entry.is_pending())
        .filter(|entry| {
            state
                .trips
                .get(&entry.trip_id)
                .is_some_and(|trip| trip.status == TripStatus::Requested)
        })
        .map(|entry| entry.value().clone())
        .collect();

    offers.sort_by_key(|attempt| attempt.sent_at);
    offers
}

pub fn attempts_for_trip(state: &AppState, trip_id: Uuid) -> Vec<DispatchAttempt> {
    let mut attempts: Vec<DispatchAttempt> = state
        .attempts
        .iter()
        .filter(|entry| entry.trip_id == trip_id)
        .map(|entry| entry.value().clone())
        .collect();

    attempts.sort_by_key(|attempt| attempt.sent_at);
    attempts
}

/// Times out the attempt if it is still pending past its window. Returns
/// whether it was expired. Caller holds the trip lock.
pub(crate) fn expire_if_due_locked(state: &AppState, attempt_id: Uuid) -> Result<bool, AppError> {
    let Some(attempt) = state
        .attempts
        .get(&attempt_id)
        .map(|entry| entry.value().clone())
    else {
        return Ok(false);
    };

    let due = attempt.sent_at + state.settings.offer_timeout <= state.now();
    if !attempt.is_pending() || !due {
        return Ok(false);
    }

    let trip = state.trip(attempt.trip_id)?;
    if trip.status != TripStatus::Requested {
        return Ok(false);
    }

    expire_locked(state, &trip, attempt);
    Ok(true)
}

fn expire_locked(state: &AppState, trip: &Trip, mut attempt: DispatchAttempt) {
    if !attempt.resolve(OfferResponse::Timeout, state.now()) {
        return;
    }
    state.attempts.insert(attempt.id, attempt.clone());
    state.metrics.offer("timeout");
    warn!(
        trip_id = %trip.id,
        driver_id = %attempt.driver_id,
        "offer timed out"
    );
    state.publish(DispatchEvent::OfferResolved { attempt });

    offer_next_locked(state, trip);
}

/// Offers the trip to the first eligible driver it has not been offered to
/// yet. Caller holds the trip lock.
pub(crate) fn offer_next_locked(state: &AppState, trip: &Trip) -> Option<DispatchAttempt> {
    let already_offered: HashSet<Uuid> = state
        .attempts
        .iter()
        .filter(|entry| entry.trip_id == trip.id)
        .map(|entry| entry.driver_id)
        .collect();

    offer_to_first_candidate(state, trip, &already_offered)
}

fn offer_to_first_candidate(
    state: &AppState,
    trip: &Trip,
    exclude: &HashSet<Uuid>,
) -> Option<DispatchAttempt> {
    let snapshot = EligibilitySnapshot::capture(state);
    let geofence = state.settings.geofence_enabled.then_some(&state.geo);

    let Some(driver_id) = find_candidates(&snapshot, trip, geofence)
        .into_iter()
        .find(|driver_id| !exclude.contains(driver_id))
    else {
        state.metrics.offer("exhausted");
        warn!(
            trip_id = %trip.id,
            offered = exclude.len(),
            "no eligible driver left; trip stays requested"
        );
        return None;
    };

    let attempt = DispatchAttempt::new(trip.id, driver_id, snapshot.now);
    state.attempts.insert(attempt.id, attempt.clone());
    state.metrics.offer("sent");
    state.publish(DispatchEvent::OfferSent {
        attempt: attempt.clone(),
    });

    info!(
        trip_id = %trip.id,
        driver_id = %driver_id,
        attempt_id = %attempt.id,
        "offer sent"
    );

    Some(attempt)
}

fn ensure_offerable(trip: &Trip) -> Result<(), AppError> {
    if trip.status == TripStatus::Requested {
        Ok(())
    } else {
        Err(AppError::TripNotOfferable(format!("trip is {}", trip.status)))
    }
}
