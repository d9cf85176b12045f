use serde::Serialize;
use uuid::Uuid;

use crate::models::offer::DispatchAttempt;
use crate::models::shift::DriverShift;
use crate::models::trip::Trip;

/// Published on the state's broadcast channel after each committed change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    OfferSent { attempt: DispatchAttempt },
    OfferResolved { attempt: DispatchAttempt },
    TripUpdated { trip: Trip },
    ShiftUpdated { shift: DriverShift },
}

impl DispatchEvent {
    pub fn trip_id(&self) -> Option<Uuid> {
        match self {
            DispatchEvent::OfferSent { attempt } | DispatchEvent::OfferResolved { attempt } => {
                Some(attempt.trip_id)
            }
            DispatchEvent::TripUpdated { trip } => Some(trip.id),
            DispatchEvent::ShiftUpdated { .. } => None,
        }
    }

    pub fn driver_id(&self) -> Option<Uuid> {
        match self {
            DispatchEvent::OfferSent { attempt } | DispatchEvent::OfferResolved { attempt } => {
                Some(attempt.driver_id)
            }
            DispatchEvent::TripUpdated { trip } => trip.driver_id,
            DispatchEvent::ShiftUpdated { shift } => Some(shift.driver_id),
        }
    }
}
