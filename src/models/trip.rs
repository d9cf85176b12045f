use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::fleet::VehicleCategory;
use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Requested,
    Assigned,
    PickedUp,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        use TripStatus::*;

        match (self, next) {
            (Requested, Assigned) => true,
            (Assigned, PickedUp) => true,
            (PickedUp, Completed) => true,
            (Requested, Cancelled) | (Assigned, Cancelled) => true,
            (Requested, _) | (Assigned, _) | (PickedUp, _) => false,
            (Completed, _) | (Cancelled, _) => false,
        }
    }

    /// Statuses in which a driver and vehicle must be bound to the trip.
    pub fn has_driver(self) -> bool {
        matches!(
            self,
            TripStatus::Assigned | TripStatus::PickedUp | TripStatus::Completed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Requested => "REQUESTED",
            TripStatus::Assigned => "ASSIGNED",
            TripStatus::PickedUp => "PICKED_UP",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub city_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    pub vehicle_category: VehicleCategory,
    pub status: TripStatus,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub fare_amount: Option<f64>,
}

impl Trip {
    pub fn is_driven_by(&self, driver_id: Uuid) -> bool {
        self.driver_id == Some(driver_id)
    }
}

/// Who is asking for a cancellation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Rider(Uuid),
    Operator,
}
