use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Online,
    Offline,
    OnTrip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverShift {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub tenant_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: ShiftStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub expected_end_at: DateTime<Utc>,
    pub last_location: Option<GeoPoint>,
}

impl DriverShift {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// An ONLINE shift whose window has run out. ON_TRIP shifts never lapse
    /// mid-ride; they are re-checked once the trip hands them back.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.status == ShiftStatus::Online && now >= self.expected_end_at
    }

    /// Closes a lapsed shift at the instant its window ended.
    pub fn close_lapsed(&mut self) {
        self.status = ShiftStatus::Offline;
        self.ended_at = Some(self.expected_end_at);
    }
}
