use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pickup code gating ASSIGNED -> PICKED_UP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripOtp {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub otp_code: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
}

impl TripOtp {
    pub fn is_reusable(&self, now: DateTime<Utc>) -> bool {
        !self.verified && now < self.expires_at
    }
}
