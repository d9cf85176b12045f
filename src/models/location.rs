use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One entry of a driver's append-only location trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub driver_id: Uuid,
    pub shift_id: Uuid,
    pub location: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}
