use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferResponse {
    Accepted,
    Rejected,
    Timeout,
}

/// One offer of one trip to one driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchAttempt {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub response: Option<OfferResponse>,
}

impl DispatchAttempt {
    pub fn new(trip_id: Uuid, driver_id: Uuid, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            driver_id,
            sent_at,
            responded_at: None,
            response: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.response.is_none()
    }

    /// Records the response. Only the first response sticks.
    pub fn resolve(&mut self, response: OfferResponse, at: DateTime<Utc>) -> bool {
        if self.response.is_some() {
            return false;
        }
        self.response = Some(response);
        self.responded_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{DispatchAttempt, OfferResponse};

    #[test]
    fn first_response_wins() {
        let now = Utc::now();
        let mut attempt = DispatchAttempt::new(Uuid::new_v4(), Uuid::new_v4(), now);

        assert!(attempt.resolve(OfferResponse::Timeout, now + Duration::seconds(45)));
        assert!(!attempt.resolve(OfferResponse::Accepted, now + Duration::seconds(46)));

        assert_eq!(attempt.response, Some(OfferResponse::Timeout));
        assert_eq!(attempt.responded_at, Some(now + Duration::seconds(45)));
    }
}
