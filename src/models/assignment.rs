use chrono::{DateTime, Days, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SECONDS_PER_DAY: u32 = 86_400;

/// A recurring daily window (UTC wall clock) during which a driver may
/// operate a vehicle. `end_time <= start_time` wraps past midnight and
/// `start_time == end_time` covers the whole day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverVehicleAssignment {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DriverVehicleAssignment {
    pub fn is_overnight(&self) -> bool {
        self.end_time < self.start_time
    }

    pub fn is_full_day(&self) -> bool {
        self.end_time == self.start_time
    }

    /// Inclusive at both boundaries.
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        let time = now.time();

        if self.is_full_day() {
            true
        } else if self.is_overnight() {
            time >= self.start_time || time <= self.end_time
        } else {
            self.start_time <= time && time <= self.end_time
        }
    }

    /// Next wall-clock occurrence of the window's end at or after `now`.
    pub fn expected_end_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today_end = now.date_naive().and_time(self.end_time).and_utc();

        if today_end >= now && !self.is_full_day() {
            return today_end;
        }

        today_end
            .checked_add_days(Days::new(1))
            .unwrap_or(today_end)
    }

    /// Whether the two recurring windows share any instant of the day,
    /// treating each window as half-open.
    pub fn overlaps(&self, other: &DriverVehicleAssignment) -> bool {
        let ours = self.day_segments();
        let theirs = other.day_segments();

        ours.iter().flatten().any(|(a_start, a_end)| {
            theirs
                .iter()
                .flatten()
                .any(|(b_start, b_end)| a_start < b_end && b_start < a_end)
        })
    }

    fn day_segments(&self) -> [Option<(u32, u32)>; 2] {
        let start = self.start_time.num_seconds_from_midnight();
        let end = self.end_time.num_seconds_from_midnight();

        if self.is_full_day() {
            [Some((0, SECONDS_PER_DAY)), None]
        } else if self.is_overnight() {
            [Some((start, SECONDS_PER_DAY)), Some((0, end))]
        } else {
            [Some((start, end)), None]
        }
    }
}
