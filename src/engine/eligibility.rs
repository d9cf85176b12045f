use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::geo::GeoResolver;
use crate::models::assignment::DriverVehicleAssignment;
use crate::models::fleet::{ApprovalStatus, DriverProfile, Vehicle};
use crate::models::shift::{DriverShift, ShiftStatus};
use crate::models::trip::Trip;
use crate::state::AppState;

/// Immutable view of everything eligibility depends on, taken at one instant.
#[derive(Debug, Clone)]
pub struct EligibilitySnapshot {
    pub now: DateTime<Utc>,
    pub open_shifts: Vec<DriverShift>,
    pub assignments: Vec<DriverVehicleAssignment>,
    pub drivers: HashMap<Uuid, DriverProfile>,
    pub vehicles: HashMap<Uuid, Vehicle>,
}

impl EligibilitySnapshot {
    pub fn capture(state: &AppState) -> Self {
        Self {
            now: state.now(),
            open_shifts: state
                .shifts
                .iter()
                .filter(|entry| entry.is_open())
                .map(|entry| entry.value().clone())
                .collect(),
            assignments: state
                .assignments
                .iter()
                .map(|entry| entry.value().clone())
                .collect(),
            drivers: state
                .drivers
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
            vehicles: state
                .vehicles
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }

    fn covering_assignment(&self, driver_id: Uuid) -> Option<&DriverVehicleAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.driver_id == driver_id && a.covers(self.now))
            .max_by_key(|a| a.expected_end_at(self.now))
    }
}

/// Why a driver with an open shift was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    ShiftNotOnline,
    OtherTenant,
    ShiftLapsed,
    NoCoveringAssignment,
    DriverNotApproved,
    VehicleUnavailable,
    CategoryMismatch,
    OutsideCity,
}

fn check_shift(
    snapshot: &EligibilitySnapshot,
    shift: &DriverShift,
    trip: &Trip,
    geofence: Option<&GeoResolver>,
) -> Result<(), Ineligible> {
    if shift.status != ShiftStatus::Online {
        return Err(Ineligible::ShiftNotOnline);
    }
    if shift.tenant_id != trip.tenant_id {
        return Err(Ineligible::OtherTenant);
    }
    if shift.is_lapsed(snapshot.now) {
        return Err(Ineligible::ShiftLapsed);
    }

    let assignment = snapshot
        .covering_assignment(shift.driver_id)
        .ok_or(Ineligible::NoCoveringAssignment)?;

    let approved = snapshot
        .drivers
        .get(&shift.driver_id)
        .is_some_and(|profile| profile.approval_status == ApprovalStatus::Approved);
    if !approved {
        return Err(Ineligible::DriverNotApproved);
    }

    let vehicle = snapshot
        .vehicles
        .get(&assignment.vehicle_id)
        .ok_or(Ineligible::VehicleUnavailable)?;
    if vehicle.category != trip.vehicle_category {
        return Err(Ineligible::CategoryMismatch);
    }
    if !vehicle.can_serve(trip.vehicle_category) {
        return Err(Ineligible::VehicleUnavailable);
    }

    if let Some(geo) = geofence {
        let inside = shift
            .last_location
            .is_some_and(|location| geo.is_point_in_city(trip.city_id, &location));
        if !inside {
            return Err(Ineligible::OutsideCity);
        }
    }

    Ok(())
}

/// Explains whether `driver_id` could be offered `trip` right now.
pub fn explain(
    snapshot: &EligibilitySnapshot,
    trip: &Trip,
    driver_id: Uuid,
    geofence: Option<&GeoResolver>,
) -> Result<(), Ineligible> {
    let shift = snapshot
        .open_shifts
        .iter()
        .filter(|s| s.driver_id == driver_id)
        .max_by_key(|s| s.started_at)
        .ok_or(Ineligible::ShiftNotOnline)?;

    check_shift(snapshot, shift, trip, geofence)
}

/// Drivers who may receive an offer for `trip`, ordered by driver id.
/// Pass a resolver to require the driver's last position inside the trip's city.
pub fn find_candidates(
    snapshot: &EligibilitySnapshot,
    trip: &Trip,
    geofence: Option<&GeoResolver>,
) -> Vec<Uuid> {
    let mut candidates = BTreeSet::new();

    for shift in &snapshot.open_shifts {
        match check_shift(snapshot, shift, trip, geofence) {
            Ok(()) => {
                candidates.insert(shift.driver_id);
            }
            Err(reason) => {
                debug!(
                    trip_id = %trip.id,
                    driver_id = %shift.driver_id,
                    ?reason,
                    "driver not eligible"
                );
            }
        }
    }

    candidates.into_iter().collect()
}
