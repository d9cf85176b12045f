use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::event::DispatchEvent;
use crate::models::fare::{FareBreakdown, Payment};
use crate::models::fleet::VehicleCategory;
use crate::models::location::GeoPoint;
use crate::models::offer::DispatchAttempt;
use crate::models::otp::TripOtp;
use crate::models::shift::ShiftStatus;
use crate::models::trip::{Actor, Trip, TripStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    pub tenant_id: Uuid,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    pub vehicle_category: VehicleCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestedTrip {
    pub trip: Trip,
    pub offer: Option<DispatchAttempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedTrip {
    pub trip: Trip,
    pub fare: FareBreakdown,
    pub payment: Payment,
}

fn require(trip: &Trip, next: TripStatus, required: &'static str) -> Result<(), AppError> {
    if trip.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidTripState {
            required,
            actual: trip.status,
        })
    }
}

fn require_driver(trip: &Trip, driver_id: Uuid) -> Result<(), AppError> {
    if trip.is_driven_by(driver_id) {
        Ok(())
    } else {
        Err(AppError::NotAuthorized(format!(
            "driver {driver_id} is not assigned to trip {}",
            trip.id
        )))
    }
}

fn fresh_otp_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

fn commit(state: &AppState, trip: &Trip) {
    state.trips.insert(trip.id, trip.clone());
    state.metrics.transition(trip.status.as_str());
    state.publish(DispatchEvent::TripUpdated { trip: trip.clone() });
}

pub fn get_trip(state: &AppState, trip_id: Uuid) -> Result<Trip, AppError> {
    state.trip(trip_id)
}

pub async fn request_trip(
    state: &AppState,
    rider_id: Uuid,
    request: TripRequest,
) -> Result<RequestedTrip, AppError> {
    if !request.pickup.is_valid() || !request.drop.is_valid() {
        return Err(AppError::BadRequest(
            "pickup and drop must be valid coordinates".to_string(),
        ));
    }

    let city_id = state.geo.resolve_city(&request.pickup)?;
    if !state
        .tenants
        .is_tenant_active_in_city(request.tenant_id, city_id)
    {
        return Err(AppError::TenantNotActiveInCity);
    }
    let zone_id = state.geo.resolve_zone(city_id, &request.pickup);

    let trip = Trip {
        id: Uuid::new_v4(),
        tenant_id: request.tenant_id,
        rider_id,
        driver_id: None,
        vehicle_id: None,
        city_id,
        zone_id,
        pickup: request.pickup,
        drop: request.drop,
        vehicle_category: request.vehicle_category,
        status: TripStatus::Requested,
        requested_at: state.now(),
        assigned_at: None,
        picked_up_at: None,
        completed_at: None,
        cancelled_at: None,
        fare_amount: None,
    };
    commit(state, &trip);
    info!(trip_id = %trip.id, rider_id = %rider_id, city_id = %city_id, "trip requested");

    let offer = dispatch::create_first_offer(state, trip.id).await?;
    let trip = state.trip(trip.id)?;

    Ok(RequestedTrip { trip, offer })
}

pub async fn assign(state: &AppState, trip_id: Uuid, driver_id: Uuid) -> Result<Trip, AppError> {
    let _guard = state.trip_locks.lock(trip_id).await;
    let trip = state.trip(trip_id)?;
    assign_locked(state, &trip, driver_id).await
}

/// Binds the driver and their current vehicle to the trip. Validates
/// everything before writing, so an error leaves no trace. Caller holds
/// the trip lock.
pub(crate) async fn assign_locked(
    state: &AppState,
    trip: &Trip,
    driver_id: Uuid,
) -> Result<Trip, AppError> {
    require(trip, TripStatus::Assigned, "REQUESTED")?;

    let _driver_guard = state.driver_locks.lock(driver_id).await;
    let now = state.now();

    let assignment = state
        .covering_assignment(driver_id, now)
        .ok_or(AppError::NoActiveAssignment)?;

    let shift = state.open_shift_of(driver_id);
    if shift
        .as_ref()
        .is_some_and(|shift| shift.status == ShiftStatus::OnTrip)
    {
        return Err(AppError::DriverOnTrip);
    }

    let mut assigned = trip.clone();
    assigned.driver_id = Some(driver_id);
    assigned.vehicle_id = Some(assignment.vehicle_id);
    assigned.status = TripStatus::Assigned;
    assigned.assigned_at = Some(now);
    commit(state, &assigned);

    if let Some(mut shift) = shift {
        shift.status = ShiftStatus::OnTrip;
        shift.vehicle_id = assignment.vehicle_id;
        state.shifts.insert(shift.id, shift.clone());
        state.publish(DispatchEvent::ShiftUpdated { shift });
    }

    info!(
        trip_id = %assigned.id,
        driver_id = %driver_id,
        vehicle_id = %assignment.vehicle_id,
        "trip assigned"
    );
    Ok(assigned)
}

pub async fn generate_otp(
    state: &AppState,
    trip_id: Uuid,
    driver_id: Uuid,
) -> Result<TripOtp, AppError> {
    let _guard = state.trip_locks.lock(trip_id).await;
    let trip = state.trip(trip_id)?;
    require_driver(&trip, driver_id)?;
    require(&trip, TripStatus::PickedUp, "ASSIGNED")?;

    let now = state.now();
    if let Some(existing) = state.otps.get(&trip_id) {
        if existing.is_reusable(now) {
            return Ok(existing.value().clone());
        }
    }

    let otp = TripOtp {
        id: Uuid::new_v4(),
        trip_id,
        otp_code: fresh_otp_code(),
        expires_at: now + state.settings.otp_ttl,
        verified: false,
    };
    state.otps.insert(trip_id, otp.clone());

    info!(trip_id = %trip_id, expires_at = %otp.expires_at, "pickup otp issued");
    Ok(otp)
}

pub async fn verify_otp_and_start(
    state: &AppState,
    trip_id: Uuid,
    driver_id: Uuid,
    otp_code: &str,
) -> Result<Trip, AppError> {
    let _guard = state.trip_locks.lock(trip_id).await;
    let mut trip = state.trip(trip_id)?;
    require_driver(&trip, driver_id)?;

    let otp = state.otps.get(&trip_id).map(|entry| entry.value().clone());

    if trip.status == TripStatus::PickedUp {
        return match otp {
            Some(otp) if otp.verified && otp.otp_code == otp_code => Ok(trip),
            Some(_) => Err(AppError::InvalidOrExpiredOtp),
            None => Err(AppError::InvalidTripState {
                required: "ASSIGNED",
                actual: trip.status,
            }),
        };
    }
    require(&trip, TripStatus::PickedUp, "ASSIGNED")?;

    let now = state.now();
    let Some(mut otp) = otp else {
        return Err(AppError::InvalidOrExpiredOtp);
    };
    if otp.otp_code != otp_code || now >= otp.expires_at {
        warn!(trip_id = %trip_id, "pickup otp rejected");
        return Err(AppError::InvalidOrExpiredOtp);
    }

    otp.verified = true;
    state.otps.insert(trip_id, otp);

    trip.status = TripStatus::PickedUp;
    trip.picked_up_at = Some(now);
    commit(state, &trip);

    info!(trip_id = %trip_id, driver_id = %driver_id, "rider picked up");
    Ok(trip)
}

pub async fn complete(
    state: &AppState,
    trip_id: Uuid,
    driver_id: Uuid,
    distance_km: f64,
    duration_minutes: f64,
) -> Result<CompletedTrip, AppError> {
    let guard = state.trip_locks.lock(trip_id).await;
    let mut trip = state.trip(trip_id)?;
    require_driver(&trip, driver_id)?;
    require(&trip, TripStatus::Completed, "PICKED_UP")?;

    let now = state.now();
    let fare = state.fares.compute_fare(&trip, distance_km, duration_minutes)?;
    let payment = state.payments.create_pending_payment(
        trip_id,
        fare.final_fare,
        &state.settings.currency,
        now,
    )?;

    trip.status = TripStatus::Completed;
    trip.completed_at = Some(now);
    trip.fare_amount = Some(fare.final_fare);
    state.fare_breakdowns.insert(trip_id, fare.clone());
    commit(state, &trip);

    release_driver(state, driver_id).await;

    drop(guard);
    state.trip_locks.forget(&trip_id);

    info!(
        trip_id = %trip_id,
        driver_id = %driver_id,
        fare = fare.final_fare,
        payment_id = %payment.id,
        "trip completed"
    );
    Ok(CompletedTrip {
        trip,
        fare,
        payment,
    })
}

pub async fn cancel(state: &AppState, trip_id: Uuid, actor: Actor) -> Result<Trip, AppError> {
    let guard = state.trip_locks.lock(trip_id).await;
    let mut trip = state.trip(trip_id)?;

    if let Actor::Rider(rider_id) = actor {
        if rider_id != trip.rider_id {
            return Err(AppError::NotAuthorized(format!(
                "rider {rider_id} did not request trip {trip_id}"
            )));
        }
    }
    require(&trip, TripStatus::Cancelled, "REQUESTED or ASSIGNED")?;

    // The accepted attempt keeps the record of who held the trip.
    let released = trip.driver_id.take();
    trip.vehicle_id = None;
    trip.status = TripStatus::Cancelled;
    trip.cancelled_at = Some(state.now());
    commit(state, &trip);

    if let Some(driver_id) = released {
        release_driver(state, driver_id).await;
    }

    drop(guard);
    state.trip_locks.forget(&trip_id);

    info!(trip_id = %trip_id, ?actor, "trip cancelled");
    Ok(trip)
}

/// Hands an ON_TRIP shift back to ONLINE, if the driver still has one open.
async fn release_driver(state: &AppState, driver_id: Uuid) {
    let _driver_guard = state.driver_locks.lock(driver_id).await;

    let Some(mut shift) = state.open_shift_of(driver_id) else {
        return;
    };
    if shift.status != ShiftStatus::OnTrip {
        return;
    }

    shift.status = ShiftStatus::Online;
    state.shifts.insert(shift.id, shift.clone());
    state.publish(DispatchEvent::ShiftUpdated { shift });
}
