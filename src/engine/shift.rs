use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::DispatchEvent;
use crate::models::location::{GeoPoint, LocationRecord};
use crate::models::shift::{DriverShift, ShiftStatus};
use crate::state::AppState;

fn save(state: &AppState, shift: &DriverShift) {
    state.shifts.insert(shift.id, shift.clone());
    state.publish(DispatchEvent::ShiftUpdated {
        shift: shift.clone(),
    });
}

fn close_lapsed(state: &AppState, shift: &mut DriverShift) {
    shift.close_lapsed();
    save(state, shift);
    state.metrics.open_shifts.dec();
    warn!(
        driver_id = %shift.driver_id,
        shift_id = %shift.id,
        ended_at = %shift.expected_end_at,
        "shift window over; shift ended automatically"
    );
}

fn record_location(state: &AppState, shift: &DriverShift, location: GeoPoint) -> LocationRecord {
    let record = LocationRecord {
        driver_id: shift.driver_id,
        shift_id: shift.id,
        location,
        recorded_at: state.now(),
    };
    state
        .location_history
        .entry(shift.driver_id)
        .or_default()
        .push(record.clone());
    record
}

fn validate(location: &GeoPoint) -> Result<(), AppError> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "invalid coordinates ({}, {})",
            location.lat, location.lng
        )))
    }
}

pub async fn start_shift(
    state: &AppState,
    driver_id: Uuid,
    tenant_id: Uuid,
    location: GeoPoint,
) -> Result<DriverShift, AppError> {
    validate(&location)?;
    if !state.drivers.contains_key(&driver_id) {
        return Err(AppError::NotFound(format!("driver {driver_id} not found")));
    }

    let _guard = state.driver_locks.lock(driver_id).await;
    let now = state.now();

    if let Some(mut open) = state.open_shift_of(driver_id) {
        if !open.is_lapsed(now) {
            return Err(AppError::DriverAlreadyOnline);
        }
        close_lapsed(state, &mut open);
    }

    let assignment = state
        .covering_assignment(driver_id, now)
        .ok_or(AppError::NoActiveAssignment)?;
    // A window ending this very instant would open an already lapsed shift.
    let expected_end_at = assignment.expected_end_at(now);
    if expected_end_at <= now {
        return Err(AppError::NoActiveAssignment);
    }

    let shift = DriverShift {
        id: Uuid::new_v4(),
        driver_id,
        tenant_id,
        vehicle_id: assignment.vehicle_id,
        status: ShiftStatus::Online,
        started_at: now,
        ended_at: None,
        expected_end_at,
        last_location: Some(location),
    };
    save(state, &shift);
    record_location(state, &shift, location);
    state.metrics.open_shifts.inc();

    info!(
        driver_id = %driver_id,
        shift_id = %shift.id,
        vehicle_id = %shift.vehicle_id,
        expected_end_at = %shift.expected_end_at,
        "shift started"
    );
    Ok(shift)
}

pub async fn update_location(
    state: &AppState,
    driver_id: Uuid,
    location: GeoPoint,
) -> Result<LocationRecord, AppError> {
    validate(&location)?;

    let _guard = state.driver_locks.lock(driver_id).await;
    let now = state.now();

    let mut shift = state
        .open_shift_of(driver_id)
        .filter(|shift| shift.status == ShiftStatus::Online)
        .ok_or(AppError::DriverNotOnline)?;

    if shift.is_lapsed(now) {
        close_lapsed(state, &mut shift);
        return Err(AppError::ShiftExpired);
    }

    shift.last_location = Some(location);
    state.shifts.insert(shift.id, shift.clone());

    Ok(record_location(state, &shift, location))
}

pub async fn end_shift(state: &AppState, driver_id: Uuid) -> Result<DriverShift, AppError> {
    let _guard = state.driver_locks.lock(driver_id).await;
    let now = state.now();

    let mut shift = state
        .open_shift_of(driver_id)
        .ok_or(AppError::NoActiveShift)?;

    match shift.status {
        ShiftStatus::OnTrip => return Err(AppError::DriverOnTrip),
        _ if shift.is_lapsed(now) => {
            close_lapsed(state, &mut shift);
            return Ok(shift);
        }
        _ => {}
    }

    shift.status = ShiftStatus::Offline;
    shift.ended_at = Some(now);
    save(state, &shift);
    state.metrics.open_shifts.dec();

    info!(driver_id = %driver_id, shift_id = %shift.id, "shift ended");
    Ok(shift)
}

pub async fn get_current_shift(state: &AppState, driver_id: Uuid) -> Result<DriverShift, AppError> {
    let _guard = state.driver_locks.lock(driver_id).await;
    let now = state.now();

    let mut shift = state
        .open_shift_of(driver_id)
        .ok_or(AppError::NoActiveShift)?;

    if shift.is_lapsed(now) {
        close_lapsed(state, &mut shift);
    }

    Ok(shift)
}

pub fn location_history(state: &AppState, driver_id: Uuid) -> Vec<LocationRecord> {
    state
        .location_history
        .get(&driver_id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default()
}
