//! Intake of the master data dispatch reads: service areas, tenant coverage,
//! drivers, vehicles and their assignment windows.

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{polygon_from_ring, City, CitySummary, Zone};
use crate::models::assignment::DriverVehicleAssignment;
use crate::models::fleet::{
    ApprovalStatus, DriverProfile, Vehicle, VehicleCategory, VehicleStatus,
};
use crate::models::location::GeoPoint;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewZone {
    pub name: String,
    pub boundary: Vec<GeoPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCity {
    pub name: String,
    pub boundary: Vec<GeoPoint>,
    #[serde(default)]
    pub zones: Vec<NewZone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDriver {
    pub name: String,
    #[serde(default = "pending")]
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    pub registration_no: String,
    pub category: VehicleCategory,
    #[serde(default = "pending")]
    pub approval_status: ApprovalStatus,
    #[serde(default = "active")]
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleUpdate {
    pub approval_status: Option<ApprovalStatus>,
    pub status: Option<VehicleStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_by: Option<Uuid>,
}

fn pending() -> ApprovalStatus {
    ApprovalStatus::Pending
}

fn active() -> VehicleStatus {
    VehicleStatus::Active
}

fn non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub fn register_city(state: &AppState, new: NewCity) -> Result<CitySummary, AppError> {
    non_empty("name", &new.name)?;

    let boundary = polygon_from_ring(&new.boundary)?;
    let zones = new
        .zones
        .into_iter()
        .map(|zone| {
            non_empty("zone name", &zone.name)?;
            Ok(Zone {
                id: Uuid::new_v4(),
                name: zone.name,
                boundary: polygon_from_ring(&zone.boundary)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let city = City {
        id: Uuid::new_v4(),
        name: new.name,
        boundary,
        zones,
    };
    let summary = CitySummary::from(&city);
    state.geo.insert_city(city);

    info!(city_id = %summary.id, name = %summary.name, "city registered");
    Ok(summary)
}

pub fn set_tenant_city(
    state: &AppState,
    tenant_id: Uuid,
    city_id: Uuid,
    active: bool,
) -> Result<(), AppError> {
    if !state.geo.has_city(city_id) {
        return Err(AppError::NotFound(format!("city {city_id} not found")));
    }
    state.tenants.set_tenant_city_active(tenant_id, city_id, active);
    Ok(())
}

pub fn register_driver(state: &AppState, new: NewDriver) -> Result<DriverProfile, AppError> {
    non_empty("name", &new.name)?;

    let driver = DriverProfile {
        id: Uuid::new_v4(),
        name: new.name,
        approval_status: new.approval_status,
        created_at: state.now(),
    };
    state.drivers.insert(driver.id, driver.clone());
    Ok(driver)
}

pub fn set_driver_approval(
    state: &AppState,
    driver_id: Uuid,
    approval_status: ApprovalStatus,
) -> Result<DriverProfile, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    driver.approval_status = approval_status;
    Ok(driver.clone())
}

pub fn register_vehicle(state: &AppState, new: NewVehicle) -> Result<Vehicle, AppError> {
    non_empty("registration_no", &new.registration_no)?;

    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        registration_no: new.registration_no,
        category: new.category,
        approval_status: new.approval_status,
        status: new.status,
    };
    state.vehicles.insert(vehicle.id, vehicle.clone());
    Ok(vehicle)
}

pub fn update_vehicle(
    state: &AppState,
    vehicle_id: Uuid,
    update: VehicleUpdate,
) -> Result<Vehicle, AppError> {
    let mut vehicle = state
        .vehicles
        .get_mut(&vehicle_id)
        .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

    if let Some(approval_status) = update.approval_status {
        vehicle.approval_status = approval_status;
    }
    if let Some(status) = update.status {
        vehicle.status = status;
    }
    Ok(vehicle.clone())
}

/// Rejects windows that overlap another window of the same vehicle or of
/// the same driver.
pub async fn register_assignment(
    state: &AppState,
    new: NewAssignment,
) -> Result<DriverVehicleAssignment, AppError> {
    if !state.drivers.contains_key(&new.driver_id) {
        return Err(AppError::NotFound(format!(
            "driver {} not found",
            new.driver_id
        )));
    }
    if !state.vehicles.contains_key(&new.vehicle_id) {
        return Err(AppError::NotFound(format!(
            "vehicle {} not found",
            new.vehicle_id
        )));
    }

    let _intake = state.assignment_intake.lock().await;

    let assignment = DriverVehicleAssignment {
        id: Uuid::new_v4(),
        driver_id: new.driver_id,
        vehicle_id: new.vehicle_id,
        start_time: new.start_time,
        end_time: new.end_time,
        created_by: new.created_by,
        created_at: state.now(),
    };

    let clash = state.assignments.iter().find_map(|entry| {
        let existing = entry.value();
        let shares = existing.vehicle_id == assignment.vehicle_id
            || existing.driver_id == assignment.driver_id;
        (shares && existing.overlaps(&assignment)).then_some(existing.id)
    });
    if let Some(existing_id) = clash {
        return Err(AppError::Conflict(format!(
            "window overlaps assignment {existing_id}"
        )));
    }

    state.assignments.insert(assignment.id, assignment.clone());
    info!(
        assignment_id = %assignment.id,
        driver_id = %assignment.driver_id,
        vehicle_id = %assignment.vehicle_id,
        start_time = %assignment.start_time,
        end_time = %assignment.end_time,
        "vehicle assignment registered"
    );
    Ok(assignment)
}

pub async fn remove_assignment(
    state: &AppState,
    assignment_id: Uuid,
) -> Result<DriverVehicleAssignment, AppError> {
    let _intake = state.assignment_intake.lock().await;

    state
        .assignments
        .remove(&assignment_id)
        .map(|(_, assignment)| assignment)
        .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id} not found")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use uuid::Uuid;

    use super::{
        register_assignment, register_city, register_driver, register_vehicle, set_tenant_city,
        NewAssignment, NewCity, NewDriver, NewVehicle,
    };
    use crate::error::AppError;
    use crate::models::fleet::{ApprovalStatus, VehicleCategory, VehicleStatus};
    use crate::models::location::GeoPoint;
    use crate::state::{AppState, DispatchSettings};

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn driver(state: &AppState) -> Uuid {
        register_driver(
            state,
            NewDriver {
                name: "Asha".to_string(),
                approval_status: ApprovalStatus::Approved,
            },
        )
        .unwrap()
        .id
    }

    fn vehicle(state: &AppState) -> Uuid {
        register_vehicle(
            state,
            NewVehicle {
                registration_no: "KA-01-AB-1234".to_string(),
                category: VehicleCategory::Auto,
                approval_status: ApprovalStatus::Approved,
                status: VehicleStatus::Active,
            },
        )
        .unwrap()
        .id
    }

    fn window(driver_id: Uuid, vehicle_id: Uuid, start: NaiveTime, end: NaiveTime) -> NewAssignment {
        NewAssignment {
            driver_id,
            vehicle_id,
            start_time: start,
            end_time: end,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn vehicle_cannot_be_double_booked() {
        let state = AppState::new(DispatchSettings::default());
        let (d1, d2, v) = (driver(&state), driver(&state), vehicle(&state));

        register_assignment(&state, window(d1, v, hm(6, 0), hm(14, 0)))
            .await
            .unwrap();
        let clash = register_assignment(&state, window(d2, v, hm(13, 0), hm(20, 0))).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        register_assignment(&state, window(d2, v, hm(14, 0), hm(22, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn driver_cannot_hold_two_overlapping_windows() {
        let state = AppState::new(DispatchSettings::default());
        let (d, v1, v2) = (driver(&state), vehicle(&state), vehicle(&state));

        register_assignment(&state, window(d, v1, hm(22, 0), hm(6, 0)))
            .await
            .unwrap();
        let clash = register_assignment(&state, window(d, v2, hm(5, 0), hm(9, 0))).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_driver_is_rejected() {
        let state = AppState::new(DispatchSettings::default());
        let v = vehicle(&state);

        let result =
            register_assignment(&state, window(Uuid::new_v4(), v, hm(8, 0), hm(9, 0))).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn tenant_coverage_requires_known_city() {
        let state = AppState::new(DispatchSettings::default());
        let tenant = Uuid::new_v4();

        let missing = set_tenant_city(&state, tenant, Uuid::new_v4(), true);
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let city = register_city(
            &state,
            NewCity {
                name: "Pune".to_string(),
                boundary: vec![
                    GeoPoint::new(18.4, 73.7),
                    GeoPoint::new(18.4, 74.0),
                    GeoPoint::new(18.7, 74.0),
                    GeoPoint::new(18.7, 73.7),
                ],
                zones: vec![],
            },
        )
        .unwrap();
        set_tenant_city(&state, tenant, city.id, true).unwrap();
        assert!(state.tenants.is_tenant_active_in_city(tenant, city.id));
    }
}
