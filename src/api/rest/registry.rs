use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::registry::{
    self, NewAssignment, NewCity, NewDriver, NewVehicle, VehicleUpdate,
};
use crate::error::AppError;
use crate::geo::CitySummary;
use crate::models::assignment::DriverVehicleAssignment;
use crate::models::fleet::{ApprovalStatus, DriverProfile, Vehicle};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cities", post(create_city))
        .route(
            "/tenants/:tenant_id/cities/:city_id",
            post(set_tenant_city),
        )
        .route("/drivers", post(create_driver))
        .route("/drivers/:id/approval", patch(update_driver_approval))
        .route("/vehicles", post(create_vehicle))
        .route("/vehicles/:id", patch(update_vehicle))
        .route("/assignments", post(create_assignment))
        .route("/assignments/:id", delete(delete_assignment))
}

#[derive(Deserialize)]
pub struct TenantCityBody {
    #[serde(default = "enabled")]
    pub active: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ApprovalBody {
    pub approval_status: ApprovalStatus,
}

async fn create_city(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewCity>,
) -> Result<Json<CitySummary>, AppError> {
    Ok(Json(registry::register_city(&state, payload)?))
}

async fn set_tenant_city(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, city_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TenantCityBody>,
) -> Result<StatusCode, AppError> {
    registry::set_tenant_city(&state, tenant_id, city_id, payload.active)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewDriver>,
) -> Result<Json<DriverProfile>, AppError> {
    Ok(Json(registry::register_driver(&state, payload)?))
}

async fn update_driver_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalBody>,
) -> Result<Json<DriverProfile>, AppError> {
    let driver = registry::set_driver_approval(&state, id, payload.approval_status)?;
    Ok(Json(driver))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewVehicle>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(registry::register_vehicle(&state, payload)?))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehicleUpdate>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(registry::update_vehicle(&state, id, payload)?))
}

async fn create_assignment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewAssignment>,
) -> Result<Json<DriverVehicleAssignment>, AppError> {
    Ok(Json(registry::register_assignment(&state, payload).await?))
}

async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverVehicleAssignment>, AppError> {
    Ok(Json(registry::remove_assignment(&state, id).await?))
}
