use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::shift;
use crate::error::AppError;
use crate::models::location::{GeoPoint, LocationRecord};
use crate::models::shift::DriverShift;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers/:id/shifts/start", post(start_shift))
        .route("/drivers/:id/shifts/end", post(end_shift))
        .route("/drivers/:id/shift/current", get(current_shift))
        .route(
            "/drivers/:id/location",
            post(update_location).get(location_history),
        )
}

#[derive(Deserialize)]
pub struct StartShiftBody {
    pub tenant_id: Uuid,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct LocationBody {
    pub location: GeoPoint,
}

async fn start_shift(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartShiftBody>,
) -> Result<Json<DriverShift>, AppError> {
    let shift = shift::start_shift(&state, id, payload.tenant_id, payload.location).await?;
    Ok(Json(shift))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationBody>,
) -> Result<Json<LocationRecord>, AppError> {
    Ok(Json(
        shift::update_location(&state, id, payload.location).await?,
    ))
}

async fn location_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<LocationRecord>> {
    Json(shift::location_history(&state, id))
}

async fn end_shift(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverShift>, AppError> {
    Ok(Json(shift::end_shift(&state, id).await?))
}

async fn current_shift(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverShift>, AppError> {
    Ok(Json(shift::get_current_shift(&state, id).await?))
}
