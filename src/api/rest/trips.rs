use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::engine::lifecycle::{self, CompletedTrip, TripRequest};
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::offer::DispatchAttempt;
use crate::models::otp::TripOtp;
use crate::models::trip::{Actor, Trip};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips/request", post(request_trip))
        .route("/trips/:id", get(get_trip))
        .route("/trips/:id/offers", get(list_offers))
        .route("/trips/:id/cancel", post(cancel_trip))
        .route("/trips/:id/otp/generate", post(generate_otp))
        .route("/trips/:id/otp/verify", post(verify_otp))
        .route("/trips/:id/complete", post(complete_trip))
}

#[derive(Deserialize)]
pub struct RequestTripBody {
    pub rider_id: Uuid,
    #[serde(flatten)]
    pub trip: TripRequest,
}

#[derive(Serialize)]
pub struct RequestTripResponse {
    pub trip: Trip,
    pub offer: Option<DispatchAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Deserialize)]
pub struct CancelBody {
    pub actor: Actor,
}

#[derive(Deserialize)]
pub struct DriverBody {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct VerifyOtpBody {
    pub driver_id: Uuid,
    pub otp_code: String,
}

#[derive(Deserialize)]
pub struct CompleteBody {
    pub driver_id: Uuid,
    /// Straight-line pickup to drop distance when absent.
    pub distance_km: Option<f64>,
    pub duration_minutes: f64,
}

async fn request_trip(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestTripBody>,
) -> Result<Json<RequestTripResponse>, AppError> {
    let requested = lifecycle::request_trip(&state, payload.rider_id, payload.trip).await?;
    let message = requested
        .offer
        .is_none()
        .then_some("no drivers available");

    Ok(Json(RequestTripResponse {
        trip: requested.trip,
        offer: requested.offer,
        message,
    }))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(lifecycle::get_trip(&state, id)?))
}

async fn list_offers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DispatchAttempt>>, AppError> {
    state.trip(id)?;
    Ok(Json(dispatch::attempts_for_trip(&state, id)))
}

async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelBody>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(lifecycle::cancel(&state, id, payload.actor).await?))
}

async fn generate_otp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverBody>,
) -> Result<Json<TripOtp>, AppError> {
    Ok(Json(
        lifecycle::generate_otp(&state, id, payload.driver_id).await?,
    ))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyOtpBody>,
) -> Result<Json<Trip>, AppError> {
    let trip =
        lifecycle::verify_otp_and_start(&state, id, payload.driver_id, &payload.otp_code).await?;
    Ok(Json(trip))
}

async fn complete_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteBody>,
) -> Result<Json<CompletedTrip>, AppError> {
    let distance_km = match payload.distance_km {
        Some(distance_km) => distance_km,
        None => {
            let trip = state.trip(id)?;
            haversine_km(&trip.pickup, &trip.drop)
        }
    };

    let completed = lifecycle::complete(
        &state,
        id,
        payload.driver_id,
        distance_km,
        payload.duration_minutes,
    )
    .await?;
    Ok(Json(completed))
}
