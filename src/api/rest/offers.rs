use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch::{self, OfferOutcome};
use crate::error::AppError;
use crate::models::offer::DispatchAttempt;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers/:id/offers/pending", get(pending_offers))
        .route("/offers/:id/respond", post(respond))
}

#[derive(Deserialize)]
pub struct RespondBody {
    pub driver_id: Uuid,
    pub accept: bool,
}

async fn pending_offers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<DispatchAttempt>> {
    Json(dispatch::pending_offers(&state, id))
}

async fn respond(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondBody>,
) -> Result<Json<OfferOutcome>, AppError> {
    let outcome = dispatch::respond(&state, id, payload.driver_id, payload.accept).await?;
    Ok(Json(outcome))
}
