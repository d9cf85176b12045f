use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::trip::TripStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("trip is {actual}, operation requires {required}")]
    InvalidTripState {
        required: &'static str,
        actual: TripStatus,
    },

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("offer belongs to another driver")]
    NotYourOffer,

    #[error("trip can no longer be offered: {0}")]
    TripNotOfferable(String),

    #[error("driver has no vehicle assignment covering the current time")]
    NoActiveAssignment,

    #[error("driver has no open shift")]
    NoActiveShift,

    #[error("driver already has an open shift")]
    DriverAlreadyOnline,

    #[error("driver is not online")]
    DriverNotOnline,

    #[error("driver is on a trip")]
    DriverOnTrip,

    #[error("shift window has ended; shift closed automatically")]
    ShiftExpired,

    #[error("invalid or expired otp")]
    InvalidOrExpiredOtp,

    #[error("location is outside every service area")]
    OutOfServiceArea,

    #[error("tenant does not operate in this city")]
    TenantNotActiveInCity,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidTripState { .. } => "INVALID_TRIP_STATE",
            AppError::NotAuthorized(_) => "NOT_AUTHORIZED",
            AppError::NotYourOffer => "NOT_YOUR_OFFER",
            AppError::TripNotOfferable(_) => "TRIP_NOT_OFFERABLE",
            AppError::NoActiveAssignment => "NO_ACTIVE_ASSIGNMENT",
            AppError::NoActiveShift => "NO_ACTIVE_SHIFT",
            AppError::DriverAlreadyOnline => "DRIVER_ALREADY_ONLINE",
            AppError::DriverNotOnline => "DRIVER_NOT_ONLINE",
            AppError::DriverOnTrip => "DRIVER_ON_TRIP",
            AppError::ShiftExpired => "SHIFT_EXPIRED",
            AppError::InvalidOrExpiredOtp => "INVALID_OR_EXPIRED_OTP",
            AppError::OutOfServiceArea => "OUT_OF_SERVICE_AREA",
            AppError::TenantNotActiveInCity => "TENANT_NOT_ACTIVE_IN_CITY",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotAuthorized(_) | AppError::NotYourOffer => StatusCode::FORBIDDEN,
            AppError::Conflict(_)
            | AppError::InvalidTripState { .. }
            | AppError::TripNotOfferable(_)
            | AppError::NoActiveAssignment
            | AppError::DriverAlreadyOnline
            | AppError::DriverOnTrip => StatusCode::CONFLICT,
            AppError::OutOfServiceArea => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_)
            | AppError::NoActiveShift
            | AppError::DriverNotOnline
            | AppError::ShiftExpired
            | AppError::InvalidOrExpiredOtp
            | AppError::TenantNotActiveInCity => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
