// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// API error types.
///
/// The OAuth callback variants carry the exact client-facing message set;
/// store and internal failures stay opaque to the client (`Internal error`)
/// with the detail logged server-side.
#[derive(Debug)]
pub enum ApiError {
    /// Callback `state` missing, unknown, expired or already consumed.
    CorruptedState,
    /// Malformed callback path (non-numeric protocol version).
    InvalidCallback,
    /// No registration for the provider key in the callback path.
    UnknownProvider(String),
    /// Authorization-code exchange with the provider failed.
    TokenExchangeFailed,
    /// Provider access token could not be mapped to a valid user profile.
    ProfileResolutionFailed,
    DatabaseError(sqlx::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::CorruptedState => write!(f, "Corrupted state"),
            ApiError::InvalidCallback => write!(f, "Invalid callback"),
            ApiError::UnknownProvider(p) => write!(f, "auth not configured for \"{}\"", p),
            ApiError::TokenExchangeFailed => write!(f, "Token exchange failed"),
            ApiError::ProfileResolutionFailed => write!(f, "User token translation failed"),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            ApiError::CorruptedState => (StatusCode::BAD_REQUEST, "Corrupted state".to_string()),
            ApiError::InvalidCallback => (StatusCode::BAD_REQUEST, "Invalid callback".to_string()),
            ApiError::UnknownProvider(p) => (
                StatusCode::BAD_REQUEST,
                format!("auth not configured for \"{}\"", p),
            ),
            ApiError::TokenExchangeFailed => {
                (StatusCode::BAD_REQUEST, "Token exchange failed".to_string())
            }
            ApiError::ProfileResolutionFailed => (
                StatusCode::BAD_REQUEST,
                "User token translation failed".to_string(),
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}
