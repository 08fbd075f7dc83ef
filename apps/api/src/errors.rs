use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Account not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    InactiveAccount,

    #[error("Sign in before continuing")]
    AuthenticationRequired,

    #[error("Participant profile is incomplete")]
    ProfileRequired,

    #[error("Session {0} not found")]
    SessionNotFound(uuid::Uuid),

    #[error("No eligible songs are available for the study")]
    NoEligibleSongs,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            // Auth failures keep the coarse category but never echo the submitted identity.
            AppError::NotFound => (
                StatusCode::UNAUTHORIZED,
                "NOT_FOUND",
                "No account matches these details".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            AppError::InactiveAccount => (
                StatusCode::FORBIDDEN,
                "INACTIVE_ACCOUNT",
                "This account is inactive".to_string(),
            ),
            AppError::AuthenticationRequired => (
                StatusCode::CONFLICT,
                "AUTHENTICATION_REQUIRED",
                self.to_string(),
            ),
            AppError::ProfileRequired => (
                StatusCode::CONFLICT,
                "PROFILE_REQUIRED",
                "Please complete your participant information before continuing".to_string(),
            ),
            AppError::SessionNotFound(_) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                self.to_string(),
            ),
            AppError::NoEligibleSongs => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NO_ELIGIBLE_SONGS",
                self.to_string(),
            ),
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSISTENCE_ERROR",
                    "Could not save your answer, please try again".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
