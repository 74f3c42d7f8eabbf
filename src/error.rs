use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// ApiError
///
/// The application's error taxonomy. Every fallible operation in the core
/// returns this type; handlers surface it directly because it implements
/// `IntoResponse`.
///
/// Mapping to HTTP:
/// - `Validation`   -> 400 (malformed or missing input)
/// - `Unauthorized` -> 401 (missing/invalid credentials or token)
/// - `Forbidden`    -> 403 (authorization denial, distinct from existence)
/// - `NotFound`     -> 404 (referenced entity absent)
/// - `Conflict`     -> 409 (uniqueness violation)
/// - `Internal`     -> 500 (store/transport failure; detail is logged
///   server-side and never exposed to the caller)
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal(String),
}

/// ErrorBody
///
/// The JSON envelope returned for every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Internal(detail) => {
                // The detail stays server-side; the client sees an opaque message.
                tracing::error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Maps store failures onto the taxonomy. Uniqueness violations become
/// `Conflict`; foreign-key violations become `NotFound` (the insert referenced
/// a row that does not exist); everything else is an opaque `Internal`.
///
/// `RowNotFound` is deliberately NOT produced by repository code for
/// expected-absence cases (those use `fetch_optional`), so seeing it here
/// still maps to `NotFound`.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // unique_violation
                Some("23505") => ApiError::Conflict("resource already exists".to_string()),
                // foreign_key_violation
                Some("23503") => {
                    ApiError::NotFound("referenced resource does not exist".to_string())
                }
                _ => ApiError::Internal(err.to_string()),
            },
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        ApiError::Unauthorized("invalid or expired token".to_string())
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        ApiError::Internal(format!("password hash error: {err}"))
    }
}
