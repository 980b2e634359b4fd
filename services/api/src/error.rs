//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{DatabaseError, is_connection_error};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ParseEnumError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, revoked or expired credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the wrong role or not a party to the resource
    #[error("{0}")]
    Forbidden(String),

    /// Referenced record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email, repeated interest, already-assigned deal
    #[error("{0}")]
    Conflict(String),

    /// Too many login attempts
    #[error("Too many attempts, please try again later")]
    RateLimited,

    /// The storage backend cannot be reached
    #[error("Storage backend is unavailable")]
    UpstreamUnavailable,

    /// Anything else; details are logged, not returned
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }
}

/// Storage failures arrive as `anyhow::Error`. Transport-level database
/// failures become `UpstreamUnavailable`; the rest are internal.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let unavailable = err.chain().any(|cause| {
            if let Some(e) = cause.downcast_ref::<sqlx::Error>() {
                return is_connection_error(e);
            }
            if let Some(e) = cause.downcast_ref::<DatabaseError>() {
                return e.is_unavailable();
            }
            if let Some(e) = cause.downcast_ref::<redis::RedisError>() {
                return e.is_io_error() || e.is_connection_refusal() || e.is_timeout();
            }
            false
        });

        if unavailable {
            ApiError::UpstreamUnavailable
        } else {
            ApiError::Internal(err)
        }
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            ApiError::UpstreamUnavailable => {
                warn!("Storage backend unavailable");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "code": self.code(),
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_maps_to_upstream_unavailable() {
        let err = anyhow::Error::new(sqlx::Error::PoolTimedOut).context("loading deal");
        assert!(matches!(ApiError::from(err), ApiError::UpstreamUnavailable));
    }

    #[test]
    fn other_storage_errors_are_internal() {
        let err = anyhow::anyhow!("row decode failed");
        let api_error = ApiError::from(err);
        assert_eq!(api_error.code(), "INTERNAL");
        assert_eq!(api_error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn response_body_is_structured() {
        let response = ApiError::conflict("Deal already has an agent").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["message"], "Deal already has an agent");
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let response = ApiError::from(anyhow::anyhow!("password column missing")).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Internal server error");
    }
}
