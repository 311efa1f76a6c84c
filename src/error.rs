//! Engine error types with HTTP status code mapping.
//!
//! [`LotteryError`] is the central error type for the engine. Draw cycle
//! failures are logged and surfaced to operators; only the accrual and
//! read endpoints ever render one as a JSON response.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "user not found: 6f0c...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Engine error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Ledger / Server | 500 / 503 / 504           |
#[derive(Debug, thiserror::Error)]
pub enum LotteryError {
    /// Ledger read or write failed. Retried on the next scheduler tick.
    #[error("ledger store error: {0}")]
    Store(String),

    /// A ledger operation exceeded its deadline and was rolled back.
    #[error("ledger operation timed out after {0:?}")]
    Timeout(Duration),

    /// The draw configuration is missing or invalid.
    #[error("invalid draw configuration: {0}")]
    Configuration(String),

    /// No user with the given ID exists in the ledger.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// No draw has been committed yet.
    #[error("no committed draw found")]
    DrawNotFound,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Configuration(_) => 1002,
            Self::UserNotFound(_) => 2001,
            Self::DrawNotFound => 2002,
            Self::Internal(_) => 3000,
            Self::Store(_) => 3001,
            Self::Timeout(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::DrawNotFound => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` when the failure is expected to clear on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Timeout(_))
    }
}

impl From<sqlx::Error> for LotteryError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl IntoResponse for LotteryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_store_and_timeout() {
        assert!(LotteryError::Store("connection reset".to_string()).is_transient());
        assert!(LotteryError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!LotteryError::Configuration("missing".to_string()).is_transient());
        assert!(!LotteryError::InvalidRequest("bad".to_string()).is_transient());
    }

    #[test]
    fn status_codes_follow_category() {
        assert_eq!(
            LotteryError::UserNotFound(UserId::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LotteryError::InvalidRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LotteryError::Timeout(Duration::from_secs(5)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn response_carries_error_status() {
        let response = LotteryError::DrawNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
