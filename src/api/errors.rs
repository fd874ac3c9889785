//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes and request tracking.

use crate::errors::WalletError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// BAD_REQUEST, UNAUTHORIZED, INTERNAL_ERROR, ...
    pub code: String,
    pub message: String,
}

/// API error types with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    BadRequest(String),
    Unauthorized(String),
    TooManyRequests,
    InternalError,
    ServiceUnavailable,
}

impl ApiError {
    pub fn bad_request(request_id: String, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message.into()),
            request_id,
        }
    }

    pub fn unauthorized(request_id: String, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized(message.into()),
            request_id,
        }
    }

    pub fn too_many_requests(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::TooManyRequests,
            request_id,
        }
    }

    pub fn internal_error(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError,
            request_id,
        }
    }

    /// Business outcomes become 400 with their message; store timeouts 503;
    /// everything else 500 with the details kept in the log.
    pub fn from_wallet(request_id: String, err: WalletError) -> Self {
        if err.is_business() {
            return Self::bad_request(request_id, err.to_string());
        }

        match &err {
            WalletError::Auth(_) => Self::unauthorized(request_id, "invalid or expired token"),
            WalletError::Store { source, .. } if source.is_timeout() => {
                warn!(request_id = %request_id, error = %err, "store timeout");
                Self {
                    kind: ApiErrorKind::ServiceUnavailable,
                    request_id,
                }
            }
            _ => {
                error!(request_id = %request_id, error = %err, "request failed");
                Self::internal_error(request_id)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code_and_message(&self) -> (&'static str, String) {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) => ("BAD_REQUEST", msg.clone()),
            ApiErrorKind::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone()),
            ApiErrorKind::TooManyRequests => ("TOO_MANY_REQUESTS", "too many requests".to_string()),
            ApiErrorKind::InternalError => ("INTERNAL_ERROR", "internal server error".to_string()),
            ApiErrorKind::ServiceUnavailable => (
                "SERVICE_UNAVAILABLE",
                "service temporarily unavailable, retry later".to_string(),
            ),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (code, message) = self.code_and_message();
        write!(f, "[{}] {}: {}", self.request_id, code, message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = self.code_and_message();

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
