//! Middleware Components
//!
//! CORS, rate limiting, request tracking and bearer authentication.

use super::{errors::ApiError, handlers::AppState};
use crate::common::types::User;
use crate::config::RateLimitConfig;
use crate::errors::WalletError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, ExposeHeaders};
use uuid::Uuid;

/// Request ID header key
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create CORS middleware with configurable origins
pub fn create_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let expose = ExposeHeaders::list([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(expose)
    } else {
        CorsLayer::new()
            .allow_origin(
                allowed_origins
                    .into_iter()
                    .filter_map(|o| o.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
            .expose_headers(expose)
    }
}

/// Middleware to add request ID to all requests
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Request ID wrapper for extracting in handlers
#[derive(Debug, Clone, Default)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_parts(parts: &Parts) -> String {
        parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default()
    }
}

/// Global token bucket shared by every route
pub fn create_rate_limiter(config: &RateLimitConfig) -> Option<Arc<DefaultDirectRateLimiter>> {
    if !config.enabled {
        return None;
    }
    let per_second = NonZeroU32::new(config.requests_per_second)?;
    let burst = NonZeroU32::new(config.burst).unwrap_or(per_second);
    Some(Arc::new(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst))))
}

pub async fn rate_limit_middleware(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    state.metrics.record_request();

    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            state.metrics.record_rate_limited();
            let request_id = request
                .extensions()
                .get::<RequestId>()
                .map(|id| id.0.clone())
                .unwrap_or_default();
            return ApiError::too_many_requests(request_id).into_response();
        }
    }

    next.run(request).await
}

/// Account behind the request's bearer token. Accepts `Bearer <token>` or
/// the bare token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let request_id = RequestId::from_parts(parts);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized(request_id.clone(), "missing authorization header"))?;

        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

        match state.wallet.authenticate(token).await {
            Ok(user) => Ok(AuthUser(user)),
            Err(WalletError::Auth(_)) | Err(WalletError::UserNotFound { .. }) => Err(ApiError::unauthorized(
                request_id,
                "unable to extract user from token",
            )),
            Err(err) => Err(ApiError::from_wallet(request_id, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_respects_burst() {
        let limiter = create_rate_limiter(&RateLimitConfig {
            enabled: true,
            requests_per_second: 1,
            burst: 2,
        })
        .unwrap();

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_disabled_rate_limiter() {
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(create_rate_limiter(&config).is_none());
    }
}
