//! Request Handlers

use super::{
    errors::ApiError,
    middleware::{AuthUser, RequestId},
    models::*,
};
use crate::common::types::Page;
use crate::errors::WalletError;
use crate::factory::SlotVault;
use crate::metrics::GameMetrics;
use crate::services::{GameService, WalletService};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use governor::DefaultDirectRateLimiter;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state
pub struct AppState {
    pub wallet: WalletService,
    pub game: GameService,
    pub metrics: Arc<GameMetrics>,
    pub rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    pub fn new(app: &SlotVault, rate_limiter: Option<Arc<DefaultDirectRateLimiter>>) -> Self {
        Self {
            wallet: app.wallet.clone(),
            game: app.game.clone(),
            metrics: Arc::new(GameMetrics::new()),
            rate_limiter,
        }
    }

    fn fail(&self, request_id: &RequestId, err: WalletError) -> ApiError {
        self.metrics.record_failure(&err);
        ApiError::from_wallet(request_id.0.clone(), err)
    }
}

fn parse_body<T>(request_id: &RequestId, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            debug!(request_id = %request_id.0, error = %rejection, "rejected request payload");
            Err(ApiError::bad_request(
                request_id.0.clone(),
                "failed to parse request payload",
            ))
        }
    }
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
    })
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
}

/// POST /api/register
pub async fn register_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let req = parse_body(&request_id, payload)?;

    let user = state
        .wallet
        .register(req.into())
        .await
        .map_err(|e| state.fail(&request_id, e))?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/login
pub async fn login_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let req = parse_body(&request_id, payload)?;

    let token = state
        .wallet
        .login(&req.login, &req.password)
        .await
        .map_err(|e| state.fail(&request_id, e))?;

    info!(login = %req.login, "user logged in");
    Ok(Json(TokenResponse { token }))
}

/// GET /api/profile
pub async fn profile_handler(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(user.into())
}

/// POST /api/wallet/deposit
pub async fn deposit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<WalletRequest>, JsonRejection>,
) -> Result<Json<WalletResponse>, ApiError> {
    let req = parse_body(&request_id, payload)?;

    let balance = state
        .wallet
        .deposit(&user.login, req.amount)
        .await
        .map_err(|e| state.fail(&request_id, e))?;

    state.metrics.record_deposit();
    Ok(Json(WalletResponse { balance }))
}

/// POST /api/wallet/withdraw
pub async fn withdraw_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<WalletRequest>, JsonRejection>,
) -> Result<Json<WalletResponse>, ApiError> {
    let req = parse_body(&request_id, payload)?;

    let balance = state
        .wallet
        .withdraw(&user.login, req.amount)
        .await
        .map_err(|e| state.fail(&request_id, e))?;

    state.metrics.record_withdrawal();
    Ok(Json(WalletResponse { balance }))
}

/// POST /api/slot/spin
pub async fn spin_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SpinRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SpinResponse>), ApiError> {
    let req = parse_body(&request_id, payload)?;

    let receipt = state
        .game
        .spin(&user, req.bet_amount)
        .await
        .map_err(|e| state.fail(&request_id, e))?;

    state
        .metrics
        .record_spin(receipt.spin.result, receipt.spin.bet_amount, receipt.spin.win_amount);
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// GET /api/slot/history?limit={n}&offset={n}
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<SpinHistoryResponse>, ApiError> {
    let parse = |value: &Option<String>| value.as_deref().and_then(|v| v.trim().parse::<i64>().ok());
    let page = Page::from_query(parse(&query.limit), parse(&query.offset));

    let spins = state
        .game
        .spin_history(&user, page)
        .await
        .map_err(|e| state.fail(&request_id, e))?;

    debug!(login = %user.login, limit = page.limit, offset = page.offset, count = spins.len(), "spin history served");
    Ok(Json(SpinHistoryResponse {
        results: spins.into_iter().map(SpinView::from).collect(),
    }))
}
