//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/profile", get(profile_handler))
        .route("/wallet/deposit", post(deposit_handler))
        .route("/wallet/withdraw", post(withdraw_handler))
        .route("/slot/spin", post(spin_handler))
        .route("/slot/history", get(history_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .with_state(state)
}
