//! HTTP API
//!
//! Registration, login, wallet transfers and slot spins under `/api`, plus
//! health and Prometheus metrics at the root.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{create_app, ApiServer};
