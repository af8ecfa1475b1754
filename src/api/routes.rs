//! API route definitions
//!
//! - /api/v1/stream/next - classify the next telemetry record
//! - /api/v1/stream/status - cursor state
//! - /api/v1/history - monthly, weekly and daily consumption
//! - /api/v1/batches - per-batch consumption for one day
//! - /api/v1/forecast - consumption forecast
//! - /api/v1/forecast/covariates - synthesized regressors only
//! - /api/v1/prescriptions - anomaly guidance

use axum::{routing::{get, post}, Router};

use super::handlers::{self, DashboardState};

/// Create all API routes for the dashboard
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/stream/next", get(handlers::stream_next))
        .route("/stream/status", get(handlers::stream_status))
        .route("/history", get(handlers::get_history))
        .route("/batches", get(handlers::get_batches))
        .route("/forecast", post(handlers::post_forecast))
        .route("/forecast/covariates", post(handlers::post_covariates))
        .route("/prescriptions", get(handlers::list_prescriptions))
        .route("/prescriptions/:label", get(handlers::get_prescription))
        .with_state(state)
}

/// Health endpoint at root level
pub fn root_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
