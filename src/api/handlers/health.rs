//! Liveness endpoint

use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use super::DashboardState;
use crate::api::envelope::ApiResponse;
use crate::stream::StreamPhase;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub plant: String,
    pub furnace: String,
    pub uptime_seconds: u64,
    pub stream_phase: StreamPhase,
    pub telemetry_records: usize,
    pub forecaster: String,
}

/// GET /health
pub async fn health_check(State(state): State<DashboardState>) -> Response {
    let snapshot = state.stream.snapshot().await;
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        plant: state.config.plant.name.clone(),
        furnace: state.config.plant.furnace.clone(),
        uptime_seconds: state.started.elapsed().as_secs(),
        stream_phase: snapshot.phase,
        telemetry_records: state.store.len(),
        forecaster: state.generator.model_name().to_string(),
    })
}
