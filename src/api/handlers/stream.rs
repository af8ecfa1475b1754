//! Live replay endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::DashboardState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::stream::{AdvanceOutcome, StreamError, StreamSnapshot, WindowEntry};
use crate::types::{LabelCounts, Prescription};

/// `prediction` value once the active day is exhausted.
pub const DONE: &str = "done";

/// One replay step, or the terminal summary once the day is exhausted.
#[derive(Debug, Serialize)]
pub struct StreamStepResponse {
    /// Label of the record just classified, or `"done"`
    pub prediction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<Prescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    pub position: usize,
    /// Trailing window, oldest first
    pub history: Vec<WindowEntry>,
    pub counts: LabelCounts,
    pub total_consumption: f64,
}

impl From<StreamSnapshot> for StreamStepResponse {
    fn from(s: StreamSnapshot) -> Self {
        Self {
            prediction: DONE.to_string(),
            prescription: None,
            timestamp: s.last_timestamp,
            position: s.position,
            history: s.window,
            counts: s.counts,
            total_consumption: s.total_consumption,
        }
    }
}

/// GET /api/v1/stream/next: classify the next record of the active day.
pub async fn stream_next(State(state): State<DashboardState>) -> Response {
    match state.stream.advance().await {
        Ok(AdvanceOutcome::Advanced(r)) => ApiResponse::ok(StreamStepResponse {
            prediction: r.label.to_string(),
            prescription: Some(r.prescription),
            timestamp: Some(r.timestamp),
            position: r.position,
            history: r.window,
            counts: r.counts,
            total_consumption: r.total_consumption,
        }),
        Ok(AdvanceOutcome::EndOfStream(snapshot)) => {
            ApiResponse::ok(StreamStepResponse::from(snapshot))
        }
        Err(e @ StreamError::Classification { .. }) => {
            tracing::error!(error = %e, "Stream advance failed");
            ApiErrorResponse::with_code(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CLASSIFICATION_ERROR",
                e.to_string(),
            )
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StreamStatusResponse {
    pub active_date: chrono::NaiveDate,
    #[serde(flatten)]
    pub snapshot: StreamSnapshot,
}

/// GET /api/v1/stream/status: cursor state without advancing.
pub async fn stream_status(State(state): State<DashboardState>) -> Response {
    let snapshot = state.stream.snapshot().await;
    ApiResponse::ok(StreamStatusResponse {
        active_date: state.config.stream.active_date,
        snapshot,
    })
}
