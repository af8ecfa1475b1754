//! History and batch views

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Response;
use chrono::NaiveDate;
use serde::Serialize;

use super::DashboardState;
use crate::aggregation::{self, BatchSummary, HistoryView};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};

/// GET /api/v1/history: monthly, weekly and daily consumption.
pub async fn get_history(State(state): State<DashboardState>) -> Response {
    ApiResponse::ok(HistoryView::build(&state.store, &state.daily))
}

#[derive(Debug, Serialize)]
pub struct BatchDayResponse {
    pub date: NaiveDate,
    pub batches: Vec<BatchSummary>,
}

/// GET /api/v1/batches?date=YYYY-MM-DD: defaults to the active replay date.
pub async fn get_batches(
    State(state): State<DashboardState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let date = match params.get("date") {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => return ApiErrorResponse::bad_request(format!("invalid date '{raw}', expected YYYY-MM-DD")),
        },
        None => state.config.stream.active_date,
    };

    ApiResponse::ok(BatchDayResponse {
        date,
        batches: aggregation::batch_summary(&state.batches, date),
    })
}
