//! Forecast endpoints

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DashboardState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::forecast::{self, ForecastError, SynthesisError, SynthesisRequest};
use crate::types::{CovariateFrame, ForecastRow, MonthEndRule};

/// Forecast request body. Omitted fields (or an empty body) take the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastRequestBody {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Total planned production over the range (kg)
    pub production: Option<f64>,
    pub anomaly_intensity: Option<f64>,
    pub seed: Option<u64>,
    pub month_end: Option<MonthEndRule>,
}

impl ForecastRequestBody {
    fn into_request(self, state: &DashboardState) -> SynthesisRequest {
        let d = SynthesisRequest::from_defaults(&state.config.forecast_defaults);
        SynthesisRequest {
            start_date: self.start_date.unwrap_or(d.start_date),
            end_date: self.end_date.unwrap_or(d.end_date),
            target_total_production: self.production.unwrap_or(d.target_total_production),
            target_mean_anomaly_intensity: self
                .anomaly_intensity
                .unwrap_or(d.target_mean_anomaly_intensity),
            seed: self.seed.unwrap_or(d.seed),
            month_end: self.month_end,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub model: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    /// Sum of point estimates over the range (kWh)
    pub total_predicted: f64,
    pub forecast: Vec<ForecastRow>,
}

fn synthesize_from(
    state: &DashboardState,
    body: &[u8],
) -> Result<(SynthesisRequest, CovariateFrame), Response> {
    let body = parse_body(body)?;
    let request = body.into_request(state);
    let frame = forecast::synthesize(&request, &state.config.synthesis)
        .map_err(|e| synthesis_error(&e))?;
    Ok((request, frame))
}

fn parse_body(body: &[u8]) -> Result<ForecastRequestBody, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ForecastRequestBody::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiErrorResponse::bad_request(format!("invalid forecast request: {e}")))
}

fn synthesis_error(e: &SynthesisError) -> Response {
    tracing::warn!(error = %e, "Rejected forecast request");
    ApiErrorResponse::with_code(StatusCode::BAD_REQUEST, "INVALID_FORECAST_REQUEST", e.to_string())
}

fn forecast_error(e: &ForecastError) -> Response {
    tracing::error!(error = %e, "Forecast failed");
    ApiErrorResponse::with_code(StatusCode::INTERNAL_SERVER_ERROR, "FORECAST_ERROR", e.to_string())
}

/// POST /api/v1/forecast: synthesize covariates and run the forecaster.
pub async fn post_forecast(
    State(state): State<DashboardState>,
    body: Bytes,
) -> Response {
    let (request, frame) = match synthesize_from(&state, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.generator.forecast_rows(&frame) {
        Ok(rows) => {
            let total_predicted = rows.iter().map(|r| r.point.point_estimate).sum();
            tracing::info!(
                start = %request.start_date,
                end = %request.end_date,
                days = rows.len(),
                total_predicted,
                "Forecast served"
            );
            ApiResponse::ok(ForecastResponse {
                model: state.generator.model_name().to_string(),
                start_date: request.start_date,
                end_date: request.end_date,
                days: rows.len(),
                total_predicted,
                forecast: rows,
            })
        }
        Err(e) => forecast_error(&e),
    }
}

/// POST /api/v1/forecast/covariates: the synthesized regressor frame only.
pub async fn post_covariates(
    State(state): State<DashboardState>,
    body: Bytes,
) -> Response {
    match synthesize_from(&state, &body) {
        Ok((_, frame)) => ApiResponse::ok(frame),
        Err(resp) => resp,
    }
}
