//! Anomaly guidance endpoints

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::prescription;
use crate::types::{AnomalyLabel, Prescription};

#[derive(Debug, Serialize)]
pub struct PrescriptionEntry {
    pub label: AnomalyLabel,
    #[serde(flatten)]
    pub prescription: Prescription,
}

/// GET /api/v1/prescriptions
pub async fn list_prescriptions() -> Response {
    let entries: Vec<PrescriptionEntry> = prescription::catalog()
        .into_iter()
        .map(|(label, prescription)| PrescriptionEntry { label, prescription })
        .collect();
    ApiResponse::ok(entries)
}

/// GET /api/v1/prescriptions/:label
pub async fn get_prescription(Path(label): Path<String>) -> Response {
    match label.parse::<AnomalyLabel>() {
        Ok(label) => ApiResponse::ok(PrescriptionEntry {
            label,
            prescription: prescription::resolve(label),
        }),
        Err(e) => ApiErrorResponse::with_code(StatusCode::NOT_FOUND, "UNKNOWN_LABEL", e.to_string()),
    }
}
