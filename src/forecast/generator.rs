//! Forecast Generator: one model call per covariate frame

use std::sync::Mutex;

use thiserror::Error;

use super::model::{Forecaster, ForecasterError};
use crate::types::{CovariateFrame, ForecastPoint, ForecastRow};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("covariate frame has no rows")]
    EmptyFrame,

    #[error(transparent)]
    Model(#[from] ForecasterError),

    #[error("model returned {got} points for {expected} rows")]
    RowCountMismatch { expected: usize, got: usize },

    #[error("model point {index} is dated {got}, expected {expected}")]
    DateMismatch {
        index: usize,
        expected: chrono::NaiveDate,
        got: chrono::NaiveDate,
    },
}

/// Serialises access to a single fitted forecaster.
pub struct ForecastGenerator {
    model: Mutex<Box<dyn Forecaster>>,
    name: String,
}

impl std::fmt::Debug for ForecastGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastGenerator")
            .field("model", &self.name)
            .finish()
    }
}

impl ForecastGenerator {
    pub fn new(model: Box<dyn Forecaster>) -> Self {
        let name = model.name().to_string();
        Self {
            model: Mutex::new(model),
            name,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.name
    }

    /// Predict one point per row. Failures are returned as-is, never retried.
    pub fn forecast(&self, frame: &CovariateFrame) -> Result<Vec<ForecastPoint>, ForecastError> {
        if frame.is_empty() {
            return Err(ForecastError::EmptyFrame);
        }

        let points = {
            let model = self.model.lock().unwrap_or_else(|e| {
                tracing::warn!("Forecaster lock was poisoned, recovering");
                e.into_inner()
            });
            model.predict(frame)
        }
        .map_err(|e| {
            tracing::warn!(model = %self.name, rows = frame.len(), error = %e, "Forecast failed");
            ForecastError::from(e)
        })?;

        if points.len() != frame.len() {
            return Err(ForecastError::RowCountMismatch {
                expected: frame.len(),
                got: points.len(),
            });
        }
        if let Some((index, (expected, point))) = frame
            .dates()
            .zip(&points)
            .enumerate()
            .find(|(_, (date, point))| *date != point.date)
        {
            return Err(ForecastError::DateMismatch {
                index,
                expected,
                got: point.date,
            });
        }

        Ok(points)
    }

    /// Forecast and join each point with the covariates that produced it.
    pub fn forecast_rows(&self, frame: &CovariateFrame) -> Result<Vec<ForecastRow>, ForecastError> {
        let points = self.forecast(frame)?;
        Ok(points
            .into_iter()
            .zip(&frame.rows)
            .map(|(point, row)| ForecastRow {
                point,
                anomaly_intensity: row.anomaly_intensity,
                is_month_end: row.is_month_end,
            })
            .collect())
    }
}
