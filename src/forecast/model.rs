//! Consumption forecaster contract and the fitted linear reference model

use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::LinearModelConfig;
use crate::types::{CovariateFrame, CovariateRow, ForecastPoint};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecasterError {
    #[error("invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("model produced a non-finite estimate for {date}")]
    NonFiniteOutput { date: NaiveDate },

    #[error("model inference failed: {0}")]
    Inference(String),
}

/// A fitted daily-consumption regression over synthesized covariates.
///
/// Implementations may not be thread-safe; the generator serialises calls.
pub trait Forecaster: Send {
    /// One point per input row, in the same date order.
    fn predict(&self, frame: &CovariateFrame) -> Result<Vec<ForecastPoint>, ForecasterError>;

    fn name(&self) -> &str;
}

/// Additive regression with a symmetric Gaussian prediction interval.
///
/// `yhat = intercept + Σ coefᵢ·xᵢ`, bounds `yhat ± z·σ` where `z` is the
/// standard-normal quantile for the configured interval width.
#[derive(Debug, Clone)]
pub struct LinearForecaster {
    params: LinearModelConfig,
    z: f64,
}

impl LinearForecaster {
    pub fn new(params: LinearModelConfig) -> Result<Self, ForecasterError> {
        let width = params.interval_width;
        if !(width > 0.0 && width < 1.0) {
            return Err(ForecasterError::InvalidParameters(format!(
                "interval width {width} must be strictly between 0 and 1"
            )));
        }
        if !(params.residual_std.is_finite() && params.residual_std >= 0.0) {
            return Err(ForecasterError::InvalidParameters(format!(
                "residual std {} must be a non-negative finite number",
                params.residual_std
            )));
        }
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| ForecasterError::InvalidParameters(e.to_string()))?;
        let z = standard.inverse_cdf(0.5 + width / 2.0);
        tracing::debug!(interval_width = width, z, "Linear forecaster ready");
        Ok(Self { params, z })
    }

    /// Half-width of the prediction interval.
    pub fn margin(&self) -> f64 {
        self.z * self.params.residual_std
    }

    fn estimate(&self, row: &CovariateRow) -> f64 {
        let p = &self.params;
        p.intercept
            + p.production * row.production
            + p.anomaly_intensity * row.anomaly_intensity
            + p.batch_count * row.batch_count
            + p.is_weekend * f64::from(u8::from(row.is_weekend))
            + p.is_month_end * f64::from(u8::from(row.is_month_end))
    }
}

impl Forecaster for LinearForecaster {
    fn predict(&self, frame: &CovariateFrame) -> Result<Vec<ForecastPoint>, ForecasterError> {
        let margin = self.margin();
        frame
            .rows
            .iter()
            .map(|row| {
                let yhat = self.estimate(row);
                if !yhat.is_finite() {
                    return Err(ForecasterError::NonFiniteOutput { date: row.date });
                }
                Ok(ForecastPoint {
                    date: row.date,
                    point_estimate: yhat,
                    lower_bound: yhat - margin,
                    upper_bound: yhat + margin,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "linear-regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(production: f64, weekend: bool, month_end: bool) -> CovariateRow {
        CovariateRow {
            date: NaiveDate::from_ymd_opt(2025, 5, 12).unwrap(),
            is_weekend: weekend,
            is_month_end: month_end,
            production,
            batch_count: production / 1_000.0,
            anomaly_intensity: 5.0,
        }
    }

    #[test]
    fn test_z_for_eighty_percent_interval() {
        let m = LinearForecaster::new(LinearModelConfig::default()).unwrap();
        assert!((m.z - 1.281_551_565).abs() < 1e-6);
    }

    #[test]
    fn test_point_is_linear_combination() {
        let params = LinearModelConfig {
            intercept: 100.0,
            production: 0.5,
            anomaly_intensity: 10.0,
            batch_count: 0.0,
            is_weekend: -50.0,
            is_month_end: 20.0,
            residual_std: 0.0,
            interval_width: 0.8,
        };
        let m = LinearForecaster::new(params).unwrap();
        let out = m
            .predict(&CovariateFrame::new(vec![row(1_000.0, true, true)]))
            .unwrap();
        // 100 + 500 + 50 - 50 + 20
        assert!((out[0].point_estimate - 620.0).abs() < 1e-9);
        assert_eq!(out[0].lower_bound, out[0].upper_bound);
    }

    #[test]
    fn test_bounds_bracket_point() {
        let m = LinearForecaster::new(LinearModelConfig::default()).unwrap();
        let frame = CovariateFrame::new(vec![row(19_200.0, false, false), row(9_600.0, true, false)]);
        for p in m.predict(&frame).unwrap() {
            assert!(p.lower_bound < p.point_estimate && p.point_estimate < p.upper_bound);
            assert!((p.upper_bound - p.point_estimate - m.margin()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_width_rejected() {
        let params = LinearModelConfig {
            interval_width: 1.0,
            ..LinearModelConfig::default()
        };
        assert!(matches!(
            LinearForecaster::new(params),
            Err(ForecasterError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_non_finite_output_is_error() {
        let m = LinearForecaster::new(LinearModelConfig::default()).unwrap();
        let frame = CovariateFrame::new(vec![row(f64::INFINITY, false, false)]);
        assert!(matches!(
            m.predict(&frame),
            Err(ForecasterError::NonFiniteOutput { .. })
        ));
    }
}
