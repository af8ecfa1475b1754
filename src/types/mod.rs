//! Shared data structures for furnace monitoring and energy forecasting
//!
//! - Telemetry: TelemetryRecord (per-minute meter row), FeatureVector (classifier input)
//! - Anomaly: AnomalyLabel, Prescription, LabelCounts
//! - Forecast: CovariateFrame (synthesized regressors), ForecastPoint (model output)

mod anomaly;
mod forecast;
mod telemetry;

pub use anomaly::*;
pub use forecast::*;
pub use telemetry::*;
