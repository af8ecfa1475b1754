//! Meltwatch: melting-furnace energy monitoring
//!
//! Replays archived per-minute furnace telemetry as a live feed, classifies
//! each reading into an operating-anomaly category with operator guidance,
//! and forecasts daily energy consumption from planned production.
//!
//! ## Architecture
//!
//! - **Telemetry Store**: time-ordered minute readings loaded from CSV
//! - **Stream Cursor**: shared replay position, label counts, trailing window
//! - **Classifier**: pluggable per-record anomaly model
//! - **Forecast**: covariate synthesis and the fitted consumption regression
//! - **Aggregation**: monthly/weekly/daily consumption views
//! - **API**: Axum dashboard endpoints

pub mod aggregation;
pub mod api;
pub mod classifier;
pub mod config;
pub mod forecast;
pub mod prescription;
pub mod stream;
pub mod telemetry;
pub mod types;

// Re-export plant configuration
pub use config::PlantConfig;

// Re-export commonly used types
pub use types::{
    AnomalyLabel, CovariateFrame, CovariateRow, DailyRecord, FeatureVector, ForecastPoint,
    LabelCounts, MonthEndRule, Prescription, TelemetryRecord, UnknownLabelError,
};

// Re-export core components
pub use classifier::{Classifier, ClassifierError, ThresholdClassifier};
pub use forecast::{
    synthesize, ForecastError, ForecastGenerator, Forecaster, LinearForecaster, SynthesisError,
    SynthesisRequest,
};
pub use stream::{AdvanceOutcome, AdvanceResult, StreamCursor, StreamError, StreamHandle};
pub use telemetry::TelemetryStore;
