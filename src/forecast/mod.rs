//! Energy forecasting
//!
//! - `synthesizer`: future covariate frame from aggregate targets
//! - `model`: [`Forecaster`] contract and the fitted linear regression
//! - `generator`: serialised model access with output checks
//!
//! Synthesis is pure and runs in parallel across requests; only the model
//! call is behind a lock.

mod generator;
mod model;
mod synthesizer;

pub use generator::{ForecastError, ForecastGenerator};
pub use model::{Forecaster, ForecasterError, LinearForecaster};
pub use synthesizer::{synthesize, SynthesisError, SynthesisRequest};
