//! Anomaly Classifier contract
//!
//! The stream cursor treats the classifier as an opaque, already-fitted
//! predictor: one [`FeatureVector`] in, one [`AnomalyLabel`] out. Any model
//! that satisfies [`Classifier`] can be plugged in at startup.
//!
//! - `threshold`: rule-based classifier over the commissioned operating bands

mod threshold;

pub use threshold::ThresholdClassifier;

use thiserror::Error;

use crate::types::{AnomalyLabel, FeatureVector};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("feature '{feature}' is not a finite number ({value})")]
    NonFiniteFeature { feature: &'static str, value: f64 },

    #[error("model inference failed: {0}")]
    Inference(String),
}

// ============================================================================
// Classifier Trait
// ============================================================================

/// A fitted per-record anomaly predictor.
///
/// Called under the stream cursor's lock, so implementations only need `Send`.
pub trait Classifier: Send {
    /// Assign exactly one label to a record's feature subset.
    fn classify(&self, features: &FeatureVector) -> Result<AnomalyLabel, ClassifierError>;

    /// Human-readable model name for logging.
    fn name(&self) -> &str;
}

/// Reject NaN/Inf inputs before they reach a model.
pub fn check_finite(features: &FeatureVector) -> Result<(), ClassifierError> {
    FeatureVector::NAMES
        .iter()
        .zip(features.as_array())
        .find(|(_, v)| !v.is_finite())
        .map_or(Ok(()), |(name, value)| {
            Err(ClassifierError::NonFiniteFeature { feature: *name, value })
        })
}
