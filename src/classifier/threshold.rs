//! Rule-based classifier over the furnace operating bands
//!
//! Reproduces the labelling rules the trained model was fitted to. Bands are
//! only evaluated while a batch is actively melting; idle minutes and
//! minutes outside a batch are always normal.
//!
//! Priority order when several bands are violated:
//! power drop > power spike > low power factor > high power factor.

use crate::config::ClassifierThresholds;
use crate::types::{AnomalyLabel, FeatureVector};

use super::{check_finite, Classifier, ClassifierError};

/// Band classifier driven by [`ClassifierThresholds`].
#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    thresholds: ClassifierThresholds,
}

impl ThresholdClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    fn is_melting(features: &FeatureVector) -> bool {
        features.batch_status == 1.0 && features.melting_batch_time != 0.0
    }
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::default())
    }
}

impl Classifier for ThresholdClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<AnomalyLabel, ClassifierError> {
        check_finite(features)?;

        if !Self::is_melting(features) {
            return Ok(AnomalyLabel::Normal);
        }

        let t = &self.thresholds;
        let label = if features.power_kw < t.power_drop_kw {
            AnomalyLabel::PowerDrop
        } else if features.power_kw > t.power_spike_kw {
            AnomalyLabel::PowerSpike
        } else if features.power_factor < t.low_pf {
            AnomalyLabel::LowPf
        } else if features.power_factor > t.high_pf {
            AnomalyLabel::HighPf
        } else {
            AnomalyLabel::Normal
        };
        Ok(label)
    }

    fn name(&self) -> &str {
        "threshold-bands"
    }
}
