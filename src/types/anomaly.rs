//! Anomaly labels, prescriptions and per-label counters

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Operating-anomaly category assigned to a single telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLabel {
    #[default]
    Normal,
    /// Power draw above the spike threshold
    PowerSpike,
    /// Power draw below the drop threshold
    PowerDrop,
    /// Power factor overcompensated
    HighPf,
    /// Power factor below the efficiency floor
    LowPf,
}

impl AnomalyLabel {
    /// Every label, in declaration order.
    pub const ALL: [AnomalyLabel; 5] = [
        AnomalyLabel::Normal,
        AnomalyLabel::PowerSpike,
        AnomalyLabel::PowerDrop,
        AnomalyLabel::HighPf,
        AnomalyLabel::LowPf,
    ];

    /// Wire name used by the classifier artifacts and the dashboard.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyLabel::Normal => "normal",
            AnomalyLabel::PowerSpike => "power_spike",
            AnomalyLabel::PowerDrop => "power_drop",
            AnomalyLabel::HighPf => "high_pf",
            AnomalyLabel::LowPf => "low_pf",
        }
    }

    pub fn is_anomaly(&self) -> bool {
        !matches!(self, AnomalyLabel::Normal)
    }

    fn index(self) -> usize {
        match self {
            AnomalyLabel::Normal => 0,
            AnomalyLabel::PowerSpike => 1,
            AnomalyLabel::PowerDrop => 2,
            AnomalyLabel::HighPf => 3,
            AnomalyLabel::LowPf => 4,
        }
    }
}

impl std::fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A label string that is not part of the closed [`AnomalyLabel`] set.
///
/// Indicates drift between the classifier's label encoder and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown anomaly label '{0}'")]
pub struct UnknownLabelError(pub String);

impl FromStr for AnomalyLabel {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnomalyLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabelError(s.to_string()))
    }
}

/// Operator guidance attached to an anomaly label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prescription {
    pub possible_reason: &'static str,
    pub cause: &'static str,
    pub solution: &'static str,
}

/// Cumulative classification counts, one slot per label.
///
/// Serializes as a map containing every label, including unseen ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts([u64; 5]);

impl LabelCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, label: AnomalyLabel) {
        self.0[label.index()] += 1;
    }

    pub fn get(&self, label: AnomalyLabel) -> u64 {
        self.0[label.index()]
    }

    /// Total records counted across all labels.
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Records counted under any non-normal label.
    pub fn anomalies(&self) -> u64 {
        self.total() - self.get(AnomalyLabel::Normal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnomalyLabel, u64)> + '_ {
        AnomalyLabel::ALL.iter().map(|label| (*label, self.get(*label)))
    }
}

impl Serialize for LabelCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(AnomalyLabel::ALL.len()))?;
        for (label, count) in self.iter() {
            map.serialize_entry(label.as_str(), &count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trips_through_text() {
        for label in AnomalyLabel::ALL {
            assert_eq!(label.as_str().parse::<AnomalyLabel>().unwrap(), label);
        }
        assert_eq!(" POWER_SPIKE ".parse::<AnomalyLabel>().unwrap(), AnomalyLabel::PowerSpike);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = "voltage_sag".parse::<AnomalyLabel>().unwrap_err();
        assert_eq!(err, UnknownLabelError("voltage_sag".to_string()));
        assert!(err.to_string().contains("voltage_sag"));
    }

    #[test]
    fn test_label_serde_is_snake_case() {
        let json = serde_json::to_string(&AnomalyLabel::HighPf).unwrap();
        assert_eq!(json, "\"high_pf\"");
    }

    #[test]
    fn test_counts_report_every_label() {
        let mut counts = LabelCounts::new();
        counts.increment(AnomalyLabel::LowPf);
        counts.increment(AnomalyLabel::LowPf);
        counts.increment(AnomalyLabel::Normal);

        assert_eq!(counts.total(), 3);
        assert_eq!(counts.anomalies(), 2);

        let v = serde_json::to_value(counts).unwrap();
        assert_eq!(v["low_pf"], 2);
        assert_eq!(v["power_spike"], 0);
        assert_eq!(v.as_object().unwrap().len(), 5);
    }
}
