//! Furnace telemetry record types

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One per-minute reading from the melting furnace meter.
///
/// Records are immutable once loaded and ordered by `timestamp` inside the
/// [`TelemetryStore`](crate::telemetry::TelemetryStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Reading time (minute resolution)
    pub timestamp: NaiveDateTime,
    /// Batch identifier, when the export carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,

    // === Batch Timing ===
    /// Minutes into the current melting batch
    pub melting_batch_time: f64,
    /// Idle minutes between batches
    pub idle_batch_time: f64,

    // === Electrical ===
    /// Active power draw (kW)
    pub power_kw: f64,
    /// Power factor (0.0-1.0)
    pub power_factor: f64,

    // === Process ===
    /// Furnace bath temperature (°C)
    pub furnace_temperature: f64,
    /// 1 while a batch is melting, 0 otherwise
    pub batch_status: u8,

    // === Energy Meter ===
    /// Energy consumed during this minute (kWh)
    pub energy_reading_pm: f64,
    /// Cumulative meter reading (kWh)
    pub energy_reading_cumulative: f64,
}

impl TelemetryRecord {
    /// Calendar day of the reading.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Extract the classifier input subset.
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            melting_batch_time: self.melting_batch_time,
            idle_batch_time: self.idle_batch_time,
            power_kw: self.power_kw,
            power_factor: self.power_factor,
            furnace_temperature: self.furnace_temperature,
            batch_status: f64::from(self.batch_status),
            energy_reading_pm: self.energy_reading_pm,
            energy_reading_cumulative: self.energy_reading_cumulative,
        }
    }
}

/// Classifier input: exactly the eight model features, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub melting_batch_time: f64,
    pub idle_batch_time: f64,
    pub power_kw: f64,
    pub power_factor: f64,
    pub furnace_temperature: f64,
    pub batch_status: f64,
    pub energy_reading_pm: f64,
    pub energy_reading_cumulative: f64,
}

impl FeatureVector {
    /// Feature names in model column order.
    pub const NAMES: [&'static str; 8] = [
        "melting_batch_time",
        "idle_batch_time",
        "power_kw",
        "power_factor",
        "furnace_temperature",
        "batch_status",
        "energy_reading_pm",
        "energy_reading_cumm",
    ];

    /// Values in model column order.
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.melting_batch_time,
            self.idle_batch_time,
            self.power_kw,
            self.power_factor,
            self.furnace_temperature,
            self.batch_status,
            self.energy_reading_pm,
            self.energy_reading_cumulative,
        ]
    }
}

/// Day-level aggregate row (actual consumption plus measured anomaly intensity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Energy consumed that day (kWh)
    pub consumption: f64,
    pub anomaly_intensity: f64,
}

/// Per-batch consumption with anomaly tallies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub timestamp: NaiveDateTime,
    pub batch_id: String,
    /// Energy consumed by the batch (kWh)
    pub consumption: f64,
    pub power_spike: u32,
    pub power_drop: u32,
    pub high_pf: u32,
    pub low_pf: u32,
}

impl BatchRecord {
    /// Sum of all non-normal anomaly minutes in the batch.
    pub fn total_anomalies(&self) -> u32 {
        self.power_spike + self.power_drop + self.high_pf + self.low_pf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: NaiveDate::from_ymd_opt(2025, 5, 11)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            batch_id: None,
            melting_batch_time: 12.0,
            idle_batch_time: 0.0,
            power_kw: 380.0,
            power_factor: 0.86,
            furnace_temperature: 1450.0,
            batch_status: 1,
            energy_reading_pm: 6.3,
            energy_reading_cumulative: 1200.0,
        }
    }

    #[test]
    fn test_features_follow_model_order() {
        let f = sample().features();
        let values = f.as_array();
        assert_eq!(values[2], 380.0);
        assert_eq!(values[5], 1.0);
        assert_eq!(FeatureVector::NAMES[7], "energy_reading_cumm");
    }

    #[test]
    fn test_batch_total_anomalies() {
        let batch = BatchRecord {
            timestamp: sample().timestamp,
            batch_id: "B-1".to_string(),
            consumption: 24_000.0,
            power_spike: 3,
            power_drop: 1,
            high_pf: 0,
            low_pf: 2,
        };
        assert_eq!(batch.total_anomalies(), 6);
    }
}
