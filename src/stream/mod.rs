//! Stream Cursor
//!
//! Replays the active day's telemetry one record per call, classifying each
//! record and keeping cumulative label counts, a bounded trailing window and
//! the running energy total. The cursor is process-wide state: every caller
//! shares one instance through [`StreamHandle`], which serialises `advance`.
//!
//! ```text
//! Idle ──advance──▶ Streaming ──advance (last record)──▶ Exhausted ⟲
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::classifier::{Classifier, ClassifierError};
use crate::prescription;
use crate::telemetry;
use crate::types::{AnomalyLabel, LabelCounts, Prescription, TelemetryRecord};

/// Lifecycle state derived from the cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// Nothing classified yet
    Idle,
    Streaming,
    /// Every record consumed (terminal). An empty active day starts here.
    Exhausted,
}

/// One classified record retained in the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowEntry {
    pub timestamp: NaiveDateTime,
    pub power_kw: f64,
    pub power_factor: f64,
    /// Label computed when the record was classified
    pub label: AnomalyLabel,
}

/// Result of one successful advance.
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceResult {
    /// Records consumed so far, including this one
    pub position: usize,
    pub timestamp: NaiveDateTime,
    pub label: AnomalyLabel,
    pub prescription: Prescription,
    /// Oldest to newest
    pub window: Vec<WindowEntry>,
    pub counts: LabelCounts,
    /// Sum of `energy_reading_pm` over every record classified so far (kWh)
    pub total_consumption: f64,
}

/// Read-only view of the cursor, also returned once the stream is exhausted.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSnapshot {
    pub phase: StreamPhase,
    pub position: usize,
    pub total_records: usize,
    pub counts: LabelCounts,
    pub window: Vec<WindowEntry>,
    pub total_consumption: f64,
    pub last_timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    Advanced(AdvanceResult),
    /// No record left to classify; nothing was mutated
    EndOfStream(StreamSnapshot),
}

#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("classification failed at position {position} ({timestamp}): {source}")]
    Classification {
        position: usize,
        timestamp: NaiveDateTime,
        #[source]
        source: ClassifierError,
    },
}

/// The replay cursor over one active day.
pub struct StreamCursor {
    records: Vec<TelemetryRecord>,
    classifier: Box<dyn Classifier>,
    position: usize,
    counts: LabelCounts,
    window: VecDeque<WindowEntry>,
    window_size: usize,
    total_consumption: f64,
}

impl std::fmt::Debug for StreamCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCursor")
            .field("classifier", &self.classifier.name())
            .field("position", &self.position)
            .field("records", &self.records.len())
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

impl StreamCursor {
    /// Create a cursor at position 0. `records` must already be time-ordered.
    ///
    /// A `window_size` of 0 is treated as 1 so the newest record is always visible.
    pub fn new(
        records: Vec<TelemetryRecord>,
        classifier: Box<dyn Classifier>,
        window_size: usize,
    ) -> Self {
        let window_size = window_size.max(1);
        let gaps = telemetry::minute_gaps(&records);
        if records.is_empty() {
            tracing::warn!("Active day has no records; stream starts exhausted");
        } else {
            tracing::info!(
                records = records.len(),
                gaps,
                classifier = classifier.name(),
                window_size,
                "Stream cursor ready"
            );
        }

        Self {
            records,
            classifier,
            position: 0,
            counts: LabelCounts::new(),
            window: VecDeque::with_capacity(window_size),
            window_size,
            total_consumption: 0.0,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        if self.position >= self.records.len() {
            StreamPhase::Exhausted
        } else if self.position == 0 {
            StreamPhase::Idle
        } else {
            StreamPhase::Streaming
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Classify the next record and fold it into the running state.
    ///
    /// On a classifier failure nothing is mutated, so the same record is
    /// attempted again by the next call.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, StreamError> {
        let Some(record) = self.records.get(self.position) else {
            return Ok(AdvanceOutcome::EndOfStream(self.snapshot()));
        };

        let label = self
            .classifier
            .classify(&record.features())
            .map_err(|source| StreamError::Classification {
                position: self.position,
                timestamp: record.timestamp,
                source,
            })?;

        let entry = WindowEntry {
            timestamp: record.timestamp,
            power_kw: record.power_kw,
            power_factor: record.power_factor,
            label,
        };
        let timestamp = record.timestamp;
        self.total_consumption += record.energy_reading_pm;
        self.counts.increment(label);
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(entry);
        self.position += 1;

        if label.is_anomaly() {
            tracing::debug!(position = self.position, %timestamp, %label, "Anomaly classified");
        }
        if self.position == self.records.len() {
            tracing::info!(
                records = self.position,
                anomalies = self.counts.anomalies(),
                total_consumption = self.total_consumption,
                "Active day fully replayed"
            );
        }

        Ok(AdvanceOutcome::Advanced(AdvanceResult {
            position: self.position,
            timestamp,
            label,
            prescription: prescription::resolve(label),
            window: self.window.iter().cloned().collect(),
            counts: self.counts,
            total_consumption: self.total_consumption,
        }))
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            phase: self.phase(),
            position: self.position,
            total_records: self.records.len(),
            counts: self.counts,
            window: self.window.iter().cloned().collect(),
            total_consumption: self.total_consumption,
            last_timestamp: self.window.back().map(|e| e.timestamp),
        }
    }
}

/// Shared, cloneable access to the process-wide cursor.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    inner: Arc<Mutex<StreamCursor>>,
}

impl StreamHandle {
    pub fn new(cursor: StreamCursor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cursor)),
        }
    }

    /// Advance under the cursor lock; at most one advance runs at a time.
    pub async fn advance(&self) -> Result<AdvanceOutcome, StreamError> {
        self.inner.lock().await.advance()
    }

    pub async fn snapshot(&self) -> StreamSnapshot {
        self.inner.lock().await.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ThresholdClassifier;
    use crate::types::FeatureVector;
    use chrono::{Duration, NaiveDate};

    fn records(power: &[f64]) -> Vec<TelemetryRecord> {
        let start = NaiveDate::from_ymd_opt(2025, 5, 11)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        power
            .iter()
            .enumerate()
            .map(|(i, kw)| TelemetryRecord {
                timestamp: start + Duration::minutes(i as i64),
                batch_id: None,
                melting_batch_time: (i + 1) as f64,
                idle_batch_time: 0.0,
                power_kw: *kw,
                power_factor: 0.85,
                furnace_temperature: 1_450.0,
                batch_status: 1,
                energy_reading_pm: 6.0,
                energy_reading_cumulative: 6.0 * (i + 1) as f64,
            })
            .collect()
    }

    fn cursor(power: &[f64]) -> StreamCursor {
        StreamCursor::new(records(power), Box::new(ThresholdClassifier::default()), 15)
    }

    fn advanced(outcome: AdvanceOutcome) -> AdvanceResult {
        match outcome {
            AdvanceOutcome::Advanced(r) => r,
            AdvanceOutcome::EndOfStream(_) => panic!("unexpected end of stream"),
        }
    }

    /// Fails on any record whose power equals `poison_kw`.
    struct FailingClassifier {
        poison_kw: f64,
    }

    impl Classifier for FailingClassifier {
        fn classify(&self, features: &FeatureVector) -> Result<AnomalyLabel, ClassifierError> {
            if features.power_kw == self.poison_kw {
                Err(ClassifierError::Inference("model rejected input".to_string()))
            } else {
                Ok(AnomalyLabel::Normal)
            }
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_twenty_normal_records_then_end_of_stream() {
        let mut c = cursor(&[380.0; 20]);
        assert_eq!(c.phase(), StreamPhase::Idle);

        for i in 1..=20 {
            let r = advanced(c.advance().unwrap());
            assert_eq!(r.label, AnomalyLabel::Normal);
            assert_eq!(r.position, i);
            assert_eq!(r.prescription, prescription::resolve(AnomalyLabel::Normal));
        }
        assert_eq!(c.snapshot().counts.get(AnomalyLabel::Normal), 20);

        match c.advance().unwrap() {
            AdvanceOutcome::EndOfStream(s) => {
                assert_eq!(s.phase, StreamPhase::Exhausted);
                assert_eq!(s.counts.total(), 20);
            }
            AdvanceOutcome::Advanced(_) => panic!("expected end of stream"),
        }
    }

    #[test]
    fn test_counts_equal_position() {
        let mut c = cursor(&[380.0, 420.0, 300.0, 380.0, 401.0]);
        while let AdvanceOutcome::Advanced(r) = c.advance().unwrap() {
            assert_eq!(r.counts.total() as usize, r.position);
            assert_eq!(r.position, c.position());
        }
        let s = c.snapshot();
        assert_eq!(s.counts.get(AnomalyLabel::PowerSpike), 2);
        assert_eq!(s.counts.get(AnomalyLabel::PowerDrop), 1);
    }

    #[test]
    fn test_exhausted_is_idempotent() {
        let mut c = cursor(&[380.0; 3]);
        while let AdvanceOutcome::Advanced(_) = c.advance().unwrap() {}
        let before = c.snapshot();
        for _ in 0..5 {
            assert!(matches!(c.advance().unwrap(), AdvanceOutcome::EndOfStream(_)));
        }
        let after = c.snapshot();
        assert_eq!(before.position, after.position);
        assert_eq!(before.counts, after.counts);
        assert_eq!(before.total_consumption, after.total_consumption);
    }

    #[test]
    fn test_window_is_bounded_and_chronological() {
        let power: Vec<f64> = (0..40).map(|i| if i % 7 == 0 { 420.0 } else { 380.0 }).collect();
        let all = records(&power);
        let mut c = cursor(&power);

        for step in 1..=40usize {
            let r = advanced(c.advance().unwrap());
            assert_eq!(r.window.len(), step.min(15));
            let expected: Vec<_> = all[step.saturating_sub(15)..step]
                .iter()
                .map(|rec| rec.timestamp)
                .collect();
            let got: Vec<_> = r.window.iter().map(|e| e.timestamp).collect();
            assert_eq!(got, expected);
            assert_eq!(r.window.last().map(|e| e.label), Some(r.label));
        }
    }

    #[test]
    fn test_window_keeps_true_labels() {
        let mut c = cursor(&[420.0, 380.0, 300.0]);
        let mut last = None;
        while let AdvanceOutcome::Advanced(r) = c.advance().unwrap() {
            last = Some(r);
        }
        let labels: Vec<_> = last.unwrap().window.iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![AnomalyLabel::PowerSpike, AnomalyLabel::Normal, AnomalyLabel::PowerDrop]
        );
    }

    #[test]
    fn test_running_consumption() {
        let mut c = cursor(&[380.0; 4]);
        advanced(c.advance().unwrap());
        let r = advanced(c.advance().unwrap());
        assert!((r.total_consumption - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_day_is_end_of_stream() {
        let mut c = cursor(&[]);
        assert_eq!(c.phase(), StreamPhase::Exhausted);
        assert!(matches!(c.advance().unwrap(), AdvanceOutcome::EndOfStream(_)));
    }

    #[test]
    fn test_classification_error_does_not_advance() {
        let mut c = StreamCursor::new(
            records(&[380.0, 999.0, 380.0]),
            Box::new(FailingClassifier { poison_kw: 999.0 }),
            15,
        );
        advanced(c.advance().unwrap());

        let err = c.advance().unwrap_err();
        let StreamError::Classification { position, .. } = err;
        assert_eq!(position, 1);
        assert_eq!(c.position(), 1);
        assert_eq!(c.snapshot().counts.total(), 1);
        assert_eq!(c.phase(), StreamPhase::Streaming);
    }

    #[tokio::test]
    async fn test_concurrent_advances_never_skip_or_duplicate() {
        let handle = StreamHandle::new(cursor(&[380.0; 64]));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let h = handle.clone();
            tasks.spawn(async move {
                let mut positions = Vec::new();
                while let AdvanceOutcome::Advanced(r) = h.advance().await.unwrap() {
                    positions.push(r.position);
                    tokio::task::yield_now().await;
                }
                positions
            });
        }

        let mut all = Vec::new();
        while let Some(res) = tasks.join_next().await {
            all.extend(res.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (1..=64).collect::<Vec<_>>());

        let s = handle.snapshot().await;
        assert_eq!(s.position, 64);
        assert_eq!(s.counts.total(), 64);
    }
}
