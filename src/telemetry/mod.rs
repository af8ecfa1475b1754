//! Telemetry Store
//!
//! Ordered, immutable-after-load sequence of per-minute furnace readings for
//! the archived window, plus the CSV loaders that fill it.
//!
//! # Usage
//!
//! ```ignore
//! use meltwatch::telemetry::{self, TelemetryStore};
//!
//! let store = TelemetryStore::new(telemetry::load_minute_csv("data/minute.csv")?);
//! let shift = store.active_day(date, start_time);
//! ```

mod csv;

pub use self::csv::{load_batch_csv, load_day_csv, load_minute_csv, LoadError};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::TelemetryRecord;

/// Time-ordered archive of telemetry records.
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    records: Vec<TelemetryRecord>,
}

impl TelemetryStore {
    /// Build the store, sorting by timestamp once. Ties keep file order.
    pub fn new(mut records: Vec<TelemetryRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Random access by position.
    pub fn get(&self, position: usize) -> Option<&TelemetryRecord> {
        self.records.get(position)
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// First and last timestamps, if any records exist.
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.records.first()?.timestamp, self.records.last()?.timestamp))
    }

    /// Records with `start <= timestamp <= end`.
    pub fn in_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[TelemetryRecord] {
        if start > end {
            return &[];
        }
        let lo = self.records.partition_point(|r| r.timestamp < start);
        let hi = self.records.partition_point(|r| r.timestamp <= end);
        &self.records[lo..hi]
    }

    /// The replayed shift: records on `date` at or after `from` time-of-day.
    pub fn active_day(&self, date: NaiveDate, from: NaiveTime) -> &[TelemetryRecord] {
        let start = date.and_time(from);
        let lo = self.records.partition_point(|r| r.timestamp < start);
        let hi = match date.succ_opt() {
            Some(next) => {
                let next_midnight = next.and_time(NaiveTime::MIN);
                self.records.partition_point(|r| r.timestamp < next_midnight)
            }
            None => self.records.len(),
        };
        &self.records[lo..hi.max(lo)]
    }
}

/// Number of places where consecutive records are more than one minute apart.
pub fn minute_gaps(records: &[TelemetryRecord]) -> usize {
    records
        .windows(2)
        .filter(|w| (w[1].timestamp - w[0].timestamp).num_minutes() > 1)
        .count()
}
