//! Aggregation Views
//!
//! Stateless read-only rollups for the history dashboard: minute energy
//! summed by calendar month and ISO-8601 week, the day-level export passed
//! through in date order, and the per-batch summary for a single day.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::telemetry::TelemetryStore;
use crate::types::{BatchRecord, DailyRecord};

/// Energy summed over one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionBucket {
    /// Sortable key, e.g. `2025-05` or `2025-W19`
    pub bucket: String,
    /// Display label, e.g. `May 2025` or `Week 19, May`
    pub label: String,
    /// kWh
    pub consumption: f64,
}

/// One batch in the per-day batch view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub timestamp: chrono::NaiveDateTime,
    pub consumption: f64,
    pub total_anomalies: u32,
}

/// All three history rollups together.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub monthly: Vec<ConsumptionBucket>,
    pub weekly: Vec<ConsumptionBucket>,
    pub daily: Vec<DailyRecord>,
}

impl HistoryView {
    pub fn build(store: &TelemetryStore, days: &[DailyRecord]) -> Self {
        Self {
            monthly: monthly_rollup(store),
            weekly: weekly_rollup(store),
            daily: daily_rollup(days),
        }
    }
}

/// Sum `energy_reading_pm` per calendar month.
pub fn monthly_rollup(store: &TelemetryStore) -> Vec<ConsumptionBucket> {
    let mut sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for r in store.records() {
        *sums.entry((r.timestamp.year(), r.timestamp.month())).or_default() += r.energy_reading_pm;
    }

    sums.into_iter()
        .filter_map(|((year, month), consumption)| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(ConsumptionBucket {
                bucket: first.format("%Y-%m").to_string(),
                label: first.format("%B %Y").to_string(),
                consumption,
            })
        })
        .collect()
}

/// Sum `energy_reading_pm` per ISO-8601 week (Monday start, ISO week-year).
///
/// The label month is the month of the week's Monday.
pub fn weekly_rollup(store: &TelemetryStore) -> Vec<ConsumptionBucket> {
    let mut sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for r in store.records() {
        let week = r.timestamp.date().iso_week();
        *sums.entry((week.year(), week.week())).or_default() += r.energy_reading_pm;
    }

    sums.into_iter()
        .filter_map(|((year, week), consumption)| {
            let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
            Some(ConsumptionBucket {
                bucket: format!("{year:04}-W{week:02}"),
                label: format!("Week {week:02}, {}", monday.format("%b")),
                consumption,
            })
        })
        .collect()
}

/// Day-level records in ascending date order.
pub fn daily_rollup(days: &[DailyRecord]) -> Vec<DailyRecord> {
    let mut out = days.to_vec();
    out.sort_by_key(|d| d.date);
    out
}

/// Batches recorded on `date`, ordered by batch id.
pub fn batch_summary(batches: &[BatchRecord], date: NaiveDate) -> Vec<BatchSummary> {
    let mut out: Vec<BatchSummary> = batches
        .iter()
        .filter(|b| b.timestamp.date() == date)
        .map(|b| BatchSummary {
            batch_id: b.batch_id.clone(),
            timestamp: b.timestamp,
            consumption: b.consumption,
            total_anomalies: b.total_anomalies(),
        })
        .collect();
    out.sort_by(|a, b| compare_batch_ids(&a.batch_id, &b.batch_id));
    out
}

/// Integer ids in numeric order, ahead of any non-numeric ids, which sort lexically.
fn compare_batch_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetryRecord;
    use chrono::NaiveDateTime;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn rec(at: NaiveDateTime, energy: f64) -> TelemetryRecord {
        TelemetryRecord {
            timestamp: at,
            batch_id: None,
            melting_batch_time: 0.0,
            idle_batch_time: 0.0,
            power_kw: 0.0,
            power_factor: 0.0,
            furnace_temperature: 0.0,
            batch_status: 0,
            energy_reading_pm: energy,
            energy_reading_cumulative: 0.0,
        }
    }

    fn store() -> TelemetryStore {
        TelemetryStore::new(vec![
            rec(ts(2025, 4, 30), 1.0),
            rec(ts(2025, 5, 4), 2.0),
            rec(ts(2025, 5, 5), 4.0),
            rec(ts(2025, 5, 11), 8.0),
            rec(ts(2024, 12, 30), 16.0),
        ])
    }

    #[test]
    fn test_monthly_rollup() {
        let m = monthly_rollup(&store());
        let keys: Vec<_> = m.iter().map(|b| b.bucket.as_str()).collect();
        assert_eq!(keys, vec!["2024-12", "2025-04", "2025-05"]);
        assert_eq!(m[2].label, "May 2025");
        assert_eq!(m[2].consumption, 14.0);
    }

    #[test]
    fn test_weekly_rollup_uses_iso_weeks() {
        let w = weekly_rollup(&store());
        let keys: Vec<_> = w.iter().map(|b| b.bucket.as_str()).collect();
        // 2024-12-30 is the Monday of ISO week 1 of 2025
        assert_eq!(keys, vec!["2025-W01", "2025-W18", "2025-W19"]);
        assert_eq!(w[0].label, "Week 01, Dec");
        // Wed 30 Apr and Sun 4 May share ISO week 18, whose Monday is in April
        assert_eq!(w[1].consumption, 3.0);
        assert_eq!(w[1].label, "Week 18, Apr");
        assert_eq!(w[2].consumption, 12.0);
    }

    #[test]
    fn test_rollups_preserve_total() {
        let s = store();
        let total: f64 = s.records().iter().map(|r| r.energy_reading_pm).sum();
        let monthly: f64 = monthly_rollup(&s).iter().map(|b| b.consumption).sum();
        let weekly: f64 = weekly_rollup(&s).iter().map(|b| b.consumption).sum();
        assert_eq!(total, monthly);
        assert_eq!(total, weekly);
    }

    #[test]
    fn test_daily_rollup_sorted() {
        let d = |day| DailyRecord {
            date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            consumption: f64::from(day),
            anomaly_intensity: 0.0,
        };
        let out = daily_rollup(&[d(3), d(1), d(2)]);
        assert!(out.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_batch_summary_filters_and_sorts() {
        let b = |id: &str, day, spikes| BatchRecord {
            timestamp: ts(2025, 5, day),
            batch_id: id.to_string(),
            consumption: 600.0,
            power_spike: spikes,
            power_drop: 1,
            high_pf: 0,
            low_pf: 1,
        };
        let batches = vec![b("B-3", 11, 0), b("B-1", 11, 2), b("B-2", 12, 0)];
        let out = batch_summary(&batches, NaiveDate::from_ymd_opt(2025, 5, 11).unwrap());
        let ids: Vec<_> = out.iter().map(|s| s.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["B-1", "B-3"]);
        assert_eq!(out[0].total_anomalies, 4);
        assert!(batch_summary(&batches, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).is_empty());
    }

    #[test]
    fn test_batch_summary_orders_numeric_ids_numerically() {
        let b = |id: &str| BatchRecord {
            timestamp: ts(2025, 5, 10),
            batch_id: id.to_string(),
            consumption: 580.0,
            power_spike: 0,
            power_drop: 0,
            high_pf: 0,
            low_pf: 0,
        };
        let batches = vec![b("10"), b("B-7"), b("2"), b("11"), b("1")];
        let out = batch_summary(&batches, NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
        let ids: Vec<_> = out.iter().map(|s| s.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10", "11", "B-7"]);
    }
}
