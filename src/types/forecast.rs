//! Forecast covariate and output types

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Rule deciding which days carry the `is_month_end` regressor flag.
///
/// The fitted forecaster and the legacy batch forecaster were trained with
/// different definitions, so the rule is configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MonthEndRule {
    /// Only the last calendar day of the month
    CalendarLastDay,
    /// Every day whose day-of-month is strictly greater than `after_day`
    LateMonth {
        #[serde(default = "default_late_month_day")]
        after_day: u32,
    },
}

fn default_late_month_day() -> u32 {
    25
}

impl Default for MonthEndRule {
    fn default() -> Self {
        MonthEndRule::CalendarLastDay
    }
}

impl MonthEndRule {
    pub fn applies(&self, date: NaiveDate) -> bool {
        match self {
            MonthEndRule::CalendarLastDay => date
                .succ_opt()
                .map_or(true, |next| next.month() != date.month()),
            MonthEndRule::LateMonth { after_day } => date.day() > *after_day,
        }
    }
}

/// One synthesized regressor row for a future day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateRow {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_month_end: bool,
    /// Planned melt production (kg)
    pub production: f64,
    pub batch_count: f64,
    pub anomaly_intensity: f64,
}

/// Per-day regressor table handed to the forecaster, ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovariateFrame {
    pub rows: Vec<CovariateRow>,
}

impl CovariateFrame {
    pub fn new(rows: Vec<CovariateRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    pub fn total_production(&self) -> f64 {
        self.rows.iter().map(|r| r.production).sum()
    }
}

/// Forecaster output for one day: point estimate with confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    #[serde(rename = "yhat")]
    pub point_estimate: f64,
    #[serde(rename = "yhat_lower")]
    pub lower_bound: f64,
    #[serde(rename = "yhat_upper")]
    pub upper_bound: f64,
}

/// A forecast point joined with the covariates it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    #[serde(flatten)]
    pub point: ForecastPoint,
    pub anomaly_intensity: f64,
    pub is_month_end: bool,
}
