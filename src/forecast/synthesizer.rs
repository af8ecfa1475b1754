//! Regressor synthesis for future days
//!
//! Builds the per-day covariate frame the forecaster consumes from a date
//! range and two aggregate targets: total production over the range and mean
//! anomaly intensity. Production follows the weekday/weekend baseline scaled
//! to hit the target exactly; anomaly intensity is drawn from a seeded normal
//! distribution so identical requests produce identical frames.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{defaults, ForecastDefaults, SynthesisConfig};
use crate::types::{CovariateFrame, CovariateRow, MonthEndRule};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("range of {days} days exceeds the {max}-day forecast horizon")]
    RangeTooLong { days: i64, max: i64 },

    #[error("target production must be a positive finite number, got {0}")]
    NonPositiveProduction(f64),

    #[error("target anomaly intensity must be a non-negative finite number, got {0}")]
    NegativeIntensity(f64),

    #[error("baseline production over the range is zero; cannot scale to target")]
    DivisionByZero,

    #[error("anomaly intensity distribution rejected (mean {mean}, std {std_dev}): {reason}")]
    Distribution {
        mean: f64,
        std_dev: f64,
        reason: String,
    },
}

/// Inputs for one synthesized frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Production target summed over every day in the range (kg)
    pub target_total_production: f64,
    pub target_mean_anomaly_intensity: f64,
    pub seed: u64,
    /// Overrides the configured month-end rule for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_end: Option<MonthEndRule>,
}

impl SynthesisRequest {
    pub fn from_defaults(d: &ForecastDefaults) -> Self {
        Self {
            start_date: d.start_date,
            end_date: d.end_date,
            target_total_production: d.production,
            target_mean_anomaly_intensity: d.anomaly_intensity,
            seed: d.seed,
            month_end: None,
        }
    }

    pub fn validate(&self) -> Result<(), SynthesisError> {
        if self.start_date > self.end_date {
            return Err(SynthesisError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let days = (self.end_date - self.start_date).num_days() + 1;
        if days > defaults::MAX_FORECAST_DAYS {
            return Err(SynthesisError::RangeTooLong {
                days,
                max: defaults::MAX_FORECAST_DAYS,
            });
        }
        let p = self.target_total_production;
        if !(p.is_finite() && p > 0.0) {
            return Err(SynthesisError::NonPositiveProduction(p));
        }
        let a = self.target_mean_anomaly_intensity;
        if !(a.is_finite() && a >= 0.0) {
            return Err(SynthesisError::NegativeIntensity(a));
        }
        Ok(())
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Synthesize one covariate row per day in `[start_date, end_date]`.
pub fn synthesize(
    request: &SynthesisRequest,
    config: &SynthesisConfig,
) -> Result<CovariateFrame, SynthesisError> {
    request.validate()?;

    let rule = request.month_end.unwrap_or(config.month_end);
    let days: Vec<NaiveDate> = request
        .start_date
        .iter_days()
        .take_while(|d| *d <= request.end_date)
        .collect();

    let weekend_days = days.iter().filter(|d| is_weekend(**d)).count();
    let weekday_days = days.len() - weekend_days;
    let total_baseline = weekday_days as f64 * config.weekday_unit_production
        + weekend_days as f64 * config.weekend_unit_production;
    if total_baseline == 0.0 {
        return Err(SynthesisError::DivisionByZero);
    }
    let scaling_factor = request.target_total_production / total_baseline;

    let mean = request.target_mean_anomaly_intensity;
    let std_dev = config.noise_ratio * mean;
    let mut sampler = IntensitySampler::new(mean, std_dev, request.seed)?;

    let rows = days
        .into_iter()
        .map(|date| {
            let weekend = is_weekend(date);
            let unit = if weekend {
                config.weekend_unit_production
            } else {
                config.weekday_unit_production
            };
            let production = unit * scaling_factor;
            CovariateRow {
                date,
                is_weekend: weekend,
                is_month_end: rule.applies(date),
                production,
                batch_count: production / config.unit_batch_size,
                anomaly_intensity: sampler.sample(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        start = %request.start_date,
        end = %request.end_date,
        days = rows.len(),
        weekday_days,
        weekend_days,
        scaling_factor,
        seed = request.seed,
        "Covariates synthesized"
    );

    Ok(CovariateFrame::new(rows))
}

/// Seeded draw of non-negative anomaly intensities.
struct IntensitySampler {
    rng: StdRng,
    normal: Option<Normal<f64>>,
    mean: f64,
}

impl IntensitySampler {
    fn new(mean: f64, std_dev: f64, seed: u64) -> Result<Self, SynthesisError> {
        // A zero spread is a constant; Normal would still consume entropy
        let normal = if std_dev == 0.0 {
            None
        } else {
            Some(Normal::new(mean, std_dev).map_err(|e| SynthesisError::Distribution {
                mean,
                std_dev,
                reason: e.to_string(),
            })?)
        };
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
            mean,
        })
    }

    fn sample(&mut self) -> f64 {
        let v = match &self.normal {
            Some(n) => n.sample(&mut self.rng),
            None => self.mean,
        };
        if v > 0.0 {
            v
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(start: NaiveDate, end: NaiveDate, production: f64, intensity: f64) -> SynthesisRequest {
        SynthesisRequest {
            start_date: start,
            end_date: end,
            target_total_production: production,
            target_mean_anomaly_intensity: intensity,
            seed: 42,
            month_end: None,
        }
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let cfg = SynthesisConfig::default();
        let req = request(day(2025, 5, 12), day(2025, 5, 26), 288_000.0, 5.0);
        let a = synthesize(&req, &cfg).unwrap();
        let b = synthesize(&req, &cfg).unwrap();
        let bits = |f: &CovariateFrame| {
            f.rows
                .iter()
                .map(|r| r.anomaly_intensity.to_bits())
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&a), bits(&b));

        let other = synthesize(&SynthesisRequest { seed: 7, ..req }, &cfg).unwrap();
        assert_ne!(bits(&a), bits(&other));
    }

    #[test]
    fn test_parallel_calls_match_sequential() {
        let cfg = SynthesisConfig::default();
        let seeded = |seed| SynthesisRequest {
            seed,
            ..request(day(2025, 5, 12), day(2025, 6, 10), 360_000.0, 4.0)
        };
        let sequential: Vec<_> = (0..8u64).map(|s| synthesize(&seeded(s), &cfg).unwrap()).collect();

        let parallel: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8u64)
                .map(|s| {
                    let (req, cfg) = (seeded(s), &cfg);
                    scope.spawn(move || synthesize(&req, cfg).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_production_sums_to_target() {
        let cfg = SynthesisConfig::default();
        let req = request(day(2025, 5, 12), day(2025, 5, 26), 288_000.0, 5.0);
        let frame = synthesize(&req, &cfg).unwrap();
        assert_eq!(frame.len(), 15);
        assert!((frame.total_production() - 288_000.0).abs() < 1e-6);
        for r in &frame.rows {
            assert!((r.batch_count - r.production / 1_000.0).abs() < 1e-9);
            assert!(r.anomaly_intensity >= 0.0);
        }
    }

    #[test]
    fn test_rows_are_contiguous_and_ascending() {
        let cfg = SynthesisConfig::default();
        let frame = synthesize(&request(day(2025, 5, 28), day(2025, 6, 3), 100_000.0, 2.0), &cfg).unwrap();
        let dates: Vec<_> = frame.dates().collect();
        for pair in dates.windows(2) {
            assert_eq!(pair[0].succ_opt(), Some(pair[1]));
        }
        let month_end: Vec<_> = frame.rows.iter().filter(|r| r.is_month_end).map(|r| r.date).collect();
        assert_eq!(month_end, vec![day(2025, 5, 31)]);
    }

    #[test]
    fn test_single_weekday_has_unit_scaling() {
        let cfg = SynthesisConfig::default();
        // 2025-05-12 is a Monday
        let frame = synthesize(&request(day(2025, 5, 12), day(2025, 5, 12), 24_000.0, 5.0), &cfg).unwrap();
        assert_eq!(frame.len(), 1);
        assert!((frame.rows[0].production - 24_000.0).abs() < 1e-9);
        assert!((frame.rows[0].batch_count - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekday_exceeds_weekend_and_zero_intensity_stays_zero() {
        let cfg = SynthesisConfig::default();
        // Friday then Saturday
        let frame = synthesize(&request(day(2025, 5, 2), day(2025, 5, 3), 36_000.0, 0.0), &cfg).unwrap();
        let (fri, sat) = (&frame.rows[0], &frame.rows[1]);
        assert!(!fri.is_weekend);
        assert!(sat.is_weekend);
        assert!(fri.production > sat.production);
        assert!((fri.production - 24_000.0).abs() < 1e-9);
        assert!((sat.production - 12_000.0).abs() < 1e-9);
        assert_eq!(fri.anomaly_intensity, 0.0);
        assert_eq!(sat.anomaly_intensity, 0.0);
    }

    #[test]
    fn test_two_weekdays_split_evenly() {
        let cfg = SynthesisConfig::default();
        // 2025-05-01 and 2025-05-02 are Thursday and Friday
        let frame = synthesize(&request(day(2025, 5, 1), day(2025, 5, 2), 36_000.0, 0.0), &cfg).unwrap();
        assert!(frame.rows.iter().all(|r| !r.is_weekend));
        assert!((frame.rows[0].production - 18_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_month_end_override() {
        let cfg = SynthesisConfig::default();
        let mut req = request(day(2025, 5, 25), day(2025, 5, 27), 50_000.0, 1.0);
        req.month_end = Some(MonthEndRule::LateMonth { after_day: 25 });
        let flags: Vec<_> = synthesize(&req, &cfg)
            .unwrap()
            .rows
            .iter()
            .map(|r| r.is_month_end)
            .collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_input_errors() {
        let cfg = SynthesisConfig::default();
        assert!(matches!(
            synthesize(&request(day(2025, 5, 3), day(2025, 5, 2), 1.0, 0.0), &cfg),
            Err(SynthesisError::InvalidRange { .. })
        ));
        assert!(matches!(
            synthesize(&request(day(2025, 5, 2), day(2025, 5, 3), 0.0, 0.0), &cfg),
            Err(SynthesisError::NonPositiveProduction(_))
        ));
        assert!(matches!(
            synthesize(&request(day(2025, 5, 2), day(2025, 5, 3), 1.0, -0.5), &cfg),
            Err(SynthesisError::NegativeIntensity(_))
        ));
        assert!(matches!(
            synthesize(&request(day(2025, 1, 1), day(2027, 1, 1), 1.0, 0.0), &cfg),
            Err(SynthesisError::RangeTooLong { .. })
        ));
    }

    #[test]
    fn test_zero_baseline_is_division_by_zero() {
        let cfg = SynthesisConfig {
            weekend_unit_production: 0.0,
            ..SynthesisConfig::default()
        };
        // Saturday and Sunday only
        let err = synthesize(&request(day(2025, 5, 3), day(2025, 5, 4), 10_000.0, 1.0), &cfg).unwrap_err();
        assert_eq!(err, SynthesisError::DivisionByZero);
    }
}
