//! Forecast Pipeline Tests
//!
//! Config TOML -> covariate synthesis -> forecaster, end to end.

use chrono::{Datelike, NaiveDate, Weekday};
use meltwatch::config::PlantConfig;
use meltwatch::types::MonthEndRule;
use meltwatch::{synthesize, ForecastGenerator, LinearForecaster, SynthesisRequest};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_default_request_forecast() {
    let config = PlantConfig::default();
    let request = SynthesisRequest::from_defaults(&config.forecast_defaults);
    let frame = synthesize(&request, &config.synthesis).unwrap();

    assert_eq!(frame.len(), 15);
    assert!((frame.total_production() - 288_000.0).abs() < 1e-6);

    let generator = ForecastGenerator::new(Box::new(
        LinearForecaster::new(config.forecaster.clone()).unwrap(),
    ));
    let rows = generator.forecast_rows(&frame).unwrap();
    assert_eq!(rows.len(), frame.len());

    // Weekends plan half the production, so they forecast lower
    let weekday = rows.iter().find(|r| r.point.date.weekday() == Weekday::Wed).unwrap();
    let weekend = rows.iter().find(|r| r.point.date.weekday() == Weekday::Sun).unwrap();
    assert!(weekday.point.point_estimate > weekend.point.point_estimate);
}

#[test]
fn test_late_month_rule_from_toml() {
    let toml = r#"
[synthesis]
month_end = { rule = "late_month", after_day = 28 }
"#;
    let config = PlantConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.synthesis.month_end, MonthEndRule::LateMonth { after_day: 28 });

    let request = SynthesisRequest {
        start_date: day(2025, 5, 27),
        end_date: day(2025, 6, 2),
        target_total_production: 100_000.0,
        target_mean_anomaly_intensity: 3.0,
        seed: 1,
        month_end: None,
    };
    let frame = synthesize(&request, &config.synthesis).unwrap();
    let flagged: Vec<_> = frame
        .rows
        .iter()
        .filter(|r| r.is_month_end)
        .map(|r| r.date.day())
        .collect();
    assert_eq!(flagged, vec![29, 30, 31]);
}

#[test]
fn test_seeded_requests_are_reproducible_across_configs() {
    let a = PlantConfig::default();
    let b = PlantConfig::from_toml_str("[plant]\nname = \"Shop 3\"\n").unwrap();
    let request = SynthesisRequest::from_defaults(&a.forecast_defaults);

    let fa = synthesize(&request, &a.synthesis).unwrap();
    let fb = synthesize(&request, &b.synthesis).unwrap();
    assert_eq!(fa, fb);
}
