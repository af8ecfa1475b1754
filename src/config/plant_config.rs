//! Plant Configuration - every tunable constant as an operator-editable TOML value
//!
//! Each struct implements `Default` with the values the monitoring service was
//! commissioned with, so the service behaves identically when no file exists.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::types::MonthEndRule;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one melting shop deployment.
///
/// Load with `PlantConfig::load()` which searches:
/// 1. `$MELTWATCH_CONFIG` env var
/// 2. `./meltwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantConfig {
    /// Plant identification
    #[serde(default)]
    pub plant: PlantInfo,

    /// Archived telemetry locations
    #[serde(default)]
    pub data: DataConfig,

    /// Live replay cursor settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Anomaly band thresholds
    #[serde(default)]
    pub classifier: ClassifierThresholds,

    /// Future regressor synthesis
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Fitted consumption regression
    #[serde(default)]
    pub forecaster: LinearModelConfig,

    /// Defaults applied to forecast requests that omit fields
    #[serde(default)]
    pub forecast_defaults: ForecastDefaults,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl PlantConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MELTWATCH_CONFIG` environment variable
    /// 2. `./meltwatch.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), plant = %config.plant.name, "Loaded plant config from MELTWATCH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from MELTWATCH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "MELTWATCH_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(plant = %config.plant.name, "Loaded plant config from ./meltwatch.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./meltwatch.toml, using defaults");
                }
            }
        }

        info!("No meltwatch.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings, never as errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Every violation is collected so operators see the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let c = &self.classifier;
        if c.power_drop_kw >= c.power_spike_kw {
            errors.push(format!(
                "classifier.power_drop_kw ({:.1}) must be less than power_spike_kw ({:.1})",
                c.power_drop_kw, c.power_spike_kw
            ));
        }
        if c.low_pf >= c.high_pf {
            errors.push(format!(
                "classifier.low_pf ({:.2}) must be less than high_pf ({:.2})",
                c.low_pf, c.high_pf
            ));
        }

        if self.stream.window_size == 0 {
            errors.push("stream.window_size must be > 0".to_string());
        }

        let s = &self.synthesis;
        if s.weekday_unit_production < 0.0 || s.weekend_unit_production < 0.0 {
            errors.push("synthesis unit production values cannot be negative".to_string());
        }
        if s.unit_batch_size <= 0.0 {
            errors.push(format!(
                "synthesis.unit_batch_size = {:.1} must be > 0 (used as divisor)",
                s.unit_batch_size
            ));
        }
        if s.noise_ratio < 0.0 {
            errors.push("synthesis.noise_ratio cannot be negative".to_string());
        }
        if let MonthEndRule::LateMonth { after_day } = s.month_end {
            if after_day == 0 || after_day > 30 {
                errors.push(format!(
                    "synthesis.month_end.after_day = {after_day} must be within 1-30"
                ));
            }
        }

        let f = &self.forecaster;
        if f.residual_std < 0.0 {
            errors.push("forecaster.residual_std cannot be negative".to_string());
        }
        if !(f.interval_width > 0.0 && f.interval_width < 1.0) {
            errors.push(format!(
                "forecaster.interval_width = {:.3} must be strictly between 0 and 1",
                f.interval_width
            ));
        }

        let d = &self.forecast_defaults;
        if d.start_date > d.end_date {
            errors.push(format!(
                "forecast_defaults.start_date ({}) is after end_date ({})",
                d.start_date, d.end_date
            ));
        }
        let horizon = (d.end_date - d.start_date).num_days() + 1;
        if horizon > defaults::MAX_FORECAST_DAYS {
            errors.push(format!(
                "forecast_defaults range of {horizon} days exceeds {} days",
                defaults::MAX_FORECAST_DAYS
            ));
        }
        if d.production <= 0.0 {
            errors.push("forecast_defaults.production must be > 0".to_string());
        }
        if d.anomaly_intensity < 0.0 {
            errors.push("forecast_defaults.anomaly_intensity cannot be negative".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // NaN comparisons silently pass the checks above
        let non_finite: Vec<&str> = self
            .numeric_fields()
            .into_iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, _)| name)
            .collect();
        if !non_finite.is_empty() {
            errors.push(format!(
                "Config contains NaN or Inf values ({}); all numbers must be finite",
                non_finite.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

impl PlantConfig {
    fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        let c = &self.classifier;
        let s = &self.synthesis;
        let f = &self.forecaster;
        let d = &self.forecast_defaults;
        vec![
            ("classifier.power_drop_kw", c.power_drop_kw),
            ("classifier.power_spike_kw", c.power_spike_kw),
            ("classifier.low_pf", c.low_pf),
            ("classifier.high_pf", c.high_pf),
            ("synthesis.weekday_unit_production", s.weekday_unit_production),
            ("synthesis.weekend_unit_production", s.weekend_unit_production),
            ("synthesis.unit_batch_size", s.unit_batch_size),
            ("synthesis.noise_ratio", s.noise_ratio),
            ("forecaster.intercept", f.intercept),
            ("forecaster.production", f.production),
            ("forecaster.anomaly_intensity", f.anomaly_intensity),
            ("forecaster.batch_count", f.batch_count),
            ("forecaster.is_weekend", f.is_weekend),
            ("forecaster.is_month_end", f.is_month_end),
            ("forecaster.residual_std", f.residual_std),
            ("forecaster.interval_width", f.interval_width),
            ("forecast_defaults.production", d.production),
            ("forecast_defaults.anomaly_intensity", d.anomaly_intensity),
        ]
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Plant Info
// ============================================================================

/// Identification metadata. Appears in logs and the health endpoint only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantInfo {
    #[serde(default = "default_plant_name")]
    pub name: String,

    /// Furnace line identifier
    #[serde(default = "default_furnace")]
    pub furnace: String,
}

fn default_plant_name() -> String {
    "Melting Shop".to_string()
}
fn default_furnace() -> String {
    "IF-1".to_string()
}

impl Default for PlantInfo {
    fn default() -> Self {
        Self {
            name: default_plant_name(),
            furnace: default_furnace(),
        }
    }
}

// ============================================================================
// Data Config
// ============================================================================

/// Locations of the archived CSV exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Per-minute meter telemetry
    #[serde(default = "default_minute_csv")]
    pub minute_csv: PathBuf,

    /// Day-level consumption with anomaly intensity
    #[serde(default = "default_day_csv")]
    pub day_csv: PathBuf,

    /// Per-batch consumption with anomaly tallies (optional view)
    #[serde(default = "default_batch_csv")]
    pub batch_csv: Option<PathBuf>,
}

fn default_minute_csv() -> PathBuf {
    PathBuf::from("data/1_minuteWiseData_Melting_energy_3.0_DB2.csv")
}
fn default_day_csv() -> PathBuf {
    PathBuf::from("data/2_Melting_Day_level_data.csv")
}
#[allow(clippy::unnecessary_wraps)]
fn default_batch_csv() -> Option<PathBuf> {
    Some(PathBuf::from("data/2_Melting_batch_data.csv"))
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            minute_csv: default_minute_csv(),
            day_csv: default_day_csv(),
            batch_csv: default_batch_csv(),
        }
    }
}

impl DataConfig {
    /// Point every file at `dir`, keeping the configured file names.
    pub fn rebase(&mut self, dir: &Path) {
        let rebase = |p: &Path| dir.join(p.file_name().unwrap_or(p.as_os_str()));
        self.minute_csv = rebase(&self.minute_csv);
        self.day_csv = rebase(&self.day_csv);
        self.batch_csv = self.batch_csv.as_deref().map(rebase);
    }
}

// ============================================================================
// Stream Config
// ============================================================================

/// Replay cursor settings: which archived day is "live" and from what time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Calendar day replayed as the live shift
    #[serde(default = "default_active_date")]
    pub active_date: NaiveDate,

    /// First time-of-day included in the replay
    #[serde(default = "default_start_time")]
    pub start_time: NaiveTime,

    /// Trailing window length reported with every advance
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_active_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 11).unwrap_or_default()
}
fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
}
fn default_window_size() -> usize {
    defaults::TRAILING_WINDOW_SIZE
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            active_date: default_active_date(),
            start_time: default_start_time(),
            window_size: default_window_size(),
        }
    }
}

// ============================================================================
// Classifier Thresholds
// ============================================================================

/// Normal operating band for the induction furnace.
///
/// Only applied while a batch is melting; idle minutes are always normal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// Below this draw the furnace is underpowered (kW)
    #[serde(default = "default_power_drop_kw")]
    pub power_drop_kw: f64,

    /// Above this draw the supply is overloaded (kW)
    #[serde(default = "default_power_spike_kw")]
    pub power_spike_kw: f64,

    #[serde(default = "default_low_pf")]
    pub low_pf: f64,

    #[serde(default = "default_high_pf")]
    pub high_pf: f64,
}

fn default_power_drop_kw() -> f64 { 350.0 }
fn default_power_spike_kw() -> f64 { 400.0 }
fn default_low_pf() -> f64 { 0.70 }
fn default_high_pf() -> f64 { 0.95 }

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            power_drop_kw: default_power_drop_kw(),
            power_spike_kw: default_power_spike_kw(),
            low_pf: default_low_pf(),
            high_pf: default_high_pf(),
        }
    }
}

// ============================================================================
// Synthesis Config
// ============================================================================

/// Constants for manufacturing future regressor frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Baseline production on a weekday (kg)
    #[serde(default = "default_weekday_production")]
    pub weekday_unit_production: f64,

    /// Baseline production on Saturday/Sunday (kg)
    #[serde(default = "default_weekend_production")]
    pub weekend_unit_production: f64,

    /// Production per batch (kg)
    #[serde(default = "default_unit_batch_size")]
    pub unit_batch_size: f64,

    /// Anomaly intensity standard deviation as a fraction of the mean
    #[serde(default = "default_noise_ratio")]
    pub noise_ratio: f64,

    #[serde(default)]
    pub month_end: MonthEndRule,
}

fn default_weekday_production() -> f64 { 24_000.0 }
fn default_weekend_production() -> f64 { 12_000.0 }
fn default_unit_batch_size() -> f64 { 1_000.0 }
fn default_noise_ratio() -> f64 { 0.3 }

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            weekday_unit_production: default_weekday_production(),
            weekend_unit_production: default_weekend_production(),
            unit_batch_size: default_unit_batch_size(),
            noise_ratio: default_noise_ratio(),
            month_end: MonthEndRule::default(),
        }
    }
}

// ============================================================================
// Forecaster Model
// ============================================================================

/// Coefficients of the fitted additive daily-consumption regression.
///
/// `kwh = intercept + Σ coefficient·regressor`, with a symmetric normal
/// prediction interval of `interval_width` coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelConfig {
    #[serde(default = "default_intercept")]
    pub intercept: f64,

    /// kWh per kg produced
    #[serde(default = "default_coef_production")]
    pub production: f64,

    #[serde(default = "default_coef_anomaly")]
    pub anomaly_intensity: f64,

    #[serde(default)]
    pub batch_count: f64,

    #[serde(default = "default_coef_weekend")]
    pub is_weekend: f64,

    #[serde(default = "default_coef_month_end")]
    pub is_month_end: f64,

    /// Residual standard deviation from the fit (kWh)
    #[serde(default = "default_residual_std")]
    pub residual_std: f64,

    /// Prediction interval coverage (0.80 → 10th..90th percentile)
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
}

fn default_intercept() -> f64 { 1_450.0 }
fn default_coef_production() -> f64 { 0.52 }
fn default_coef_anomaly() -> f64 { 38.0 }
fn default_coef_weekend() -> f64 { -420.0 }
fn default_coef_month_end() -> f64 { 260.0 }
fn default_residual_std() -> f64 { 640.0 }
fn default_interval_width() -> f64 { 0.80 }

impl Default for LinearModelConfig {
    fn default() -> Self {
        Self {
            intercept: default_intercept(),
            production: default_coef_production(),
            anomaly_intensity: default_coef_anomaly(),
            batch_count: 0.0,
            is_weekend: default_coef_weekend(),
            is_month_end: default_coef_month_end(),
            residual_std: default_residual_std(),
            interval_width: default_interval_width(),
        }
    }
}

// ============================================================================
// Forecast Request Defaults
// ============================================================================

/// Values used when a forecast request leaves a field out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDefaults {
    #[serde(default = "default_fc_start")]
    pub start_date: NaiveDate,

    #[serde(default = "default_fc_end")]
    pub end_date: NaiveDate,

    /// Target production over the whole range (kg)
    #[serde(default = "default_fc_production")]
    pub production: f64,

    /// Target mean anomaly intensity
    #[serde(default = "default_fc_anomaly")]
    pub anomaly_intensity: f64,

    #[serde(default = "default_fc_seed")]
    pub seed: u64,
}

fn default_fc_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 12).unwrap_or_default()
}
fn default_fc_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 26).unwrap_or_default()
}
fn default_fc_production() -> f64 { 288_000.0 }
fn default_fc_anomaly() -> f64 { 5.0 }
fn default_fc_seed() -> u64 { defaults::SYNTHESIS_SEED }

impl Default for ForecastDefaults {
    fn default() -> Self {
        Self {
            start_date: default_fc_start(),
            end_date: default_fc_end(),
            production: default_fc_production(),
            anomaly_intensity: default_fc_anomaly(),
            seed: default_fc_seed(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `MELTWATCH_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        PlantConfig::default().validate().unwrap();
    }

    #[test]
    fn test_defaults_match_commissioned_values() {
        let c = PlantConfig::default();
        assert_eq!(c.stream.window_size, 15);
        assert_eq!(c.stream.active_date, NaiveDate::from_ymd_opt(2025, 5, 11).unwrap());
        assert_eq!(c.stream.start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(c.synthesis.weekday_unit_production, 24_000.0);
        assert_eq!(c.synthesis.weekend_unit_production, 12_000.0);
        assert_eq!(c.synthesis.unit_batch_size, 1_000.0);
        assert_eq!(c.synthesis.month_end, MonthEndRule::CalendarLastDay);
        assert_eq!(c.forecast_defaults.seed, 42);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = PlantConfig::from_toml_str(
            r#"
            [stream]
            active_date = "2025-05-10"
            window_size = 30

            [synthesis]
            month_end = { rule = "late_month", after_day = 25 }
            "#,
        )
        .unwrap();
        assert_eq!(c.stream.window_size, 30);
        assert_eq!(c.stream.active_date, NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
        assert_eq!(c.synthesis.month_end, MonthEndRule::LateMonth { after_day: 25 });
        assert_eq!(c.classifier.power_spike_kw, 400.0);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut c = PlantConfig::default();
        c.classifier.power_drop_kw = 500.0;
        c.stream.window_size = 0;
        c.synthesis.unit_batch_size = 0.0;

        match c.validate() {
            Err(ConfigError::Validation(errors)) => assert!(errors.len() >= 3, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_through_toml() {
        let c = PlantConfig::default();
        let text = c.to_toml().unwrap();
        let back = PlantConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.forecast_defaults.production, c.forecast_defaults.production);
        assert_eq!(back.synthesis.month_end, c.synthesis.month_end);
    }

    #[test]
    fn test_rebase_keeps_file_names() {
        let mut d = DataConfig::default();
        d.rebase(Path::new("/srv/plant"));
        assert_eq!(d.day_csv, PathBuf::from("/srv/plant/2_Melting_Day_level_data.csv"));
        assert_eq!(
            d.batch_csv,
            Some(PathBuf::from("/srv/plant/2_Melting_batch_data.csv"))
        );
    }
}
