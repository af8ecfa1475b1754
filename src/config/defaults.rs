//! System-wide default constants.
//!
//! Centralises magic numbers shared by the service and the generator binary.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Configuration Discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MELTWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "meltwatch.toml";

/// Environment variable overriding the bind address.
pub const SERVER_ADDR_ENV_VAR: &str = "MELTWATCH_SERVER_ADDR";

/// Comma-separated list of allowed CORS origins.
pub const CORS_ORIGINS_ENV_VAR: &str = "MELTWATCH_CORS_ORIGINS";

// ============================================================================
// HTTP
// ============================================================================

/// Upper bound on request bodies (forecast requests are a few hundred bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// Stream Cursor
// ============================================================================

/// Trailing window length reported with each advance.
///
/// 15 minutes of one-minute readings.
pub const TRAILING_WINDOW_SIZE: usize = 15;

// ============================================================================
// Forecasting
// ============================================================================

/// Seed for anomaly-intensity sampling when the request does not supply one.
pub const SYNTHESIS_SEED: u64 = 42;

/// Longest synthesized forecast horizon (days).
pub const MAX_FORECAST_DAYS: i64 = 366;

// ============================================================================
// Synthetic Telemetry Generator
// ============================================================================

/// Nominal melting power draw (kW).
pub const GEN_BASE_POWER_KW: f64 = 375.0;

/// Nominal power factor while melting.
pub const GEN_BASE_POWER_FACTOR: f64 = 0.85;

/// Nominal bath temperature while melting (°C).
pub const GEN_BASE_TEMPERATURE_C: f64 = 1_480.0;

/// Length of one melting batch (minutes).
pub const GEN_BATCH_MINUTES: u32 = 50;

/// Idle gap between batches (minutes).
pub const GEN_IDLE_MINUTES: u32 = 10;

/// Probability that a melting minute is perturbed into an anomaly band.
pub const GEN_ANOMALY_PROBABILITY: f64 = 0.04;
