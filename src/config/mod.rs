//! Plant Configuration Module
//!
//! Provides per-plant configuration loaded from TOML files: archived data
//! locations, replay settings, classifier bands, synthesis constants and the
//! fitted forecaster coefficients.
//!
//! ## Loading Order
//!
//! 1. `MELTWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `meltwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = PlantConfig::load();
//! config.validate()?;
//! let state = DashboardState::new(stream, store, daily, batches, generator, config);
//! ```

mod plant_config;
pub mod defaults;
pub mod validation;

pub use plant_config::*;
