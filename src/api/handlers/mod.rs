//! API route handlers
//!
//! - `stream`: live replay (advance, status)
//! - `forecast`: covariate synthesis and consumption forecast
//! - `history`: monthly/weekly/daily rollups and per-day batches
//! - `prescriptions`: anomaly guidance catalog
//! - `health`: liveness

mod forecast;
mod health;
mod history;
mod prescriptions;
mod stream;

pub use forecast::*;
pub use health::*;
pub use history::*;
pub use prescriptions::*;
pub use stream::*;

use std::sync::Arc;
use std::time::Instant;

use crate::config::PlantConfig;
use crate::forecast::ForecastGenerator;
use crate::stream::StreamHandle;
use crate::telemetry::TelemetryStore;
use crate::types::{BatchRecord, DailyRecord};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers. Everything except the cursor is read-only.
#[derive(Clone)]
pub struct DashboardState {
    /// Process-wide replay cursor
    pub stream: StreamHandle,
    /// Full minute-level archive (history rollups)
    pub store: Arc<TelemetryStore>,
    /// Day-level export
    pub daily: Arc<Vec<DailyRecord>>,
    /// Per-batch export (empty when not configured)
    pub batches: Arc<Vec<BatchRecord>>,
    pub generator: Arc<ForecastGenerator>,
    pub config: Arc<PlantConfig>,
    pub started: Instant,
}

impl DashboardState {
    pub fn new(
        stream: StreamHandle,
        store: TelemetryStore,
        daily: Vec<DailyRecord>,
        batches: Vec<BatchRecord>,
        generator: ForecastGenerator,
        config: PlantConfig,
    ) -> Self {
        Self {
            stream,
            store: Arc::new(store),
            daily: Arc::new(daily),
            batches: Arc::new(batches),
            generator: Arc::new(generator),
            config: Arc::new(config),
            started: Instant::now(),
        }
    }
}
