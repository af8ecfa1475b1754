//! Synthetic furnace telemetry generator
//!
//! Writes a per-minute meter export, the matching day-level rollup and the
//! per-batch summary so the service can run without plant data. Melting
//! batches alternate with idle gaps; a small share of melting minutes is
//! pushed outside the operating bands to produce each anomaly category.
//!
//! # Usage
//! ```bash
//! ./telemetry-gen --out demo-data --start 2025-04-01 --days 45 --seed 7
//! ./meltwatch --data demo-data
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tracing::info;

use meltwatch::config::{defaults, DataConfig};
use meltwatch::{AnomalyLabel, Classifier, LabelCounts, TelemetryRecord, ThresholdClassifier};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "telemetry-gen")]
#[command(about = "Synthetic melting-furnace telemetry for Meltwatch")]
#[command(version)]
struct Args {
    /// Output directory (created if missing)
    #[arg(short, long, default_value = "data")]
    out: PathBuf,

    /// First generated day (YYYY-MM-DD)
    #[arg(long, default_value = "2025-04-01")]
    start: NaiveDate,

    /// Number of days to generate (1-366)
    #[arg(long, default_value = "45", value_parser = clap::value_parser!(u32).range(1..=366))]
    days: u32,

    /// Probability that a melting minute is pushed out of band
    #[arg(long, default_value_t = defaults::GEN_ANOMALY_PROBABILITY)]
    anomaly_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Furnace Simulation
// ============================================================================

struct FurnaceSim {
    rng: StdRng,
    anomaly_rate: f64,
    power_noise: Normal<f64>,
    pf_noise: Normal<f64>,
    temp_noise: Normal<f64>,
    cumulative_kwh: f64,
    batch_seq: u32,
}

impl FurnaceSim {
    fn new(seed: Option<u64>, anomaly_rate: f64) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            anomaly_rate: if anomaly_rate.is_finite() { anomaly_rate.clamp(0.0, 1.0) } else { 0.0 },
            power_noise: Normal::new(0.0, 6.0).context("power noise")?,
            pf_noise: Normal::new(0.0, 0.015).context("power factor noise")?,
            temp_noise: Normal::new(0.0, 4.0).context("temperature noise")?,
            cumulative_kwh: 0.0,
            batch_seq: 0,
        })
    }

    /// Power and power factor for one melting minute, occasionally out of band.
    fn melting_electrics(&mut self) -> (f64, f64) {
        let mut power = defaults::GEN_BASE_POWER_KW + self.power_noise.sample(&mut self.rng);
        let mut pf = defaults::GEN_BASE_POWER_FACTOR + self.pf_noise.sample(&mut self.rng);

        if self.rng.gen_bool(self.anomaly_rate) {
            match self.rng.gen_range(0..4) {
                0 => power = self.rng.gen_range(410.0..460.0),
                1 => power = self.rng.gen_range(300.0..345.0),
                2 => pf = self.rng.gen_range(0.96..0.99),
                _ => pf = self.rng.gen_range(0.60..0.69),
            }
        }
        (power, pf.clamp(0.0, 1.0))
    }

    fn record(
        &mut self,
        timestamp: NaiveDateTime,
        batch_id: &str,
        melting_minute: u32,
        idle_minute: u32,
    ) -> TelemetryRecord {
        let melting = melting_minute > 0;
        let (power_kw, power_factor) = if melting {
            self.melting_electrics()
        } else {
            (
                35.0 + self.power_noise.sample(&mut self.rng).abs(),
                0.55 + self.pf_noise.sample(&mut self.rng),
            )
        };
        let progress = f64::from(melting_minute) / f64::from(defaults::GEN_BATCH_MINUTES);
        let furnace_temperature = if melting {
            1_250.0 + (defaults::GEN_BASE_TEMPERATURE_C - 1_250.0) * progress
        } else {
            defaults::GEN_BASE_TEMPERATURE_C - 15.0 * f64::from(idle_minute)
        } + self.temp_noise.sample(&mut self.rng);

        let energy = power_kw / 60.0;
        self.cumulative_kwh += energy;

        TelemetryRecord {
            timestamp,
            batch_id: Some(batch_id.to_string()),
            melting_batch_time: f64::from(melting_minute),
            idle_batch_time: f64::from(idle_minute),
            power_kw,
            power_factor,
            furnace_temperature,
            batch_status: u8::from(melting),
            energy_reading_pm: energy,
            energy_reading_cumulative: self.cumulative_kwh,
        }
    }

    fn next_batch_id(&mut self, day: NaiveDate) -> String {
        self.batch_seq += 1;
        format!("B{}-{:04}", day.format("%Y%m%d"), self.batch_seq)
    }
}

// ============================================================================
// Rollups
// ============================================================================

#[derive(Default)]
struct DayTotals {
    energy: f64,
    anomalies: u64,
}

struct BatchTotals {
    started: NaiveDateTime,
    energy: f64,
    counts: LabelCounts,
}

// ============================================================================
// Output
// ============================================================================

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut paths = DataConfig::default();
    paths.rebase(&args.out);

    let mut sim = FurnaceSim::new(args.seed, args.anomaly_rate)?;
    let classifier = ThresholdClassifier::default();
    let cycle = defaults::GEN_BATCH_MINUTES + defaults::GEN_IDLE_MINUTES;

    let mut minute_out = create(&paths.minute_csv)?;
    writeln!(
        minute_out,
        "timestamp,batch_id,melting_batch_time,idle_batch_time,power_kw,power_factor,\
         furnace_temperature,batch_status,energy_reading_pm,energy_reading_cumm"
    )?;

    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    let mut batches: BTreeMap<String, BatchTotals> = BTreeMap::new();
    let start = args.start.and_time(chrono::NaiveTime::MIN);
    let total_minutes = i64::from(args.days) * 24 * 60;
    let mut batch_id = String::new();

    for minute in 0..total_minutes {
        let timestamp = start + Duration::minutes(minute);
        let phase = u32::try_from(minute % i64::from(cycle)).unwrap_or(0);
        if phase == 0 {
            batch_id = sim.next_batch_id(timestamp.date());
        }
        let (melting_minute, idle_minute) = if phase < defaults::GEN_BATCH_MINUTES {
            (phase + 1, 0)
        } else {
            (0, phase - defaults::GEN_BATCH_MINUTES + 1)
        };

        let record = sim.record(timestamp, &batch_id, melting_minute, idle_minute);
        let label = classifier
            .classify(&record.features())
            .unwrap_or(AnomalyLabel::Normal);

        let day = days.entry(timestamp.date()).or_default();
        day.energy += record.energy_reading_pm;
        day.anomalies += u64::from(label.is_anomaly());

        let batch = batches.entry(batch_id.clone()).or_insert_with(|| BatchTotals {
            started: timestamp,
            energy: 0.0,
            counts: LabelCounts::new(),
        });
        batch.energy += record.energy_reading_pm;
        batch.counts.increment(label);

        writeln!(
            minute_out,
            "{},{},{},{},{:.2},{:.3},{:.1},{},{:.4},{:.3}",
            record.timestamp.format("%d-%m-%Y %H:%M"),
            batch_id,
            record.melting_batch_time,
            record.idle_batch_time,
            record.power_kw,
            record.power_factor,
            record.furnace_temperature,
            record.batch_status,
            record.energy_reading_pm,
            record.energy_reading_cumulative,
        )?;
    }
    minute_out.flush()?;

    let mut day_out = create(&paths.day_csv)?;
    writeln!(day_out, "ds,y,anomaly_intensity")?;
    for (date, totals) in &days {
        // Anomalous minutes per hour
        let intensity = totals.anomalies as f64 / 24.0;
        writeln!(day_out, "{},{:.2},{:.3}", date.format("%d-%m-%Y"), totals.energy, intensity)?;
    }
    day_out.flush()?;

    if let Some(batch_path) = &paths.batch_csv {
        let mut batch_out = create(batch_path)?;
        writeln!(batch_out, "timestamp,batch_id,consumption,power_spike,power_drop,high_pf,low_pf")?;
        for (id, b) in &batches {
            writeln!(
                batch_out,
                "{},{},{:.2},{},{},{},{}",
                b.started.format("%d-%m-%Y %H:%M"),
                id,
                b.energy,
                b.counts.get(AnomalyLabel::PowerSpike),
                b.counts.get(AnomalyLabel::PowerDrop),
                b.counts.get(AnomalyLabel::HighPf),
                b.counts.get(AnomalyLabel::LowPf),
            )?;
        }
        batch_out.flush()?;
    }

    let anomalies: u64 = days.values().map(|d| d.anomalies).sum();
    info!(
        out = %args.out.display(),
        days = days.len(),
        minutes = total_minutes,
        batches = batches.len(),
        anomalies,
        "Synthetic telemetry written"
    );
    Ok(())
}
