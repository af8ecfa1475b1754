//! CSV loaders for the plant exports
//!
//! Columns are mapped from the header row (order independent, case
//! insensitive). Rows that fail to parse are skipped and logged with their
//! line number; only structural problems (missing file, missing required
//! column, no usable rows) fail the load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::types::{BatchRecord, DailyRecord, TelemetryRecord};

const DATETIME_FORMATS: [&str; 3] = ["%d-%m-%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%Y-%m-%d"];

/// Parse errors logged individually before falling back to a count.
const MAX_LOGGED_ROW_ERRORS: usize = 10;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{} contains no usable rows ({skipped} skipped)", path.display())]
    Empty { path: PathBuf, skipped: usize },
}

// ============================================================================
// Public loaders
// ============================================================================

/// Load the per-minute furnace export.
pub fn load_minute_csv(path: impl AsRef<Path>) -> Result<Vec<TelemetryRecord>, LoadError> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let (header, rows) = split_header(path, &text)?;

    let cols = MinuteColumns {
        timestamp: header.require(path, "timestamp")?,
        batch_id: header.optional(&["batch_id"]),
        melting_batch_time: header.require(path, "melting_batch_time")?,
        idle_batch_time: header.require(path, "idle_batch_time")?,
        power_kw: header.require(path, "power_kw")?,
        power_factor: header.require(path, "power_factor")?,
        furnace_temperature: header.require(path, "furnace_temperature")?,
        batch_status: header.require(path, "batch_status")?,
        energy_reading_pm: header.require(path, "energy_reading_pm")?,
        energy_reading_cumulative: header
            .optional(&["energy_reading_cumm", "energy_reading_cumulative"])
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: "energy_reading_cumm",
            })?,
    };

    collect_rows(path, "minute", rows, |fields| parse_minute_row(fields, &cols))
}

/// Load the day-level consumption export (`ds`, `y`, `anomaly_intensity`).
pub fn load_day_csv(path: impl AsRef<Path>) -> Result<Vec<DailyRecord>, LoadError> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let (header, rows) = split_header(path, &text)?;

    let date = header.require_any(path, &["ds", "date"])?;
    let consumption = header.require_any(path, &["y", "consumption"])?;
    let intensity = header.require(path, "anomaly_intensity")?;

    collect_rows(path, "day", rows, |fields| {
        Ok(DailyRecord {
            date: parse_date(field(fields, date)?)?,
            consumption: parse_f64(field(fields, consumption)?)?,
            anomaly_intensity: parse_f64(field(fields, intensity)?)?,
        })
    })
}

/// Load the per-batch summary export.
pub fn load_batch_csv(path: impl AsRef<Path>) -> Result<Vec<BatchRecord>, LoadError> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let (header, rows) = split_header(path, &text)?;

    let timestamp = header.require(path, "timestamp")?;
    let batch_id = header.require(path, "batch_id")?;
    let consumption = header.require(path, "consumption")?;
    let spike = header.require(path, "power_spike")?;
    let drop = header.require(path, "power_drop")?;
    let high = header.require(path, "high_pf")?;
    let low = header.require(path, "low_pf")?;

    collect_rows(path, "batch", rows, |fields| {
        Ok(BatchRecord {
            timestamp: parse_datetime(field(fields, timestamp)?)?,
            batch_id: field(fields, batch_id)?.to_string(),
            consumption: parse_f64(field(fields, consumption)?)?,
            power_spike: parse_count(field(fields, spike)?)?,
            power_drop: parse_count(field(fields, drop)?)?,
            high_pf: parse_count(field(fields, high)?)?,
            low_pf: parse_count(field(fields, low)?)?,
        })
    })
}

// ============================================================================
// Row parsing
// ============================================================================

struct MinuteColumns {
    timestamp: usize,
    batch_id: Option<usize>,
    melting_batch_time: usize,
    idle_batch_time: usize,
    power_kw: usize,
    power_factor: usize,
    furnace_temperature: usize,
    batch_status: usize,
    energy_reading_pm: usize,
    energy_reading_cumulative: usize,
}

fn parse_minute_row(fields: &[&str], cols: &MinuteColumns) -> Result<TelemetryRecord, String> {
    let batch_status = parse_f64(field(fields, cols.batch_status)?)?;
    Ok(TelemetryRecord {
        timestamp: parse_datetime(field(fields, cols.timestamp)?)?,
        batch_id: cols
            .batch_id
            .and_then(|i| fields.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        melting_batch_time: parse_f64(field(fields, cols.melting_batch_time)?)?,
        idle_batch_time: parse_f64(field(fields, cols.idle_batch_time)?)?,
        power_kw: parse_f64(field(fields, cols.power_kw)?)?,
        power_factor: parse_f64(field(fields, cols.power_factor)?)?,
        furnace_temperature: parse_f64(field(fields, cols.furnace_temperature)?)?,
        batch_status: u8::from(batch_status >= 0.5),
        energy_reading_pm: parse_f64(field(fields, cols.energy_reading_pm)?)?,
        energy_reading_cumulative: parse_f64(field(fields, cols.energy_reading_cumulative)?)?,
    })
}

fn field<'a>(fields: &[&'a str], idx: usize) -> Result<&'a str, String> {
    fields
        .get(idx)
        .map(|s| s.trim())
        .ok_or_else(|| format!("row has {} fields, expected column {}", fields.len(), idx + 1))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|e| format!("invalid number '{s}': {e}"))?;
    if !v.is_finite() {
        return Err(format!("non-finite number '{s}'"));
    }
    Ok(v)
}

fn parse_count(s: &str) -> Result<u32, String> {
    let v = parse_f64(s)?;
    if v < 0.0 || v.fract() != 0.0 || v > f64::from(u32::MAX) {
        return Err(format!("invalid count '{s}'"));
    }
    Ok(v as u32)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("unrecognised timestamp '{s}'"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| parse_datetime(s).ok().map(|dt| dt.date()))
        .ok_or_else(|| format!("unrecognised date '{s}'"))
}

// ============================================================================
// File and header handling
// ============================================================================

/// Read a file as UTF-8, falling back to Latin-1 for legacy exports.
fn read_text(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::info!(file = %path.display(), "File is not UTF-8, decoding as Latin-1");
            Ok(e.into_bytes().iter().map(|&b| char::from(b)).collect())
        }
    }
}

/// Header column positions keyed by lowercase name.
struct Header {
    index: HashMap<String, usize>,
}

impl Header {
    fn parse(line: &str) -> Self {
        let index = csv_split(line.trim_start_matches('\u{feff}'))
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();
        Self { index }
    }

    fn optional(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.index.get(*n).copied())
    }

    fn require(&self, path: &Path, name: &'static str) -> Result<usize, LoadError> {
        self.require_any(path, &[name])
    }

    /// First matching alias; the error names the primary (first) alias.
    fn require_any(&self, path: &Path, names: &[&'static str]) -> Result<usize, LoadError> {
        self.optional(names).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: names.first().copied().unwrap_or_default(),
        })
    }
}

fn split_header<'a>(
    path: &Path,
    text: &'a str,
) -> Result<(Header, impl Iterator<Item = (usize, &'a str)>), LoadError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
    let header = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| Header::parse(l))
        .ok_or_else(|| LoadError::Empty {
            path: path.to_path_buf(),
            skipped: 0,
        })?;
    Ok((header, lines))
}

fn collect_rows<'a, T>(
    path: &Path,
    kind: &'static str,
    rows: impl Iterator<Item = (usize, &'a str)>,
    mut parse: impl FnMut(&[&str]) -> Result<T, String>,
) -> Result<Vec<T>, LoadError> {
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for (line_num, line) in rows {
        if line.trim().is_empty() {
            continue;
        }
        let fields = csv_split(line);
        match parse(&fields) {
            Ok(row) => out.push(row),
            Err(e) => {
                if skipped < MAX_LOGGED_ROW_ERRORS {
                    tracing::warn!(file = %path.display(), line = line_num, error = %e, "Skipping malformed row");
                }
                skipped += 1;
            }
        }
    }

    if out.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
            skipped,
        });
    }

    tracing::info!(
        file = %path.display(),
        kind,
        rows = out.len(),
        skipped,
        "CSV loaded"
    );
    Ok(out)
}

/// Split a CSV line respecting double-quoted fields.
fn csv_split(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(line[start..i].trim_matches('"'));
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(line[start..].trim_matches('"'));
    fields
}
