//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for PlantConfig.
///
/// Maintained by hand to match the struct hierarchy in plant_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [plant]
        "plant",
        "plant.name",
        "plant.furnace",
        // [data]
        "data",
        "data.minute_csv",
        "data.day_csv",
        "data.batch_csv",
        // [stream]
        "stream",
        "stream.active_date",
        "stream.start_time",
        "stream.window_size",
        // [classifier]
        "classifier",
        "classifier.power_drop_kw",
        "classifier.power_spike_kw",
        "classifier.low_pf",
        "classifier.high_pf",
        // [synthesis]
        "synthesis",
        "synthesis.weekday_unit_production",
        "synthesis.weekend_unit_production",
        "synthesis.unit_batch_size",
        "synthesis.noise_ratio",
        "synthesis.month_end",
        "synthesis.month_end.rule",
        "synthesis.month_end.after_day",
        // [forecaster]
        "forecaster",
        "forecaster.intercept",
        "forecaster.production",
        "forecaster.anomaly_intensity",
        "forecaster.batch_count",
        "forecaster.is_weekend",
        "forecaster.is_month_end",
        "forecaster.residual_std",
        "forecaster.interval_width",
        // [forecast_defaults]
        "forecast_defaults",
        "forecast_defaults.start_date",
        "forecast_defaults.end_date",
        "forecast_defaults.production",
        "forecast_defaults.anomaly_intensity",
        "forecast_defaults.seed",
        // [server]
        "server",
        "server.addr",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed PlantConfig.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::PlantConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let c = &config.classifier;

    // Power factor is a ratio of real to apparent power
    for (name, pf) in [("classifier.low_pf", c.low_pf), ("classifier.high_pf", c.high_pf)] {
        if !(0.0..=1.0).contains(&pf) {
            errors.push(format!("{name} = {pf:.3} is outside physical range (0-1)"));
        }
    }

    if c.power_drop_kw < 0.0 {
        errors.push(format!(
            "classifier.power_drop_kw = {:.1} cannot be negative",
            c.power_drop_kw
        ));
    }

    // Induction melting furnaces in this class draw tens to low thousands of kW
    if c.power_spike_kw > 5_000.0 {
        warnings.push(ValidationWarning {
            field: "classifier.power_spike_kw".to_string(),
            message: format!(
                "power_spike_kw = {:.0} is outside typical range (up to 5000 kW)",
                c.power_spike_kw
            ),
            suggestion: None,
        });
    }

    let s = &config.synthesis;
    if s.weekday_unit_production < s.weekend_unit_production {
        warnings.push(ValidationWarning {
            field: "synthesis.weekend_unit_production".to_string(),
            message: format!(
                "weekend_unit_production ({:.0}) exceeds weekday_unit_production ({:.0})",
                s.weekend_unit_production, s.weekday_unit_production
            ),
            suggestion: None,
        });
    }
    if s.noise_ratio > 1.0 {
        warnings.push(ValidationWarning {
            field: "synthesis.noise_ratio".to_string(),
            message: format!(
                "noise_ratio = {:.2} will clip most sampled intensities at zero",
                s.noise_ratio
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
