//! Prescription Resolver
//!
//! Maps each anomaly label to operator guidance. The mapping is total over
//! the closed [`AnomalyLabel`] set; textual labels outside that set fail with
//! [`UnknownLabelError`] instead of degrading to a placeholder.

use crate::types::{AnomalyLabel, Prescription, UnknownLabelError};

const NORMAL: Prescription = Prescription {
    possible_reason: "—",
    cause: "—",
    solution: "No action needed, System operating Normally",
};

const POWER_SPIKE: Prescription = Prescription {
    possible_reason: "Overload on the power system",
    cause: "Sudden high load or faulty power control",
    solution: "Check load balancing & inspect control systems",
};

const POWER_DROP: Prescription = Prescription {
    possible_reason: "Underpowering the furnace",
    cause: "Voltage fluctuation & Transformer issue",
    solution: "Stabilize voltage & check transformer health",
};

const HIGH_PF: Prescription = Prescription {
    possible_reason: "Overcompensated power factor correction",
    cause: "Excess capacitor bank usage",
    solution: "Adjust capacitor banks & check reactive power",
};

const LOW_PF: Prescription = Prescription {
    possible_reason: "Inefficient power usage",
    cause: "Load imbalance & capacitance imbalance",
    solution: "Improve load distribution or inductance imbalance",
};

/// Guidance for a label.
pub fn resolve(label: AnomalyLabel) -> Prescription {
    match label {
        AnomalyLabel::Normal => NORMAL,
        AnomalyLabel::PowerSpike => POWER_SPIKE,
        AnomalyLabel::PowerDrop => POWER_DROP,
        AnomalyLabel::HighPf => HIGH_PF,
        AnomalyLabel::LowPf => LOW_PF,
    }
}

/// Guidance for a textual label as emitted by an external label encoder.
pub fn resolve_name(name: &str) -> Result<Prescription, UnknownLabelError> {
    name.parse::<AnomalyLabel>().map(resolve)
}

/// Every label with its guidance, in declaration order.
pub fn catalog() -> Vec<(AnomalyLabel, Prescription)> {
    AnomalyLabel::ALL.iter().map(|l| (*l, resolve(*l))).collect()
}
