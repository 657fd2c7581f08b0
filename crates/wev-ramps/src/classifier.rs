// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::Duration;
use wev_core::{AlignedPair, Timestamp};

/// Direction of change a classifier is sensitive to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RampNature {
    Up,
    Down,
    All,
}

impl RampNature {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::All => "all",
        }
    }
}

/// Lagged differences over a fixed duration and the ramp flags derived from
/// them, one row per timestamp that has a valid counterpart `duration` later.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RampFlags {
    pub timestamps: Vec<Timestamp>,
    pub baseline_delta: Vec<f64>,
    pub comparison_delta: Vec<f64>,
    pub baseline: Vec<bool>,
    pub comparison: Vec<bool>,
}

impl RampFlags {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn baseline_count(&self) -> usize {
        self.baseline.iter().filter(|flag| **flag).count()
    }

    pub fn comparison_count(&self) -> usize {
        self.comparison.iter().filter(|flag| **flag).count()
    }
}

/// Column-wise `v(t + lag) - v(t)` over an aligned pair.
///
/// Rows whose partner timestamp is absent, or where either column has a
/// non-finite difference, are dropped. With a complete regular index this
/// removes `lag` worth of trailing rows.
#[derive(Clone, Debug, PartialEq)]
pub struct LaggedDelta {
    pub timestamps: Vec<Timestamp>,
    pub baseline: Vec<f64>,
    pub comparison: Vec<f64>,
}

pub fn lagged_delta(pair: &AlignedPair, lag: Duration) -> LaggedDelta {
    let mut out = LaggedDelta {
        timestamps: Vec::new(),
        baseline: Vec::new(),
        comparison: Vec::new(),
    };

    let index = pair.timestamps();
    let base = pair.baseline();
    let comp = pair.comparison();

    for (i, ts) in index.iter().enumerate() {
        let Some(j) = pair.position(*ts + lag) else {
            continue;
        };
        let db = base[j] - base[i];
        let dc = comp[j] - comp[i];
        if !db.is_finite() || !dc.is_finite() {
            continue;
        }
        out.timestamps.push(*ts);
        out.baseline.push(db);
        out.comparison.push(dc);
    }

    out
}

/// A ramp definition: a lag duration plus a rule deciding whether a lagged
/// difference counts as a ramp event.
///
/// Both columns are flagged independently with the same rule. Classification
/// never fails; an empty pair or a lag longer than the pair yields empty flags.
pub trait RampClassifier {
    fn nature(&self) -> RampNature;

    fn duration(&self) -> Duration;

    /// Column label of the form `<definition>_<threshold><units>_<duration>`.
    fn method_name(&self) -> String;

    fn is_ramp(&self, delta: f64) -> bool;

    fn classify(&self, pair: &AlignedPair) -> RampFlags {
        let delta = lagged_delta(pair, self.duration());
        let baseline = delta.baseline.iter().map(|d| self.is_ramp(*d)).collect();
        let comparison = delta.comparison.iter().map(|d| self.is_ramp(*d)).collect();
        RampFlags {
            timestamps: delta.timestamps,
            baseline_delta: delta.baseline,
            comparison_delta: delta.comparison,
            baseline,
            comparison,
        }
    }
}

/// Renders a lag the way method names carry it, e.g. `2h` or `30min`.
pub(crate) fn format_lag(lag: Duration) -> String {
    let minutes = lag.num_minutes();
    if minutes > 0 && minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{minutes}min")
    }
}
