// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::time_series::{Frequency, Timestamp};
use crate::WevError;

/// Baseline and comparison values merged onto one shared timestamp index.
///
/// The baseline is always the first column.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "AlignedPairRepr"))]
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedPair {
    timestamps: Vec<Timestamp>,
    baseline: Vec<f64>,
    comparison: Vec<f64>,
    baseline_label: String,
    comparison_label: String,
    frequency: Frequency,
}

impl AlignedPair {
    pub fn new(
        baseline_label: impl Into<String>,
        comparison_label: impl Into<String>,
        frequency: Frequency,
        timestamps: Vec<Timestamp>,
        baseline: Vec<f64>,
        comparison: Vec<f64>,
    ) -> Result<Self, WevError> {
        if baseline.len() != timestamps.len() || comparison.len() != timestamps.len() {
            return Err(WevError::length_mismatch(format!(
                "aligned pair columns must share the index length: index={}, baseline={}, comparison={}",
                timestamps.len(),
                baseline.len(),
                comparison.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(WevError::invalid_input(format!(
                "aligned pair index must be strictly increasing; violation at row {}",
                pos + 1
            )));
        }
        Ok(Self {
            timestamps,
            baseline,
            comparison,
            baseline_label: baseline_label.into(),
            comparison_label: comparison_label.into(),
            frequency,
        })
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn baseline(&self) -> &[f64] {
        &self.baseline
    }

    pub fn comparison(&self) -> &[f64] {
        &self.comparison
    }

    pub fn baseline_label(&self) -> &str {
        &self.baseline_label
    }

    pub fn comparison_label(&self) -> &str {
        &self.comparison_label
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn position(&self, ts: Timestamp) -> Option<usize> {
        self.timestamps.binary_search(&ts).ok()
    }

    /// Drops every row where either column is NaN.
    ///
    /// Returns the reduced pair and the timestamps that were removed.
    pub fn drop_incomplete(&self) -> (Self, Vec<Timestamp>) {
        let mut kept = Self {
            timestamps: Vec::with_capacity(self.len()),
            baseline: Vec::with_capacity(self.len()),
            comparison: Vec::with_capacity(self.len()),
            baseline_label: self.baseline_label.clone(),
            comparison_label: self.comparison_label.clone(),
            frequency: self.frequency,
        };
        let mut dropped = Vec::new();

        for ((&ts, &base), &comp) in self
            .timestamps
            .iter()
            .zip(self.baseline.iter())
            .zip(self.comparison.iter())
        {
            if base.is_nan() || comp.is_nan() {
                dropped.push(ts);
            } else {
                kept.timestamps.push(ts);
                kept.baseline.push(base);
                kept.comparison.push(comp);
            }
        }

        (kept, dropped)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct AlignedPairRepr {
    timestamps: Vec<Timestamp>,
    baseline: Vec<f64>,
    comparison: Vec<f64>,
    baseline_label: String,
    comparison_label: String,
    frequency: Frequency,
}

#[cfg(feature = "serde")]
impl TryFrom<AlignedPairRepr> for AlignedPair {
    type Error = WevError;

    fn try_from(repr: AlignedPairRepr) -> Result<Self, Self::Error> {
        Self::new(
            repr.baseline_label,
            repr.comparison_label,
            repr.frequency,
            repr.timestamps,
            repr.baseline,
            repr.comparison,
        )
    }
}
