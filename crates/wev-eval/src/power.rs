// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use wev_core::WevError;

/// Turbine power curve as a step table of (wind speed, power) bins.
///
/// A speed maps to the power of the highest bin whose speed it strictly
/// exceeds; speeds at or below the first bin produce zero power.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PowerCurve {
    speeds: Vec<f64>,
    power: Vec<f64>,
}

impl PowerCurve {
    pub fn new(speeds: Vec<f64>, power: Vec<f64>) -> Result<Self, WevError> {
        if speeds.is_empty() {
            return Err(WevError::invalid_input("power curve needs at least one bin"));
        }
        if speeds.len() != power.len() {
            return Err(WevError::length_mismatch(format!(
                "power curve has {} wind speeds but {} power values",
                speeds.len(),
                power.len()
            )));
        }
        if let Some(bad) = speeds.iter().chain(&power).find(|v| !v.is_finite()) {
            return Err(WevError::invalid_input(format!(
                "power curve values must be finite; got {bad}"
            )));
        }
        if let Some(pos) = speeds.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(WevError::invalid_input(format!(
                "power curve wind speeds must be strictly increasing; violation at bin {}",
                pos + 1
            )));
        }
        Ok(Self { speeds, power })
    }

    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    /// Power produced at wind speed `ws`; `NaN` stays `NaN`.
    pub fn power_at(&self, ws: f64) -> f64 {
        if ws.is_nan() {
            return f64::NAN;
        }
        match self.speeds.partition_point(|bin| *bin < ws) {
            0 => 0.0,
            exceeded => self.power[exceeded - 1],
        }
    }
}

/// Converts a wind-speed column into derived power, row by row.
pub fn derive_power(curve: &PowerCurve, speeds: &[f64]) -> Vec<f64> {
    speeds.iter().map(|ws| curve.power_at(*ws)).collect()
}
