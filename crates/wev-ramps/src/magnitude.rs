// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classifier::{format_lag, RampClassifier, RampNature};
use chrono::Duration;
use wev_core::WevError;

pub const SIGNED_MAGNITUDE_NAME: &str = "r_magnitude";
pub const ABSOLUTE_MAGNITUDE_NAME: &str = "r_abs_magnitude";

pub(crate) fn validate_lag(lag: Duration) -> Result<(), WevError> {
    if lag <= Duration::zero() {
        return Err(WevError::invalid_input(format!(
            "ramp duration must be positive; got {}s",
            lag.num_seconds()
        )));
    }
    Ok(())
}

fn validate_threshold(threshold: f64) -> Result<(), WevError> {
    if !threshold.is_finite() {
        return Err(WevError::invalid_input(format!(
            "ramp threshold must be finite; got {threshold}"
        )));
    }
    Ok(())
}

/// Up or down ramps: `delta > threshold` for a positive threshold,
/// `delta < threshold` for a negative one.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedMagnitude {
    threshold: f64,
    lag: Duration,
    units: String,
}

impl SignedMagnitude {
    pub fn new(threshold: f64, lag: Duration, units: impl Into<String>) -> Result<Self, WevError> {
        validate_threshold(threshold)?;
        if threshold == 0.0 {
            return Err(WevError::invalid_input(
                "signed magnitude threshold must be non-zero; its sign selects up or down ramps",
            ));
        }
        validate_lag(lag)?;
        Ok(Self {
            threshold,
            lag,
            units: units.into(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl RampClassifier for SignedMagnitude {
    fn nature(&self) -> RampNature {
        if self.threshold > 0.0 {
            RampNature::Up
        } else {
            RampNature::Down
        }
    }

    fn duration(&self) -> Duration {
        self.lag
    }

    fn method_name(&self) -> String {
        format!(
            "{SIGNED_MAGNITUDE_NAME}_{}{}_{}",
            self.threshold,
            self.units,
            format_lag(self.lag)
        )
    }

    fn is_ramp(&self, delta: f64) -> bool {
        if self.threshold > 0.0 {
            delta > self.threshold
        } else {
            delta < self.threshold
        }
    }
}

/// Ramps in either direction: `|delta| > threshold`.
#[derive(Clone, Debug, PartialEq)]
pub struct AbsoluteMagnitude {
    threshold: f64,
    lag: Duration,
    units: String,
}

impl AbsoluteMagnitude {
    pub fn new(threshold: f64, lag: Duration, units: impl Into<String>) -> Result<Self, WevError> {
        validate_threshold(threshold)?;
        validate_lag(lag)?;
        Ok(Self {
            threshold: threshold.abs(),
            lag,
            units: units.into(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl RampClassifier for AbsoluteMagnitude {
    fn nature(&self) -> RampNature {
        RampNature::All
    }

    fn duration(&self) -> Duration {
        self.lag
    }

    fn method_name(&self) -> String {
        format!(
            "{ABSOLUTE_MAGNITUDE_NAME}_{}{}_{}",
            self.threshold,
            self.units,
            format_lag(self.lag)
        )
    }

    fn is_ramp(&self, delta: f64) -> bool {
        delta.abs() > self.threshold
    }
}
