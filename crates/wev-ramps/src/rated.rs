// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classifier::{format_lag, RampClassifier, RampNature};
use crate::magnitude::validate_lag;
use chrono::Duration;
use wev_core::WevError;

pub const PERCENT_OF_RATED_NAME: &str = "r_abs_percent_rated";

/// Ramps sized relative to installed capacity:
/// `|delta| > percent / 100 * rated_capacity`.
#[derive(Clone, Debug, PartialEq)]
pub struct AbsolutePercentOfRated {
    percent: f64,
    rated_capacity: f64,
    lag: Duration,
    units: String,
}

impl AbsolutePercentOfRated {
    pub fn new(
        percent: f64,
        rated_capacity: f64,
        lag: Duration,
        units: impl Into<String>,
    ) -> Result<Self, WevError> {
        if !percent.is_finite() || percent < 0.0 {
            return Err(WevError::invalid_input(format!(
                "percent-of-rated threshold must be finite and >= 0; got {percent}"
            )));
        }
        if !rated_capacity.is_finite() || rated_capacity <= 0.0 {
            return Err(WevError::invalid_input(format!(
                "rated capacity must be finite and > 0; got {rated_capacity}"
            )));
        }
        validate_lag(lag)?;
        Ok(Self {
            percent,
            rated_capacity,
            lag,
            units: units.into(),
        })
    }

    /// Threshold in the variable's own units.
    pub fn threshold(&self) -> f64 {
        self.percent / 100.0 * self.rated_capacity
    }
}

impl RampClassifier for AbsolutePercentOfRated {
    fn nature(&self) -> RampNature {
        RampNature::All
    }

    fn duration(&self) -> Duration {
        self.lag
    }

    fn method_name(&self) -> String {
        format!(
            "{PERCENT_OF_RATED_NAME}_{}{}_{}",
            self.percent,
            self.units,
            format_lag(self.lag)
        )
    }

    fn is_ramp(&self, delta: f64) -> bool {
        delta.abs() > self.threshold()
    }
}

#[cfg(test)]
mod tests {
    use super::AbsolutePercentOfRated;
    use crate::classifier::RampClassifier;
    use chrono::Duration;

    #[test]
    fn threshold_scales_with_capacity() {
        let rule = AbsolutePercentOfRated::new(10.0, 2000.0, Duration::hours(1), "kW")
            .expect("valid");
        assert_eq!(rule.threshold(), 200.0);
        assert!(rule.is_ramp(-250.0));
        assert!(rule.is_ramp(200.5));
        assert!(!rule.is_ramp(200.0));
    }

    #[test]
    fn rejects_bad_capacity_and_percent() {
        assert!(AbsolutePercentOfRated::new(10.0, 0.0, Duration::hours(1), "kW").is_err());
        assert!(AbsolutePercentOfRated::new(-1.0, 100.0, Duration::hours(1), "kW").is_err());
        assert!(AbsolutePercentOfRated::new(f64::NAN, 100.0, Duration::hours(1), "kW").is_err());
    }

    #[test]
    fn method_name_uses_percent() {
        let rule =
            AbsolutePercentOfRated::new(15.0, 3000.0, Duration::hours(4), "%").expect("valid");
        assert_eq!(rule.method_name(), "r_abs_percent_rated_15%_4h");
    }
}
