// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classifier::{format_lag, RampClassifier, RampNature};
use crate::magnitude::validate_lag;
use chrono::Duration;
use wev_core::WevError;

pub const CHANGE_RATE_NAME: &str = "r_change_rate";

/// Ramps by rate of change: `|delta| / hours(lag) > rate_per_hour`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeRate {
    rate_per_hour: f64,
    lag: Duration,
    units: String,
}

impl ChangeRate {
    pub fn new(rate_per_hour: f64, lag: Duration, units: impl Into<String>) -> Result<Self, WevError> {
        if !rate_per_hour.is_finite() || rate_per_hour < 0.0 {
            return Err(WevError::invalid_input(format!(
                "change-rate threshold must be finite and >= 0; got {rate_per_hour}"
            )));
        }
        validate_lag(lag)?;
        Ok(Self {
            rate_per_hour,
            lag,
            units: units.into(),
        })
    }

    fn lag_hours(&self) -> f64 {
        self.lag.num_seconds() as f64 / 3600.0
    }
}

impl RampClassifier for ChangeRate {
    fn nature(&self) -> RampNature {
        RampNature::All
    }

    fn duration(&self) -> Duration {
        self.lag
    }

    fn method_name(&self) -> String {
        format!(
            "{CHANGE_RATE_NAME}_{}{}/h_{}",
            self.rate_per_hour,
            self.units,
            format_lag(self.lag)
        )
    }

    fn is_ramp(&self, delta: f64) -> bool {
        delta.abs() / self.lag_hours() > self.rate_per_hour
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeRate;
    use crate::classifier::{RampClassifier, RampNature};
    use chrono::Duration;

    #[test]
    fn rate_is_normalised_by_lag_hours() {
        let rule = ChangeRate::new(5.0, Duration::minutes(30), "ms-1").expect("valid");
        // 3 over half an hour is 6 per hour.
        assert!(rule.is_ramp(3.0));
        assert!(rule.is_ramp(-3.0));
        assert!(!rule.is_ramp(2.5));
        assert_eq!(rule.nature(), RampNature::All);
    }

    #[test]
    fn method_name_marks_per_hour() {
        let rule = ChangeRate::new(4.0, Duration::hours(2), "ms-1").expect("valid");
        assert_eq!(rule.method_name(), "r_change_rate_4ms-1/h_2h");
    }

    #[test]
    fn rejects_negative_rate() {
        assert!(ChangeRate::new(-1.0, Duration::hours(1), "ms-1").is_err());
    }
}
