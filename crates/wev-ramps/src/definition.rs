// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::change_rate::ChangeRate;
use crate::classifier::RampClassifier;
use crate::magnitude::{AbsoluteMagnitude, SignedMagnitude};
use crate::rated::AbsolutePercentOfRated;
use chrono::Duration;
use wev_core::WevError;

/// Boxed classifier shareable across worker threads.
pub type DynRampClassifier = Box<dyn RampClassifier + Send + Sync>;

/// Configured ramp definition, decoded from the `definition` tag.
///
/// Unknown tags fail at decode time rather than at run time.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "definition"))]
#[derive(Clone, Debug, PartialEq)]
pub enum RampDefinition {
    #[cfg_attr(feature = "serde", serde(rename = "r_magnitude"))]
    SignedMagnitude { magnitude: f64, duration_minutes: u32 },
    #[cfg_attr(feature = "serde", serde(rename = "r_abs_magnitude"))]
    AbsoluteMagnitude { magnitude: f64, duration_minutes: u32 },
    #[cfg_attr(
        feature = "serde",
        serde(rename = "r_abs_percent_rated", alias = "r_abs_change_rate")
    )]
    AbsolutePercentOfRated {
        percent: f64,
        rated_capacity: f64,
        duration_minutes: u32,
    },
    #[cfg_attr(feature = "serde", serde(rename = "r_change_rate"))]
    ChangeRate {
        rate_per_hour: f64,
        duration_minutes: u32,
    },
}

impl RampDefinition {
    pub fn duration_minutes(&self) -> u32 {
        match self {
            Self::SignedMagnitude {
                duration_minutes, ..
            }
            | Self::AbsoluteMagnitude {
                duration_minutes, ..
            }
            | Self::AbsolutePercentOfRated {
                duration_minutes, ..
            }
            | Self::ChangeRate {
                duration_minutes, ..
            } => *duration_minutes,
        }
    }

    /// Builds the classifier; `units` is the reference variable's unit label
    /// used in the method name.
    pub fn build(&self, units: &str) -> Result<DynRampClassifier, WevError> {
        let lag = Duration::minutes(i64::from(self.duration_minutes()));
        Ok(match *self {
            Self::SignedMagnitude { magnitude, .. } => {
                Box::new(SignedMagnitude::new(magnitude, lag, units)?)
            }
            Self::AbsoluteMagnitude { magnitude, .. } => {
                Box::new(AbsoluteMagnitude::new(magnitude, lag, units)?)
            }
            Self::AbsolutePercentOfRated {
                percent,
                rated_capacity,
                ..
            } => Box::new(AbsolutePercentOfRated::new(
                percent,
                rated_capacity,
                lag,
                units,
            )?),
            Self::ChangeRate { rate_per_hour, .. } => {
                Box::new(ChangeRate::new(rate_per_hour, lag, units)?)
            }
        })
    }

    pub fn validate(&self) -> Result<(), WevError> {
        self.build("").map(|_| ())
    }
}
