// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Ramp-event classifiers: lagged differences over a fixed duration turned
//! into per-sample boolean flags for the baseline and comparison columns.

pub mod change_rate;
pub mod classifier;
pub mod definition;
pub mod magnitude;
pub mod rated;

pub use change_rate::ChangeRate;
pub use classifier::{lagged_delta, LaggedDelta, RampClassifier, RampFlags, RampNature};
pub use definition::{DynRampClassifier, RampDefinition};
pub use magnitude::{AbsoluteMagnitude, SignedMagnitude};
pub use rated::AbsolutePercentOfRated;
