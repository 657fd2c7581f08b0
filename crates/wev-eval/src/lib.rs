// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Contingency scoring of paired event flags, the error metrics applied to
//! aligned series and power derived from a turbine power curve.

pub mod contingency;
pub mod direction;
pub mod metrics;
pub mod power;

pub use contingency::{ContingencyCategory, ContingencyTable, SkillScores};
pub use direction::{angle_difference, angle_difference_series};
pub use metrics::{MetricFunction, MetricKind, MetricValue};
pub use power::{derive_power, PowerCurve};
