// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for wev-rs: time series, aligned pairs, errors and
//! per-stage diagnostics.

pub mod aligned;
pub mod diagnostics;
pub mod error;
pub mod time_series;

pub use aligned::AlignedPair;
pub use diagnostics::{Diagnostics, DIAGNOSTICS_SCHEMA_VERSION};
pub use error::WevError;
pub use time_series::{
    format_timestamp, parse_timestamp, EvaluationWindow, Frequency, TimeSeries, Timestamp,
};
