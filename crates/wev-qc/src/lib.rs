// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Data-quality repair and time alignment.
//!
//! [`verify`] turns a raw parser series into one with unique, regular
//! timestamps and explicit `NaN` gaps. [`align`] trims two verified series to an
//! evaluation window, reconciles their frequencies and inner-merges them into
//! an [`wev_core::AlignedPair`].

pub mod align;
pub mod resample;
pub mod verify;

pub use align::{align, AlignConfig, AlignInput, AlignMode, AlignOutcome};
pub use resample::{resample, start_of_day, SelectionPolicy};
pub use verify::{
    mask_flagged, verify, VerifiedSeries, VerifyConfig, DEFAULT_MAX_GRID_FACTOR,
    DEFAULT_MAX_ITERATIONS,
};
