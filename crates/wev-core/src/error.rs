// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Fatal errors raised by the evaluation pipeline.
///
/// Any of these aborts the current (level, dataset) combination. Recoverable
/// data-quality findings are never errors; they travel as warnings in
/// [`crate::Diagnostics`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WevError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("non-constant time step: {0}")]
    NonConstantStep(String),
    #[error("empty intersection: {0}")]
    EmptyIntersection(String),
    #[error("verification did not converge: {0}")]
    NonConvergent(String),
    #[error("length mismatch: {0}")]
    LengthMismatch(String),
    #[error("missing source data: {0}")]
    MissingData(String),
    #[error("i/o failure: {0}")]
    Io(String),
}

impl WevError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn non_constant_step(msg: impl Into<String>) -> Self {
        Self::NonConstantStep(msg.into())
    }

    pub fn empty_intersection(msg: impl Into<String>) -> Self {
        Self::EmptyIntersection(msg.into())
    }

    pub fn non_convergent(msg: impl Into<String>) -> Self {
        Self::NonConvergent(msg.into())
    }

    pub fn length_mismatch(msg: impl Into<String>) -> Self {
        Self::LengthMismatch(msg.into())
    }

    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Stable machine-readable code for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NonConstantStep(_) => "non_constant_step",
            Self::EmptyIntersection(_) => "empty_intersection",
            Self::NonConvergent(_) => "non_convergent",
            Self::LengthMismatch(_) => "length_mismatch",
            Self::MissingData(_) => "missing_data",
            Self::Io(_) => "io_error",
        }
    }
}
