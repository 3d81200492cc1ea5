// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Coarse classification of [`OffPeakError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Segmentation,
}

/// Error type shared by every offpeak crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OffPeakError {
    /// A caller-supplied phase or parameter violates a precondition.
    InvalidInput(String),
    /// The segmentation primitive returned a decomposition the estimator
    /// cannot use (non-finite heights, broken periodicity, bad shape).
    Segmentation(String),
}

impl OffPeakError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn segmentation(msg: impl Into<String>) -> Self {
        Self::Segmentation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Segmentation(_) => ErrorKind::Segmentation,
        }
    }

    /// Stable snake_case code used in structured error output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Segmentation(_) => "segmentation",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(msg) | Self::Segmentation(msg) => msg.as_str(),
        }
    }
}

impl fmt::Display for OffPeakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Segmentation(msg) => write!(f, "segmentation error: {msg}"),
        }
    }
}

impl std::error::Error for OffPeakError {}
