// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod blocks;
pub mod config;
pub mod error;
pub mod histogram;
pub mod phase;

pub use blocks::{BinnedSegmenter, BlockDecomposition};
pub use config::{
    DEFAULT_BOUNDARY_RTOL, DEFAULT_MARGIN_FRACTION, DEFAULT_NBINS, DEFAULT_NCP_PRIOR,
    DEFAULT_SNAP_TOLERANCE, MAX_NBINS, OffPeakConfig, validate_ncp_prior,
};
pub use error::{ErrorKind, OffPeakError};
pub use histogram::{WRAP_PERIODS, WRAP_START, WrappedHistogram};
pub use phase::{OffPeakWindow, PhaseRange, validate_phases};

/// Core shared types and traits for offpeak-rs.
pub fn crate_name() -> &'static str {
    "offpeak-core"
}
