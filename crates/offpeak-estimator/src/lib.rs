// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod batch;
pub mod estimator;

pub use batch::estimate_many;
pub use estimator::{EstimateDiagnostics, OffPeakEstimator, OffPeakResult, estimate_off_peak};
pub use offpeak_blocks::BayesianBlocks;
pub use offpeak_core::{
    BinnedSegmenter, BlockDecomposition, ErrorKind, OffPeakConfig, OffPeakError, OffPeakWindow,
    PhaseRange,
};

/// Estimator namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (offpeak_core::crate_name(), offpeak_blocks::crate_name());
    "offpeak-estimator"
}
