// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod bayesian;

pub use bayesian::{BayesianBlocks, BlockRun};

/// Segmentation namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = offpeak_core::crate_name();
    "offpeak-blocks"
}
