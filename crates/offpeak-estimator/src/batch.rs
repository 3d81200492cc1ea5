// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::estimator::{OffPeakEstimator, OffPeakResult};
use offpeak_core::{BinnedSegmenter, OffPeakError};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Runs the estimator over independent pulsars.
///
/// Results keep the input order. With the `rayon` feature the pulsars are
/// processed in parallel.
pub fn estimate_many<S, P>(
    estimator: &OffPeakEstimator<S>,
    pulsars: &[P],
) -> Vec<Result<OffPeakResult, OffPeakError>>
where
    S: BinnedSegmenter + Sync,
    P: AsRef<[f64]> + Sync,
{
    #[cfg(feature = "rayon")]
    {
        pulsars
            .par_iter()
            .map(|phases| estimator.analyze(phases.as_ref()))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        pulsars
            .iter()
            .map(|phases| estimator.analyze(phases.as_ref()))
            .collect()
    }
}
