// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::OffPeakError;

/// Piecewise-constant density: block `i` spans `[xx[i], xx[i + 1])` with
/// height `yy[i]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct BlockDecomposition {
    xx: Vec<f64>,
    yy: Vec<f64>,
}

impl BlockDecomposition {
    /// Validates breakpoint ordering, shape and height finiteness.
    pub fn new(xx: Vec<f64>, yy: Vec<f64>) -> Result<Self, OffPeakError> {
        if xx.len() < 2 {
            return Err(OffPeakError::segmentation(format!(
                "decomposition needs at least 2 breakpoints; got {}",
                xx.len()
            )));
        }
        if yy.len() + 1 != xx.len() {
            return Err(OffPeakError::segmentation(format!(
                "block count mismatch: {} breakpoints require {} heights, got {}",
                xx.len(),
                xx.len() - 1,
                yy.len()
            )));
        }
        if let Some((idx, x)) = xx.iter().copied().enumerate().find(|(_, x)| !x.is_finite()) {
            return Err(OffPeakError::segmentation(format!(
                "non-finite breakpoint at index {idx}: {x}"
            )));
        }
        if let Some(idx) = xx.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(OffPeakError::segmentation(format!(
                "breakpoints must be strictly increasing; xx[{}]={} >= xx[{}]={}",
                idx,
                xx[idx],
                idx + 1,
                xx[idx + 1]
            )));
        }
        if let Some((idx, y)) = yy.iter().copied().enumerate().find(|(_, y)| !y.is_finite()) {
            return Err(OffPeakError::segmentation(format!(
                "non-finite block height at index {idx}: {y}"
            )));
        }

        Ok(Self { xx, yy })
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.xx
    }

    pub fn heights(&self) -> &[f64] {
        &self.yy
    }

    pub fn n_blocks(&self) -> usize {
        self.yy.len()
    }

    /// Returns `(start, end, height)` of block `idx`.
    pub fn block(&self, idx: usize) -> Option<(f64, f64, f64)> {
        let height = *self.yy.get(idx)?;
        Some((self.xx[idx], self.xx[idx + 1], height))
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.xx, self.yy)
    }
}

/// Binned changepoint segmentation primitive.
///
/// Implementations receive `(content, size)` pairs per bin starting at
/// `tstart` and return a step-function approximation of the rate.
pub trait BinnedSegmenter {
    fn name(&self) -> &'static str;

    fn segment(
        &self,
        tstart: f64,
        contents: &[f64],
        sizes: &[f64],
        ncp_prior: f64,
    ) -> Result<BlockDecomposition, OffPeakError>;
}

impl<S: BinnedSegmenter + ?Sized> BinnedSegmenter for &S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn segment(
        &self,
        tstart: f64,
        contents: &[f64],
        sizes: &[f64],
        ncp_prior: f64,
    ) -> Result<BlockDecomposition, OffPeakError> {
        (**self).segment(tstart, contents, sizes, ncp_prior)
    }
}
