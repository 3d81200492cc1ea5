// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::OffPeakError;
use crate::phase::validate_phases;

/// Number of periods the wrapped histogram spans.
pub const WRAP_PERIODS: usize = 3;

/// Left edge of the wrapped grid, in phase units.
pub const WRAP_START: f64 = -1.0;

/// Phase histogram replicated over `[-1, 2)` so the segmentation sees
/// continuity across phase 0/1.
///
/// Each phase is placed once in the fundamental period and its count is
/// copied to the bins `nbins` to the left and right, which is the same as
/// histogramming `phases ∪ (phases - 1) ∪ (phases + 1)` but keeps the three
/// periods bit-for-bit identical.
#[derive(Clone, Debug, PartialEq)]
pub struct WrappedHistogram {
    nbins: usize,
    contents: Vec<f64>,
    sizes: Vec<f64>,
}

impl WrappedHistogram {
    pub fn build(phases: &[f64], nbins: usize) -> Result<Self, OffPeakError> {
        if nbins == 0 {
            return Err(OffPeakError::invalid_input("nbins must be >= 1; got 0"));
        }
        validate_phases(phases)?;

        let total_bins = nbins.checked_mul(WRAP_PERIODS).ok_or_else(|| {
            OffPeakError::invalid_input(format!("nbins={nbins} overflows the wrapped grid"))
        })?;

        let mut period = vec![0u64; nbins];
        for &phase in phases {
            // phase < 1 keeps the index below nbins except for rounding at the top edge.
            let idx = ((phase * nbins as f64).floor() as usize).min(nbins - 1);
            period[idx] += 1;
        }

        let mut contents = Vec::with_capacity(total_bins);
        for _ in 0..WRAP_PERIODS {
            contents.extend(period.iter().map(|&count| count as f64));
        }

        let width = 1.0 / nbins as f64;
        Ok(Self {
            nbins,
            contents,
            sizes: vec![width; total_bins],
        })
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    pub fn tstart(&self) -> f64 {
        WRAP_START
    }

    pub fn bin_width(&self) -> f64 {
        1.0 / self.nbins as f64
    }

    /// Per-bin counts over the wrapped grid.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// Per-bin widths, all equal to [`Self::bin_width`].
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// Bin edges, `contents().len() + 1` values from -1 to 2.
    pub fn edges(&self) -> Vec<f64> {
        let total = self.contents.len();
        (0..=total)
            .map(|i| WRAP_START + (WRAP_PERIODS as f64) * (i as f64) / (total as f64))
            .collect()
    }

    /// Total count over the wrapped grid (three times the sample count).
    pub fn total_count(&self) -> f64 {
        self.contents.iter().sum()
    }
}
