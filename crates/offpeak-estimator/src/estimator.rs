// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use log::{debug, trace, warn};
use offpeak_blocks::BayesianBlocks;
use offpeak_core::{
    BinnedSegmenter, BlockDecomposition, OffPeakConfig, OffPeakError, OffPeakWindow, PhaseRange,
    WrappedHistogram,
};
use std::time::Instant;

/// Per-call metadata captured alongside an [`OffPeakResult`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateDiagnostics {
    pub n_samples: usize,
    pub nbins: usize,
    pub ncp_prior: f64,
    pub segmenter: String,
    /// Blocks returned by the segmenter over the wrapped grid.
    pub raw_block_count: usize,
    /// Blocks left after trimming to one period.
    pub retained_block_count: usize,
    /// Relative height difference between the two boundary blocks.
    pub boundary_mismatch: f64,
    pub runtime_ms: Option<u64>,
}

/// Full output of [`OffPeakEstimator::analyze`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OffPeakResult {
    /// Lowest block with the margin removed from both sides.
    pub window: OffPeakWindow,
    /// Lowest block before the margin shrink.
    pub raw_block: PhaseRange,
    /// Index of the lowest block within `blocks`.
    pub block_index: usize,
    /// Decomposition restricted to `[0, 1]`, first and last breakpoints clamped.
    pub blocks: BlockDecomposition,
    pub diagnostics: EstimateDiagnostics,
}

/// Estimates the off-pulse phase window of a pulsar light curve.
#[derive(Clone, Debug)]
pub struct OffPeakEstimator<S = BayesianBlocks> {
    segmenter: S,
    config: OffPeakConfig,
}

impl OffPeakEstimator<BayesianBlocks> {
    /// Estimator backed by the built-in binned Bayesian Blocks.
    pub fn with_config(config: OffPeakConfig) -> Result<Self, OffPeakError> {
        Self::new(BayesianBlocks::new(), config)
    }
}

impl Default for OffPeakEstimator<BayesianBlocks> {
    fn default() -> Self {
        Self {
            segmenter: BayesianBlocks::new(),
            config: OffPeakConfig::default(),
        }
    }
}

impl<S: BinnedSegmenter> OffPeakEstimator<S> {
    pub fn new(segmenter: S, config: OffPeakConfig) -> Result<Self, OffPeakError> {
        config.validate()?;
        Ok(Self { segmenter, config })
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    pub fn config(&self) -> &OffPeakConfig {
        &self.config
    }

    /// Returns only the off-peak window.
    pub fn estimate(&self, phases: &[f64]) -> Result<OffPeakWindow, OffPeakError> {
        Ok(self.analyze(phases)?.window)
    }

    /// Runs wrap, bin, segment, trim and argmin, returning every intermediate
    /// the caller may want to inspect.
    pub fn analyze(&self, phases: &[f64]) -> Result<OffPeakResult, OffPeakError> {
        let started_at = Instant::now();
        let histogram = WrappedHistogram::build(phases, self.config.nbins)?;
        let raw = self.segmenter.segment(
            histogram.tstart(),
            histogram.contents(),
            histogram.sizes(),
            self.config.ncp_prior,
        )?;
        check_finite_heights(raw.heights())?;
        trace!(
            "{} returned breakpoints {:?} heights {:?}",
            self.segmenter.name(),
            raw.breakpoints(),
            raw.heights()
        );

        let trimmed = trim_to_period(&raw, &self.config)?;
        let block_index = argmin_leftmost(trimmed.blocks.heights());
        let (start, end, height) = trimmed.blocks.block(block_index).ok_or_else(|| {
            OffPeakError::segmentation(format!(
                "lowest block index {block_index} outside trimmed decomposition"
            ))
        })?;
        let raw_block = PhaseRange::new(start, end).map_err(|err| {
            OffPeakError::segmentation(format!("lowest block is degenerate: {}", err.message()))
        })?;
        let window = shrink_by_margin(&raw_block, self.config.margin_fraction)?;

        debug!(
            "off-peak: n={}, blocks={}/{}, lowest block {} [{start}, {end}) height={height}, window=[{}, {})",
            phases.len(),
            trimmed.blocks.n_blocks(),
            raw.n_blocks(),
            block_index,
            window.phase_min,
            window.phase_max
        );

        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).ok();
        Ok(OffPeakResult {
            window,
            raw_block,
            block_index,
            diagnostics: EstimateDiagnostics {
                n_samples: phases.len(),
                nbins: self.config.nbins,
                ncp_prior: self.config.ncp_prior,
                segmenter: self.segmenter.name().to_string(),
                raw_block_count: raw.n_blocks(),
                retained_block_count: trimmed.blocks.n_blocks(),
                boundary_mismatch: trimmed.boundary_mismatch,
                runtime_ms,
            },
            blocks: trimmed.blocks,
        })
    }
}

/// Estimates the off-peak window with the built-in Bayesian Blocks and the
/// default binning.
pub fn estimate_off_peak(phases: &[f64], ncp_prior: f64) -> Result<OffPeakWindow, OffPeakError> {
    OffPeakEstimator::with_config(OffPeakConfig::default().with_ncp_prior(ncp_prior))?
        .estimate(phases)
}

#[derive(Debug)]
struct TrimmedBlocks {
    blocks: BlockDecomposition,
    boundary_mismatch: f64,
}

fn check_finite_heights(heights: &[f64]) -> Result<(), OffPeakError> {
    if let Some((idx, y)) = heights
        .iter()
        .copied()
        .enumerate()
        .find(|(_, y)| !y.is_finite())
    {
        return Err(OffPeakError::segmentation(format!(
            "segmentation returned non-finite block height at index {idx}: {y}"
        )));
    }
    Ok(())
}

fn snap_to_period_edge(x: f64, tolerance: f64) -> f64 {
    if x.abs() <= tolerance {
        0.0
    } else if (x - 1.0).abs() <= tolerance {
        1.0
    } else {
        x
    }
}

fn relative_mismatch(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

fn trim_to_period(
    raw: &BlockDecomposition,
    config: &OffPeakConfig,
) -> Result<TrimmedBlocks, OffPeakError> {
    let xx = raw
        .breakpoints()
        .iter()
        .map(|&x| snap_to_period_edge(x, config.snap_tolerance))
        .collect::<Vec<_>>();
    let yy = raw.heights();

    if let Some(idx) = xx.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(OffPeakError::segmentation(format!(
            "breakpoints {} and {} collapse onto the same period edge",
            raw.breakpoints()[idx],
            raw.breakpoints()[idx + 1]
        )));
    }

    let above_zero = xx.iter().position(|&x| x > 0.0).ok_or_else(|| {
        OffPeakError::segmentation("decomposition has no breakpoint above phase 0")
    })?;
    let first = above_zero.checked_sub(1).ok_or_else(|| {
        OffPeakError::segmentation(format!(
            "decomposition starts at {} and does not cover phase 0",
            xx[0]
        ))
    })?;
    let below_one = xx.iter().rposition(|&x| x < 1.0).ok_or_else(|| {
        OffPeakError::segmentation("decomposition has no breakpoint below phase 1")
    })?;
    let last = below_one + 1;
    if last >= xx.len() {
        return Err(OffPeakError::segmentation(format!(
            "decomposition ends at {} and does not cover phase 1",
            xx[xx.len() - 1]
        )));
    }

    // Block containing phase 0 and its periodic copy containing phase 1.
    // When a change point sits on the period edge, the copy is the block
    // starting at 1, which lies outside the retained range.
    let zero_idx = first;
    let one_idx = if xx[last] > 1.0 { last - 1 } else { last };
    let head = yy[zero_idx];
    let wrapped = *yy.get(one_idx).ok_or_else(|| {
        OffPeakError::segmentation(
            "decomposition ends at phase 1 and has no block covering phase 1",
        )
    })?;
    let boundary_mismatch = relative_mismatch(head, wrapped);
    if boundary_mismatch > config.boundary_rtol {
        return Err(OffPeakError::segmentation(format!(
            "boundary blocks disagree across the phase wrap: at 0 = {head}, at 1 = {wrapped}, relative mismatch {boundary_mismatch:e} > {:e}",
            config.boundary_rtol
        )));
    }
    if boundary_mismatch > 0.5 * config.boundary_rtol {
        warn!(
            "boundary blocks differ by {boundary_mismatch:e}, close to tolerance {:e}; using {head}",
            config.boundary_rtol
        );
    }

    let mut cut_xx = xx[first..=last].to_vec();
    let mut cut_yy = yy[first..last].to_vec();
    if xx[first] < 0.0 && xx[last] > 1.0 {
        // Head and tail pieces are the same block wrapping across phase 0/1.
        let tail_idx = cut_yy.len() - 1;
        cut_yy[tail_idx] = head;
    }
    cut_xx[0] = 0.0;
    let end = cut_xx.len() - 1;
    cut_xx[end] = 1.0;

    Ok(TrimmedBlocks {
        blocks: BlockDecomposition::new(cut_xx, cut_yy)?,
        boundary_mismatch,
    })
}

fn argmin_leftmost(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value < values[best_idx] {
            best_idx = idx;
        }
    }
    best_idx
}

fn shrink_by_margin(
    block: &PhaseRange,
    margin_fraction: f64,
) -> Result<OffPeakWindow, OffPeakError> {
    let width = block.width();
    let margin = margin_fraction * width;
    PhaseRange::new(block.phase_min + margin, block.phase_max - margin).map_err(|err| {
        OffPeakError::segmentation(format!(
            "lowest block [{}, {}) is too narrow for a {margin_fraction} margin: {}",
            block.phase_min,
            block.phase_max,
            err.message()
        ))
    })
}
