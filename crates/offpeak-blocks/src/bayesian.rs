// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use log::{debug, trace};
use offpeak_core::{BinnedSegmenter, BlockDecomposition, OffPeakError, validate_ncp_prior};

/// Binned Bayesian Blocks (Scargle et al. 2013) with the Poisson
/// block fitness `N * (ln N - ln T)`.
///
/// Cells are contiguous: cell `i` covers `[t_i, t_i + sizes[i])` with
/// `t_0 = tstart`. Every block beyond the first costs `ncp_prior`; among
/// equal-fitness partitions the one with the earliest last change point wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BayesianBlocks;

impl BayesianBlocks {
    pub const fn new() -> Self {
        Self
    }

    /// Runs the optimal-partitioning kernel and returns cell-level details.
    pub fn run(
        &self,
        tstart: f64,
        contents: &[f64],
        sizes: &[f64],
        ncp_prior: f64,
    ) -> Result<BlockRun, OffPeakError> {
        validate_inputs(tstart, contents, sizes, ncp_prior)?;

        let n = contents.len();
        let prefix_counts = prefix_sums(contents);
        let prefix_sizes = prefix_sums(sizes);

        let mut best = vec![f64::NEG_INFINITY; n + 1];
        let mut last_cp = vec![usize::MAX; n + 1];
        best[0] = 0.0;
        last_cp[0] = 0;

        for end in 1..=n {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_start = usize::MAX;

            for start in 0..end {
                let count = prefix_counts[end] - prefix_counts[start];
                let size = prefix_sizes[end] - prefix_sizes[start];
                let score = best[start] + block_fitness(count, size) - ncp_prior;
                if score > best_score {
                    best_score = score;
                    best_start = start;
                }
            }

            if best_start == usize::MAX || !best_score.is_finite() {
                return Err(OffPeakError::segmentation(format!(
                    "no finite partition reached cell {end}; best score {best_score}"
                )));
            }
            best[end] = best_score;
            last_cp[end] = best_start;
        }

        let edges = reconstruct_edges(n, &last_cp)?;
        let mut xx = Vec::with_capacity(edges.len());
        let mut yy = Vec::with_capacity(edges.len().saturating_sub(1));
        for &edge in &edges {
            xx.push(tstart + prefix_sizes[edge]);
        }
        for pair in edges.windows(2) {
            let count = prefix_counts[pair[1]] - prefix_counts[pair[0]];
            let size = prefix_sizes[pair[1]] - prefix_sizes[pair[0]];
            yy.push(count / size);
        }

        debug!(
            "bayesian blocks: cells={n}, ncp_prior={ncp_prior}, blocks={}, objective={}",
            yy.len(),
            best[n]
        );
        trace!("bayesian blocks breakpoints: {xx:?}");

        Ok(BlockRun {
            decomposition: BlockDecomposition::new(xx, yy)?,
            cell_edges: edges,
            objective: best[n],
        })
    }
}

/// Output of [`BayesianBlocks::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct BlockRun {
    pub decomposition: BlockDecomposition,
    /// Cell indices of block edges, from 0 to the cell count inclusive.
    pub cell_edges: Vec<usize>,
    /// Total fitness of the partition, block penalties included.
    pub objective: f64,
}

impl BinnedSegmenter for BayesianBlocks {
    fn name(&self) -> &'static str {
        "bayesian_blocks_binned"
    }

    fn segment(
        &self,
        tstart: f64,
        contents: &[f64],
        sizes: &[f64],
        ncp_prior: f64,
    ) -> Result<BlockDecomposition, OffPeakError> {
        Ok(self.run(tstart, contents, sizes, ncp_prior)?.decomposition)
    }
}

fn validate_inputs(
    tstart: f64,
    contents: &[f64],
    sizes: &[f64],
    ncp_prior: f64,
) -> Result<(), OffPeakError> {
    if !tstart.is_finite() {
        return Err(OffPeakError::invalid_input(format!(
            "tstart must be finite; got {tstart}"
        )));
    }
    validate_ncp_prior(ncp_prior)?;
    if contents.is_empty() {
        return Err(OffPeakError::invalid_input(
            "bayesian blocks requires at least one cell",
        ));
    }
    if contents.len() != sizes.len() {
        return Err(OffPeakError::invalid_input(format!(
            "contents/sizes length mismatch: {} vs {}",
            contents.len(),
            sizes.len()
        )));
    }
    if let Some((idx, c)) = contents
        .iter()
        .copied()
        .enumerate()
        .find(|(_, c)| !c.is_finite() || *c < 0.0)
    {
        return Err(OffPeakError::invalid_input(format!(
            "cell contents must be finite and >= 0; index {idx} has {c}"
        )));
    }
    if let Some((idx, s)) = sizes
        .iter()
        .copied()
        .enumerate()
        .find(|(_, s)| !s.is_finite() || *s <= 0.0)
    {
        return Err(OffPeakError::invalid_input(format!(
            "cell sizes must be finite and > 0; index {idx} has {s}"
        )));
    }
    Ok(())
}

fn prefix_sums(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len() + 1);
    let mut acc = 0.0;
    out.push(acc);
    for &v in values {
        acc += v;
        out.push(acc);
    }
    out
}

fn block_fitness(count: f64, size: f64) -> f64 {
    if count <= 0.0 {
        0.0
    } else {
        count * (count.ln() - size.ln())
    }
}

fn reconstruct_edges(n: usize, last_cp: &[usize]) -> Result<Vec<usize>, OffPeakError> {
    let mut reverse = vec![n];
    let mut cursor = n;
    while cursor > 0 {
        let start = last_cp[cursor];
        if start >= cursor {
            return Err(OffPeakError::segmentation(format!(
                "invalid backtrack state: predecessor {start} is not < {cursor}"
            )));
        }
        reverse.push(start);
        cursor = start;
    }
    reverse.reverse();
    Ok(reverse)
}
