// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use offpeak_estimator::{
    BinnedSegmenter, BlockDecomposition, ErrorKind, OffPeakConfig, OffPeakError, OffPeakEstimator,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

const MIN_PROPTEST_CASES: u32 = 1000;
const NBINS: usize = 50;
const HIGH_COUNT: usize = 40;
const LOW_COUNT: usize = 2;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

/// Replays a periodic decomposition built from one period of cut points.
#[derive(Clone, Debug)]
struct PeriodicSegmenter {
    cuts: Vec<f64>,
    heights: Vec<f64>,
}

impl PeriodicSegmenter {
    fn from_cells(cells: &[usize], heights: &[f64]) -> Self {
        Self {
            cuts: cells.iter().map(|&c| c as f64 / NBINS as f64).collect(),
            heights: heights.to_vec(),
        }
    }

    fn wrap_height(&self) -> f64 {
        self.heights[self.heights.len() - 1]
    }
}

impl BinnedSegmenter for PeriodicSegmenter {
    fn name(&self) -> &'static str {
        "periodic_stub"
    }

    fn segment(
        &self,
        tstart: f64,
        _contents: &[f64],
        _sizes: &[f64],
        _ncp_prior: f64,
    ) -> Result<BlockDecomposition, OffPeakError> {
        let mut xx = vec![tstart];
        let mut yy = vec![self.wrap_height()];
        for shift in [-1.0, 0.0, 1.0] {
            for (cut, height) in self.cuts.iter().zip(&self.heights) {
                xx.push(cut + shift);
                yy.push(*height);
            }
        }
        xx.push(tstart + 3.0);
        BlockDecomposition::new(xx, yy)
    }
}

fn sorted_cells() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(1usize..NBINS, 1..6).prop_map(|set| set.into_iter().collect())
}

fn periodic_case() -> impl Strategy<Value = (Vec<usize>, Vec<f64>)> {
    sorted_cells().prop_flat_map(|cells| {
        let k = cells.len();
        (Just(cells), prop::collection::vec(0.1f64..100.0, k))
    })
}

fn valid_phases() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1.0, 1..64)
}

/// Two-level light curve: `LOW_COUNT` photons per bin in `[low_start, low_end)`,
/// `HIGH_COUNT` elsewhere, spread evenly inside each bin.
fn two_level_phases(low_start: usize, low_end: usize) -> Vec<f64> {
    let mut phases = Vec::new();
    for bin in 0..NBINS {
        let count = if (low_start..low_end).contains(&bin) {
            LOW_COUNT
        } else {
            HIGH_COUNT
        };
        for j in 0..count {
            let offset = (j as f64 + 0.5) / count as f64;
            phases.push((bin as f64 + offset) / NBINS as f64);
        }
    }
    phases
}

fn off_pulse_case() -> impl Strategy<Value = (usize, usize, i64)> {
    // shifts may put the low block's edge exactly on phase 0 or phase 1
    (0usize..=29, 5usize..=20).prop_flat_map(|(start, width)| {
        let end = start + width;
        let min_shift = -(start as i64);
        let max_shift = (NBINS - end) as i64;
        (Just(start), Just(width), min_shift..=max_shift)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn window_stays_inside_period_and_lowest_block(
        (cells, heights) in periodic_case(),
        phases in valid_phases(),
    ) {
        let segmenter = PeriodicSegmenter::from_cells(&cells, &heights);
        let estimator = OffPeakEstimator::new(segmenter, OffPeakConfig::default())
            .expect("default config should be valid");
        let result = estimator.analyze(&phases).expect("periodic decomposition should succeed");

        let window = result.window;
        prop_assert!(0.0 <= window.phase_min);
        prop_assert!(window.phase_min < window.phase_max);
        prop_assert!(window.phase_max <= 1.0);

        let min_height = heights.iter().copied().fold(f64::INFINITY, f64::min);
        prop_assert_eq!(result.blocks.heights()[result.block_index], min_height);
        prop_assert!(result.raw_block.phase_min < window.phase_min);
        prop_assert!(window.phase_max < result.raw_block.phase_max);

        let margin = 0.1 * result.raw_block.width();
        prop_assert!((window.phase_min - (result.raw_block.phase_min + margin)).abs() < 1e-12);
        prop_assert!((window.phase_max - (result.raw_block.phase_max - margin)).abs() < 1e-12);

        let bps = result.blocks.breakpoints();
        prop_assert_eq!(bps[0], 0.0);
        prop_assert_eq!(bps[bps.len() - 1], 1.0);
    }

    #[test]
    fn out_of_range_phase_is_rejected(
        mut phases in valid_phases(),
        bad in prop_oneof![1.0f64..10.0, -10.0f64..-1.0e-12],
        position in any::<prop::sample::Index>(),
    ) {
        let idx = position.index(phases.len() + 1);
        phases.insert(idx, bad);
        let err = OffPeakEstimator::default()
            .estimate(&phases)
            .expect_err("out of range phase should fail");
        prop_assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn rotating_light_curve_rotates_window(
        (start, width, shift) in off_pulse_case(),
    ) {
        let estimator = OffPeakEstimator::default();
        let base = estimator
            .estimate(&two_level_phases(start, start + width))
            .expect("two-level light curve should succeed");

        let shifted_start = (start as i64 + shift) as usize;
        let rotated = estimator
            .estimate(&two_level_phases(shifted_start, shifted_start + width))
            .expect("rotated light curve should succeed");

        let delta = shift as f64 / NBINS as f64;
        prop_assert!((rotated.phase_min - (base.phase_min + delta)).abs() < 1e-9);
        prop_assert!((rotated.phase_max - (base.phase_max + delta)).abs() < 1e-9);

        let low = start as f64 / NBINS as f64;
        let high = (start + width) as f64 / NBINS as f64;
        let margin = 0.1 * (high - low);
        prop_assert!((base.phase_min - (low + margin)).abs() < 1e-9);
        prop_assert!((base.phase_max - (high - margin)).abs() < 1e-9);
    }
}
