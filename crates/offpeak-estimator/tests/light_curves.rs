// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use offpeak_estimator::{
    BayesianBlocks, ErrorKind, OffPeakConfig, OffPeakEstimator, estimate_many, estimate_off_peak,
};

const NBINS: usize = 50;

/// Builds phases from per-bin photon counts, spreading photons evenly in each bin.
fn phases_from_profile(counts: &[usize]) -> Vec<f64> {
    let nbins = counts.len() as f64;
    let mut phases = Vec::new();
    for (bin, &count) in counts.iter().enumerate() {
        for j in 0..count {
            let offset = (j as f64 + 0.5) / count as f64;
            phases.push((bin as f64 + offset) / nbins);
        }
    }
    phases
}

fn two_level_profile(
    low: std::ops::Range<usize>,
    low_count: usize,
    high_count: usize,
) -> Vec<usize> {
    (0..NBINS)
        .map(|bin| if low.contains(&bin) { low_count } else { high_count })
        .collect()
}

/// Two narrow peaks joined by a bridge, a shoulder leading into the first
/// peak, and a flat background between the second peak and the shoulder.
fn double_peaked_profile() -> Vec<usize> {
    let mut counts = vec![3usize; NBINS];
    for bin in (45..50).chain(0..5) {
        counts[bin] = 10;
    }
    for bin in 5..12 {
        counts[bin] = 60;
    }
    for bin in 12..25 {
        counts[bin] = 15;
    }
    for bin in 25..33 {
        counts[bin] = 45;
    }
    counts
}

fn lcg_unit(state: &mut u64) -> f64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*state >> 11) as f64 / (1u64 << 53) as f64
}

/// Photons drawn at random: a flat background holding `background` of them
/// and a pulse of half-width ~0.08 centred on `center`.
fn noisy_pulsed_phases(n: usize, background: f64, center: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            let phase = if lcg_unit(&mut state) < background {
                lcg_unit(&mut state)
            } else {
                let jitter = (0..4).map(|_| lcg_unit(&mut state)).sum::<f64>() - 2.0;
                (center + 0.04 * jitter).rem_euclid(1.0)
            };
            phase.min(1.0 - f64::EPSILON)
        })
        .collect()
}

#[test]
fn sharp_low_block_is_shrunk_by_ten_percent() {
    let phases = phases_from_profile(&two_level_profile(30..40, 2, 40));
    let window = estimate_off_peak(&phases, 5.0).expect("two-level curve should succeed");

    assert!((window.phase_min - 0.62).abs() < 1e-9, "got {window:?}");
    assert!((window.phase_max - 0.78).abs() < 1e-9, "got {window:?}");
}

#[test]
fn analyze_reports_trimmed_blocks_for_two_level_curve() {
    let phases = phases_from_profile(&two_level_profile(30..40, 2, 40));
    let result = OffPeakEstimator::default()
        .analyze(&phases)
        .expect("two-level curve should succeed");

    assert_eq!(result.blocks.n_blocks(), 3);
    assert_eq!(result.block_index, 1);
    let bps = result.blocks.breakpoints();
    assert_eq!(bps[0], 0.0);
    assert_eq!(bps[3], 1.0);
    assert!((bps[1] - 0.6).abs() < 1e-9);
    assert!((bps[2] - 0.8).abs() < 1e-9);

    let heights = result.blocks.heights();
    assert!((heights[0] - heights[2]).abs() / heights[0] < 1e-9);
    assert!((heights[1] - 100.0).abs() < 1e-6, "low rate is 2 per 1/50");
    assert!((heights[0] - 2_000.0).abs() < 1e-6, "high rate is 40 per 1/50");

    assert_eq!(result.diagnostics.raw_block_count, 7);
    assert_eq!(result.diagnostics.n_samples, phases.len());
    assert_eq!(result.diagnostics.segmenter, "bayesian_blocks_binned");
}

#[test]
fn off_pulse_between_peaks_is_found_in_background() {
    let phases = phases_from_profile(&double_peaked_profile());
    let result = OffPeakEstimator::default()
        .analyze(&phases)
        .expect("double-peaked curve should succeed");

    assert_eq!(result.blocks.n_blocks(), 6);
    assert_eq!(result.block_index, 4);
    assert!((result.raw_block.phase_min - 0.66).abs() < 1e-9);
    assert!((result.raw_block.phase_max - 0.90).abs() < 1e-9);
    assert!((result.window.phase_min - 0.684).abs() < 1e-9, "got {:?}", result.window);
    assert!((result.window.phase_max - 0.876).abs() < 1e-9, "got {:?}", result.window);
}

#[test]
fn off_pulse_straddling_zero_keeps_leading_piece() {
    // background in bins 45..50 and 0..5: split by the period edge into two
    // equal-height pieces; the earliest one wins the tie
    let mut counts = vec![40usize; NBINS];
    for bin in (45..50).chain(0..5) {
        counts[bin] = 2;
    }
    let result = OffPeakEstimator::default()
        .analyze(&phases_from_profile(&counts))
        .expect("wrapped off-pulse should succeed");

    assert_eq!(result.block_index, 0);
    assert_eq!(result.raw_block.phase_min, 0.0);
    assert!((result.raw_block.phase_max - 0.1).abs() < 1e-9);
    assert!((result.window.phase_min - 0.01).abs() < 1e-9);
    assert!((result.window.phase_max - 0.09).abs() < 1e-9);
}

#[test]
fn pulse_edge_on_phase_zero_keeps_background_block() {
    // pulse fills bins 0..10, so change points land on phase 0 and phase 1
    let phases = phases_from_profile(&two_level_profile(10..50, 2, 40));
    let result = OffPeakEstimator::default()
        .analyze(&phases)
        .expect("pulse starting on phase 0 should succeed");

    assert_eq!(result.diagnostics.raw_block_count, 6);
    assert_eq!(result.blocks.n_blocks(), 2);
    assert_eq!(result.block_index, 1);
    assert!(result.diagnostics.boundary_mismatch <= 1e-9);

    let heights = result.blocks.heights();
    assert!((heights[0] - 2_000.0).abs() < 1e-6, "pulse rate is 40 per 1/50");
    assert!((heights[1] - 100.0).abs() < 1e-6, "background rate is 2 per 1/50");

    assert!((result.raw_block.phase_min - 0.2).abs() < 1e-9);
    assert_eq!(result.raw_block.phase_max, 1.0);
    assert!((result.window.phase_min - 0.28).abs() < 1e-9, "got {:?}", result.window);
    assert!((result.window.phase_max - 0.92).abs() < 1e-9, "got {:?}", result.window);
}

#[test]
fn noisy_pulsed_light_curve_yields_window_off_the_pulse() {
    let phases = noisy_pulsed_phases(20_000, 0.6, 0.5, 0x5eed_f00d_u64);
    let window = OffPeakEstimator::default()
        .estimate(&phases)
        .expect("noisy pulsed curve should succeed");

    assert!(0.0 <= window.phase_min && window.phase_max <= 1.0);
    assert!(window.phase_min < window.phase_max);
    assert!(!window.contains(0.5), "window {window:?} overlaps the pulse peak");
}

#[test]
fn coarser_binning_still_recovers_edges_on_grid() {
    let counts = (0..10)
        .map(|bin| if (6..8).contains(&bin) { 5 } else { 200 })
        .collect::<Vec<usize>>();
    let estimator = OffPeakEstimator::with_config(OffPeakConfig::default().with_nbins(10))
        .expect("config should be valid");
    let window = estimator
        .estimate(&phases_from_profile(&counts))
        .expect("coarse curve should succeed");

    assert!((window.phase_min - 0.62).abs() < 1e-9, "got {window:?}");
    assert!((window.phase_max - 0.78).abs() < 1e-9, "got {window:?}");
}

#[test]
fn phase_of_one_is_rejected_before_segmentation() {
    let err = estimate_off_peak(&[0.1, 0.2, 1.0], 5.0).expect_err("phase 1.0 should fail");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = estimate_off_peak(&[-0.01, 0.2], 5.0).expect_err("phase -0.01 should fail");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn batch_matches_single_estimates() {
    let estimator = OffPeakEstimator::new(BayesianBlocks::new(), OffPeakConfig::default())
        .expect("config should be valid");
    let pulsars = vec![
        phases_from_profile(&two_level_profile(30..40, 2, 40)),
        phases_from_profile(&two_level_profile(10..18, 1, 30)),
        phases_from_profile(&double_peaked_profile()),
    ];

    let batch = estimate_many(&estimator, &pulsars);
    for (phases, result) in pulsars.iter().zip(batch) {
        let single = estimator.estimate(phases).expect("single estimate should succeed");
        let batched = result.expect("batched estimate should succeed");
        assert_eq!(batched.window, single);
    }
}

#[cfg(feature = "serde")]
#[test]
fn result_serializes_window_and_blocks() {
    let phases = phases_from_profile(&two_level_profile(30..40, 2, 40));
    let result = OffPeakEstimator::default()
        .analyze(&phases)
        .expect("two-level curve should succeed");

    let value = serde_json::to_value(&result).expect("result should serialize");
    assert!(value["window"]["phase_min"].is_number());
    assert_eq!(
        value["blocks"]["xx"].as_array().map(Vec::len),
        Some(4),
        "unexpected blocks payload: {value}"
    );
    assert_eq!(value["diagnostics"]["nbins"], serde_json::json!(50));
}
