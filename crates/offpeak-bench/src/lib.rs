// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic synthetic light curves shared by the benchmarks.

use offpeak_core::{OffPeakError, WrappedHistogram};

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

fn lcg_unit(state: &mut u64) -> f64 {
    (lcg_next(state) >> 11) as f64 / (1u64 << 53) as f64
}

/// Draws `n` phases from a profile with a Gaussian-ish pulse at phase 0.3 on
/// top of a flat background holding `background` of the photons.
pub fn pulsed_phases(n: usize, background: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let mut phases = Vec::with_capacity(n);
    for _ in 0..n {
        let phase = if lcg_unit(&mut state) < background {
            lcg_unit(&mut state)
        } else {
            // sum of uniforms, width ~0.03 around the pulse centre
            let jitter = (0..4).map(|_| lcg_unit(&mut state)).sum::<f64>() - 2.0;
            (0.3 + 0.03 * jitter).rem_euclid(1.0)
        };
        phases.push(phase.min(1.0 - f64::EPSILON));
    }
    phases
}

/// Wrapped histogram of [`pulsed_phases`], ready for a segmenter.
pub fn pulsed_histogram(
    n: usize,
    nbins: usize,
    seed: u64,
) -> Result<WrappedHistogram, OffPeakError> {
    WrappedHistogram::build(&pulsed_phases(n, 0.7, seed), nbins)
}
