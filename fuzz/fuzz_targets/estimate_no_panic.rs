// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use libfuzzer_sys::fuzz_target;
use offpeak_core::{ErrorKind, OffPeakConfig};
use offpeak_estimator::OffPeakEstimator;

fn build_phase(mode_seed: u8, raw_seed: u16, raw_bits: f64) -> f64 {
    match mode_seed % 8 {
        0 => raw_bits,
        1 => 1.0,
        2 => -f64::from(raw_seed) / 65_536.0,
        3 => f64::NAN,
        _ => f64::from(raw_seed) / 65_536.0,
    }
}

fn build_config(cursor: &mut common::ByteCursor<'_>) -> OffPeakConfig {
    let nbins = common::bounded(cursor.next_u8(), 0, 200);
    let ncp_prior = match cursor.next_u8() % 6 {
        0 => 0.0,
        1 => f64::NAN,
        _ => 0.25 + f64::from(cursor.next_u8()) / 16.0,
    };
    let margin_fraction = f64::from(cursor.next_u8()) / 400.0;

    OffPeakConfig {
        nbins,
        ncp_prior,
        margin_fraction,
        ..OffPeakConfig::default()
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let config = build_config(&mut cursor);

    let Ok(estimator) = OffPeakEstimator::with_config(config) else {
        return;
    };

    let payload_len = common::bounded(cursor.next_u8(), 0, 128).saturating_mul(8);
    let raw = common::decode_f64_chunks(&cursor.take_padded(payload_len), 128);
    let count = common::bounded(cursor.next_u8(), 0, 255);

    let mut phases = Vec::with_capacity(count);
    for idx in 0..count {
        let raw_bits = raw.get(idx % raw.len().max(1)).copied().unwrap_or(0.5);
        phases.push(build_phase(cursor.next_u8(), cursor.next_u16(), raw_bits));
    }

    let all_valid = !phases.is_empty()
        && phases
            .iter()
            .all(|phase| phase.is_finite() && (0.0..1.0).contains(phase));
    match estimator.analyze(&phases) {
        Ok(result) => {
            assert!(all_valid, "invalid phases must be rejected");
            assert!(0.0 <= result.window.phase_min);
            assert!(result.window.phase_min < result.window.phase_max);
            assert!(result.window.phase_max <= 1.0);
        }
        Err(err) => {
            if !all_valid {
                assert_eq!(err.kind(), ErrorKind::InvalidInput);
            }
        }
    }
});
