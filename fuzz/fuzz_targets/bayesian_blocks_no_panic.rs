// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use libfuzzer_sys::fuzz_target;
use offpeak_blocks::BayesianBlocks;

fn build_count(mode_seed: u8, raw: u8) -> f64 {
    match mode_seed % 10 {
        0 => 0.0,
        1 => -1.0,
        2 => f64::NAN,
        3 => f64::INFINITY,
        _ => f64::from(raw),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let ncells = common::bounded(cursor.next_u8(), 0, 160);
    let ncp_prior = f64::from(cursor.next_u8()) / 8.0;
    let tstart = -f64::from(cursor.next_u8()) / 16.0;

    let mut contents = Vec::with_capacity(ncells);
    let mut sizes = Vec::with_capacity(ncells);
    for _ in 0..ncells {
        contents.push(build_count(cursor.next_u8(), cursor.next_u8()));
        sizes.push(match cursor.next_u8() % 12 {
            0 => 0.0,
            1 => -0.5,
            seed => f64::from(seed) / 32.0,
        });
    }

    if let Ok(run) = BayesianBlocks::new().run(tstart, &contents, &sizes, ncp_prior) {
        let xx = run.decomposition.breakpoints();
        assert_eq!(xx.len(), run.decomposition.heights().len() + 1);
        assert!(xx.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(run.cell_edges.first().copied(), Some(0));
        assert_eq!(run.cell_edges.last().copied(), Some(ncells));
    }
});
