// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use offpeak_core::{OffPeakConfig, OffPeakError};
use offpeak_estimator::{OffPeakEstimator, OffPeakResult};

/// Runs the Bayesian Blocks off-peak estimator with `config` over `phases`.
pub fn run_estimate(
    phases: &[f64],
    config: &OffPeakConfig,
) -> Result<OffPeakResult, OffPeakError> {
    OffPeakEstimator::with_config(config.clone())?.analyze(phases)
}

/// Parses a JSON config document and runs the estimator.
pub fn run_estimate_json(
    phases: &[f64],
    config_json: &str,
) -> Result<OffPeakResult, OffPeakError> {
    let config: OffPeakConfig = serde_json::from_str(config_json)
        .map_err(|err| OffPeakError::invalid_input(format!("invalid config JSON: {err}")))?;
    run_estimate(phases, &config)
}

/// CLI namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (
        offpeak_core::crate_name(),
        offpeak_blocks::crate_name(),
        offpeak_estimator::crate_name(),
    );
    "offpeak-cli"
}
