// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::OffPeakError;

pub const DEFAULT_NBINS: usize = 50;
pub const DEFAULT_NCP_PRIOR: f64 = 5.0;
pub const DEFAULT_MARGIN_FRACTION: f64 = 0.1;
pub const DEFAULT_BOUNDARY_RTOL: f64 = 1.0e-9;
pub const DEFAULT_SNAP_TOLERANCE: f64 = 1.0e-9;

/// Largest accepted `nbins`. Bayesian Blocks is quadratic in the
/// `3 * nbins` wrapped cells.
pub const MAX_NBINS: usize = 4096;

/// Configuration for the off-peak estimator.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[derive(Clone, Debug, PartialEq)]
pub struct OffPeakConfig {
    /// Bins per period; the wrapped histogram has three times as many.
    pub nbins: usize,
    /// Penalty per extra block; larger values give coarser decompositions.
    pub ncp_prior: f64,
    /// Fraction of the lowest block trimmed from each side.
    pub margin_fraction: f64,
    /// Relative tolerance when comparing the heights of the two boundary blocks.
    pub boundary_rtol: f64,
    /// Breakpoints this close to phase 0 or 1 are treated as lying on it.
    pub snap_tolerance: f64,
}

impl Default for OffPeakConfig {
    fn default() -> Self {
        Self {
            nbins: DEFAULT_NBINS,
            ncp_prior: DEFAULT_NCP_PRIOR,
            margin_fraction: DEFAULT_MARGIN_FRACTION,
            boundary_rtol: DEFAULT_BOUNDARY_RTOL,
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
        }
    }
}

impl OffPeakConfig {
    pub fn with_ncp_prior(mut self, ncp_prior: f64) -> Self {
        self.ncp_prior = ncp_prior;
        self
    }

    pub fn with_nbins(mut self, nbins: usize) -> Self {
        self.nbins = nbins;
        self
    }

    pub fn validate(&self) -> Result<(), OffPeakError> {
        if self.nbins == 0 || self.nbins > MAX_NBINS {
            return Err(OffPeakError::invalid_input(format!(
                "OffPeakConfig.nbins must be in [1, {MAX_NBINS}]; got {}",
                self.nbins
            )));
        }
        validate_ncp_prior(self.ncp_prior)?;
        if !self.margin_fraction.is_finite()
            || self.margin_fraction < 0.0
            || self.margin_fraction >= 0.5
        {
            return Err(OffPeakError::invalid_input(format!(
                "OffPeakConfig.margin_fraction must be in [0, 0.5); got {}",
                self.margin_fraction
            )));
        }
        if !self.boundary_rtol.is_finite() || self.boundary_rtol < 0.0 {
            return Err(OffPeakError::invalid_input(format!(
                "OffPeakConfig.boundary_rtol must be finite and >= 0; got {}",
                self.boundary_rtol
            )));
        }
        if !self.snap_tolerance.is_finite() || self.snap_tolerance < 0.0 {
            return Err(OffPeakError::invalid_input(format!(
                "OffPeakConfig.snap_tolerance must be finite and >= 0; got {}",
                self.snap_tolerance
            )));
        }
        Ok(())
    }
}

pub fn validate_ncp_prior(ncp_prior: f64) -> Result<(), OffPeakError> {
    if !ncp_prior.is_finite() || ncp_prior <= 0.0 {
        return Err(OffPeakError::invalid_input(format!(
            "ncp_prior must be finite and > 0; got {ncp_prior}"
        )));
    }
    Ok(())
}
