// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::OffPeakError;

/// Checks that every phase is finite and lies in `[0, 1)`.
pub fn validate_phases(phases: &[f64]) -> Result<(), OffPeakError> {
    if phases.is_empty() {
        return Err(OffPeakError::invalid_input(
            "phases must contain at least one sample",
        ));
    }

    if let Some((idx, phase)) = phases
        .iter()
        .copied()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && *p >= 0.0 && *p < 1.0))
    {
        return Err(OffPeakError::invalid_input(format!(
            "phases must lie in [0, 1); index {idx} has {phase}"
        )));
    }

    Ok(())
}

/// Half-open pulsar phase interval `[phase_min, phase_max)` inside one period.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseRange {
    pub phase_min: f64,
    pub phase_max: f64,
}

/// The estimated off-pulse interval.
pub type OffPeakWindow = PhaseRange;

impl PhaseRange {
    /// Constructs a validated range with `0 <= phase_min < phase_max <= 1`.
    pub fn new(phase_min: f64, phase_max: f64) -> Result<Self, OffPeakError> {
        if !phase_min.is_finite() || !phase_max.is_finite() {
            return Err(OffPeakError::invalid_input(format!(
                "phase range bounds must be finite; got [{phase_min}, {phase_max})"
            )));
        }
        if phase_min < 0.0 || phase_max > 1.0 || phase_min >= phase_max {
            return Err(OffPeakError::invalid_input(format!(
                "phase range must satisfy 0 <= min < max <= 1; got [{phase_min}, {phase_max})"
            )));
        }
        Ok(Self {
            phase_min,
            phase_max,
        })
    }

    /// Fraction of the pulsar period covered by the range.
    pub fn width(&self) -> f64 {
        self.phase_max - self.phase_min
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.phase_min + self.phase_max)
    }

    pub fn contains(&self, phase: f64) -> bool {
        phase >= self.phase_min && phase < self.phase_max
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.phase_min, self.phase_max)
    }
}
