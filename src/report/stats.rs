//! Fit statistics: per-line residuals, RMS, and uncertainty notation.

use serde::Serialize;

use crate::domain::{FitResult, Transition, TransitionSet};
use crate::error::FitError;
use crate::predict::predict_all;

/// One assigned line after the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineResidual {
    pub transition: Transition,
    pub observed: f64,
    pub calculated: f64,
    /// Observed minus calculated, kHz, rounded to 2 decimals.
    pub omc_khz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitStatistics {
    pub residuals: Vec<LineResidual>,
    /// RMS of `obs - calc`, MHz.
    pub rms_mhz: f64,
}

impl FitStatistics {
    pub fn rms_khz(&self) -> f64 {
        self.rms_mhz * 1000.0
    }

    pub fn calculated(&self) -> Vec<f64> {
        self.residuals.iter().map(|r| r.calculated).collect()
    }
}

/// `sqrt(Σ (obs - calc)² / (n - 1))`, MHz.
///
/// The divisor is clamped to 1 so a single line yields its absolute residual and an
/// empty list yields zero.
pub fn rms_error(observed: &[f64], calculated: &[f64]) -> Result<f64, FitError> {
    if observed.len() != calculated.len() {
        return Err(FitError::DimensionMismatch {
            transitions: calculated.len(),
            observed: observed.len(),
        });
    }
    if observed.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = observed
        .iter()
        .zip(calculated.iter())
        .map(|(o, c)| (o - c) * (o - c))
        .sum();
    let dof = observed.len().saturating_sub(1).max(1);
    Ok((sum / dof as f64).sqrt())
}

/// Observed minus calculated in kHz, rounded to 2 decimals.
pub fn omc_khz(observed: f64, calculated: f64) -> f64 {
    ((observed - calculated) * 1000.0 * 100.0).round() / 100.0
}

/// Pair each assigned line with its calculated frequency.
pub fn compute_residuals(data: &TransitionSet, calculated: &[f64]) -> Result<Vec<LineResidual>, FitError> {
    if data.len() != calculated.len() {
        return Err(FitError::DimensionMismatch {
            transitions: data.len(),
            observed: calculated.len(),
        });
    }
    Ok(data
        .iter()
        .zip(calculated.iter())
        .map(|((t, obs), &calc)| LineResidual {
            transition: *t,
            observed: obs,
            calculated: calc,
            omc_khz: omc_khz(obs, calc),
        })
        .collect())
}

/// Predict with the fitted constants and summarize the residuals.
pub fn compute_statistics(fit: &FitResult, data: &TransitionSet) -> Result<FitStatistics, FitError> {
    let calculated = predict_all(data.transitions(), &fit.constants)?;
    let rms_mhz = rms_error(data.observed(), &calculated)?;
    Ok(FitStatistics {
        residuals: compute_residuals(data, &calculated)?,
        rms_mhz,
    })
}

/// Decimal position of the first non-zero digit of `se`, counted as the number of
/// zeros right after the decimal point (`0.0015 -> 2`, `0.15 -> 0`, `2.5 -> 0`).
pub fn first_significant_decimal(se: f64) -> usize {
    if !(se.is_finite() && se > 0.0) {
        return 0;
    }
    let sci = format!("{se:e}");
    let exp = sci
        .rsplit_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or_else(|| se.log10().floor() as i32);
    if exp < 0 { (-exp - 1) as usize } else { 0 }
}

/// `value(uncertainty)` notation with two significant digits of uncertainty.
///
/// `9769.72213 ± 0.0015` renders as `9769.7221(15)`. A non-finite error renders
/// as `(inf)` after the value at 6 decimals.
pub fn format_uncertainty(value: f64, se: f64) -> String {
    if !se.is_finite() {
        return format!("{value:.6}(inf)");
    }
    if se == 0.0 {
        return format!("{value:.6}(0)");
    }
    let decimals = first_significant_decimal(se) + 2;
    let digits = (se * 10f64.powi(decimals as i32)).round();
    format!("{value:.decimals$}({digits:.0})")
}
