//! Shared fit pipeline used by the `fit` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! input -> transition set -> fit -> statistics -> catalog around the assigned lines
//!
//! The commands can then focus on presentation (printing, plotting, exports).

use log::info;

use crate::domain::{CatalogConfig, FitResult, PredictedLine, TransitionSet};
use crate::error::AppError;
use crate::fit::fit_constants;
use crate::io::FitInputFile;
use crate::predict::predict_catalog;
use crate::report::{FitStatistics, compute_statistics};

/// Extra catalog width around the assigned lines when plotting (MHz).
const PLOT_MARGIN_MHZ: f64 = 250.0;

/// All computed outputs of a single fit run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: TransitionSet,
    pub fit: FitResult,
    pub stats: FitStatistics,
}

/// Execute the fit described by `input`.
pub fn run_fit(input: &FitInputFile) -> Result<RunOutput, AppError> {
    // 1) Validate the assignment list.
    let data = input.transition_set()?;
    if data.is_empty() {
        return Err(AppError::new(3, "No assigned transitions to fit."));
    }
    info!("fitting {} lines, floating {:?}", data.len(), input.config.float_params);

    // 2) Fit.
    let fit = fit_constants(&input.initial_constants(), &data, &input.config)?;

    // 3) Residuals + RMS at the fitted constants.
    let stats = compute_statistics(&fit, &data)?;

    Ok(RunOutput { data, fit, stats })
}

/// Predict the catalog spanning the observed lines, for the stick plot.
pub fn plot_catalog(run: &RunOutput, base: &CatalogConfig) -> Result<(Vec<PredictedLine>, f64, f64), AppError> {
    let observed = run.data.observed();
    let lo = observed.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let f_min = (lo - PLOT_MARGIN_MHZ).max(0.0);
    let f_max = hi + PLOT_MARGIN_MHZ;

    let j_needed = run
        .data
        .transitions()
        .iter()
        .map(|t| t.upper.j.max(t.lower.j))
        .max()
        .unwrap_or(0);
    let config = CatalogConfig {
        j_max: base.j_max.max(j_needed),
        f_min,
        f_max,
        ..base.clone()
    };
    let lines = predict_catalog(&run.fit.constants, &config)?;
    Ok((lines, f_min, f_max))
}
