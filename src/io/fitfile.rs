//! Fit result JSON.
//!
//! A portable record of one fit:
//! - every constant, with a standard error for the floated ones
//! - the covariance of the floated constants
//! - optimizer status and residual table
//!
//! Non-finite standard errors and covariance entries are written as `null`.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConstantId, FitResult, FitStatus, HamiltonianConstants, Transition};
use crate::error::AppError;
use crate::report::FitStatistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub constants: HamiltonianConstants,
    pub parameters: Vec<FittedParameter>,
    pub covariance: Vec<Vec<Option<f64>>>,
    pub status: FitStatus,
    pub degenerate: bool,
    pub iterations: usize,
    pub rms_khz: f64,
    pub lines: Vec<FitFileLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParameter {
    pub name: ConstantId,
    pub value: f64,
    pub std_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFileLine {
    pub transition: Transition,
    pub observed: f64,
    pub calculated: f64,
    pub omc_khz: f64,
}

impl FitFile {
    pub fn new(fit: &FitResult, stats: &FitStatistics) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            tool: format!("rotfit {}", env!("CARGO_PKG_VERSION")),
            generated_at: Utc::now(),
            constants: fit.constants,
            parameters: fit
                .free
                .iter()
                .zip(fit.std_errors.iter())
                .map(|(&id, &se)| FittedParameter {
                    name: id,
                    value: fit.value(id),
                    std_error: finite(se),
                })
                .collect(),
            covariance: fit
                .covariance
                .row_iter()
                .map(|row| row.iter().map(|&v| finite(v)).collect())
                .collect(),
            status: fit.status,
            degenerate: fit.degenerate,
            iterations: fit.iterations,
            rms_khz: stats.rms_khz(),
            lines: stats
                .residuals
                .iter()
                .map(|r| FitFileLine {
                    transition: r.transition,
                    observed: r.observed,
                    calculated: r.calculated,
                    omc_khz: r.omc_khz,
                })
                .collect(),
        }
    }
}

/// Write a fit result JSON file.
pub fn write_fit_json(path: &Path, fit: &FitResult, stats: &FitStatistics) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &FitFile::new(fit, stats))
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}
