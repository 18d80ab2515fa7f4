//! JSON fit-input files.
//!
//! ```json
//! {
//!   "guess": { "A": 9769.72, "B": 868.85, "C": 818.52 },
//!   "distortion": { "DJ": 4.7e-5, "DJK": -9.0e-4, "DK": 0.0232, "dJ": 5.0e-6, "dK": 3.4e-4 },
//!   "transitions": [[4, 0, 4, 3, 0, 3], [5, 1, 5, 4, 1, 4]],
//!   "observed": [6747.32023, 8310.06771],
//!   "config": { "max_iterations": 100 },
//!   "catalog": { "j_max": 10 }
//! }
//! ```
//!
//! `distortion`, `observed`, `config` and `catalog` are optional.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::hexanal;
use crate::domain::{
    CatalogConfig, DistortionConstants, FitConfig, HamiltonianConstants, RotationalConstants, Transition,
    TransitionSet,
};
use crate::error::{AppError, FitError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitInputFile {
    pub guess: RotationalConstants,
    #[serde(default)]
    pub distortion: DistortionConstants,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub observed: Vec<f64>,
    #[serde(default)]
    pub config: FitConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl FitInputFile {
    /// The bundled hexanal data set with default settings.
    pub fn hexanal() -> Self {
        let k = hexanal::seed_constants();
        Self {
            guess: k.rotational,
            distortion: k.distortion,
            transitions: hexanal::transitions(),
            observed: hexanal::observed(),
            config: FitConfig::default(),
            catalog: CatalogConfig {
                j_max: 10,
                f_min: 6_000.0,
                f_max: 14_000.0,
                ..CatalogConfig::default()
            },
        }
    }

    pub fn initial_constants(&self) -> HamiltonianConstants {
        HamiltonianConstants::new(self.guess, self.distortion)
    }

    /// Pair transitions with observations, validating both.
    pub fn transition_set(&self) -> Result<TransitionSet, FitError> {
        TransitionSet::new(self.transitions.clone(), self.observed.clone())
    }
}

/// Read a fit-input JSON file.
pub fn read_fit_input(path: &Path) -> Result<FitInputFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open input JSON '{}': {e}", path.display())))?;
    let input: FitInputFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid input JSON '{}': {e}", path.display())))?;
    Ok(input)
}

/// Write a fit-input JSON file (used by `simulate`).
pub fn write_fit_input(path: &Path, input: &FitInputFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create input JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, input)
        .map_err(|e| AppError::new(2, format!("Failed to write input JSON: {e}")))?;
    Ok(())
}
