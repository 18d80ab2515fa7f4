//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the eight Hamiltonian constants (`RotationalConstants`, `DistortionConstants`)
//! - rotational levels and transitions (`RotState`, `Transition`, `TransitionSet`)
//! - fit configuration and outputs (`FitConfig`, `FitResult`, `FitStatus`)
//! - catalog prediction types (`PredictedLine`, `CatalogConfig`)

pub mod types;

pub use types::*;
