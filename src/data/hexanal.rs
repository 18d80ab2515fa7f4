//! Hexanal, conformer I.
//!
//! Seven assigned lines between 6.7 and 13.6 GHz together with a constant set that
//! predicts them to within a few hundred kHz. Backs the `demo` subcommand and the
//! unit tests.

use crate::domain::{DistortionConstants, HamiltonianConstants, RotationalConstants, Transition, TransitionSet};
use crate::error::FitError;

const TRANSITIONS: [[u32; 6]; 7] = [
    [4, 0, 4, 3, 0, 3],
    [5, 1, 5, 4, 1, 4],
    [5, 0, 5, 4, 0, 4],
    [1, 1, 0, 1, 0, 1],
    [2, 1, 2, 1, 0, 1],
    [8, 2, 7, 7, 2, 6],
    [8, 2, 6, 7, 2, 5],
];

const OBSERVED: [f64; 7] = [
    6747.32023,
    8310.06771,
    8432.54591,
    8951.08513,
    12225.16434,
    13496.27440,
    13514.14580,
];

pub fn seed_constants() -> HamiltonianConstants {
    HamiltonianConstants::new(
        RotationalConstants::new(9769.72213, 868.846659, 818.518746),
        DistortionConstants::new(0.000047239, -0.0008991, 0.023173, 5.0298e-06, 0.000343),
    )
}

pub fn transitions() -> Vec<Transition> {
    TRANSITIONS.iter().copied().map(Transition::from).collect()
}

/// Observed frequencies (MHz), in the order of [`transitions`].
pub fn observed() -> Vec<f64> {
    OBSERVED.to_vec()
}

pub fn transition_set() -> Result<TransitionSet, FitError> {
    TransitionSet::new(transitions(), observed())
}
