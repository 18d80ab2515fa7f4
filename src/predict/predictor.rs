//! Transition frequencies from energy-level differences.
//!
//! `ν = E_upper[J' - Kc' + Ka'] - E_lower[J'' - Kc'' + Ka'']`
//!
//! The batch form diagonalizes each distinct J once per constant set, in parallel.

use std::collections::BTreeSet;

use crate::domain::{HamiltonianConstants, Transition};
use crate::error::FitError;
use crate::predict::levels::{EnergyLevels, LevelCache};

/// Predicted frequency (MHz) of a single transition.
pub fn predict_frequency(transition: &Transition, constants: &HamiltonianConstants) -> Result<f64, FitError> {
    transition.validate()?;
    let upper = EnergyLevels::compute(transition.upper.j, constants)?;
    let e_upper = upper.energy(transition.upper)?;
    let e_lower = if transition.lower.j == transition.upper.j {
        upper.energy(transition.lower)?
    } else {
        EnergyLevels::compute(transition.lower.j, constants)?.energy(transition.lower)?
    };
    Ok(e_upper - e_lower)
}

/// Predicted frequencies for an ordered list of transitions.
pub fn predict_all(transitions: &[Transition], constants: &HamiltonianConstants) -> Result<Vec<f64>, FitError> {
    let mut cache = LevelCache::new();
    predict_all_cached(transitions, constants, &mut cache)
}

/// Same as [`predict_all`], reusing ladders already held in `cache`.
pub fn predict_all_cached(
    transitions: &[Transition],
    constants: &HamiltonianConstants,
    cache: &mut LevelCache,
) -> Result<Vec<f64>, FitError> {
    for t in transitions {
        t.validate()?;
    }
    if !constants.all_finite() {
        return Err(FitError::NonFiniteValue(format!("Hamiltonian constants {:?}", constants.to_array())));
    }

    let js: Vec<u32> = transitions
        .iter()
        .flat_map(|t| [t.upper.j, t.lower.j])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    cache.prefetch(&js, constants)?;

    transitions
        .iter()
        .map(|t| {
            let upper = cache.get_or_compute(t.upper.j, constants)?;
            let lower = cache.get_or_compute(t.lower.j, constants)?;
            Ok(upper.energy(t.upper)? - lower.energy(t.lower)?)
        })
        .collect()
}
