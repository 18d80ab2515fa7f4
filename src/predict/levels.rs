//! Energy-level ladders and their memoisation.
//!
//! A ladder is the ascending eigenvalue list of one J block. Levels are addressed by
//! the asymmetric-top label through `J - Kc + Ka` (see [`RotState::level_index`]).

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use rayon::prelude::*;

use nalgebra::{DMatrix, DVectorView};

use crate::domain::{HamiltonianConstants, MAX_J, RotState};
use crate::error::FitError;
use crate::math::{build_hamiltonian, sorted_eigensystem, sorted_eigenvalues};

/// Soft cap on cached ladders; the cache is flushed when it is exceeded.
const MAX_CACHED_LADDERS: usize = 4096;

/// Sorted energy levels (MHz) for one J.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyLevels {
    j: u32,
    values: Vec<f64>,
}

impl EnergyLevels {
    /// Build and diagonalize the Hamiltonian for `j`.
    pub fn compute(j: u32, constants: &HamiltonianConstants) -> Result<Self, FitError> {
        check_block(j)?;
        let h = build_hamiltonian(j, constants);
        let values = sorted_eigenvalues(&h)?;
        Ok(Self { j, values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Energy of a labelled level of this J block.
    pub fn energy(&self, state: RotState) -> Result<f64, FitError> {
        state.validate()?;
        if state.j != self.j {
            return Err(FitError::InvalidQuantumNumbers {
                state,
                reason: format!("looked up in the J={} ladder", self.j),
            });
        }
        self.values
            .get(state.level_index())
            .copied()
            .ok_or_else(|| FitError::InvalidQuantumNumbers {
                state,
                reason: format!("level index {} outside ladder of {}", state.level_index(), self.values.len()),
            })
    }
}

fn check_block(j: u32) -> Result<(), FitError> {
    if j > MAX_J {
        return Err(FitError::InvalidConfig(format!(
            "J={j} block exceeds the supported maximum of {MAX_J}"
        )));
    }
    Ok(())
}

/// One J block's sorted energies together with their eigenvectors in the
/// `|J, K>` basis (column `i` belongs to ladder position `i`).
#[derive(Debug, Clone)]
pub struct EigenLadder {
    j: u32,
    values: Vec<f64>,
    vectors: DMatrix<f64>,
}

impl EigenLadder {
    pub fn compute(j: u32, constants: &HamiltonianConstants) -> Result<Self, FitError> {
        check_block(j)?;
        let h = build_hamiltonian(j, constants);
        let (values, vectors) = sorted_eigensystem(&h)?;
        Ok(Self { j, values, vectors })
    }

    pub fn j(&self) -> u32 {
        self.j
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Basis coefficients of the level at ladder position `index`, `K = -J..=J`.
    pub fn vector(&self, index: usize) -> DVectorView<'_, f64> {
        self.vectors.column(index)
    }
}

type CacheKey = (u32, [u64; 8]);

/// Ladders keyed by `(J, exact constant bit patterns)`.
///
/// Owned by a single prediction or fit run; not shared between threads.
#[derive(Debug, Default)]
pub struct LevelCache {
    entries: HashMap<CacheKey, Arc<EnergyLevels>>,
    hits: usize,
    misses: usize,
}

impl LevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Fetch a ladder, diagonalizing on a miss.
    pub fn get_or_compute(
        &mut self,
        j: u32,
        constants: &HamiltonianConstants,
    ) -> Result<Arc<EnergyLevels>, FitError> {
        let key = (j, constants.cache_key());
        if let Some(levels) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(levels));
        }
        self.misses += 1;
        let levels = Arc::new(EnergyLevels::compute(j, constants)?);
        self.insert(key, Arc::clone(&levels));
        Ok(levels)
    }

    /// Diagonalize every missing J in `js` in parallel.
    pub fn prefetch(&mut self, js: &[u32], constants: &HamiltonianConstants) -> Result<(), FitError> {
        let bits = constants.cache_key();
        let missing: Vec<u32> = js
            .iter()
            .copied()
            .filter(|&j| !self.entries.contains_key(&(j, bits)))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let computed: Vec<EnergyLevels> = missing
            .par_iter()
            .map(|&j| EnergyLevels::compute(j, constants))
            .collect::<Result<Vec<_>, FitError>>()?;

        trace!("diagonalized {} J blocks", computed.len());
        self.misses += computed.len();
        for levels in computed {
            self.insert((levels.j, bits), Arc::new(levels));
        }
        Ok(())
    }

    fn insert(&mut self, key: CacheKey, levels: Arc<EnergyLevels>) {
        if self.entries.len() >= MAX_CACHED_LADDERS {
            self.entries.clear();
        }
        self.entries.insert(key, levels);
    }
}
