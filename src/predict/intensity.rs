//! Line strengths and relative absorption intensities.
//!
//! The line strength of a `g`-type transition is the squared direction-cosine
//! matrix element summed over the space-fixed component and both M sublevels.
//! In the `|J, K>` basis it reduces to
//!
//! ```text
//! S_g = (2J'+1)(2J''+1) · |Σ_K c'_{K+q} c_K (-1)^{K+q} (J' 1 J''; -(K+q) q K)|²
//! ```
//!
//! with `q = 0` for a-type, and the `q = ±1` combinations `(m₋ - m₊)/√2` for b-type
//! and `(m₋ + m₊)/√2` for c-type.
//!
//! Intensities follow the usual absorption form
//! `μ_g² · S_g · ν · exp(-E''/kT) · (1 - exp(-hν/kT))`, without the partition
//! function since only relative values are reported.

use crate::domain::DipoleType;
use crate::math::{Wigner3j, parity};
use crate::predict::levels::EigenLadder;

/// `h/k` in kelvin per MHz.
pub const H_OVER_K: f64 = 4.799_243_073e-5;

/// One level picked out of a ladder by its position.
#[derive(Debug, Clone, Copy)]
pub struct LevelRef<'a> {
    pub ladder: &'a EigenLadder,
    pub index: usize,
}

/// Line strength of the `dipole` component between two levels.
pub fn line_strength(upper: LevelRef<'_>, lower: LevelRef<'_>, dipole: DipoleType, wigner: &Wigner3j) -> f64 {
    let amplitude = |q: i64| spherical_component(upper, lower, q, wigner);
    let j_up = upper.ladder.j() as f64;
    let j_low = lower.ladder.j() as f64;
    let degeneracy = (2.0 * j_up + 1.0) * (2.0 * j_low + 1.0);

    let squared = match dipole {
        DipoleType::A => amplitude(0).powi(2),
        DipoleType::B => (amplitude(-1) - amplitude(1)).powi(2) / 2.0,
        DipoleType::C => (amplitude(-1) + amplitude(1)).powi(2) / 2.0,
    };
    degeneracy * squared
}

fn spherical_component(upper: LevelRef<'_>, lower: LevelRef<'_>, q: i64, wigner: &Wigner3j) -> f64 {
    let j_up = upper.ladder.j() as i64;
    let j_low = lower.ladder.j() as i64;
    let c_up = upper.ladder.vector(upper.index);
    let c_low = lower.ladder.vector(lower.index);

    let mut sum = 0.0;
    for k in -j_low..=j_low {
        let k_up = k + q;
        if k_up.abs() > j_up {
            continue;
        }
        let a = c_up[(k_up + j_up) as usize];
        let b = c_low[(k + j_low) as usize];
        sum += a * b * parity(k_up) * wigner.symbol(j_up, 1, j_low, -k_up, q, k);
    }
    sum
}

/// Absorption intensity in arbitrary units.
///
/// `frequency` and `lower_energy` are in MHz, `temperature_k` in K.
pub fn absorption_intensity(mu: f64, strength: f64, frequency: f64, lower_energy: f64, temperature_k: f64) -> f64 {
    let population = (-lower_energy * H_OVER_K / temperature_k).exp();
    let stimulated = -(-frequency * H_OVER_K / temperature_k).exp_m1();
    mu * mu * strength * frequency * population * stimulated
}
