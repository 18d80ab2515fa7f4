//! Synthetic observed spectra.
//!
//! Observed frequencies are the predicted line positions plus independent Gaussian
//! noise. The generator is seeded so a given `(transitions, constants, noise, seed)`
//! always produces the same spectrum.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{HamiltonianConstants, Transition};
use crate::error::FitError;
use crate::predict::predict_all;

/// Noisy "observed" frequencies (MHz) for `transitions`.
///
/// `noise_khz` is the standard deviation of the added noise in kHz; zero returns the
/// exact predictions.
pub fn simulate_observations(
    transitions: &[Transition],
    constants: &HamiltonianConstants,
    noise_khz: f64,
    seed: u64,
) -> Result<Vec<f64>, FitError> {
    if !(noise_khz.is_finite() && noise_khz >= 0.0) {
        return Err(FitError::InvalidConfig(format!(
            "noise must be finite and >= 0 kHz, got {noise_khz}"
        )));
    }

    let exact = predict_all(transitions, constants)?;
    if noise_khz == 0.0 {
        return Ok(exact);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise_khz / 1000.0)
        .map_err(|e| FitError::InvalidConfig(format!("noise distribution: {e}")))?;

    Ok(exact.into_iter().map(|f| f + normal.sample(&mut rng)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::hexanal;

    #[test]
    fn zero_noise_returns_predictions() {
        let k = hexanal::seed_constants();
        let t = hexanal::transitions();
        let sim = simulate_observations(&t, &k, 0.0, 7).unwrap();
        assert_eq!(sim, predict_all(&t, &k).unwrap());
    }

    #[test]
    fn same_seed_same_spectrum() {
        let k = hexanal::seed_constants();
        let t = hexanal::transitions();
        let a = simulate_observations(&t, &k, 10.0, 42).unwrap();
        let b = simulate_observations(&t, &k, 10.0, 42).unwrap();
        let c = simulate_observations(&t, &k, 10.0, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn noise_stays_within_a_few_sigma() {
        let k = hexanal::seed_constants();
        let t = hexanal::transitions();
        let exact = predict_all(&t, &k).unwrap();
        let sim = simulate_observations(&t, &k, 5.0, 1).unwrap();
        for (s, e) in sim.iter().zip(exact.iter()) {
            // 5 kHz sigma; 8 sigma is 0.04 MHz.
            assert!((s - e).abs() < 0.04, "{s} vs {e}");
        }
    }

    #[test]
    fn negative_noise_is_rejected() {
        let k = hexanal::seed_constants();
        let err = simulate_observations(&hexanal::transitions(), &k, -1.0, 0).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfig(_)));
    }
}
