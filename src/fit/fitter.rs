//! Fitting Hamiltonian constants to assigned line positions.
//!
//! Given:
//! - a list of assigned transitions `t_i`
//! - observed frequencies `ν_i` (MHz)
//! - an initial constant set and a float mask
//!
//! we minimize `Σ (ν_calc(t_i; k) - ν_i)²` over the floated constants with
//! Levenberg–Marquardt. Constants outside the mask are bound into the residual
//! closure and never change.
//!
//! The covariance follows the usual unweighted least-squares convention:
//! `(JᵀJ)⁻¹ · SSE / (n - p)`. With `n == p`, or a singular `JᵀJ`, the fit is
//! marked degenerate and every entry is `+∞`.

use std::time::Instant;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::{
    ConstantId, DistortionConstants, FitConfig, FitResult, HamiltonianConstants, RotationalConstants, Transition,
    TransitionSet,
};
use crate::error::FitError;
use crate::fit::lm::{LmOptions, levenberg_marquardt};
use crate::math::invert_normal_matrix;
use crate::predict::{LevelCache, predict_all_cached};

/// Fit the rotational constants A, B, C with the distortion constants held fixed.
///
/// `transitions` and `observed` must have the same length; a mismatch is reported
/// before any iteration runs. The float mask in `config` is replaced by `[A, B, C]`.
pub fn fit_rotational_constants(
    guess: RotationalConstants,
    distortion: DistortionConstants,
    transitions: &[Transition],
    observed: &[f64],
    config: &FitConfig,
) -> Result<FitResult, FitError> {
    let data = TransitionSet::new(transitions.to_vec(), observed.to_vec())?;
    let config = FitConfig {
        float_params: ConstantId::ROTATIONAL.to_vec(),
        ..config.clone()
    };
    fit_constants(&HamiltonianConstants::new(guess, distortion), &data, &config)
}

/// Fit the constants named in `config.float_params`, holding the rest at `initial`.
pub fn fit_constants(
    initial: &HamiltonianConstants,
    data: &TransitionSet,
    config: &FitConfig,
) -> Result<FitResult, FitError> {
    validate_float_params(&config.float_params)?;
    let opts = LmOptions::from(config);
    opts.validate()?;

    let free = config.float_params.clone();
    let n = data.len();
    let p = free.len();
    if n < p {
        return Err(FitError::Underdetermined {
            observations: n,
            parameters: p,
        });
    }
    if !initial.all_finite() {
        return Err(FitError::NonFiniteValue(format!("initial constants {:?}", initial.to_array())));
    }

    let started = Instant::now();
    let base = *initial;
    let x0 = DVector::from_iterator(p, free.iter().map(|&id| base.get(id)));
    let transitions = data.transitions();
    let observed = data.observed();

    let mut cache = LevelCache::new();
    let outcome = {
        let free = &free;
        let cache = &mut cache;
        let residuals = move |x: &DVector<f64>| -> Result<DVector<f64>, FitError> {
            let k = bind_parameters(&base, free, x.as_slice());
            let calc = predict_all_cached(transitions, &k, &mut *cache)?;
            Ok(DVector::from_iterator(
                n,
                calc.iter().zip(observed.iter()).map(|(c, o)| c - o),
            ))
        };
        levenberg_marquardt(residuals, x0, &opts)?
    };
    debug!(
        "level cache: {} entries, {} hits, {} misses",
        cache.len(),
        cache.hits(),
        cache.misses()
    );

    let constants = bind_parameters(&base, &free, outcome.params.as_slice());
    let (covariance, degenerate) = covariance(&outcome.jacobian, outcome.cost, n);
    let std_errors: Vec<f64> = covariance.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect();

    let result = FitResult {
        constants,
        free,
        covariance,
        std_errors,
        status: outcome.status,
        degenerate,
        iterations: outcome.iterations,
        sse: outcome.cost,
        n_observations: n,
    };

    info!(
        "fit finished: status={:?} iterations={} sse={:.6e} elapsed={:.1?}",
        result.status,
        result.iterations,
        result.sse,
        started.elapsed()
    );
    for w in result.warnings() {
        warn!("{w}");
    }
    Ok(result)
}

/// Overlay parameter-vector values onto a base constant set.
///
/// `values[i]` replaces the constant `free[i]`; everything else is taken from `base`.
pub fn bind_parameters(base: &HamiltonianConstants, free: &[ConstantId], values: &[f64]) -> HamiltonianConstants {
    let mut k = *base;
    for (&id, &v) in free.iter().zip(values.iter()) {
        k.set(id, v);
    }
    k
}

fn validate_float_params(free: &[ConstantId]) -> Result<(), FitError> {
    if free.is_empty() {
        return Err(FitError::InvalidConfig("no constants selected to float".to_string()));
    }
    for (i, id) in free.iter().enumerate() {
        if free[..i].contains(id) {
            return Err(FitError::InvalidConfig(format!("{} is floated twice", id.label())));
        }
    }
    Ok(())
}

/// Scaled inverse of `JᵀJ`, and whether it had to be replaced by `+∞`.
fn covariance(jacobian: &DMatrix<f64>, sse: f64, n: usize) -> (DMatrix<f64>, bool) {
    let p = jacobian.ncols();
    let infinite = || DMatrix::from_element(p, p, f64::INFINITY);
    if n <= p {
        return (infinite(), true);
    }

    let jtj = jacobian.transpose() * jacobian;
    match invert_normal_matrix(&jtj) {
        Some(inv) => (inv * (sse / (n - p) as f64), false),
        None => (infinite(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::hexanal;
    use crate::domain::FitStatus;
    use crate::predict::predict_all;

    fn rotational_seed() -> (RotationalConstants, DistortionConstants) {
        let k = hexanal::seed_constants();
        (k.rotational, k.distortion)
    }

    #[test]
    fn hexanal_fit_stays_close_to_seed() {
        let (guess, distortion) = rotational_seed();
        let fit = fit_rotational_constants(
            guess,
            distortion,
            &hexanal::transitions(),
            &hexanal::observed(),
            &FitConfig::default(),
        )
        .unwrap();

        assert!(fit.status.is_converged(), "status={:?}", fit.status);
        assert!(!fit.degenerate);
        let r = fit.rotational();
        assert!((r.a - guess.a).abs() < 0.5, "A={}", r.a);
        assert!((r.b - guess.b).abs() < 0.01, "B={}", r.b);
        assert!((r.c - guess.c).abs() < 0.01, "C={}", r.c);
        assert_eq!(fit.constants.distortion, distortion);

        // RMS residual well under 50 kHz.
        let rms = (fit.sse / (fit.n_observations - 1) as f64).sqrt();
        assert!(rms < 0.05, "rms={rms}");
        assert!(fit.std_errors.iter().all(|se| se.is_finite() && *se > 0.0));
        assert!(fit.std_errors[0] > fit.std_errors[1]);
    }

    #[test]
    fn recovers_constants_from_exact_lines() {
        let truth = hexanal::seed_constants();
        let transitions = hexanal::transitions();
        let observed = predict_all(&transitions, &truth).unwrap();

        let guess = RotationalConstants::new(truth.rotational.a + 5.0, truth.rotational.b - 0.5, truth.rotational.c + 0.3);
        let fit = fit_rotational_constants(guess, truth.distortion, &transitions, &observed, &FitConfig::default())
            .unwrap();

        assert!((fit.rotational().a - truth.rotational.a).abs() < 1e-3);
        assert!((fit.rotational().b - truth.rotational.b).abs() < 1e-4);
        assert!((fit.rotational().c - truth.rotational.c).abs() < 1e-4);

        // Fitted constants reproduce the input lines.
        let calc = predict_all(&transitions, &fit.constants).unwrap();
        for (c, o) in calc.iter().zip(observed.iter()) {
            assert!((c - o).abs() < 1e-3);
        }
    }

    #[test]
    fn floats_a_distortion_constant() {
        let truth = hexanal::seed_constants();
        let transitions = hexanal::transitions();
        let observed = predict_all(&transitions, &truth).unwrap();
        let data = TransitionSet::new(transitions.clone(), observed.clone()).unwrap();

        let mut initial = truth;
        initial.set(ConstantId::DJ, 0.0);
        initial.set(ConstantId::B, truth.rotational.b + 0.05);
        let config = FitConfig {
            float_params: vec![ConstantId::A, ConstantId::B, ConstantId::C, ConstantId::DJ],
            ..FitConfig::default()
        };
        let fit = fit_constants(&initial, &data, &config).unwrap();

        assert_eq!(fit.free.len(), 4);
        assert!((fit.value(ConstantId::DJ) - truth.distortion.dj).abs() < 2e-6);
        assert!(fit.std_error(ConstantId::DJ).is_some());
        assert!(fit.std_error(ConstantId::DK).is_none());
        assert_eq!(fit.value(ConstantId::DK), truth.distortion.dk);

        let calc = predict_all(&transitions, &fit.constants).unwrap();
        let worst = calc.iter().zip(observed.iter()).map(|(c, o)| (c - o).abs()).fold(0.0, f64::max);
        assert!(worst < 1e-3, "worst residual {worst}");
    }

    #[test]
    fn mismatched_lengths_fail_before_fitting() {
        let (guess, distortion) = rotational_seed();
        let err = fit_rotational_constants(
            guess,
            distortion,
            &hexanal::transitions(),
            &hexanal::observed()[..5],
            &FitConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FitError::DimensionMismatch {
                transitions: 7,
                observed: 5
            }
        ));
    }

    #[test]
    fn fewer_lines_than_parameters_is_underdetermined() {
        let (guess, distortion) = rotational_seed();
        let err = fit_rotational_constants(
            guess,
            distortion,
            &hexanal::transitions()[..2],
            &hexanal::observed()[..2],
            &FitConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FitError::Underdetermined {
                observations: 2,
                parameters: 3
            }
        ));
    }

    #[test]
    fn exactly_determined_fit_has_infinite_errors() {
        let (guess, distortion) = rotational_seed();
        // One a-type and two b-type lines: three lines, three unknowns.
        let pick = [0, 3, 4];
        let transitions: Vec<Transition> = pick.iter().map(|&i| hexanal::transitions()[i]).collect();
        let observed: Vec<f64> = pick.iter().map(|&i| hexanal::observed()[i]).collect();
        let fit = fit_rotational_constants(guess, distortion, &transitions, &observed, &FitConfig::default()).unwrap();
        assert!(fit.degenerate);
        assert!(fit.std_errors.iter().all(|se| se.is_infinite()));
        assert!(fit.warnings().iter().any(|w| w.contains("singular")));
    }

    #[test]
    fn repeated_line_gives_singular_normal_matrix() {
        // Five copies of 4(0,4)-3(0,3): more lines than unknowns, but rank one.
        let (guess, distortion) = rotational_seed();
        let transitions = vec![hexanal::transitions()[0]; 5];
        let observed = vec![hexanal::observed()[0]; 5];
        let fit = fit_rotational_constants(guess, distortion, &transitions, &observed, &FitConfig::default()).unwrap();
        assert_eq!(fit.n_observations, 5);
        assert!(fit.degenerate);
        assert!(fit.std_errors.iter().all(|se| se.is_infinite()));
        assert!(fit.covariance.iter().all(|v| v.is_infinite()));
        assert!(fit.warnings().iter().any(|w| w.contains("singular")));
    }

    #[test]
    fn iteration_budget_yields_partial_result() {
        let (guess, distortion) = rotational_seed();
        let config = FitConfig {
            max_iterations: 1,
            ..FitConfig::default()
        };
        let far = RotationalConstants::new(guess.a + 20.0, guess.b + 1.0, guess.c - 1.0);
        let fit =
            fit_rotational_constants(far, distortion, &hexanal::transitions(), &hexanal::observed(), &config).unwrap();
        assert_eq!(fit.status, FitStatus::MaxIterations);
        assert_eq!(fit.iterations, 1);
        assert!(!fit.warnings().is_empty());
        assert!(fit.rotational().a.is_finite());
    }

    #[test]
    fn duplicate_or_empty_masks_are_rejected() {
        let data = hexanal::transition_set().unwrap();
        let k = hexanal::seed_constants();
        for mask in [vec![], vec![ConstantId::A, ConstantId::A]] {
            let config = FitConfig {
                float_params: mask,
                ..FitConfig::default()
            };
            assert!(matches!(fit_constants(&k, &data, &config), Err(FitError::InvalidConfig(_))));
        }
    }

    #[test]
    fn bind_parameters_only_touches_floated_constants() {
        let base = hexanal::seed_constants();
        let k = bind_parameters(&base, &[ConstantId::C, ConstantId::DK], &[1.0, 2.0]);
        assert_eq!(k.rotational.c, 1.0);
        assert_eq!(k.distortion.dk, 2.0);
        assert_eq!(k.rotational.a, base.rotational.a);
        assert_eq!(k.distortion.dj, base.distortion.dj);
    }
}
