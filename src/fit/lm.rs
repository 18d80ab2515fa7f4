//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `‖r(x)‖²` for a residual function `r: ℝᵖ → ℝⁿ`. The Jacobian is taken by
//! central differences. Steps are damped with Marquardt's `diag(JᵀJ)` scaling and the
//! dimensionless damping factor follows Nielsen's gain-ratio update. The step-size
//! test uses the same column scaling, so constants of very different magnitude
//! (A in GHz, DJ in Hz) converge together.
//!
//! Trial points whose residuals are non-finite (or whose Hamiltonian cannot be
//! diagonalized) are treated as rejected steps rather than errors.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{ConvergenceReason, FitConfig, FitStatus};
use crate::error::FitError;
use crate::math::solve_damped_step;

/// Floor for a column scale so a parameter with zero sensitivity still gets damped.
const MIN_SCALE: f64 = 1e-30;

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_damping: f64,
    pub jacobian_step: f64,
}

impl From<&FitConfig> for LmOptions {
    fn from(config: &FitConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            ftol: config.ftol,
            xtol: config.xtol,
            gtol: config.gtol,
            initial_damping: config.initial_damping,
            jacobian_step: config.jacobian_step,
        }
    }
}

impl Default for LmOptions {
    fn default() -> Self {
        Self::from(&FitConfig::default())
    }
}

impl LmOptions {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.max_iterations == 0 {
            return Err(FitError::InvalidConfig("max_iterations must be > 0".to_string()));
        }
        for (name, v) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(FitError::InvalidConfig(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        if !(self.initial_damping.is_finite() && self.initial_damping > 0.0) {
            return Err(FitError::InvalidConfig("initial_damping must be > 0".to_string()));
        }
        if !(self.jacobian_step.is_finite() && self.jacobian_step > 0.0) {
            return Err(FitError::InvalidConfig("jacobian_step must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Final state of an optimization run.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Jacobian at `params`.
    pub jacobian: DMatrix<f64>,
    /// `‖r‖²` at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub status: FitStatus,
}

/// Run Levenberg–Marquardt from `initial`.
///
/// Errors only on invalid options, a non-finite starting point, or a structural
/// failure reported by `residual_fn`. Running out of iterations is reported via
/// `FitStatus::MaxIterations` together with the best point found.
pub fn levenberg_marquardt<F>(
    mut residual_fn: F,
    initial: DVector<f64>,
    opts: &LmOptions,
) -> Result<LmOutcome, FitError>
where
    F: FnMut(&DVector<f64>) -> Result<DVector<f64>, FitError>,
{
    opts.validate()?;

    let mut x = initial;
    let mut r = residual_fn(&x)?;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteValue("residuals at the initial guess".to_string()));
    }
    let mut cost = r.norm_squared();
    let mut jac = jacobian(&mut residual_fn, &x, r.len(), opts.jacobian_step)?;

    let mut mu = opts.initial_damping;
    let mut growth = 2.0;
    let mut status = FitStatus::MaxIterations;
    let mut iterations = 0;
    let mut jac_stale = false;

    while iterations < opts.max_iterations {
        iterations += 1;
        if jac_stale {
            jac = jacobian(&mut residual_fn, &x, r.len(), opts.jacobian_step)?;
            jac_stale = false;
        }

        let gradient = jac.transpose() * &r;
        if gradient_converged(&jac, &r, &gradient, opts.gtol) {
            status = FitStatus::Converged(ConvergenceReason::Gradient);
            break;
        }

        let scale = DVector::from_iterator(
            jac.ncols(),
            jac.column_iter().map(|c| c.norm_squared().max(MIN_SCALE)),
        );
        let Some(step) = solve_damped_step(&jac, &r, &scale, mu) else {
            mu *= growth;
            growth *= 2.0;
            continue;
        };

        let diag = scale.map(f64::sqrt);
        if diag.component_mul(&step).norm() <= opts.xtol * (diag.component_mul(&x).norm() + opts.xtol) {
            status = FitStatus::Converged(ConvergenceReason::StepSize);
            break;
        }

        let x_trial = &x + &step;
        let r_trial = match residual_fn(&x_trial) {
            Ok(v) if v.iter().all(|e| e.is_finite()) => Some(v),
            Ok(_) | Err(FitError::NonFiniteValue(_)) | Err(FitError::Eigen(_)) => None,
            Err(e) => return Err(e),
        };

        let accepted = r_trial.and_then(|r_new| {
            let cost_new = r_new.norm_squared();
            let linear = &r + &jac * &step;
            let predicted = cost - linear.norm_squared();
            let actual = cost - cost_new;
            (actual > 0.0 && predicted > 0.0).then(|| (r_new, cost_new, actual / predicted))
        });

        match accepted {
            Some((r_new, cost_new, rho)) => {
                let relative = (cost - cost_new) / cost;
                x = x_trial;
                r = r_new;
                cost = cost_new;
                jac_stale = true;
                debug!("lm iter {iterations}: cost={cost:.6e} rho={rho:.3} mu={mu:.3e}");
                mu *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                growth = 2.0;

                if cost == 0.0 || relative <= opts.ftol {
                    status = FitStatus::Converged(ConvergenceReason::CostReduction);
                    break;
                }
            }
            None => {
                debug!("lm iter {iterations}: step rejected at mu={mu:.3e}");
                mu *= growth;
                growth *= 2.0;
            }
        }
    }

    if jac_stale {
        jac = jacobian(&mut residual_fn, &x, r.len(), opts.jacobian_step)?;
    }

    Ok(LmOutcome {
        params: x,
        residuals: r,
        jacobian: jac,
        cost,
        iterations,
        status,
    })
}

/// Central-difference Jacobian `∂r_i/∂x_k`.
fn jacobian<F>(residual_fn: &mut F, x: &DVector<f64>, n: usize, rel_step: f64) -> Result<DMatrix<f64>, FitError>
where
    F: FnMut(&DVector<f64>) -> Result<DVector<f64>, FitError>,
{
    let p = x.len();
    let mut jac = DMatrix::<f64>::zeros(n, p);
    for k in 0..p {
        let h = rel_step * x[k].abs().max(1.0);
        let mut forward = x.clone();
        let mut backward = x.clone();
        forward[k] += h;
        backward[k] -= h;

        let rf = residual_fn(&forward)?;
        let rb = residual_fn(&backward)?;
        let column = (rf - rb) / (2.0 * h);
        if column.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteValue(format!("Jacobian column {k}")));
        }
        jac.set_column(k, &column);
    }
    Ok(jac)
}

/// Largest cosine between the residual vector and any Jacobian column.
fn gradient_converged(jac: &DMatrix<f64>, r: &DVector<f64>, gradient: &DVector<f64>, gtol: f64) -> bool {
    let r_norm = r.norm();
    if r_norm == 0.0 {
        return true;
    }
    jac.column_iter().zip(gradient.iter()).all(|(col, g)| {
        let c = col.norm();
        c == 0.0 || (g.abs() / (c * r_norm)) <= gtol
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_exponential_decay() {
        // y = 3·exp(-0.5 t), sampled without noise.
        let t: Vec<f64> = (0..12).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = t.iter().map(|&t| 3.0 * (-0.5 * t).exp()).collect();

        let residuals = |p: &DVector<f64>| -> Result<DVector<f64>, FitError> {
            Ok(DVector::from_iterator(
                t.len(),
                t.iter().zip(y.iter()).map(|(&t, &y)| p[0] * (-p[1] * t).exp() - y),
            ))
        };

        let out = levenberg_marquardt(residuals, DVector::from_row_slice(&[1.0, 1.5]), &LmOptions::default()).unwrap();
        assert!(out.status.is_converged(), "status={:?}", out.status);
        assert!((out.params[0] - 3.0).abs() < 1e-6);
        assert!((out.params[1] - 0.5).abs() < 1e-6);
        assert!(out.cost < 1e-10);
    }

    #[test]
    fn linear_problem_jacobian_is_exact() {
        let residuals = |p: &DVector<f64>| -> Result<DVector<f64>, FitError> {
            Ok(DVector::from_row_slice(&[p[0] + 2.0 * p[1] - 1.0, 3.0 * p[0] - p[1]]))
        };
        let out = levenberg_marquardt(residuals, DVector::from_row_slice(&[10.0, -4.0]), &LmOptions::default()).unwrap();
        assert!((out.jacobian[(0, 0)] - 1.0).abs() < 1e-6);
        assert!((out.jacobian[(0, 1)] - 2.0).abs() < 1e-6);
        assert!((out.jacobian[(1, 0)] - 3.0).abs() < 1e-6);
        assert!((out.jacobian[(1, 1)] + 1.0).abs() < 1e-6);
        assert!(out.cost < 1e-12);
    }

    #[test]
    fn exhausted_budget_returns_last_iterate() {
        let residuals = |p: &DVector<f64>| -> Result<DVector<f64>, FitError> {
            Ok(DVector::from_row_slice(&[10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]]))
        };
        let opts = LmOptions {
            max_iterations: 2,
            ..LmOptions::default()
        };
        let start = DVector::from_row_slice(&[-1.2, 1.0]);
        let out = levenberg_marquardt(residuals, start, &opts).unwrap();
        assert_eq!(out.status, FitStatus::MaxIterations);
        assert_eq!(out.iterations, 2);
        // Rosenbrock start cost is 24.2; accepted steps only ever decrease it.
        assert!(out.cost <= 24.2 + 1e-12);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let residuals = |_: &DVector<f64>| -> Result<DVector<f64>, FitError> { Ok(DVector::zeros(1)) };
        let opts = LmOptions {
            max_iterations: 0,
            ..LmOptions::default()
        };
        assert!(matches!(
            levenberg_marquardt(residuals, DVector::zeros(1), &opts),
            Err(FitError::InvalidConfig(_))
        ));
    }
}
