//! Dense linear least squares used by the fit driver.
//!
//! Each Levenberg–Marquardt step solves a small damped problem of the form:
//!
//! ```text
//! minimize ‖J δ + r‖² + μ ‖D δ‖²
//! ```
//!
//! which we rewrite as one stacked least-squares system and solve by SVD. The
//! parameter dimension is tiny (3–8 columns), so SVD cost is irrelevant next to
//! the eigen-decompositions that produce `J`.
//!
//! The stacked system has `n + p` rows and `p` columns. With `μ = 0` and a rank
//! deficient `J` it has no unique solution, and the SVD solve returns the
//! minimum-norm step.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped step `[J; sqrt(μ)·D] δ = [-r; 0]`.
///
/// `scale` holds the diagonal of `D²` (Marquardt scaling by `diag(JᵀJ)`).
pub fn solve_damped_step(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &DVector<f64>,
    damping: f64,
) -> Option<DVector<f64>> {
    let (n, p) = jacobian.shape();
    let mut stacked = DMatrix::<f64>::zeros(n + p, p);
    let mut rhs = DVector::<f64>::zeros(n + p);

    stacked.view_mut((0, 0), (n, p)).copy_from(jacobian);
    for i in 0..n {
        rhs[i] = -residuals[i];
    }
    for k in 0..p {
        stacked[(n + k, k)] = (damping * scale[k]).sqrt();
    }

    solve_least_squares(&stacked, &rhs)
}

/// Invert a symmetric positive semi-definite matrix (e.g. `JᵀJ`).
///
/// Returns `None` when the matrix is numerically singular, measured by the
/// ratio of smallest to largest singular value.
pub fn invert_normal_matrix(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = m.nrows();
    if n == 0 || !m.is_square() || m.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let svd = m.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    let rcond = f64::EPSILON * n as f64;
    if !(s_max > 0.0) || s_min <= rcond * s_max {
        return None;
    }

    let inv = svd.pseudo_inverse(0.0).ok()?;
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}
