//! Symmetric eigensolver adapter.
//!
//! The Hamiltonian is exactly symmetric by construction, so we always go through
//! nalgebra's `SymmetricEigen` (real eigenvalues, no complex round-off) rather than a
//! general eigen-decomposition.

use nalgebra::{DMatrix, Dyn, SymmetricEigen};

use crate::error::FitError;

/// Iteration cap handed to the symmetric QR sweeps.
const MAX_SWEEPS: usize = 10_000;

/// Eigenvalues of a real symmetric matrix, sorted ascending.
pub fn sorted_eigenvalues(matrix: &DMatrix<f64>) -> Result<Vec<f64>, FitError> {
    let eig = decompose(matrix)?;
    let mut values: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    values.sort_by(f64::total_cmp);
    Ok(values)
}

/// Eigenvalues sorted ascending, with the matching unit eigenvectors as columns.
pub fn sorted_eigensystem(matrix: &DMatrix<f64>) -> Result<(Vec<f64>, DMatrix<f64>), FitError> {
    let eig = decompose(matrix)?;
    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&i, &k| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[k]));

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let n = matrix.nrows();
    let vectors = DMatrix::from_fn(n, n, |row, col| eig.eigenvectors[(row, order[col])]);
    Ok((values, vectors))
}

fn decompose(matrix: &DMatrix<f64>) -> Result<SymmetricEigen<f64, Dyn>, FitError> {
    if !matrix.is_square() {
        return Err(FitError::InvalidConfig(format!(
            "eigenvalues requested for a non-square {}x{} matrix",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteValue("Hamiltonian matrix element".to_string()));
    }

    SymmetricEigen::try_new(matrix.clone(), f64::EPSILON, MAX_SWEEPS).ok_or_else(|| {
        FitError::Eigen(format!(
            "symmetric eigensolver did not converge for a {}x{} matrix",
            matrix.nrows(),
            matrix.ncols()
        ))
    })
}
