//! Watson A-reduced asymmetric-top Hamiltonian in the symmetric-top basis.
//!
//! For a given J the basis states are `|J, K>` with `K = -J..=J`, so the matrix is
//! `(2J+1) × (2J+1)`. Row/column `l` maps to `K = l - J`.
//!
//! Nonzero elements:
//!
//! ```text
//! <K|H|K>   = (B+C)/2·J(J+1) + (A-(B+C)/2)·K² - [DJ·J²(J+1)² + DJK·K²·J(J+1) + DK·K⁴]
//! <K|H|K∓2> = [(B-C)/4 - dJ·J(J+1) - dK·(K² + (K∓2)²)/2]
//!             · sqrt[(J(J+1) - (K∓1)(K∓2)) · (J(J+1) - K(K∓1))]
//! ```
//!
//! The matrix is rebuilt from scratch for every `(J, constants)` pair.

use nalgebra::DMatrix;

use crate::domain::HamiltonianConstants;

/// Build the Hamiltonian matrix for one J block.
pub fn build_hamiltonian(j: u32, constants: &HamiltonianConstants) -> DMatrix<f64> {
    let dim = 2 * j as usize + 1;
    let offset = j as i64;
    let jj = j as f64 * (j as f64 + 1.0);

    DMatrix::from_fn(dim, dim, |l, m| {
        let k_row = (l as i64 - offset) as f64;
        let k_col = (m as i64 - offset) as f64;
        if l == m {
            diagonal_element(jj, k_row, constants)
        } else if m + 2 == l {
            let radicand = (jj - (k_row - 1.0) * (k_row - 2.0)) * (jj - k_row * (k_row - 1.0));
            asymmetry_prefactor(jj, k_row, k_col, constants) * radicand.sqrt()
        } else if l + 2 == m {
            let radicand = (jj - (k_row + 1.0) * (k_row + 2.0)) * (jj - k_row * (k_row + 1.0));
            asymmetry_prefactor(jj, k_row, k_col, constants) * radicand.sqrt()
        } else {
            0.0
        }
    })
}

fn diagonal_element(jj: f64, k: f64, constants: &HamiltonianConstants) -> f64 {
    let r = &constants.rotational;
    let d = &constants.distortion;
    let k2 = k * k;
    let rigid = 0.5 * (r.b + r.c) * jj + (r.a - 0.5 * (r.b + r.c)) * k2;
    let distortion = d.dj * jj * jj + d.djk * k2 * jj + d.dk * k2 * k2;
    rigid - distortion
}

fn asymmetry_prefactor(jj: f64, k_row: f64, k_col: f64, constants: &HamiltonianConstants) -> f64 {
    let r = &constants.rotational;
    let d = &constants.distortion;
    (r.b - r.c) / 4.0 - jj * d.sub_dj - (k_row * k_row + k_col * k_col) * d.sub_dk * 0.5
}
