//! Numerical building blocks: Hamiltonian construction, symmetric eigenvalues,
//! dense least squares, and Wigner 3j symbols.

pub mod eigen;
pub mod hamiltonian;
pub mod ols;
pub mod wigner;

pub use eigen::*;
pub use hamiltonian::*;
pub use ols::*;
pub use wigner::*;
