//! Error types.
//!
//! Two layers:
//!
//! - [`FitError`] is returned by the numerical core (Hamiltonian, predictor, fit driver).
//!   Only structural precondition failures are errors; a fit that stops early or
//!   produces a singular covariance is reported through `FitStatus` instead.
//! - [`AppError`] is what the binary surfaces: a message plus a process exit code.

use thiserror::Error;

use crate::domain::RotState;

/// Structural failures in the numerical core.
#[derive(Debug, Clone, Error)]
pub enum FitError {
    #[error("invalid quantum numbers {state}: {reason}")]
    InvalidQuantumNumbers { state: RotState, reason: String },

    #[error("{transitions} transitions but {observed} observed frequencies")]
    DimensionMismatch { transitions: usize, observed: usize },

    #[error("underdetermined fit: {observations} observations for {parameters} free parameters")]
    Underdetermined { observations: usize, parameters: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("non-finite value: {0}")]
    NonFiniteValue(String),

    #[error("eigensolver failure: {0}")]
    Eigen(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = match &err {
            FitError::InvalidQuantumNumbers { .. }
            | FitError::DimensionMismatch { .. }
            | FitError::InvalidConfig(_) => 2,
            FitError::Underdetermined { .. } => 3,
            FitError::NonFiniteValue(_) | FitError::Eigen(_) => 4,
        };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_codes() {
        let mismatch: AppError = FitError::DimensionMismatch { transitions: 3, observed: 2 }.into();
        assert_eq!(mismatch.exit_code(), 2);
        assert!(mismatch.to_string().contains("3 transitions"));

        let under: AppError = FitError::Underdetermined { observations: 2, parameters: 3 }.into();
        assert_eq!(under.exit_code(), 3);

        let eig: AppError = FitError::Eigen("no convergence".to_string()).into();
        assert_eq!(eig.exit_code(), 4);
    }
}
