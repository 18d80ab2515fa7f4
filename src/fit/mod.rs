//! Constant fitting.
//!
//! Responsibilities:
//!
//! - a generic Levenberg–Marquardt solver over a residual closure
//! - binding the floated constants into that closure with the rest held fixed
//! - covariance and standard errors of the fitted constants

pub mod fitter;
pub mod lm;

pub use fitter::*;
pub use lm::*;
