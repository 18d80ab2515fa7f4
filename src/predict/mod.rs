//! Frequency prediction: energy ladders, assigned-transition frequencies, line
//! intensities, and catalog enumeration.

pub mod catalog;
pub mod intensity;
pub mod levels;
pub mod predictor;

pub use catalog::*;
pub use intensity::*;
pub use levels::*;
pub use predictor::*;
