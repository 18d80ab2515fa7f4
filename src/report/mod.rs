//! Reporting utilities: residual statistics and formatted terminal output.

pub mod format;
pub mod stats;

pub use format::*;
pub use stats::*;
