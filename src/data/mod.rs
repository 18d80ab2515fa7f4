//! Bundled data sets and synthetic observations.

pub mod hexanal;
pub mod sample;

pub use sample::*;
