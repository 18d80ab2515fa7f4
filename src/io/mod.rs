//! Input/output helpers.
//!
//! - JSON fit-input files (`input`)
//! - line-list and catalog CSV exports (`export`)
//! - fit result JSON (`fitfile`)

pub mod export;
pub mod fitfile;
pub mod input;

pub use export::*;
pub use fitfile::*;
pub use input::*;
