//! `rotfit` library crate.
//!
//! The binary (`rotfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the Hamiltonian, predictor and fit driver are reusable outside the CLI
//!
//! Layers, bottom up: `math` (Hamiltonian + eigensolver), `predict` (levels,
//! transition frequencies, catalogs), `fit` (Levenberg–Marquardt driver),
//! `report` (statistics + formatting).

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod predict;
pub mod report;
