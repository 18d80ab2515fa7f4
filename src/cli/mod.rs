//! Command-line parsing for the rotational-spectrum fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the Hamiltonian/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ConstantId, DipoleType};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rotfit", version, about = "Asymmetric-top rotational spectrum fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit constants to assigned lines, print the report, and optionally plot/export.
    Fit(FitArgs),
    /// Predict a line catalog from the constants in an input file.
    Predict(PredictArgs),
    /// Replace the observed frequencies of an input file with simulated ones.
    Simulate(SimulateArgs),
    /// Fit the bundled hexanal data set.
    Demo(PlotArgs),
}

/// Options for `rotfit fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Fit-input JSON (guess, distortion, transitions, observed).
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: PathBuf,

    /// Constants to float (comma separated). Overrides the input file.
    #[arg(long = "float", value_enum, value_delimiter = ',')]
    pub float_params: Option<Vec<ConstantId>>,

    /// Iteration budget. Overrides the input file.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Export the fit (constants, covariance, residuals) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Export the line list to CSV.
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,

    #[command(flatten)]
    pub plot: PlotArgs,
}

/// Options for `rotfit predict`.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Fit-input JSON; `guess` and `distortion` define the constants.
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: PathBuf,

    /// Highest J included. Overrides the input file.
    #[arg(long)]
    pub j_max: Option<u32>,

    /// Lower edge of the frequency window (MHz).
    #[arg(long)]
    pub f_min: Option<f64>,

    /// Upper edge of the frequency window (MHz).
    #[arg(long)]
    pub f_max: Option<f64>,

    /// Dipole types to include (comma separated).
    #[arg(long, value_enum, value_delimiter = ',')]
    pub types: Option<Vec<DipoleType>>,

    /// Rotational temperature for intensities (K). Overrides the input file.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Keep only the N most intense lines.
    #[arg(long, value_name = "N")]
    pub strongest: Option<usize>,

    /// Export the catalog to CSV.
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,
}

/// Options for `rotfit simulate`.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Fit-input JSON; its transitions are simulated from `guess` and `distortion`.
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: PathBuf,

    /// Gaussian noise standard deviation (kHz).
    #[arg(long, default_value_t = 10.0)]
    pub noise_khz: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output fit-input JSON. Printed to stdout when omitted.
    #[arg(short = 'o', long, value_name = "JSON")]
    pub output: Option<PathBuf>,
}

/// Terminal stick-plot options.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Render an ASCII stick spectrum after the report.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,
}
