//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initialises logging
//! - parses CLI arguments
//! - loads fit-input files
//! - runs fits, catalog predictions and simulations
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use log::debug;

use crate::cli::{Command, FitArgs, PlotArgs, PredictArgs, SimulateArgs};
use crate::error::AppError;
use crate::io::FitInputFile;

pub mod pipeline;

/// Entry point for the `rotfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // `rotfit` alone runs the demo and `rotfit -i in.json` means `rotfit fit -i in.json`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    debug!("{cli:?}");

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Predict(args) => handle_predict(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let mut input = crate::io::read_fit_input(&args.input)?;
    if let Some(mask) = &args.float_params {
        input.config.float_params = mask.clone();
    }
    if let Some(n) = args.max_iter {
        input.config.max_iterations = n;
    }

    let run = pipeline::run_fit(&input)?;
    print_run(&run, &input, &args.plot)?;

    // Optional exports.
    if let Some(path) = &args.export_json {
        crate::io::write_fit_json(path, &run.fit, &run.stats)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::write_line_list_csv(path, &run.stats)?;
    }
    Ok(())
}

fn handle_demo(args: PlotArgs) -> Result<(), AppError> {
    let input = FitInputFile::hexanal();
    println!("=== rotfit demo: hexanal conformer I ===\n");
    let run = pipeline::run_fit(&input)?;
    print_run(&run, &input, &args)
}

fn print_run(run: &pipeline::RunOutput, input: &FitInputFile, plot: &PlotArgs) -> Result<(), AppError> {
    println!("{}", crate::report::format_fit_report(&run.fit, &run.stats));

    if plot.plot {
        let (lines, f_min, f_max) = pipeline::plot_catalog(run, &input.catalog)?;
        let txt = crate::plot::render_stick_plot(
            &lines,
            run.data.observed(),
            run.data.transitions(),
            f_min,
            f_max,
            plot.width,
            plot.height,
        );
        println!("{txt}");
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let input = crate::io::read_fit_input(&args.input)?;
    let mut catalog = input.catalog.clone();
    if let Some(j) = args.j_max {
        catalog.j_max = j;
    }
    if let Some(f) = args.f_min {
        catalog.f_min = f;
    }
    if let Some(f) = args.f_max {
        catalog.f_max = f;
    }
    if let Some(types) = &args.types {
        catalog.types = types.clone();
    }
    if let Some(t) = args.temperature {
        catalog.temperature_k = t;
    }

    let mut lines = crate::predict::predict_catalog(&input.initial_constants(), &catalog)?;
    if let Some(n) = args.strongest {
        lines = crate::predict::strongest_lines(&lines, n);
    }
    println!("{}", crate::report::format_catalog(&lines));

    if let Some(path) = &args.export_csv {
        crate::io::write_catalog_csv(path, &lines)?;
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let mut input = crate::io::read_fit_input(&args.input)?;
    input.observed = crate::data::simulate_observations(
        &input.transitions,
        &input.initial_constants(),
        args.noise_khz,
        args.seed,
    )?;

    match &args.output {
        Some(path) => crate::io::write_fit_input(path, &input),
        None => {
            let json = serde_json::to_string_pretty(&input)
                .map_err(|e| AppError::new(4, format!("Failed to serialize simulated input: {e}")))?;
            println!("{json}");
            Ok(())
        }
    }
}

/// Rewrite argv so `rotfit` defaults to `rotfit demo`.
///
/// Rules:
/// - `rotfit`                        -> `rotfit demo`
/// - `rotfit -i in.json ...`         -> `rotfit fit -i in.json ...`
/// - `rotfit --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("demo".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "predict" | "simulate" | "demo");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    argv
}
