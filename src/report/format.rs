//! Formatted terminal output for fits and catalogs.
//!
//! We keep formatting code in one place so the fitting code stays free of
//! presentation details and the golden tests below pin the exact layout.

use crate::domain::{ConstantId, ConvergenceReason, FitResult, FitStatus, PredictedLine, Transition};
use crate::report::stats::{FitStatistics, format_uncertainty};

/// Full fit report: constants, status, line list, RMS.
pub fn format_fit_report(fit: &FitResult, stats: &FitStatistics) -> String {
    let mut out = String::new();

    out.push_str("Fit Parameters:\n");
    for id in ConstantId::ALL {
        out.push_str(&format_constant(fit, id));
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&format!(
        "Status: {} after {} iterations ({} lines, {} free)\n",
        status_label(fit.status),
        fit.iterations,
        fit.n_observations,
        fit.free.len()
    ));
    for w in fit.warnings() {
        out.push_str(&format!("Warning: {w}\n"));
    }
    out.push('\n');

    out.push_str("------------ LINELIST ---------\n");
    out.push_str(&format_line_list(stats));
    out.push_str(&format!("RMS Error: {:.4} kHz\n", stats.rms_khz()));

    out
}

/// One `NAME (unit): value` row. Distortion constants are shown in kHz.
fn format_constant(fit: &FitResult, id: ConstantId) -> String {
    let (unit, scale) = if id.is_distortion() { ("kHz", 1000.0) } else { ("MHz", 1.0) };
    let value = fit.value(id) * scale;
    let body = match fit.std_error(id) {
        Some(se) => format_uncertainty(value, se * scale),
        None if id.is_distortion() => format!("{value:.3}"),
        None => format!("{value:.6} (fixed)"),
    };
    format!("{} ({unit}): {body}", id.label())
}

fn status_label(status: FitStatus) -> &'static str {
    match status {
        FitStatus::Converged(ConvergenceReason::CostReduction) => "converged (cost reduction)",
        FitStatus::Converged(ConvergenceReason::StepSize) => "converged (step size)",
        FitStatus::Converged(ConvergenceReason::Gradient) => "converged (gradient)",
        FitStatus::MaxIterations => "NOT converged",
    }
}

/// Assigned lines with calculated, observed and OMC columns.
pub fn format_line_list(stats: &FitStatistics) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<8}  -->  {:<8}  {:>12} {:>12} {:>10}\n",
            "J Ka Kc", "J Ka Kc", "CALC. FREQ", "OBS. FREQ", "OMC (kHz)"
        )
        .trim_end(),
    );
    out.push('\n');

    for r in &stats.residuals {
        out.push_str(
            format!(
                "{}  {:>12.3} {:>12.3} {:>10.2}\n",
                fmt_quanta(&r.transition),
                r.calculated,
                r.observed,
                r.omc_khz
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Predicted catalog table, one line per transition. Intensities are shown as
/// `log10` of the value relative to the strongest line.
pub fn format_catalog(lines: &[PredictedLine]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<8}  -->  {:<8}  {:>12} {:>4} {:>12} {:>9}\n",
            "J Ka Kc", "J Ka Kc", "FREQ (MHz)", "TYPE", "E_LOW (MHz)", "LOG10(I)"
        )
        .trim_end(),
    );
    out.push('\n');

    for l in lines {
        out.push_str(
            format!(
                "{}  {:>12.3} {:>4} {:>12.3} {:>9.3}\n",
                fmt_quanta(&l.transition),
                l.frequency,
                l.dipole.label(),
                l.lower_energy,
                l.intensity.log10()
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out.push_str(&format!("{} lines\n", lines.len()));
    out
}

fn fmt_quanta(t: &Transition) -> String {
    let u = t.upper;
    let l = t.lower;
    format!(
        "{:>2} {:>2} {:>2}  -->  {:>2} {:>2} {:>2}",
        u.j, u.ka, u.kc, l.j, l.ka, l.kc
    )
}
