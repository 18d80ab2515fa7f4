//! CSV exports of assigned-line residuals and predicted catalogs.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::PredictedLine;
use crate::error::AppError;
use crate::report::FitStatistics;

/// Write the assigned line list with calculated frequencies and OMC.
pub fn write_line_list_csv(path: &Path, stats: &FitStatistics) -> Result<(), AppError> {
    let mut w = create(path)?;
    writeln!(w, "j_up,ka_up,kc_up,j_low,ka_low,kc_low,obs_mhz,calc_mhz,omc_khz").map_err(write_err)?;

    for r in &stats.residuals {
        let (u, l) = (r.transition.upper, r.transition.lower);
        writeln!(
            w,
            "{},{},{},{},{},{},{:.6},{:.6},{:.2}",
            u.j, u.ka, u.kc, l.j, l.ka, l.kc, r.observed, r.calculated, r.omc_khz
        )
        .map_err(write_err)?;
    }
    w.flush().map_err(write_err)
}

/// Write a predicted catalog.
pub fn write_catalog_csv(path: &Path, lines: &[PredictedLine]) -> Result<(), AppError> {
    let mut w = create(path)?;
    writeln!(w, "j_up,ka_up,kc_up,j_low,ka_low,kc_low,freq_mhz,type,e_low_mhz,rel_intensity").map_err(write_err)?;

    for line in lines {
        let (u, l) = (line.transition.upper, line.transition.lower);
        writeln!(
            w,
            "{},{},{},{},{},{},{:.6},{},{:.6},{:.6e}",
            u.j,
            u.ka,
            u.kc,
            l.j,
            l.ka,
            l.kc,
            line.frequency,
            line.dipole.label(),
            line.lower_energy,
            line.intensity
        )
        .map_err(write_err)?;
    }
    w.flush().map_err(write_err)
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    Ok(BufWriter::new(file))
}

fn write_err(e: std::io::Error) -> AppError {
    AppError::new(2, format!("Failed to write export CSV: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DipoleType, Transition};
    use crate::report::LineResidual;

    #[test]
    fn line_list_csv_layout() {
        let stats = FitStatistics {
            residuals: vec![LineResidual {
                transition: Transition::from([4, 0, 4, 3, 0, 3]),
                observed: 6747.32023,
                calculated: 6747.3,
                omc_khz: 20.23,
            }],
            rms_mhz: 0.02,
        };
        let path = std::env::temp_dir().join(format!("rotfit-lines-{}.csv", std::process::id()));
        write_line_list_csv(&path, &stats).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("j_up,ka_up,kc_up,j_low,ka_low,kc_low,obs_mhz,calc_mhz,omc_khz")
        );
        assert_eq!(lines.next(), Some("4,0,4,3,0,3,6747.320230,6747.300000,20.23"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn catalog_csv_has_one_row_per_line() {
        let lines = vec![PredictedLine {
            transition: Transition::from([1, 0, 1, 0, 0, 0]),
            frequency: 9000.0,
            dipole: DipoleType::A,
            lower_energy: 0.0,
            intensity: 0.25,
        }];
        let path = std::env::temp_dir().join(format!("rotfit-catalog-{}.csv", std::process::id()));
        write_catalog_csv(&path, &lines).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text.lines().nth(1), Some("1,0,1,0,0,0,9000.000000,a,0.000000,2.500000e-1"));
    }
}
