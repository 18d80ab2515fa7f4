//! Line catalog prediction.
//!
//! Enumerates electric-dipole transitions between all levels up to `j_max` and keeps
//! those inside a frequency window. Selection rules:
//!
//! - `ΔJ ∈ {-1, 0, +1}`
//! - `|ΔKa| <= 1`, `|ΔKc| <= 1`
//! - a-type: Ka parity kept, Kc parity flips
//! - b-type: both flip
//! - c-type: Ka parity flips, Kc parity kept
//!
//! Each line carries a relative intensity from its eigenvector line strength, the
//! configured dipole component and the Boltzmann population of its lower level,
//! scaled so the strongest line in the catalog is 1.

use rayon::prelude::*;

use crate::domain::{CatalogConfig, DipoleType, HamiltonianConstants, MAX_J, PredictedLine, RotState, Transition};
use crate::error::FitError;
use crate::math::Wigner3j;
use crate::predict::intensity::{LevelRef, absorption_intensity, line_strength};
use crate::predict::levels::EigenLadder;

/// Predict every allowed line within `[f_min, f_max]`, sorted by frequency.
pub fn predict_catalog(
    constants: &HamiltonianConstants,
    config: &CatalogConfig,
) -> Result<Vec<PredictedLine>, FitError> {
    validate_config(config)?;
    if !constants.all_finite() {
        return Err(FitError::NonFiniteValue(format!("Hamiltonian constants {:?}", constants.to_array())));
    }

    let ladders: Vec<EigenLadder> = (0..=config.j_max)
        .into_par_iter()
        .map(|j| EigenLadder::compute(j, constants))
        .collect::<Result<Vec<_>, FitError>>()?;
    let ground = ladders[0].values()[0];
    let wigner = Wigner3j::new(2 * config.j_max as usize + 2);

    let mut lines: Vec<PredictedLine> = (0..=config.j_max)
        .into_par_iter()
        .map(|j| lines_from_block(j, &ladders, ground, &wigner, config))
        .flatten()
        .collect();

    let strongest = lines.iter().map(|l| l.intensity).fold(0.0, f64::max);
    if strongest > 0.0 {
        for line in &mut lines {
            line.intensity /= strongest;
        }
    }

    lines.sort_by(|a, b| {
        a.frequency
            .total_cmp(&b.frequency)
            .then_with(|| <[u32; 6]>::from(a.transition).cmp(&<[u32; 6]>::from(b.transition)))
    });
    Ok(lines)
}

/// Keep the `n` most intense lines, still sorted by frequency.
pub fn strongest_lines(lines: &[PredictedLine], n: usize) -> Vec<PredictedLine> {
    let mut ranked = lines.to_vec();
    ranked.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    ranked.truncate(n);
    ranked.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
    ranked
}

fn validate_config(config: &CatalogConfig) -> Result<(), FitError> {
    if config.j_max > MAX_J {
        return Err(FitError::InvalidConfig(format!(
            "j_max={} exceeds the supported maximum of {MAX_J}",
            config.j_max
        )));
    }
    if !(config.f_min.is_finite() && config.f_max.is_finite() && config.f_max > config.f_min) {
        return Err(FitError::InvalidConfig(format!(
            "invalid frequency window [{}, {}]",
            config.f_min, config.f_max
        )));
    }
    if config.types.is_empty() {
        return Err(FitError::InvalidConfig("no dipole types selected".to_string()));
    }
    if !(config.temperature_k.is_finite() && config.temperature_k > 0.0) {
        return Err(FitError::InvalidConfig(format!(
            "temperature must be positive, got {} K",
            config.temperature_k
        )));
    }
    if [config.mu_a, config.mu_b, config.mu_c].iter().any(|mu| !mu.is_finite()) {
        return Err(FitError::InvalidConfig("dipole components must be finite".to_string()));
    }
    Ok(())
}

/// Lines whose lower-J member lies in block `j` (partners in `j` and `j+1`).
fn lines_from_block(
    j: u32,
    ladders: &[EigenLadder],
    ground: f64,
    wigner: &Wigner3j,
    config: &CatalogConfig,
) -> Vec<PredictedLine> {
    let mut out = Vec::new();
    let states = RotState::ladder(j);
    let block = &ladders[j as usize];
    let energies = block.values();

    for (i, &s1) in states.iter().enumerate() {
        let e1 = energies[i];
        let here = LevelRef { ladder: block, index: i };

        // Same-J partners above s1 in the ladder, then the whole J+1 ladder.
        let mut partners: Vec<(RotState, LevelRef<'_>)> = states[i + 1..]
            .iter()
            .enumerate()
            .map(|(offset, &s)| (s, LevelRef { ladder: block, index: i + 1 + offset }))
            .collect();
        if j < config.j_max {
            let next = &ladders[j as usize + 1];
            partners.extend(
                RotState::ladder(j + 1)
                    .into_iter()
                    .enumerate()
                    .map(|(index, s)| (s, LevelRef { ladder: next, index })),
            );
        }

        for (s2, there) in partners {
            if s1.ka.abs_diff(s2.ka) > 1 || s1.kc.abs_diff(s2.kc) > 1 {
                continue;
            }
            let Some(dipole) = DipoleType::classify(s1, s2) else {
                continue;
            };
            if !config.types.contains(&dipole) {
                continue;
            }

            let e2 = there.ladder.values()[there.index];
            let (upper, lower, up_ref, low_ref, e_lower, freq) = if e2 >= e1 {
                (s2, s1, there, here, e1, e2 - e1)
            } else {
                (s1, s2, here, there, e2, e1 - e2)
            };
            if freq < config.f_min || freq > config.f_max {
                continue;
            }

            let lower_energy = e_lower - ground;
            let strength = line_strength(up_ref, low_ref, dipole, wigner);
            let intensity = absorption_intensity(
                config.dipole_component(dipole),
                strength,
                freq,
                lower_energy,
                config.temperature_k,
            );

            out.push(PredictedLine {
                transition: Transition::new(upper, lower),
                frequency: freq,
                dipole,
                lower_energy,
                intensity,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::hexanal;
    use crate::predict::predict_frequency;

    #[test]
    fn rigid_rotor_low_j_catalog() {
        let k = HamiltonianConstants::rigid(10000.0, 5000.0, 4000.0);
        let config = CatalogConfig {
            j_max: 1,
            f_min: 1.0,
            f_max: 100_000.0,
            types: vec![DipoleType::A, DipoleType::B, DipoleType::C],
            ..CatalogConfig::default()
        };
        let lines = predict_catalog(&k, &config).unwrap();

        // J<=1 has 0(0,0), 1(0,1), 1(1,1), 1(1,0).
        //   1(0,1)-0(0,0) a-type  9000
        //   1(1,1)-0(0,0) b-type 14000
        //   1(1,0)-0(0,0) c-type 15000
        //   1(1,1)-1(0,1) c-type  5000
        //   1(1,0)-1(0,1) b-type  6000
        //   1(1,0)-1(1,1) a-type  1000
        let freqs: Vec<f64> = lines.iter().map(|l| l.frequency).collect();
        let expected = [1000.0, 5000.0, 6000.0, 9000.0, 14000.0, 15000.0];
        assert_eq!(freqs.len(), expected.len());
        for (f, e) in freqs.iter().zip(expected.iter()) {
            assert!((f - e).abs() < 1e-8, "{f} vs {e}");
        }
        assert_eq!(lines[0].dipole, DipoleType::A);
        assert_eq!(lines[2].dipole, DipoleType::B);
    }

    #[test]
    fn catalog_contains_assigned_hexanal_lines() {
        let k = hexanal::seed_constants();
        let config = CatalogConfig {
            j_max: 9,
            f_min: 6000.0,
            f_max: 14000.0,
            types: vec![DipoleType::A, DipoleType::B],
            ..CatalogConfig::default()
        };
        let lines = predict_catalog(&k, &config).unwrap();
        for t in hexanal::transitions() {
            let line = lines
                .iter()
                .find(|l| l.transition == t)
                .unwrap_or_else(|| panic!("{t} missing from catalog"));
            let f = predict_frequency(&t, &k).unwrap();
            assert!((line.frequency - f).abs() < 1e-9);
        }
        assert!(lines.windows(2).all(|w| w[0].frequency <= w[1].frequency));
    }

    #[test]
    fn type_filter_and_window_are_respected() {
        let k = hexanal::seed_constants();
        let config = CatalogConfig {
            j_max: 6,
            f_min: 5000.0,
            f_max: 9000.0,
            types: vec![DipoleType::A],
            ..CatalogConfig::default()
        };
        let lines = predict_catalog(&k, &config).unwrap();
        assert!(!lines.is_empty());
        for l in &lines {
            assert_eq!(l.dipole, DipoleType::A);
            assert!(l.frequency >= 5000.0 && l.frequency <= 9000.0);
        }
    }

    #[test]
    fn intensities_follow_strength_and_dipole_weights() {
        let k = HamiltonianConstants::rigid(10000.0, 5000.0, 4000.0);
        let config = CatalogConfig {
            j_max: 1,
            f_min: 8000.0,
            f_max: 100_000.0,
            ..CatalogConfig::default()
        };
        let lines = predict_catalog(&k, &config).unwrap();
        let find = |f: f64| lines.iter().find(|l| (l.frequency - f).abs() < 1e-6).unwrap();

        // 1(0,1), 1(1,1) and 1(1,0) from the ground level all have unit strength.
        let a = find(9000.0).intensity;
        let b = find(14000.0).intensity;
        let expected = absorption_intensity(1.0, 1.0, 14000.0, 0.0, 298.0)
            / absorption_intensity(1.0, 1.0, 9000.0, 0.0, 298.0);
        assert!((b / a - expected).abs() < 1e-9, "{} vs {expected}", b / a);
        assert!((find(15000.0).intensity - 1.0).abs() < 1e-12);

        let no_b = CatalogConfig { mu_b: 0.0, ..config };
        let lines = predict_catalog(&k, &no_b).unwrap();
        for l in &lines {
            assert_eq!(l.intensity == 0.0, l.dipole == DipoleType::B, "{}", l.transition);
        }
    }

    #[test]
    fn strongest_lines_keeps_frequency_order() {
        let k = hexanal::seed_constants();
        let config = CatalogConfig {
            j_max: 8,
            f_min: 6000.0,
            f_max: 14000.0,
            ..CatalogConfig::default()
        };
        let lines = predict_catalog(&k, &config).unwrap();
        let top = strongest_lines(&lines, 5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].frequency <= w[1].frequency));
        let weakest_kept = top.iter().map(|l| l.intensity).fold(f64::INFINITY, f64::min);
        let stronger_elsewhere = lines
            .iter()
            .filter(|l| !top.contains(l))
            .any(|l| l.intensity > weakest_kept);
        assert!(!stronger_elsewhere);
        assert!(top.iter().any(|l| l.intensity == 1.0));
    }

    #[test]
    fn rejects_j_max_beyond_limit_and_bad_temperature() {
        let k = HamiltonianConstants::rigid(3000.0, 1500.0, 1000.0);
        let too_big = CatalogConfig {
            j_max: 100_000,
            ..CatalogConfig::default()
        };
        assert!(matches!(predict_catalog(&k, &too_big), Err(FitError::InvalidConfig(_))));
        let frozen = CatalogConfig {
            temperature_k: 0.0,
            ..CatalogConfig::default()
        };
        assert!(matches!(predict_catalog(&k, &frozen), Err(FitError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_window() {
        let k = HamiltonianConstants::rigid(3000.0, 1500.0, 1000.0);
        let config = CatalogConfig {
            f_min: 10.0,
            f_max: 5.0,
            ..CatalogConfig::default()
        };
        assert!(matches!(predict_catalog(&k, &config), Err(FitError::InvalidConfig(_))));
    }
}
