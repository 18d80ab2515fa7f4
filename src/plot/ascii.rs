//! ASCII stick spectrum for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of assignments in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Layout, top to bottom:
//! - observed lines: `o`
//! - frequency axis: `-`
//! - predicted lines hanging below the axis: `|`, or `*` when assigned
//!
//! Stick length is proportional to relative intensity, with at least one row per
//! drawn line.

use std::collections::HashSet;

use crate::domain::{PredictedLine, Transition};

/// Render observed frequencies above a predicted stick spectrum.
///
/// Lines outside `[f_min, f_max]` are not drawn.
pub fn render_stick_plot(
    predicted: &[PredictedLine],
    observed: &[f64],
    assigned: &[Transition],
    f_min: f64,
    f_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(3);
    let (f_min, f_max) = if f_max > f_min { (f_min, f_max) } else { (f_min, f_min + 1.0) };

    let mut grid = vec![vec![' '; width]; height];
    grid[1].fill('-');

    let assigned: HashSet<Transition> = assigned.iter().copied().collect();
    let in_window = |f: f64| f.is_finite() && f >= f_min && f <= f_max;

    // Per column: strongest intensity and whether any line there is assigned.
    let mut columns: Vec<Option<(f64, bool)>> = vec![None; width];
    let mut n_sticks = 0;
    for l in predicted.iter().filter(|l| in_window(l.frequency)) {
        let x = map_x(l.frequency, f_min, f_max, width);
        let intensity = if l.intensity.is_finite() { l.intensity.max(0.0) } else { 0.0 };
        let is_assigned = assigned.contains(&l.transition);
        columns[x] = Some(match columns[x] {
            Some((i, a)) => (i.max(intensity), a || is_assigned),
            None => (intensity, is_assigned),
        });
        n_sticks += 1;
    }

    let rows = height - 2;
    let strongest = columns.iter().flatten().map(|&(i, _)| i).fold(0.0, f64::max);
    for (x, column) in columns.iter().enumerate() {
        let Some((intensity, is_assigned)) = *column else {
            continue;
        };
        let length = if strongest > 0.0 {
            ((intensity / strongest * rows as f64).round() as usize).clamp(1, rows)
        } else {
            rows
        };
        let ch = if is_assigned { '*' } else { '|' };
        for row in grid.iter_mut().skip(2).take(length) {
            row[x] = ch;
        }
    }

    let mut n_obs = 0;
    for &f in observed.iter().filter(|&&f| in_window(f)) {
        grid[0][map_x(f, f_min, f_max, width)] = 'o';
        n_obs += 1;
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: freq=[{f_min:.3}, {f_max:.3}] MHz | {n_sticks} predicted, {n_obs} observed\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn map_x(f: f64, f_min: f64, f_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((f - f_min) / (f_max - f_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DipoleType;

    fn line(q: [u32; 6], frequency: f64, intensity: f64) -> PredictedLine {
        PredictedLine {
            transition: Transition::from(q),
            frequency,
            dipole: DipoleType::A,
            lower_energy: 0.0,
            intensity,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let predicted = vec![
            line([2, 0, 2, 1, 0, 1], 1.0, 1.0),
            line([3, 0, 3, 2, 0, 2], 5.0, 1.0),
            line([9, 0, 9, 8, 0, 8], 42.0, 1.0),
        ];
        let observed = [5.0, 8.0, -3.0];
        let assigned = [Transition::from([3, 0, 3, 2, 0, 2])];

        let txt = render_stick_plot(&predicted, &observed, &assigned, 0.0, 9.0, 10, 4);
        let expected = concat!(
            "Plot: freq=[0.000, 9.000] MHz | 2 predicted, 2 observed\n",
            "     o  o \n",
            "----------\n",
            " |   *    \n",
            " |   *    \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn assigned_stick_wins_shared_column() {
        let predicted = vec![line([3, 0, 3, 2, 0, 2], 5.0, 1.0), line([4, 1, 3, 3, 1, 2], 5.1, 1.0)];
        let assigned = [Transition::from([3, 0, 3, 2, 0, 2])];
        let txt = render_stick_plot(&predicted, &[], &assigned, 0.0, 9.0, 10, 3);
        assert_eq!(txt.lines().nth(3), Some("     *    "));
    }

    #[test]
    fn stick_length_follows_intensity() {
        let predicted = vec![
            line([2, 0, 2, 1, 0, 1], 1.0, 0.5),
            line([3, 0, 3, 2, 0, 2], 5.0, 1.0),
            line([4, 0, 4, 3, 0, 3], 8.0, 0.001),
        ];
        let txt = render_stick_plot(&predicted, &[], &[], 0.0, 9.0, 10, 6);
        let expected = concat!(
            "Plot: freq=[0.000, 9.000] MHz | 3 predicted, 0 observed\n",
            "          \n",
            "----------\n",
            " |   |  | \n",
            " |   |    \n",
            "     |    \n",
            "     |    \n",
        );
        assert_eq!(txt, expected);
    }
}
