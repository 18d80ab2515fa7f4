//! Shared domain types.
//!
//! These types are kept small and `Copy` where possible so the predictor and the
//! fit driver can pass them by value. Most of them are serializable so they can be
//! read from fit-input files and written to exports.

use std::fmt;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Rigid-rotor rotational constants (MHz).
///
/// Callers supply `A >= B >= C`; the ordering is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationalConstants {
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
}

impl RotationalConstants {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }
}

/// Watson A-reduction quartic centrifugal-distortion constants (MHz).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistortionConstants {
    #[serde(rename = "DJ")]
    pub dj: f64,
    #[serde(rename = "DJK")]
    pub djk: f64,
    #[serde(rename = "DK")]
    pub dk: f64,
    #[serde(rename = "dJ")]
    pub sub_dj: f64,
    #[serde(rename = "dK")]
    pub sub_dk: f64,
}

impl DistortionConstants {
    pub fn new(dj: f64, djk: f64, dk: f64, sub_dj: f64, sub_dk: f64) -> Self {
        Self {
            dj,
            djk,
            dk,
            sub_dj,
            sub_dk,
        }
    }

}

/// The full set of eight constants that define one Hamiltonian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianConstants {
    pub rotational: RotationalConstants,
    #[serde(default)]
    pub distortion: DistortionConstants,
}

impl HamiltonianConstants {
    pub fn new(rotational: RotationalConstants, distortion: DistortionConstants) -> Self {
        Self {
            rotational,
            distortion,
        }
    }

    /// Rigid rotor (all distortion terms zero).
    pub fn rigid(a: f64, b: f64, c: f64) -> Self {
        Self::new(RotationalConstants::new(a, b, c), DistortionConstants::default())
    }

    /// Constants in `ConstantId::ALL` order.
    pub fn to_array(&self) -> [f64; 8] {
        let r = &self.rotational;
        let d = &self.distortion;
        [r.a, r.b, r.c, d.dj, d.djk, d.dk, d.sub_dj, d.sub_dk]
    }

    pub fn from_array(v: [f64; 8]) -> Self {
        Self::new(
            RotationalConstants::new(v[0], v[1], v[2]),
            DistortionConstants::new(v[3], v[4], v[5], v[6], v[7]),
        )
    }

    pub fn get(&self, id: ConstantId) -> f64 {
        self.to_array()[id.index()]
    }

    pub fn set(&mut self, id: ConstantId, value: f64) {
        let mut v = self.to_array();
        v[id.index()] = value;
        *self = Self::from_array(v);
    }

    /// Exact bit patterns, used as a memoisation key for energy levels.
    pub fn cache_key(&self) -> [u64; 8] {
        self.to_array().map(f64::to_bits)
    }

    pub fn all_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Identifies one of the eight Hamiltonian constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ConstantId {
    #[serde(rename = "A")]
    #[value(name = "A")]
    A,
    #[serde(rename = "B")]
    #[value(name = "B")]
    B,
    #[serde(rename = "C")]
    #[value(name = "C")]
    C,
    #[serde(rename = "DJ")]
    #[value(name = "DJ")]
    DJ,
    #[serde(rename = "DJK")]
    #[value(name = "DJK")]
    DJK,
    #[serde(rename = "DK")]
    #[value(name = "DK")]
    DK,
    #[serde(rename = "dJ")]
    #[value(name = "dJ")]
    SubDJ,
    #[serde(rename = "dK")]
    #[value(name = "dK")]
    SubDK,
}

impl ConstantId {
    pub const ALL: [ConstantId; 8] = [
        ConstantId::A,
        ConstantId::B,
        ConstantId::C,
        ConstantId::DJ,
        ConstantId::DJK,
        ConstantId::DK,
        ConstantId::SubDJ,
        ConstantId::SubDK,
    ];

    pub const ROTATIONAL: [ConstantId; 3] = [ConstantId::A, ConstantId::B, ConstantId::C];

    pub fn index(self) -> usize {
        match self {
            ConstantId::A => 0,
            ConstantId::B => 1,
            ConstantId::C => 2,
            ConstantId::DJ => 3,
            ConstantId::DJK => 4,
            ConstantId::DK => 5,
            ConstantId::SubDJ => 6,
            ConstantId::SubDK => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConstantId::A => "A",
            ConstantId::B => "B",
            ConstantId::C => "C",
            ConstantId::DJ => "DJ",
            ConstantId::DJK => "DJK",
            ConstantId::DK => "DK",
            ConstantId::SubDJ => "dJ",
            ConstantId::SubDK => "dK",
        }
    }

    pub fn is_distortion(self) -> bool {
        !matches!(self, ConstantId::A | ConstantId::B | ConstantId::C)
    }
}

/// Largest J accepted anywhere a level is labelled or a ladder is diagonalized.
///
/// One J block is a dense `(2J+1)²` matrix, so this bounds both memory and solve time.
pub const MAX_J: u32 = 200;

/// A rotational level `J_{Ka,Kc}` of an asymmetric top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RotState {
    pub j: u32,
    pub ka: u32,
    pub kc: u32,
}

impl RotState {
    pub fn new(j: u32, ka: u32, kc: u32) -> Self {
        Self { j, ka, kc }
    }

    /// Check the asymmetric-top labelling rules: `J <= MAX_J`, `Ka, Kc <= J` and
    /// `Ka + Kc ∈ {J, J+1}`.
    pub fn validate(&self) -> Result<(), FitError> {
        let reason = if self.j > MAX_J {
            Some(format!("J={} exceeds the supported maximum of {MAX_J}", self.j))
        } else if self.ka > self.j {
            Some(format!("Ka={} exceeds J={}", self.ka, self.j))
        } else if self.kc > self.j {
            Some(format!("Kc={} exceeds J={}", self.kc, self.j))
        } else if self.ka + self.kc != self.j && self.ka + self.kc != self.j + 1 {
            Some(format!("Ka+Kc={} must equal J or J+1", self.ka + self.kc))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(FitError::InvalidQuantumNumbers {
                state: *self,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Position of this level in the ascending energy ladder of its J block.
    ///
    /// `J - Kc + Ka`; only meaningful for states that pass [`RotState::validate`].
    pub fn level_index(&self) -> usize {
        (self.j + self.ka - self.kc) as usize
    }

    /// All `2J+1` valid labels for a given J, in ladder order.
    pub fn ladder(j: u32) -> Vec<RotState> {
        let mut out = Vec::with_capacity(2 * j as usize + 1);
        for ka in 0..=j {
            // Each Ka > 0 splits into a pair with Kc = J-Ka and J-Ka+1.
            if ka == 0 {
                out.push(RotState::new(j, 0, j));
            } else {
                out.push(RotState::new(j, ka, j + 1 - ka));
                out.push(RotState::new(j, ka, j - ka));
            }
        }
        out.sort_by_key(|s| s.level_index());
        out
    }
}

impl fmt::Display for RotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.j, self.ka, self.kc)
    }
}

/// An upper/lower pair of levels. Serialized as `[J', Ka', Kc', J'', Ka'', Kc'']`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 6]", into = "[u32; 6]")]
pub struct Transition {
    pub upper: RotState,
    pub lower: RotState,
}

impl Transition {
    pub fn new(upper: RotState, lower: RotState) -> Self {
        Self { upper, lower }
    }

    pub fn validate(&self) -> Result<(), FitError> {
        self.upper.validate()?;
        self.lower.validate()
    }
}

impl From<[u32; 6]> for Transition {
    fn from(q: [u32; 6]) -> Self {
        Transition::new(RotState::new(q[0], q[1], q[2]), RotState::new(q[3], q[4], q[5]))
    }
}

impl From<Transition> for [u32; 6] {
    fn from(t: Transition) -> Self {
        [t.upper.j, t.upper.ka, t.upper.kc, t.lower.j, t.lower.ka, t.lower.kc]
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.upper, self.lower)
    }
}

/// Assigned transitions paired 1:1 with observed frequencies (MHz).
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSet {
    transitions: Vec<Transition>,
    observed: Vec<f64>,
}

impl TransitionSet {
    /// Pair transitions with observations.
    ///
    /// Fails with `DimensionMismatch` if the counts differ and with
    /// `InvalidQuantumNumbers` if any label is not a valid asymmetric-top state.
    pub fn new(transitions: Vec<Transition>, observed: Vec<f64>) -> Result<Self, FitError> {
        if transitions.len() != observed.len() {
            return Err(FitError::DimensionMismatch {
                transitions: transitions.len(),
                observed: observed.len(),
            });
        }
        for t in &transitions {
            t.validate()?;
        }
        if let Some(i) = observed.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteValue(format!(
                "observed frequency #{} is {}",
                i + 1,
                observed[i]
            )));
        }
        Ok(Self {
            transitions,
            observed,
        })
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Transition, f64)> {
        self.transitions.iter().zip(self.observed.iter().copied())
    }
}

/// Why the optimizer stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceReason {
    /// Relative reduction of the cost fell below `ftol`.
    CostReduction,
    /// Relative step length fell below `xtol`.
    StepSize,
    /// Largest gradient component fell below `gtol`.
    Gradient,
}

/// Outcome of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged(ConvergenceReason),
    /// The iteration budget ran out; the result holds the best iterate found.
    MaxIterations,
}

impl FitStatus {
    pub fn is_converged(self) -> bool {
        matches!(self, FitStatus::Converged(_))
    }
}

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Initial damping factor, applied to the column-scaled normal equations.
    pub initial_damping: f64,
    /// Relative central-difference step for the Jacobian.
    pub jacobian_step: f64,
    /// Constants floated by the optimizer; everything else is held fixed.
    pub float_params: Vec<ConstantId>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-10,
            initial_damping: 1e-3,
            jacobian_step: 1e-7,
            float_params: ConstantId::ROTATIONAL.to_vec(),
        }
    }
}

/// Fitted constants, covariance, and the optimizer's status.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// All eight constants; floated ones hold their fitted values.
    pub constants: HamiltonianConstants,
    /// Floated constants, in parameter-vector order.
    pub free: Vec<ConstantId>,
    /// Covariance of the floated constants (`p × p`).
    pub covariance: DMatrix<f64>,
    pub std_errors: Vec<f64>,
    pub status: FitStatus,
    /// Set when `JᵀJ` could not be inverted; standard errors are then infinite.
    pub degenerate: bool,
    pub iterations: usize,
    /// Sum of squared residuals at the returned constants (MHz²).
    pub sse: f64,
    pub n_observations: usize,
}

impl FitResult {
    pub fn rotational(&self) -> RotationalConstants {
        self.constants.rotational
    }

    pub fn value(&self, id: ConstantId) -> f64 {
        self.constants.get(id)
    }

    /// Standard error of a floated constant, `None` if it was held fixed.
    pub fn std_error(&self, id: ConstantId) -> Option<f64> {
        self.free
            .iter()
            .position(|&f| f == id)
            .map(|i| self.std_errors[i])
    }

    /// Human-readable warnings for a non-clean fit.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.status.is_converged() {
            out.push(format!(
                "fit did not converge within {} iterations; returning best estimate",
                self.iterations
            ));
        }
        if self.degenerate {
            out.push("covariance is singular; standard errors are undefined".to_string());
        }
        out
    }
}

/// Electric-dipole component driving a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DipoleType {
    A,
    B,
    C,
}

impl DipoleType {
    /// Classify by the parity change of Ka and Kc.
    pub fn classify(upper: RotState, lower: RotState) -> Option<DipoleType> {
        let ka_flip = (upper.ka + lower.ka) % 2 == 1;
        let kc_flip = (upper.kc + lower.kc) % 2 == 1;
        match (ka_flip, kc_flip) {
            (false, true) => Some(DipoleType::A),
            (true, true) => Some(DipoleType::B),
            (true, false) => Some(DipoleType::C),
            (false, false) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DipoleType::A => "a",
            DipoleType::B => "b",
            DipoleType::C => "c",
        }
    }
}

/// A predicted catalog line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedLine {
    pub transition: Transition,
    pub frequency: f64,
    pub dipole: DipoleType,
    /// Energy of the lower level (MHz above the J=0 ground level).
    pub lower_energy: f64,
    /// Absorption intensity relative to the strongest line of the same catalog.
    pub intensity: f64,
}

/// Settings for catalog prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub j_max: u32,
    pub f_min: f64,
    pub f_max: f64,
    pub types: Vec<DipoleType>,
    /// Dipole-moment components (Debye) weighting a-, b- and c-type intensities.
    pub mu_a: f64,
    pub mu_b: f64,
    pub mu_c: f64,
    /// Rotational temperature for the Boltzmann populations (K).
    pub temperature_k: f64,
}

impl CatalogConfig {
    pub fn dipole_component(&self, dipole: DipoleType) -> f64 {
        match dipole {
            DipoleType::A => self.mu_a,
            DipoleType::B => self.mu_b,
            DipoleType::C => self.mu_c,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            j_max: 20,
            f_min: 2_000.0,
            f_max: 18_000.0,
            types: vec![DipoleType::A, DipoleType::B, DipoleType::C],
            mu_a: 1.0,
            mu_b: 1.0,
            mu_c: 1.0,
            temperature_k: 298.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_index_matches_ladder_position() {
        for j in 0..6 {
            let ladder = RotState::ladder(j);
            assert_eq!(ladder.len(), 2 * j as usize + 1);
            for (i, s) in ladder.iter().enumerate() {
                assert!(s.validate().is_ok(), "{s} should be valid");
                assert_eq!(s.level_index(), i);
            }
        }
    }

    #[test]
    fn validate_rejects_bad_labels() {
        assert!(RotState::new(2, 3, 0).validate().is_err());
        assert!(RotState::new(2, 0, 3).validate().is_err());
        assert!(RotState::new(4, 1, 1).validate().is_err());
        assert!(RotState::new(4, 2, 3).validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_j_without_overflow() {
        let huge = Transition::from([u32::MAX, u32::MAX, u32::MAX, 0, 0, 0]);
        assert!(matches!(huge.validate(), Err(FitError::InvalidQuantumNumbers { .. })));

        let big = Transition::from([100_000, 0, 100_000, 99_999, 0, 99_999]);
        assert!(matches!(big.validate(), Err(FitError::InvalidQuantumNumbers { .. })));

        assert!(RotState::new(MAX_J, 0, MAX_J).validate().is_ok());
        assert!(RotState::new(MAX_J + 1, 0, MAX_J + 1).validate().is_err());
    }

    #[test]
    fn transition_set_rejects_length_mismatch() {
        let t = vec![Transition::from([1, 0, 1, 0, 0, 0])];
        let err = TransitionSet::new(t, vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            FitError::DimensionMismatch {
                transitions: 1,
                observed: 2
            }
        ));
    }

    #[test]
    fn constants_array_order_follows_ids() {
        let mut k = HamiltonianConstants::new(
            RotationalConstants::new(1.0, 2.0, 3.0),
            DistortionConstants::new(4.0, 5.0, 6.0, 7.0, 8.0),
        );
        for id in ConstantId::ALL {
            assert_eq!(k.get(id), (id.index() + 1) as f64);
        }
        k.set(ConstantId::SubDK, -1.0);
        assert_eq!(k.distortion.sub_dk, -1.0);
    }

    #[test]
    fn transition_serializes_as_six_integers() {
        let t = Transition::from([4, 0, 4, 3, 0, 3]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[4,0,4,3,0,3]");
        let back: Transition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn dipole_type_from_parity() {
        let s = |j, ka, kc| RotState::new(j, ka, kc);
        assert_eq!(DipoleType::classify(s(4, 0, 4), s(3, 0, 3)), Some(DipoleType::A));
        assert_eq!(DipoleType::classify(s(1, 1, 0), s(1, 0, 1)), Some(DipoleType::B));
        assert_eq!(DipoleType::classify(s(1, 1, 1), s(1, 0, 1)), Some(DipoleType::C));
        assert_eq!(DipoleType::classify(s(2, 0, 2), s(1, 0, 0)), None);
    }
}
