//! # Policy
//!
//! The numerical conventions shared by every stage of the solver. Each convention lives
//! in exactly one place so that the wavevector factory, the eigensolver, the half-space
//! modes and the field reconstruction cannot disagree with one another.
//!
//! Throughout the crate fields carry an `exp(-iωt)` time dependence, so an absorbing
//! medium has a permittivity with a positive imaginary part, and a mode which carries
//! energy toward increasing depth `z` varies as `exp(-k0 q z)` with `Re(q) >= 0`.

use crate::constants::{
    BRANCH_TOLERANCE, DEGENERACY_TOLERANCE, EXPONENT_FLOOR, GRAZING_TOLERANCE,
    MAXIMUM_CONDITION_NUMBER, MAXIMUM_SCHUR_ITERATIONS, WAVEVECTOR_PERTURBATION,
};
use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
/// The full set of numerical policies used in a solve
pub struct SolverPolicy {
    /// Treatment of harmonic wavevectors which vanish
    pub wavevector: WavevectorPolicy,
    /// Choice of square-root branch for propagation constants
    pub branch: BranchPolicy,
    /// Relative separation below which two eigenvalues are considered degenerate
    pub degeneracy_tolerance: f64,
    /// One-norm condition estimate above which an inversion is refused
    pub maximum_condition_number: f64,
    /// Iteration cap for the Schur decomposition
    pub maximum_schur_iterations: usize,
    /// Layer exponents with a real part below this value are flushed to zero
    pub exponent_floor: f64,
    /// A harmonic grazes a homogeneous medium when `|q|²` falls below this value
    pub grazing_tolerance: f64,
}

impl Default for SolverPolicy {
    fn default() -> Self {
        Self {
            wavevector: WavevectorPolicy::default(),
            branch: BranchPolicy::default(),
            degeneracy_tolerance: DEGENERACY_TOLERANCE,
            maximum_condition_number: MAXIMUM_CONDITION_NUMBER,
            maximum_schur_iterations: MAXIMUM_SCHUR_ITERATIONS,
            exponent_floor: EXPONENT_FLOOR,
            grazing_tolerance: GRAZING_TOLERANCE,
        }
    }
}

impl SolverPolicy {
    /// The diagonal propagator `exp(-q * distance)` for a normalised distance `k0 * d`.
    ///
    /// Overflow policy: the real part of the exponent is clipped at zero, so a root which
    /// rounding has pushed marginally into the left half-plane cannot grow, and exponents
    /// below `exponent_floor` are flushed to an exact zero rather than underflowing.
    pub fn layer_exponential(&self, q: Complex<f64>, distance: f64) -> Complex<f64> {
        let mut exponent = -q * distance;
        if exponent.re > 0_f64 {
            exponent.re = 0_f64;
        }
        if exponent.re < self.exponent_floor {
            return Complex::<f64>::zero();
        }
        exponent.exp()
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
/// Controlled approximation for harmonic wavevectors which are exactly zero.
///
/// At normal incidence the zeroth harmonic has `kx = 0`, which makes the conical
/// azimuth and several admittances undefined. The component is replaced by a fixed
/// small value, which biases the efficiencies by a relative amount of order the
/// perturbation squared.
pub struct WavevectorPolicy {
    /// The substituted value, normalised to the free-space wavevector
    pub perturbation: f64,
}

impl Default for WavevectorPolicy {
    fn default() -> Self {
        Self {
            perturbation: WAVEVECTOR_PERTURBATION,
        }
    }
}

impl WavevectorPolicy {
    /// Returns the component to use, and whether it was substituted
    pub fn apply(&self, component: f64) -> (f64, bool) {
        if component == 0_f64 {
            (self.perturbation, true)
        } else {
            (component, false)
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
/// Square-root branch selection for the propagation constants `q = sqrt(λ)`.
///
/// The root with `Re(q) >= 0` is taken. When the real part is negligible the mode
/// propagates, and the root with `Im(q) <= 0` is taken so the mode carries energy toward
/// increasing depth. Both roots square to the eigenvalue, so the choice never changes
/// the eigenproblem, only the labelling of forward and backward modes.
pub struct BranchPolicy {
    /// Relative size of `Re(q)` compared to `|q|` below which the mode is propagating
    pub tolerance: f64,
}

impl Default for BranchPolicy {
    fn default() -> Self {
        Self {
            tolerance: BRANCH_TOLERANCE,
        }
    }
}

impl BranchPolicy {
    /// The forward propagation constant associated with an eigenvalue `λ = q²`
    pub fn propagation_constant(&self, eigenvalue: Complex<f64>) -> Complex<f64> {
        let mut root = eigenvalue.sqrt();
        if root.re < 0_f64 {
            root = -root;
        }
        if root.re <= self.tolerance * root.norm() {
            root = Complex::new(root.re, -root.im.abs());
        }
        root
    }

    /// The longitudinal wavevector `kz = i q` of a forward plane wave, normalised to `k0`.
    ///
    /// Propagating orders have `Re(kz) > 0`, evanescent and absorbed orders `Im(kz) > 0`.
    pub fn longitudinal_wavevector(&self, eigenvalue: Complex<f64>) -> Complex<f64> {
        Complex::<f64>::i() * self.propagation_constant(eigenvalue)
    }
}
