//! # Layer eigensolver
//!
//! Inside a layer which is invariant along `z` the tangential fields are expanded in the
//! retained harmonics and split into an electric-like vector `s` and a magnetic-like
//! vector `u`. Maxwell's equations reduce to the first order system
//!
//! ds/dz' = P u, du/dz' = Q s
//!
//! in the normalised depth `z' = k0 z`. Eliminating `u` gives `s'' = P Q s`, so the modes of
//! the layer follow from the eigen-decomposition `P Q = W diag(λ) W⁻¹`. Writing `q = √λ`
//! with the branch of [`BranchPolicy`](crate::policy::BranchPolicy), the general solution is
//!
//! s = W (e^{-q z'} c⁺ + e^{q z'} c⁻), u = V (e^{-q z'} c⁺ − e^{q z'} c⁻)
//!
//! with `V = −P⁻¹ W q`. Every formulation in the crate shares this representation, which
//! is all the propagators and the field reconstruction rely on.
//!
//! | Problem | s | u | P | Q |
//! |---|---|---|---|---|
//! | TE | `Sy` | `Ux` | `−M` | `E − Kx M⁻¹ Kx` |
//! | TM | `Uy` | `Sx` | `−A⁻¹` | `M − Kx E⁻¹ Kx` |
//! | vector | `[Sx, Sy]` | `[Ux, Uy]` | see [`vector`] | see [`vector`] |
//!
//! Here `S = E` and `U = i η0 H` are the scaled fields, `E`, `A` and `M` are the convolution
//! matrices of the permittivity, the reciprocal permittivity and the permeability.

pub(crate) mod homogeneous;
pub(crate) mod planar;
pub(crate) mod vector;

use crate::{
    error::SolverError,
    linalg::{eigendecompose, ComplexMatrix, ComplexVector},
    policy::SolverPolicy,
};
use nalgebra::DVectorSlice;
use num_complex::Complex;

#[derive(Clone, Debug)]
/// The eigenmodes of one layer or half-space
pub struct LayerModes {
    q: ComplexVector,
    w: ComplexMatrix,
    v: ComplexMatrix,
    family_size: Option<usize>,
}

impl LayerModes {
    pub(crate) fn new(q: ComplexVector, w: ComplexMatrix, v: ComplexMatrix) -> Self {
        Self {
            q,
            w,
            v,
            family_size: None,
        }
    }

    pub(crate) fn with_families(mut self, family_size: usize) -> Self {
        self.family_size = Some(family_size);
        self
    }

    /// The normalised propagation constants
    pub fn q(&self) -> &ComplexVector {
        &self.q
    }

    /// The electric-like mode matrix
    pub fn w(&self) -> &ComplexMatrix {
        &self.w
    }

    /// The magnetic-like mode matrix
    pub fn v(&self) -> &ComplexMatrix {
        &self.v
    }

    /// The number of modes
    pub fn dimension(&self) -> usize {
        self.q.len()
    }

    /// The first family of a vector formulation, dominated by `Sx`
    pub fn q1(&self) -> Option<DVectorSlice<'_, Complex<f64>>> {
        self.family_size.map(|n| self.q.rows(0, n))
    }

    /// The second family of a vector formulation, dominated by `Sy`
    pub fn q2(&self) -> Option<DVectorSlice<'_, Complex<f64>>> {
        self.family_size.map(|n| self.q.rows(n, n))
    }

    /// The diagonal of the propagator `X = exp(−q k0 d)` over a depth `k0 d`
    pub fn exponentials(&self, distance: f64, policy: &SolverPolicy) -> ComplexVector {
        self.q.map(|q| policy.layer_exponential(q, distance))
    }

    /// Normalised longitudinal wavevectors `kz = i q` of the forward modes
    pub fn longitudinal_wavevectors(&self) -> ComplexVector {
        self.q.map(|q| Complex::<f64>::i() * q)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
/// Near-coincident eigenvalues found while solving a layer
pub struct Degeneracy {
    /// Number of eigenvalue pairs closer than the degeneracy tolerance
    pub pairs: usize,
    /// The smallest relative separation
    pub separation: f64,
}

/// Solves the modes of layers and half-spaces under a fixed numerical policy
pub struct LayerEigensolver<'a> {
    policy: &'a SolverPolicy,
}

impl<'a> LayerEigensolver<'a> {
    /// An eigensolver applying `policy`
    pub fn new(policy: &'a SolverPolicy) -> Self {
        Self { policy }
    }

    pub(crate) fn policy(&self) -> &SolverPolicy {
        self.policy
    }

    /// Decomposes `PQ` and returns the branch-selected propagation constants, the
    /// eigenvectors and any degeneracy found.
    pub(crate) fn decompose(
        &self,
        omega_squared: ComplexMatrix,
    ) -> Result<(ComplexVector, ComplexMatrix, Option<Degeneracy>), SolverError> {
        let decomposition = eigendecompose(omega_squared, self.policy)?;
        let q = decomposition
            .eigenvalues
            .map(|lambda| self.policy.branch.propagation_constant(lambda));
        let degeneracy = (decomposition.degenerate_pairs > 0).then(|| Degeneracy {
            pairs: decomposition.degenerate_pairs,
            separation: decomposition.minimum_separation,
        });
        Ok((q, decomposition.eigenvectors, degeneracy))
    }
}
