// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Propagation
//!
//! Composition of the layer modes into a single relation between the amplitudes incident
//! on the stack and the amplitudes it reflects and transmits.
//!
//! Two strategies are provided. The [`transfer`] recursion of Moharam folds the layers
//! from the bottom of the stack upward and keeps the per-layer record needed to rebuild
//! the internal fields. The [`scattering`] method builds a scattering matrix for every
//! layer and composes them with the Redheffer star product. Both consume the same
//! [`StackModes`] and produce a [`GlobalRelation`].

pub mod scattering;
pub mod transfer;

pub use scattering::{ScatteringMatrix, ScatteringPropagator};
pub use transfer::{TransferPropagator, TransferRelation};

use crate::{eigensolver::LayerModes, error::SolverError, linalg::ComplexVector};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// The layer composition strategy
pub enum Algorithm {
    /// The enhanced transmittance matrix recursion
    Transfer,
    /// Scattering matrices composed with the Redheffer star product
    Scattering,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Transfer
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transfer => write!(f, "TMM"),
            Self::Scattering => write!(f, "SMM"),
        }
    }
}

#[derive(Clone, Debug)]
/// The modes of every region of the structure at one wavelength
pub struct StackModes {
    /// Modes of the incidence half-space
    pub reflection: LayerModes,
    /// Modes of the transmission half-space
    pub transmission: LayerModes,
    /// Modes and thicknesses of the layers, top first
    pub layers: Vec<(LayerModes, f64)>,
    /// The free-space wavevector
    pub k0: f64,
}

#[derive(Clone, Debug)]
/// Tangential amplitudes leaving the stack
pub struct BoundaryAmplitudes {
    /// Amplitudes reflected into the incidence half-space
    pub reflected: ComplexVector,
    /// Amplitudes transmitted into the transmission half-space
    pub transmitted: ComplexVector,
}

/// Relates the incident amplitudes to the reflected and transmitted ones
pub trait GlobalRelation {
    /// The outgoing amplitudes for incident tangential amplitudes `incident`
    fn outgoing(&self, incident: &ComplexVector) -> Result<BoundaryAmplitudes, SolverError>;
}

/// A layer composition strategy
pub trait Propagator {
    /// The relation produced by the strategy
    type Relation: GlobalRelation;

    /// Folds the modes of every region into a global relation
    fn propagate(&self, modes: StackModes) -> Result<Self::Relation, SolverError>;
}
