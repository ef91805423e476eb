//! # Formulations
//!
//! The block structure of the problem for each grating dimensionality.
//!
//! The pipeline in [`solver`](crate::solver) is written once against [`Formulation`].
//! Planar gratings solve one scalar problem per polarisation on `2N + 1` harmonics.
//! Conical and two-dimensional gratings couple both polarisations and share the vector
//! machinery in [`vector`], differing only in the harmonics they retain.

mod conical;
mod crossed;
mod planar;
mod vector;

pub(crate) use conical::Conical;
pub(crate) use crossed::Crossed;
pub(crate) use planar::Planar;

use crate::{
    boundary::BoundaryMatcher,
    eigensolver::{Degeneracy, LayerModes},
    error::SolverError,
    field::FieldComponent,
    grating::Layer,
    linalg::ComplexVector,
    propagation::Algorithm,
    wavevector::HarmonicWavevectors,
};
use num_complex::Complex;

/// The grating-specific stages of a solve
pub(crate) trait Formulation {
    /// The wavevectors of the retained harmonics
    fn wavevectors(&self) -> &HarmonicWavevectors;

    /// Fails fast when the algorithm cannot treat this grating
    fn check_algorithm(&self, _algorithm: Algorithm) -> Result<(), SolverError> {
        Ok(())
    }

    /// The modes of a layer of the stack
    fn layer_modes(&self, layer: &Layer) -> Result<(LayerModes, Option<Degeneracy>), SolverError>;

    /// The modes of a non-magnetic homogeneous medium
    fn homogeneous_modes(&self, permittivity: Complex<f64>) -> Result<LayerModes, SolverError>;

    /// The tangential amplitudes of the incident wave in the incidence half-space
    fn incident_amplitudes(&self) -> ComplexVector;

    /// The power weighting of the half-spaces
    fn boundary(&self, reflection: &LayerModes, transmission: &LayerModes) -> BoundaryMatcher;

    /// The components reconstructed by [`Formulation::field_harmonics`]
    fn field_components(&self) -> &'static [FieldComponent];

    /// Harmonic amplitudes of every field component from the modal fields `s` and `u`
    fn field_harmonics(
        &self,
        layer: &Layer,
        s: &ComplexVector,
        u: &ComplexVector,
    ) -> Result<Vec<ComplexVector>, SolverError>;
}
