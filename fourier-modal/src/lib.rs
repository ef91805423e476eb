// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Fourier-modal is a rigorous coupled-wave solver for periodic gratings written in Rust
//!
//! # Overview
//! Fourier-modal computes the diffraction efficiencies of stratified periodic structures using the
//! Fourier modal method ([Moharam 1995](https://doi.org/10.1364/JOSAA.12.001068)). Each layer of the
//! stack is invariant along the stacking direction and periodic in the plane, so the fields inside are
//! expanded in a truncated set of spatial harmonics. The modes of every layer follow from a dense
//! eigenvalue problem, and the layers are coupled either through the enhanced transmittance matrix
//! recursion or the Redheffer star product of scattering matrices.
//!
//! One-dimensional gratings in classical and conical mounting, and two-dimensional crossed gratings are
//! supported. The internal field of a solved stack can be reconstructed on a regular grid.
//!
//! # Usage
//! Fourier-modal can be used as a library or from the command line. To run the binary first define a
//! structure in a `.toml` file:
//!
//! ```toml
//! kind = "one_dimensional"
//! period = [700.0]
//! fourier_order = 20
//! wavelengths = [900.0, 950.0]
//! polarization = "te"
//!
//! [[layers]]
//! thickness = 460.0
//! pixels = 100
//! segments = [{ start = 0.0, end = 0.5, permittivity = [12.1, 0.0] }]
//! background = [1.0, 0.0]
//! ```
//!
//! where additional layers can be appended with subsequent `layers` fields.

#![warn(missing_docs)]
#![allow(clippy::type_complexity)]

/// The command line application, its configuration and tracing
pub mod app;

/// Diffraction efficiencies from the outgoing amplitudes
pub mod boundary;

/// Numerical constants
mod constants;

/// Fourier coefficients of periodic profiles and their Toeplitz matrices
pub mod convolution;

/// Modes of layers and homogeneous media
pub mod eigensolver;

/// Error handling
mod error;

/// Reconstruction of the internal field
pub mod field;

/// The per-dimensionality formulations of Maxwell's equations
mod formulation;

/// The grating, its illumination and the layer stack
pub mod grating;

/// Dense complex linear algebra
pub mod linalg;

/// Named numerical policies
pub mod policy;

/// Composition of the layer stack
pub mod propagation;

/// The solve entry points
pub mod solver;

/// Helper functions
mod utilities;

/// Harmonic wavevectors of the diffracted orders
pub mod wavevector;

pub use boundary::DiffractionResult;
pub use convolution::{ConvolutionMatrix, ConvolutionMatrixBuilder, Expansion, Profile};
pub use error::{SolverError, SolverWarning};
pub use field::{FieldCell, FieldComponent, Resolution};
pub use grating::{
    GratingKind, GratingSpec, GratingSpecBuilder, Incidence, Layer, LayerStack, Period,
    Polarization,
};
pub use policy::SolverPolicy;
pub use propagation::Algorithm;
pub use solver::{reconstruct_field, solve, solve_with_history, sweep_wavelengths, Solution, Solver};
