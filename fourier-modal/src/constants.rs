// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Constants
//!
//! Defines the default numerical policy values used in the solver. These seed
//! [`SolverPolicy::default`](crate::SolverPolicy) and can be overridden by configuration.

pub const WAVEVECTOR_PERTURBATION: f64 = 1e-10; // Substituted for harmonic wavevectors which are exactly zero (normalised to k0)
pub const BRANCH_TOLERANCE: f64 = 1e-10; // Relative size of Re(q) below which a mode is treated as propagating
pub const DEGENERACY_TOLERANCE: f64 = 1e-12; // Relative eigenvalue separation below which two modes are degenerate
pub const MAXIMUM_CONDITION_NUMBER: f64 = 1e14; // One-norm condition estimate above which a matrix is singular
pub const MAXIMUM_SCHUR_ITERATIONS: usize = 10_000; // Iteration cap for the complex Schur decomposition
pub const EXPONENT_FLOOR: f64 = -700.0; // Layer exponents below this are flushed to zero
pub const GRAZING_TOLERANCE: f64 = 1e-12; // A harmonic with |q|^2 below this grazes a homogeneous medium
