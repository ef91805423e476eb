//! Gratings periodic along both x and y.
//!
//! The `(2N + 1)²` harmonics are flattened with the x order varying fastest, matching the
//! two-dimensional convolution matrices.

use super::vector::{VectorCore, VectorLattice};
use crate::{grating::GratingSpec, policy::SolverPolicy};

pub(crate) struct Crossed {
    core: VectorCore,
}

impl Crossed {
    pub(crate) fn new(spec: &GratingSpec, policy: &SolverPolicy) -> Self {
        Self {
            core: VectorCore::new(spec, policy),
        }
    }
}

impl VectorLattice for Crossed {
    fn core(&self) -> &VectorCore {
        &self.core
    }
}
