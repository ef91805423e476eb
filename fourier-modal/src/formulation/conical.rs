//! Gratings periodic along x illuminated outside the xz plane.
//!
//! Every harmonic shares the wavevector component `ky = n_I sinθ sinφ`, so the convolution
//! matrices are one-dimensional while both polarisations couple.

use super::vector::{VectorCore, VectorLattice};
use crate::{error::SolverError, grating::GratingSpec, policy::SolverPolicy, propagation::Algorithm};

pub(crate) struct Conical {
    core: VectorCore,
}

impl Conical {
    pub(crate) fn new(spec: &GratingSpec, policy: &SolverPolicy) -> Self {
        Self {
            core: VectorCore::new(spec, policy),
        }
    }
}

impl VectorLattice for Conical {
    fn core(&self) -> &VectorCore {
        &self.core
    }

    fn supports(&self, algorithm: Algorithm) -> Result<(), SolverError> {
        match algorithm {
            Algorithm::Transfer => Ok(()),
            Algorithm::Scattering => Err(SolverError::UnsupportedConfiguration(
                "the scattering matrix method is not implemented for conical gratings, use the transfer method".into(),
            )),
        }
    }
}
