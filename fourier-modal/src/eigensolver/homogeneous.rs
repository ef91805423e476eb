//! Closed-form modes of homogeneous media.
//!
//! In a homogeneous medium every harmonic is already an eigenmode, so `W = I` and the
//! propagation constants are `q = √(kx² + ky² − εμ)` harmonic by harmonic. Half-spaces, the
//! vacuum gap of the scattering matrix method and unpatterned layers all use these.

use super::{planar::PlanarPolarization, LayerModes};
use crate::{
    error::SolverError,
    linalg::{block, ComplexMatrix, ComplexVector},
    policy::BranchPolicy,
};
use num_complex::Complex;
use num_traits::Zero;

fn propagation_constants(
    kx: &ComplexVector,
    ky: Option<&ComplexVector>,
    refractive_index_squared: Complex<f64>,
    branch: &BranchPolicy,
) -> ComplexVector {
    ComplexVector::from_fn(kx.len(), |i, _| {
        let transverse = kx[i] * kx[i] + ky.map_or(Complex::<f64>::zero(), |ky| ky[i] * ky[i]);
        branch.propagation_constant(transverse - refractive_index_squared)
    })
}

/// TE or TM modes of a homogeneous medium. For TE `V = q / μ`, for TM `V = q / ε`.
pub(crate) fn planar(
    kx: &ComplexVector,
    permittivity: Complex<f64>,
    permeability: Complex<f64>,
    polarization: PlanarPolarization,
    branch: &BranchPolicy,
) -> LayerModes {
    let q = propagation_constants(kx, None, permittivity * permeability, branch);
    let divisor = match polarization {
        PlanarPolarization::Te => permeability,
        PlanarPolarization::Tm => permittivity,
    };
    let v = ComplexMatrix::from_diagonal(&q.map(|q| q / divisor));
    LayerModes::new(q, ComplexMatrix::identity(kx.len(), kx.len()), v)
}

/// Coupled-polarisation modes of a homogeneous medium, `V = −Q q⁻¹`.
///
/// Both families share the propagation constants of the scalar problem. The first family
/// carries `Sx`, the second `Sy`. A harmonic which grazes the medium has `q = 0` and no
/// magnetic-like mode, which is reported as a singular matrix.
pub(crate) fn vector(
    kx: &ComplexVector,
    ky: &ComplexVector,
    permittivity: Complex<f64>,
    permeability: Complex<f64>,
    branch: &BranchPolicy,
) -> Result<LayerModes, SolverError> {
    let n = kx.len();
    let index_squared = permittivity * permeability;
    let q = propagation_constants(kx, Some(ky), index_squared, branch);
    if let Some(order) = q.iter().position(|q| q.is_zero() || !q.is_finite()) {
        return Err(SolverError::singular(format!(
            "harmonic {order} grazes a homogeneous medium of permittivity {permittivity}"
        )));
    }

    let denominator = q.map(|q| q * permeability);
    let diagonal = |f: &dyn Fn(usize) -> Complex<f64>| {
        ComplexMatrix::from_diagonal(&ComplexVector::from_fn(n, |i, _| f(i) / denominator[i]))
    };
    let v = block(
        &diagonal(&|i| -kx[i] * ky[i]),
        &diagonal(&|i| kx[i] * kx[i] - index_squared),
        &diagonal(&|i| index_squared - ky[i] * ky[i]),
        &diagonal(&|i| kx[i] * ky[i]),
    );
    let doubled = ComplexVector::from_iterator(2 * n, q.iter().chain(q.iter()).copied());
    Ok(LayerModes::new(doubled, ComplexMatrix::identity(2 * n, 2 * n), v).with_families(n))
}
