//! The coupled-polarisation machinery shared by conical and two-dimensional gratings.

use super::Formulation;
use crate::{
    boundary::BoundaryMatcher,
    eigensolver::{homogeneous, Degeneracy, LayerEigensolver, LayerModes},
    error::SolverError,
    field::FieldComponent,
    grating::{GratingKind, GratingSpec, Layer},
    linalg::{stack, ComplexVector},
    policy::SolverPolicy,
    propagation::Algorithm,
    wavevector::{delta_vector, HarmonicWavevectors, WavevectorFactory},
};
use nalgebra::Vector3;
use num_complex::Complex;

/// Everything a vector formulation needs at one wavelength
pub(crate) struct VectorCore {
    kind: GratingKind,
    policy: SolverPolicy,
    wavevectors: HarmonicWavevectors,
    kx: ComplexVector,
    ky: ComplexVector,
    polarization: Vector3<f64>,
    kz_incident: f64,
}

impl VectorCore {
    pub(super) fn new(spec: &GratingSpec, policy: &SolverPolicy) -> Self {
        let factory = WavevectorFactory::new(spec, &policy.wavevector);
        let wavevectors = factory.build();
        Self {
            kind: spec.kind(),
            policy: *policy,
            kx: wavevectors.kx_complex(),
            ky: wavevectors.ky_complex(),
            wavevectors,
            polarization: factory.polarization_vector(),
            kz_incident: factory.incident_normal_component(),
        }
    }

    /// The first half of a doubled vector
    fn first_family(values: &ComplexVector) -> ComplexVector {
        values.rows(0, values.len() / 2).into_owned()
    }
}

/// A grating treated with the coupled-polarisation formulation
pub(crate) trait VectorLattice {
    fn core(&self) -> &VectorCore;

    fn supports(&self, _algorithm: Algorithm) -> Result<(), SolverError> {
        Ok(())
    }
}

impl<T: VectorLattice> Formulation for T {
    fn wavevectors(&self) -> &HarmonicWavevectors {
        &self.core().wavevectors
    }

    fn check_algorithm(&self, algorithm: Algorithm) -> Result<(), SolverError> {
        self.supports(algorithm)
    }

    fn layer_modes(&self, layer: &Layer) -> Result<(LayerModes, Option<Degeneracy>), SolverError> {
        let core = self.core();
        LayerEigensolver::new(&core.policy).vector(&core.kx, &core.ky, layer)
    }

    fn homogeneous_modes(&self, permittivity: Complex<f64>) -> Result<LayerModes, SolverError> {
        let core = self.core();
        homogeneous::vector(
            &core.kx,
            &core.ky,
            permittivity,
            Complex::from(1.),
            &core.policy.branch,
        )
    }

    fn incident_amplitudes(&self) -> ComplexVector {
        let core = self.core();
        let delta = delta_vector(core.kx.len());
        stack(
            &(&delta * Complex::from(core.polarization.x)),
            &(&delta * Complex::from(core.polarization.y)),
        )
    }

    fn boundary(&self, reflection: &LayerModes, transmission: &LayerModes) -> BoundaryMatcher {
        let core = self.core();
        BoundaryMatcher::vector(
            core.kind,
            core.wavevectors.orders().to_vec(),
            core.kx.clone(),
            core.ky.clone(),
            VectorCore::first_family(&reflection.longitudinal_wavevectors()),
            VectorCore::first_family(&transmission.longitudinal_wavevectors()),
            core.kz_incident,
        )
    }

    fn field_components(&self) -> &'static [FieldComponent] {
        &[
            FieldComponent::Ex,
            FieldComponent::Ey,
            FieldComponent::Ez,
            FieldComponent::Hx,
            FieldComponent::Hy,
            FieldComponent::Hz,
        ]
    }

    /// `Ez = i E⁻¹ (Kx Uy − Ky Ux)` and `Hz = M⁻¹ (Kx Sy − Ky Sx)`, with `H = −i U`
    fn field_harmonics(
        &self,
        layer: &Layer,
        s: &ComplexVector,
        u: &ComplexVector,
    ) -> Result<Vec<ComplexVector>, SolverError> {
        let core = self.core();
        let n = core.kx.len();
        let (sx, sy) = (s.rows(0, n).into_owned(), s.rows(n, n).into_owned());
        let (ux, uy) = (u.rows(0, n).into_owned(), u.rows(n, n).into_owned());
        let minus_i = -Complex::<f64>::i();

        let e_inverse = layer
            .permittivity()
            .inverse(&core.policy, "permittivity matrix")?;
        let ez = e_inverse * (core.kx.component_mul(&uy) - core.ky.component_mul(&ux))
            * Complex::<f64>::i();
        let curl_s = core.kx.component_mul(&sy) - core.ky.component_mul(&sx);
        let hz = match layer.permeability() {
            None => curl_s,
            Some(permeability) => {
                permeability.inverse(&core.policy, "permeability matrix")? * curl_s
            }
        };
        Ok(vec![sx, sy, ez, ux * minus_i, uy * minus_i, hz])
    }
}
