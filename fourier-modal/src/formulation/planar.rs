//! Gratings periodic along x in classical mounting, where TE and TM decouple.
//!
//! TE amplitudes are the electric field `Ey`, TM amplitudes the scaled magnetic field
//! `Uy = i η0 Hy`, so TM powers are weighted by the permittivity of each half-space.

use super::Formulation;
use crate::{
    boundary::BoundaryMatcher,
    eigensolver::{homogeneous, planar::PlanarPolarization, Degeneracy, LayerEigensolver, LayerModes},
    error::SolverError,
    field::FieldComponent,
    grating::{GratingKind, GratingSpec, Layer, Polarization},
    linalg::ComplexVector,
    policy::SolverPolicy,
    wavevector::{delta_vector, HarmonicWavevectors, WavevectorFactory},
};
use num_complex::Complex;

pub(crate) struct Planar {
    policy: SolverPolicy,
    polarization: PlanarPolarization,
    wavevectors: HarmonicWavevectors,
    kx: ComplexVector,
    kz_incident: f64,
    reflection_permittivity: Complex<f64>,
    transmission_permittivity: Complex<f64>,
}

impl Planar {
    pub(crate) fn new(spec: &GratingSpec, policy: &SolverPolicy) -> Result<Self, SolverError> {
        let polarization = match spec.polarization() {
            Polarization::Te => PlanarPolarization::Te,
            Polarization::Tm => PlanarPolarization::Tm,
            Polarization::Linear { .. } => {
                return Err(SolverError::InvalidSpec(
                    "planar gratings are solved for TE or TM polarisation".into(),
                ))
            }
        };
        let factory = WavevectorFactory::new(spec, &policy.wavevector);
        let wavevectors = factory.build();
        Ok(Self {
            policy: *policy,
            polarization,
            kx: wavevectors.kx_complex(),
            wavevectors,
            kz_incident: factory.incident_normal_component(),
            reflection_permittivity: spec.incidence_permittivity(),
            transmission_permittivity: spec.transmission_permittivity(),
        })
    }
}

impl Formulation for Planar {
    fn wavevectors(&self) -> &HarmonicWavevectors {
        &self.wavevectors
    }

    fn layer_modes(&self, layer: &Layer) -> Result<(LayerModes, Option<Degeneracy>), SolverError> {
        let solver = LayerEigensolver::new(&self.policy);
        match self.polarization {
            PlanarPolarization::Te => solver.transverse_electric(&self.kx, layer),
            PlanarPolarization::Tm => solver.transverse_magnetic(&self.kx, layer),
        }
    }

    fn homogeneous_modes(&self, permittivity: Complex<f64>) -> Result<LayerModes, SolverError> {
        Ok(homogeneous::planar(
            &self.kx,
            permittivity,
            Complex::from(1.),
            self.polarization,
            &self.policy.branch,
        ))
    }

    fn incident_amplitudes(&self) -> ComplexVector {
        delta_vector(self.kx.len())
    }

    fn boundary(&self, reflection: &LayerModes, transmission: &LayerModes) -> BoundaryMatcher {
        let (reflection_divisor, transmission_divisor) = match self.polarization {
            PlanarPolarization::Te => (Complex::from(1.), Complex::from(1.)),
            PlanarPolarization::Tm => (self.reflection_permittivity, self.transmission_permittivity),
        };
        BoundaryMatcher::scalar(
            GratingKind::OneDimensional,
            self.wavevectors.orders().to_vec(),
            &reflection.longitudinal_wavevectors(),
            &transmission.longitudinal_wavevectors(),
            reflection_divisor,
            transmission_divisor,
            self.kz_incident,
        )
    }

    fn field_components(&self) -> &'static [FieldComponent] {
        match self.polarization {
            PlanarPolarization::Te => &[FieldComponent::Ey, FieldComponent::Hx, FieldComponent::Hz],
            PlanarPolarization::Tm => &[FieldComponent::Hy, FieldComponent::Ex, FieldComponent::Ez],
        }
    }

    /// TE: `Hx = −i Ux`, `Hz = M⁻¹ Kx Sy`. TM: `Hy = −i Uy`, `Ez = i E⁻¹ Kx Uy`.
    fn field_harmonics(
        &self,
        layer: &Layer,
        s: &ComplexVector,
        u: &ComplexVector,
    ) -> Result<Vec<ComplexVector>, SolverError> {
        let minus_i = -Complex::<f64>::i();
        let kx_s = self.kx.component_mul(s);
        match self.polarization {
            PlanarPolarization::Te => {
                let hz = match layer.permeability() {
                    None => kx_s,
                    Some(permeability) => {
                        permeability.inverse(&self.policy, "permeability matrix")? * kx_s
                    }
                };
                Ok(vec![s.clone(), u * minus_i, hz])
            }
            PlanarPolarization::Tm => {
                let ez = layer
                    .permittivity()
                    .inverse(&self.policy, "permittivity matrix")?
                    * kx_s
                    * Complex::<f64>::i();
                Ok(vec![s * minus_i, u.clone(), ez])
            }
        }
    }
}
