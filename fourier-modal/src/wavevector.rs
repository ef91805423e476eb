//! # Wavevectors
//!
//! The in-plane wavevectors of the retained diffraction orders, normalised to the
//! free-space wavevector `k0`.
//!
//! For a grating of period `Λx` illuminated from a medium of index `n_I` the Floquet
//! condition gives
//!
//! kx_m = n_I sinθ cosφ − m λ / Λx, ky_m = n_I sinθ sinφ − m λ / Λy
//!
//! with `m` running over `-N..=N`. Conical gratings carry the same `ky` on every harmonic,
//! planar gratings have `ky = 0`. Two-dimensional harmonics are flattened with the x
//! order varying fastest, so harmonic `(m_x, m_y)` lives at `(m_y + N) (2N + 1) + m_x + N`.

use crate::{
    error::SolverWarning,
    grating::{GratingKind, GratingSpec},
    linalg::{ComplexMatrix, ComplexVector},
    policy::WavevectorPolicy,
};
use itertools::iproduct;
use nalgebra::{DVector, Vector3};
use num_complex::Complex;

#[derive(Clone, Debug)]
/// The normalised in-plane wavevectors of every retained harmonic
pub struct HarmonicWavevectors {
    kx: DVector<f64>,
    ky: DVector<f64>,
    orders: Vec<(i32, i32)>,
    perturbed: usize,
}

impl HarmonicWavevectors {
    /// The x components
    pub fn kx(&self) -> &DVector<f64> {
        &self.kx
    }

    /// The y components
    pub fn ky(&self) -> &DVector<f64> {
        &self.ky
    }

    /// The diffraction order `(m_x, m_y)` of each harmonic
    pub fn orders(&self) -> &[(i32, i32)] {
        &self.orders
    }

    /// The number of harmonics
    pub fn len(&self) -> usize {
        self.kx.len()
    }

    /// Whether no harmonic is retained, which never occurs for a built set
    pub fn is_empty(&self) -> bool {
        self.kx.is_empty()
    }

    /// The x components as a complex vector
    pub fn kx_complex(&self) -> ComplexVector {
        self.kx.map(Complex::from)
    }

    /// The y components as a complex vector
    pub fn ky_complex(&self) -> ComplexVector {
        self.ky.map(Complex::from)
    }

    /// The diagonal matrix `Kx`
    pub fn kx_matrix(&self) -> ComplexMatrix {
        ComplexMatrix::from_diagonal(&self.kx_complex())
    }

    /// The diagonal matrix `Ky`
    pub fn ky_matrix(&self) -> ComplexMatrix {
        ComplexMatrix::from_diagonal(&self.ky_complex())
    }

    /// The index of the specular `(0, 0)` harmonic
    pub fn zeroth(&self) -> usize {
        self.len() / 2
    }

    /// The warning to attach to the result when components were perturbed
    pub fn warning(&self, policy: &WavevectorPolicy) -> Option<SolverWarning> {
        (self.perturbed > 0).then(|| SolverWarning::PerturbedWavevector {
            count: self.perturbed,
            perturbation: policy.perturbation,
        })
    }
}

/// Computes the harmonic wavevectors of a grating
pub struct WavevectorFactory<'a> {
    spec: &'a GratingSpec,
    policy: &'a WavevectorPolicy,
}

impl<'a> WavevectorFactory<'a> {
    /// A factory for `spec` which substitutes zero components according to `policy`
    pub fn new(spec: &'a GratingSpec, policy: &'a WavevectorPolicy) -> Self {
        Self { spec, policy }
    }

    /// The wavevectors of every retained harmonic
    pub fn build(&self) -> HarmonicWavevectors {
        let n = self.spec.fourier_order() as i32;
        let ff = (2 * n + 1) as usize;
        let (kx0, ky0) = self.incident_components();
        let step_x = self.spec.wavelength() / self.spec.period().x;

        let mut perturbed = 0;
        let mut perturb = |component: f64| {
            let (value, substituted) = self.policy.apply(component);
            if substituted {
                perturbed += 1;
            }
            value
        };

        let (kx, ky, orders) = match self.spec.kind() {
            GratingKind::OneDimensional => {
                let kx = (-n..=n)
                    .map(|m| perturb(kx0 - m as f64 * step_x))
                    .collect::<Vec<_>>();
                (kx, vec![0.; ff], (-n..=n).map(|m| (m, 0)).collect())
            }
            GratingKind::Conical => {
                let kx = (-n..=n)
                    .map(|m| perturb(kx0 - m as f64 * step_x))
                    .collect::<Vec<_>>();
                let ky = (0..ff).map(|_| perturb(ky0)).collect();
                (kx, ky, (-n..=n).map(|m| (m, 0)).collect())
            }
            GratingKind::TwoDimensional => {
                let step_y = self.spec.wavelength() / self.spec.period().y.unwrap_or(f64::INFINITY);
                let orders = iproduct!(-n..=n, -n..=n)
                    .map(|(my, mx)| (mx, my))
                    .collect::<Vec<_>>();
                let kx = orders
                    .iter()
                    .map(|&(mx, _)| perturb(kx0 - mx as f64 * step_x))
                    .collect::<Vec<_>>();
                let ky = orders
                    .iter()
                    .map(|&(_, my)| perturb(ky0 - my as f64 * step_y))
                    .collect();
                (kx, ky, orders)
            }
        };

        HarmonicWavevectors {
            kx: DVector::from_vec(kx),
            ky: DVector::from_vec(ky),
            orders,
            perturbed,
        }
    }

    /// The in-plane wavevector of the incident wave, before perturbation
    pub fn incident_components(&self) -> (f64, f64) {
        let n = self.spec.incidence_index();
        let theta = self.spec.incidence().theta;
        let phi = self.spec.incidence().phi;
        (n * theta.sin() * phi.cos(), n * theta.sin() * phi.sin())
    }

    /// The normal component of the incident wavevector
    pub fn incident_normal_component(&self) -> f64 {
        self.spec.incidence_index() * self.spec.incidence().theta.cos()
    }

    /// The unit electric field vector of the incident wave.
    ///
    /// The TE direction is `ŷ` at normal incidence and along `ẑ × k̂` otherwise, the TM
    /// direction completes the triad as `â_TE × k̂`.
    pub fn polarization_vector(&self) -> Vector3<f64> {
        let theta = self.spec.incidence().theta;
        let phi = self.spec.incidence().phi;
        let k = Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
        let te = if theta == 0. {
            Vector3::y()
        } else {
            Vector3::z().cross(&k).normalize()
        };
        let tm = te.cross(&k).normalize();
        let polarization = self.spec.polarization();
        te * polarization.te_amplitude() + tm * polarization.tm_amplitude()
    }
}

/// The source vector of length `len` exciting only the specular harmonic, at `⌊len/2⌋`
pub fn delta_vector(len: usize) -> ComplexVector {
    let mut vector = ComplexVector::zeros(len);
    if len > 0 {
        vector[len / 2] = Complex::from(1.);
    }
    vector
}

#[cfg(test)]
mod test {
    use super::{delta_vector, WavevectorFactory};
    use crate::{
        error::SolverWarning,
        grating::{GratingKind, GratingSpec, Period, Polarization},
        policy::WavevectorPolicy,
    };
    use approx::assert_relative_eq;
    use num_complex::Complex;

    #[test]
    fn delta_vector_has_its_unit_at_the_centre() {
        for len in [1, 2, 5, 8, 81] {
            let delta = delta_vector(len);
            assert_eq!(delta.len(), len);
            assert_eq!(delta[len / 2], Complex::new(1., 0.));
            assert_relative_eq!(delta.norm(), 1.);
        }
    }

    #[test]
    fn planar_harmonics_follow_the_grating_equation() {
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::OneDimensional)
            .with_period(Period::line(1000.))
            .with_wavelength(500.)
            .with_fourier_order(2)
            .with_angles(30., 0.)
            .with_media(1.5, Complex::from(1.))
            .build()
            .unwrap();
        let policy = WavevectorPolicy::default();
        let wavevectors = WavevectorFactory::new(&spec, &policy).build();
        let kx0 = 1.5 * 0.5_f64;
        for (idx, m) in (-2..=2).enumerate() {
            assert_relative_eq!(wavevectors.kx()[idx], kx0 - m as f64 * 0.5, epsilon = 1e-14);
            assert_eq!(wavevectors.orders()[idx], (m, 0));
        }
        // 0.75 - 0.5 m never vanishes for integer m
        assert!(wavevectors.warning(&policy).is_none());
    }

    #[test]
    fn normal_incidence_perturbs_the_specular_harmonic() {
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::OneDimensional)
            .with_period(Period::line(700.))
            .with_wavelength(900.)
            .with_fourier_order(3)
            .build()
            .unwrap();
        let policy = WavevectorPolicy::default();
        let wavevectors = WavevectorFactory::new(&spec, &policy).build();
        assert_eq!(wavevectors.kx()[wavevectors.zeroth()], 1e-10);
        assert_eq!(
            wavevectors.warning(&policy),
            Some(SolverWarning::PerturbedWavevector {
                count: 1,
                perturbation: 1e-10
            })
        );
    }

    #[test]
    fn crossed_harmonics_are_ordered_with_x_fastest() {
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::TwoDimensional)
            .with_period(Period::lattice(1000., 500.))
            .with_wavelength(250.)
            .with_fourier_order(1)
            .with_angles(10., 20.)
            .build()
            .unwrap();
        let policy = WavevectorPolicy::default();
        let factory = WavevectorFactory::new(&spec, &policy);
        let wavevectors = factory.build();
        let (kx0, ky0) = factory.incident_components();
        assert_eq!(wavevectors.len(), 9);
        assert_eq!(wavevectors.orders()[1], (0, -1));
        assert_eq!(wavevectors.orders()[3], (-1, 0));
        assert_relative_eq!(wavevectors.kx()[3], kx0 + 0.25, epsilon = 1e-14);
        assert_relative_eq!(wavevectors.ky()[1], ky0 + 0.5, epsilon = 1e-14);
        assert_relative_eq!(wavevectors.ky()[3], ky0, epsilon = 1e-14);
    }

    #[test]
    fn polarisation_vectors_are_transverse_unit_vectors() {
        for (theta, phi, psi) in [(0., 0., 45.), (30., 20., 10.), (60., -40., 90.)] {
            let spec = GratingSpec::builder()
                .with_kind(GratingKind::Conical)
                .with_period(Period::line(700.))
                .with_wavelength(900.)
                .with_angles(theta, phi)
                .with_polarization_angle(psi)
                .build()
                .unwrap();
            let policy = WavevectorPolicy::default();
            let factory = WavevectorFactory::new(&spec, &policy);
            let e = factory.polarization_vector();
            let (kx, ky) = factory.incident_components();
            let kz = factory.incident_normal_component();
            assert_relative_eq!(e.norm(), 1., epsilon = 1e-14);
            assert_relative_eq!(e.x * kx + e.y * ky + e.z * kz, 0., epsilon = 1e-14);
        }
    }

    #[test]
    fn te_light_at_normal_incidence_is_polarised_along_y() {
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::Conical)
            .with_period(Period::line(700.))
            .with_wavelength(900.)
            .with_polarization(Polarization::Te)
            .build()
            .unwrap();
        let policy = WavevectorPolicy::default();
        let e = WavevectorFactory::new(&spec, &policy).polarization_vector();
        assert_relative_eq!(e.y, 1., epsilon = 1e-14);
    }
}
