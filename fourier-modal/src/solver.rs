//! # Solver
//!
//! The entry points of the crate. A solve dispatches once on the grating dimensionality
//! and then runs the same pipeline for every formulation:
//!
//! 1. harmonic wavevectors for the grating and incidence,
//! 2. the modes of every layer and of both half-spaces,
//! 3. composition of the stack with the selected [`Algorithm`],
//! 4. power weighting of the outgoing amplitudes.
//!
//! A solve is a pure function of its inputs. Independent wavelengths of a sweep run in
//! parallel on the `rayon` thread pool.

use crate::{
    boundary::{BoundaryMatcher, DiffractionResult},
    error::{SolverError, SolverWarning},
    field::{FieldCell, FieldReconstructor, Resolution},
    formulation::{Conical, Crossed, Formulation, Planar},
    grating::{GratingKind, GratingSpec, LayerStack},
    linalg::ComplexVector,
    policy::SolverPolicy,
    propagation::{
        Algorithm, BoundaryAmplitudes, Propagator, ScatteringPropagator, StackModes,
        TransferPropagator, TransferRelation,
    },
};
use num_complex::Complex;
use rayon::prelude::*;

#[derive(Clone, Debug)]
/// The result of a solve together with the data needed to rebuild the internal fields
pub struct Solution {
    result: DiffractionResult,
    amplitudes: BoundaryAmplitudes,
    incident: ComplexVector,
    algorithm: Algorithm,
    transfer: Option<TransferRelation>,
}

impl Solution {
    /// The diffraction efficiencies
    pub fn result(&self) -> &DiffractionResult {
        &self.result
    }

    /// Consumes the solution, returning the diffraction efficiencies
    pub fn into_result(self) -> DiffractionResult {
        self.result
    }

    /// The reflected and transmitted tangential amplitudes
    pub fn amplitudes(&self) -> &BoundaryAmplitudes {
        &self.amplitudes
    }

    /// The tangential amplitudes of the incident wave
    pub fn incident(&self) -> &ComplexVector {
        &self.incident
    }

    /// The algorithm used to compose the stack
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The layer history, retained when the transfer recursion was used
    pub fn transfer(&self) -> Option<&TransferRelation> {
        self.transfer.as_ref()
    }
}

/// Everything computed before the layers are composed
struct Prepared {
    modes: StackModes,
    matcher: BoundaryMatcher,
    incident: ComplexVector,
    warnings: Vec<SolverWarning>,
}

#[derive(Clone, Debug, Default)]
/// Solves gratings under a fixed numerical policy
pub struct Solver {
    policy: SolverPolicy,
}

impl Solver {
    /// A solver applying `policy`
    pub fn new(policy: SolverPolicy) -> Self {
        Self { policy }
    }

    /// The numerical policy
    pub fn policy(&self) -> &SolverPolicy {
        &self.policy
    }

    /// Diffraction efficiencies of `stack` illuminated as described by `spec`
    pub fn solve(
        &self,
        spec: &GratingSpec,
        stack: &LayerStack,
        algorithm: Algorithm,
    ) -> Result<DiffractionResult, SolverError> {
        Ok(self.solve_with_history(spec, stack, algorithm)?.into_result())
    }

    /// Solves and keeps the per-layer history for field reconstruction
    pub fn solve_with_history(
        &self,
        spec: &GratingSpec,
        stack: &LayerStack,
        algorithm: Algorithm,
    ) -> Result<Solution, SolverError> {
        match spec.kind() {
            GratingKind::OneDimensional => {
                self.run(&Planar::new(spec, &self.policy)?, spec, stack, algorithm)
            }
            GratingKind::Conical => {
                self.run(&Conical::new(spec, &self.policy), spec, stack, algorithm)
            }
            GratingKind::TwoDimensional => {
                self.run(&Crossed::new(spec, &self.policy), spec, stack, algorithm)
            }
        }
    }

    /// Samples the field inside every layer of a solved stack.
    ///
    /// A solution obtained with the scattering matrix method carries no layer history, so
    /// the stack is folded again with the transfer recursion.
    pub fn reconstruct_field(
        &self,
        spec: &GratingSpec,
        stack: &LayerStack,
        solution: &Solution,
        resolution: Resolution,
    ) -> Result<FieldCell, SolverError> {
        match spec.kind() {
            GratingKind::OneDimensional => self.reconstruct(
                &Planar::new(spec, &self.policy)?,
                spec,
                stack,
                solution,
                resolution,
            ),
            GratingKind::Conical => self.reconstruct(
                &Conical::new(spec, &self.policy),
                spec,
                stack,
                solution,
                resolution,
            ),
            GratingKind::TwoDimensional => self.reconstruct(
                &Crossed::new(spec, &self.policy),
                spec,
                stack,
                solution,
                resolution,
            ),
        }
    }

    /// Solves the grating at every wavelength in `wavelengths`.
    ///
    /// `stack_at` builds the layer stack at a wavelength, which is where dispersive
    /// materials enter. Each wavelength succeeds or fails independently.
    pub fn sweep_wavelengths<F>(
        &self,
        spec: &GratingSpec,
        wavelengths: &[f64],
        stack_at: F,
        algorithm: Algorithm,
    ) -> Vec<Result<DiffractionResult, SolverError>>
    where
        F: Fn(f64) -> Result<LayerStack, SolverError> + Sync,
    {
        tracing::info!("Sweeping {} wavelengths", wavelengths.len());
        wavelengths
            .par_iter()
            .map(|&wavelength| {
                let spec = spec.at_wavelength(wavelength)?;
                let stack = stack_at(wavelength)?;
                self.solve(&spec, &stack, algorithm)
            })
            .collect()
    }

    fn prepare<F: Formulation>(
        &self,
        formulation: &F,
        spec: &GratingSpec,
        stack: &LayerStack,
    ) -> Result<Prepared, SolverError> {
        stack.validate(spec.harmonics())?;
        let mut warnings = formulation
            .wavevectors()
            .warning(&self.policy.wavevector)
            .into_iter()
            .collect::<Vec<_>>();

        let mut layers = Vec::with_capacity(stack.len());
        for (index, layer) in stack.iter().enumerate() {
            tracing::debug!("Solving the modes of layer {index}");
            let (modes, degeneracy) = formulation
                .layer_modes(layer)
                .map_err(|e| e.within(&format!("layer {index}")))?;
            if let Some(degeneracy) = degeneracy {
                warnings.push(SolverWarning::DegenerateEigenvalues {
                    layer: index,
                    pairs: degeneracy.pairs,
                    separation: degeneracy.separation,
                });
            }
            layers.push((modes, layer.thickness()));
        }

        let reflection = formulation
            .homogeneous_modes(spec.incidence_permittivity())
            .map_err(|e| e.within("incidence half-space"))?;
        let transmission = formulation
            .homogeneous_modes(spec.transmission_permittivity())
            .map_err(|e| e.within("transmission half-space"))?;

        Ok(Prepared {
            matcher: formulation.boundary(&reflection, &transmission),
            incident: formulation.incident_amplitudes(),
            modes: StackModes {
                reflection,
                transmission,
                layers,
                k0: spec.k0(),
            },
            warnings,
        })
    }

    #[tracing::instrument(name = "Solve", skip_all, fields(wavelength = spec.wavelength()))]
    fn run<F: Formulation>(
        &self,
        formulation: &F,
        spec: &GratingSpec,
        stack: &LayerStack,
        algorithm: Algorithm,
    ) -> Result<Solution, SolverError> {
        formulation.check_algorithm(algorithm)?;
        let Prepared {
            modes,
            matcher,
            incident,
            warnings,
        } = self.prepare(formulation, spec, stack)?;

        let (result, amplitudes, transfer) = match algorithm {
            Algorithm::Transfer => {
                let relation = TransferPropagator::new(&self.policy).propagate(modes)?;
                let (result, amplitudes) = matcher.match_relation(&relation, &incident)?;
                (result, amplitudes, Some(relation))
            }
            Algorithm::Scattering => {
                let context = incidence_context(spec);
                let gap = formulation
                    .homogeneous_modes(Complex::from(1.))
                    .map_err(|e| e.within(&context))?;
                let relation = ScatteringPropagator::new(&self.policy, gap)
                    .and_then(|propagator| propagator.propagate(modes))
                    .map_err(|e| e.within(&context))?;
                let (result, amplitudes) = matcher.match_relation(&relation, &incident)?;
                (result, amplitudes, None)
            }
        };

        for warning in warnings.iter() {
            tracing::warn!("{warning}");
        }
        tracing::info!(
            "{algorithm}: R = {:.6}, T = {:.6}",
            result.total_reflection(),
            result.total_transmission()
        );

        Ok(Solution {
            result: result.with_warnings(warnings),
            amplitudes,
            incident,
            algorithm,
            transfer,
        })
    }

    fn reconstruct<F: Formulation>(
        &self,
        formulation: &F,
        spec: &GratingSpec,
        stack: &LayerStack,
        solution: &Solution,
        resolution: Resolution,
    ) -> Result<FieldCell, SolverError> {
        let reconstructor = FieldReconstructor::new(formulation, spec, &self.policy);
        match solution.transfer() {
            Some(relation) => {
                reconstructor.reconstruct(stack, relation, solution.incident(), resolution)
            }
            None => {
                tracing::debug!("Recovering the layer history with the transfer recursion");
                let prepared = self.prepare(formulation, spec, stack)?;
                let relation = TransferPropagator::new(&self.policy).propagate(prepared.modes)?;
                reconstructor.reconstruct(stack, &relation, &prepared.incident, resolution)
            }
        }
    }
}

fn incidence_context(spec: &GratingSpec) -> String {
    format!(
        "θ = {:.4}°, φ = {:.4}°",
        spec.incidence().theta.to_degrees(),
        spec.incidence().phi.to_degrees()
    )
}

/// Diffraction efficiencies with the default numerical policy
pub fn solve(
    spec: &GratingSpec,
    stack: &LayerStack,
    algorithm: Algorithm,
) -> Result<DiffractionResult, SolverError> {
    Solver::default().solve(spec, stack, algorithm)
}

/// Solves with the default numerical policy, keeping the layer history
pub fn solve_with_history(
    spec: &GratingSpec,
    stack: &LayerStack,
    algorithm: Algorithm,
) -> Result<Solution, SolverError> {
    Solver::default().solve_with_history(spec, stack, algorithm)
}

/// Samples the internal field with the default numerical policy
pub fn reconstruct_field(
    spec: &GratingSpec,
    stack: &LayerStack,
    solution: &Solution,
    resolution: Resolution,
) -> Result<FieldCell, SolverError> {
    Solver::default().reconstruct_field(spec, stack, solution, resolution)
}

/// Sweeps wavelengths with the default numerical policy
pub fn sweep_wavelengths<F>(
    spec: &GratingSpec,
    wavelengths: &[f64],
    stack_at: F,
    algorithm: Algorithm,
) -> Vec<Result<DiffractionResult, SolverError>>
where
    F: Fn(f64) -> Result<LayerStack, SolverError> + Sync,
{
    Solver::default().sweep_wavelengths(spec, wavelengths, stack_at, algorithm)
}

#[cfg(test)]
mod test {
    use super::{solve, solve_with_history, sweep_wavelengths, Solver};
    use crate::{
        boundary::DiffractionResult,
        convolution::{ConvolutionMatrix, Profile},
        error::{SolverError, SolverWarning},
        field::{FieldComponent, Resolution},
        grating::{GratingKind, GratingSpec, Layer, LayerStack, Period, Polarization},
        linalg::ComplexMatrix,
        policy::{SolverPolicy, WavevectorPolicy},
        propagation::Algorithm,
    };
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use num_complex::Complex;
    use std::f64::consts::PI;

    fn lamellar(pixels: usize, filled: usize, inside: f64, outside: f64) -> Profile {
        let values = (0..pixels)
            .map(|idx| if idx < filled { inside } else { outside })
            .collect::<Vec<_>>();
        Profile::from_real_line(&values)
    }

    /// A centred ridge, symmetric about the middle of the cell
    fn ridge(pixels: usize, width: usize, inside: f64, outside: f64) -> Profile {
        let start = (pixels - width) / 2;
        let values = (0..pixels)
            .map(|idx| {
                if (start..start + width).contains(&idx) {
                    inside
                } else {
                    outside
                }
            })
            .collect::<Vec<_>>();
        Profile::from_real_line(&values)
    }

    fn planar_spec(order: usize, theta: f64, polarization: Polarization) -> GratingSpec {
        GratingSpec::builder()
            .with_kind(GratingKind::OneDimensional)
            .with_period(Period::line(700.))
            .with_wavelength(900.)
            .with_fourier_order(order)
            .with_angles(theta, 0.)
            .with_polarization(polarization)
            .with_media(1., Complex::from(1.45))
            .build()
            .unwrap()
    }

    fn two_layer_stack(kind: GratingKind, order: usize) -> LayerStack {
        LayerStack::from_profiles(
            &[300., 150.],
            &[lamellar(60, 21, 12.1, 1.), lamellar(60, 40, 2.25, 6.25)],
            order,
            kind,
        )
        .unwrap()
    }

    fn crossed_stack(order: usize) -> LayerStack {
        let grid = Array2::from_shape_fn((20, 20), |(y, x)| {
            if x < 9 && (4..16).contains(&y) {
                12.1
            } else {
                1.
            }
        });
        LayerStack::from_profiles(&[200.], &[Profile::from_real_grid(grid)], order, GratingKind::TwoDimensional)
            .unwrap()
    }

    fn crossed_spec(order: usize, theta: f64, phi: f64) -> GratingSpec {
        GratingSpec::builder()
            .with_kind(GratingKind::TwoDimensional)
            .with_period(Period::lattice(700., 600.))
            .with_wavelength(900.)
            .with_fourier_order(order)
            .with_angles(theta, phi)
            .with_polarization_angle(35.)
            .with_media(1., Complex::from(1.45))
            .build()
            .unwrap()
    }

    fn assert_energy_conserved(result: &DiffractionResult) {
        assert!(result.reflection().iter().all(|&r| r >= 0.));
        assert!(result.transmission().iter().all(|&t| t >= 0.));
        assert_relative_eq!(
            result.total_reflection() + result.total_transmission(),
            1.,
            epsilon = 1e-7
        );
    }

    fn assert_algorithms_agree(spec: &GratingSpec, stack: &LayerStack) {
        let transfer = solve(spec, stack, Algorithm::Transfer).unwrap();
        let scattering = solve(spec, stack, Algorithm::Scattering).unwrap();
        for (a, b) in transfer.reflection().iter().zip(scattering.reflection()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
        for (a, b) in transfer.transmission().iter().zip(scattering.transmission()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn lossless_planar_gratings_conserve_energy() {
        for polarization in [Polarization::Te, Polarization::Tm] {
            for algorithm in [Algorithm::Transfer, Algorithm::Scattering] {
                let spec = planar_spec(15, 12., polarization);
                let stack = two_layer_stack(GratingKind::OneDimensional, 15);
                let result = solve(&spec, &stack, algorithm).unwrap();
                assert_energy_conserved(&result);
            }
        }
    }

    #[test]
    fn lossless_conical_gratings_conserve_energy() {
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::Conical)
            .with_period(Period::line(700.))
            .with_wavelength(900.)
            .with_fourier_order(10)
            .with_angles(25., 40.)
            .with_polarization_angle(60.)
            .with_media(1., Complex::from(1.45))
            .build()
            .unwrap();
        let stack = two_layer_stack(GratingKind::Conical, 10);
        let result = solve(&spec, &stack, Algorithm::Transfer).unwrap();
        assert_energy_conserved(&result);
    }

    #[test]
    fn lossless_crossed_gratings_conserve_energy() {
        for algorithm in [Algorithm::Transfer, Algorithm::Scattering] {
            let result = solve(&crossed_spec(2, 15., 25.), &crossed_stack(2), algorithm).unwrap();
            assert_energy_conserved(&result);
            assert_eq!(result.reflection_grid().unwrap().dim(), (5, 5));
        }
    }

    proptest::proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(16))]
        #[test]
        fn random_lossless_profiles_conserve_energy(
            values in proptest::collection::vec(1.0..16.0_f64, 8..32),
            theta in 0.0..80.0_f64,
            thickness in 10.0..800.0_f64,
        ) {
            let stack = LayerStack::from_profiles(
                &[thickness],
                &[Profile::from_real_line(&values)],
                6,
                GratingKind::OneDimensional,
            )
            .unwrap();
            for polarization in [Polarization::Te, Polarization::Tm] {
                let spec = planar_spec(6, theta, polarization);
                let result = solve(&spec, &stack, Algorithm::Transfer).unwrap();
                proptest::prop_assert!(
                    (result.total_reflection() + result.total_transmission() - 1.).abs() < 1e-7
                );
            }
        }
    }

    #[test]
    fn transfer_and_scattering_methods_agree() {
        for polarization in [Polarization::Te, Polarization::Tm] {
            let spec = planar_spec(12, 31., polarization);
            let stack = two_layer_stack(GratingKind::OneDimensional, 12);
            assert_algorithms_agree(&spec, &stack);
        }
        assert_algorithms_agree(&crossed_spec(2, 10., 30.), &crossed_stack(2));
    }

    #[test]
    fn absorbing_layers_are_handled_identically_by_both_methods() {
        let spec = planar_spec(10, 5., Polarization::Te);
        let stack = LayerStack::from_profiles(
            &[5000.],
            &[Profile::Line(
                (0..30)
                    .map(|idx| {
                        if idx < 10 {
                            Complex::new(-20., 1.5)
                        } else {
                            Complex::from(2.25)
                        }
                    })
                    .collect(),
            )],
            10,
            GratingKind::OneDimensional,
        )
        .unwrap();
        assert_algorithms_agree(&spec, &stack);
        let result = solve(&spec, &stack, Algorithm::Transfer).unwrap();
        assert!(result.total_reflection() + result.total_transmission() < 1.);
    }

    #[test]
    fn grazing_gap_harmonics_make_the_scattering_method_singular() {
        // n_I sinθ = 2 sin 30° places the specular order on the light line of the vacuum gap
        let build = |theta: f64| {
            GratingSpec::builder()
                .with_kind(GratingKind::OneDimensional)
                .with_period(Period::line(700.))
                .with_wavelength(900.)
                .with_fourier_order(5)
                .with_angles(theta, 0.)
                .with_media(2., Complex::from(2.))
                .build()
                .unwrap()
        };
        let stack = two_layer_stack(GratingKind::OneDimensional, 5);

        let singular = solve(&build(30.), &stack, Algorithm::Scattering);
        assert!(matches!(singular, Err(SolverError::SingularMatrix { .. })));
        let transfer = solve(&build(30.), &stack, Algorithm::Transfer).unwrap();
        assert_energy_conserved(&transfer);

        assert_algorithms_agree(&build(31.), &stack);
    }

    #[test]
    fn conical_gratings_are_unsupported_by_the_scattering_method() {
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::Conical)
            .with_period(Period::line(700.))
            .with_wavelength(900.)
            .with_fourier_order(3)
            .with_angles(10., 10.)
            .build()
            .unwrap();
        let stack = two_layer_stack(GratingKind::Conical, 3);
        let result = solve(&spec, &stack, Algorithm::Scattering);
        assert!(matches!(
            result,
            Err(SolverError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn efficiencies_converge_with_increasing_order() {
        let specular = |order: usize| {
            let spec = planar_spec(order, 0., Polarization::Te);
            let stack = LayerStack::from_profiles(
                &[460.],
                &[lamellar(700, 350, 3.48 * 3.48, 1.)],
                order,
                GratingKind::OneDimensional,
            )
            .unwrap();
            solve(&spec, &stack, Algorithm::Transfer)
                .unwrap()
                .order(0, 0)
                .unwrap()
                .0
        };
        let coarse = (specular(10) - specular(5)).abs();
        let fine = (specular(40) - specular(20)).abs();
        assert!(fine < coarse);
        assert!(fine < 5e-3);
    }

    #[test]
    fn a_homogeneous_layer_on_a_matched_substrate_reproduces_fresnel() {
        let (n1, n2) = (1., 1.5_f64);
        let theta = 40_f64.to_radians();
        let cos_i = theta.cos();
        let cos_t = (1. - (n1 * theta.sin() / n2).powi(2)).sqrt();
        let r_te = ((n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t)).powi(2);
        let r_tm = ((n2 * cos_i - n1 * cos_t) / (n2 * cos_i + n1 * cos_t)).powi(2);

        for (kind, polarization, expected) in [
            (GratingKind::OneDimensional, Polarization::Te, r_te),
            (GratingKind::OneDimensional, Polarization::Tm, r_tm),
            (
                GratingKind::Conical,
                Polarization::Linear { psi: PI / 6. },
                0.25 * r_te + 0.75 * r_tm,
            ),
        ] {
            let spec = GratingSpec::builder()
                .with_kind(kind)
                .with_period(Period::line(700.))
                .with_wavelength(900.)
                .with_fourier_order(3)
                .with_angles(40., 0.)
                .with_polarization(polarization)
                .with_media(n1, Complex::from(n2))
                .build()
                .unwrap();
            let stack = LayerStack::from_profiles(
                &[321.],
                &[Profile::uniform(Complex::from(n2 * n2))],
                3,
                kind,
            )
            .unwrap();
            let result = solve(&spec, &stack, Algorithm::Transfer).unwrap();
            let (reflection, transmission) = result.order(0, 0).unwrap();
            assert_relative_eq!(reflection, expected, epsilon = 1e-9);
            assert_relative_eq!(transmission, 1. - expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn specular_transmission_is_reciprocal() {
        let order = 12;
        let profiles = [ridge(50, 20, 12.1, 1.), ridge(50, 30, 2.25, 4.)];
        let forward_stack =
            LayerStack::from_profiles(&[250., 120.], &profiles, order, GratingKind::OneDimensional)
                .unwrap();
        let build = |n_incidence: f64, n_transmission: f64| {
            GratingSpec::builder()
                .with_kind(GratingKind::OneDimensional)
                .with_period(Period::line(700.))
                .with_wavelength(900.)
                .with_fourier_order(order)
                .with_media(n_incidence, Complex::from(n_transmission))
                .build()
                .unwrap()
        };
        let forward = solve(&build(1., 1.5), &forward_stack, Algorithm::Transfer).unwrap();
        let backward = solve(&build(1.5, 1.), &forward_stack.reversed(), Algorithm::Transfer)
            .unwrap();
        assert_relative_eq!(
            forward.order(0, 0).unwrap().1,
            backward.order(0, 0).unwrap().1,
            epsilon = 1e-6
        );
    }

    /// Reflectance of a free-standing slab at normal incidence
    fn airy_reflectance(n: f64, thickness: f64, wavelength: f64) -> f64 {
        let r12 = Complex::from((1. - n) / (1. + n));
        let r23 = -r12;
        let phase = Complex::new(0., 4. * PI * n * thickness / wavelength).exp();
        ((r12 + r23 * phase) / (Complex::from(1.) + r12 * r23 * phase)).norm_sqr()
    }

    fn slab_reflectance(profile: Profile, algorithm: Algorithm) -> f64 {
        let (order, thickness, wavelength) = (40, 460., 900.);
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::OneDimensional)
            .with_period(Period::line(700.))
            .with_wavelength(wavelength)
            .with_fourier_order(order)
            .with_polarization(Polarization::Te)
            .build()
            .unwrap();
        let stack =
            LayerStack::from_profiles(&[thickness], &[profile], order, GratingKind::OneDimensional)
                .unwrap();
        solve(&spec, &stack, algorithm).unwrap().order(0, 0).unwrap().0
    }

    #[test]
    fn an_unpatterned_slab_matches_the_airy_formula() {
        let n = 3.48_f64;
        let airy = airy_reflectance(n, 460., 900.);
        let reflection =
            slab_reflectance(Profile::uniform(Complex::from(n * n)), Algorithm::Transfer);
        assert!((reflection - airy).abs() < 0.01 * airy);
    }

    #[test]
    fn a_weakly_patterned_slab_matches_the_airy_formula() {
        let n = 3.48_f64;
        let airy = airy_reflectance(n, 460., 900.);
        for algorithm in [Algorithm::Transfer, Algorithm::Scattering] {
            let profile = lamellar(700, 350, n * n + 1e-6, n * n);
            assert!(profile.uniform_value().is_none());
            let reflection = slab_reflectance(profile, algorithm);
            assert!(
                (reflection - airy).abs() < 0.01 * airy,
                "{algorithm}: {reflection} against {airy}"
            );
        }
    }

    #[test]
    fn the_normal_incidence_perturbation_has_negligible_bias() {
        let stack = two_layer_stack(GratingKind::OneDimensional, 10);
        let spec = planar_spec(10, 0., Polarization::Tm);
        let solve_with = |perturbation: f64| {
            let policy = SolverPolicy {
                wavevector: WavevectorPolicy { perturbation },
                ..SolverPolicy::default()
            };
            Solver::new(policy)
                .solve(&spec, &stack, Algorithm::Transfer)
                .unwrap()
        };
        let small = solve_with(1e-10);
        let large = solve_with(1e-6);
        assert!(small
            .warnings()
            .iter()
            .any(|w| matches!(w, SolverWarning::PerturbedWavevector { count: 1, .. })));
        for (a, b) in small.reflection().iter().zip(large.reflection()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_layers_are_reported_and_still_solved() {
        let order = 3;
        let n = 2 * order + 1;
        let layer = Layer::new(
            200.,
            ConvolutionMatrix::from_matrix(ComplexMatrix::identity(n, n) * Complex::from(2.25))
                .unwrap(),
        )
        .unwrap()
        .with_reciprocal_permittivity(
            ConvolutionMatrix::from_matrix(
                ComplexMatrix::identity(n, n) * Complex::from(1. / 2.25),
            )
            .unwrap(),
        )
        .unwrap();
        let stack = LayerStack::new(vec![layer]);
        let spec = GratingSpec::builder()
            .with_kind(GratingKind::Conical)
            .with_period(Period::line(700.))
            .with_wavelength(900.)
            .with_fourier_order(order)
            .with_angles(20., 30.)
            .with_polarization_angle(45.)
            .build()
            .unwrap();
        let result = solve(&spec, &stack, Algorithm::Transfer).unwrap();
        assert!(result
            .warnings()
            .iter()
            .any(|w| matches!(w, SolverWarning::DegenerateEigenvalues { layer: 0, .. })));
        assert_energy_conserved(&result);
    }

    #[test]
    fn mismatched_stacks_are_invalid() {
        let spec = planar_spec(4, 0., Polarization::Te);
        let stack = two_layer_stack(GratingKind::OneDimensional, 5);
        assert!(matches!(
            solve(&spec, &stack, Algorithm::Transfer),
            Err(SolverError::InvalidSpec(_))
        ));
    }

    #[test]
    fn sweeps_solve_each_wavelength_independently() {
        let spec = planar_spec(6, 10., Polarization::Te);
        let stack_at = |_: f64| -> Result<LayerStack, SolverError> {
            Ok(two_layer_stack(GratingKind::OneDimensional, 6))
        };
        let results = sweep_wavelengths(&spec, &[850., 900., -1.], stack_at, Algorithm::Transfer);
        assert_eq!(results.len(), 3);
        let direct = solve(
            &spec.at_wavelength(850.).unwrap(),
            &two_layer_stack(GratingKind::OneDimensional, 6),
            Algorithm::Transfer,
        )
        .unwrap();
        let swept = results[0].as_ref().unwrap();
        assert_relative_eq!(
            swept.total_reflection(),
            direct.total_reflection(),
            epsilon = 1e-14
        );
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(SolverError::InvalidSpec(_))));
    }

    #[test]
    fn the_field_at_the_top_of_a_slab_is_the_sum_of_incident_and_reflected_waves() {
        let spec = planar_spec(2, 0., Polarization::Te);
        let stack = LayerStack::from_profiles(
            &[250.],
            &[Profile::uniform(Complex::from(6.25))],
            2,
            GratingKind::OneDimensional,
        )
        .unwrap();
        let solution = solve_with_history(&spec, &stack, Algorithm::Transfer).unwrap();
        let zeroth = solution.incident().len() / 2;
        let expected = (solution.amplitudes().reflected[zeroth] + 1.).norm();
        let cell = Solver::default()
            .reconstruct_field(&spec, &stack, &solution, Resolution { x: 4, y: 1, z: 3 })
            .unwrap();
        let ey = cell.component(FieldComponent::Ey).unwrap();
        for x in 0..4 {
            assert_relative_eq!(ey[[0, 0, x]].norm(), expected, epsilon = 1e-9);
        }
    }
}
