//! # Scattering matrix method
//!
//! Every region is described by a scattering matrix relating the amplitudes of the waves
//! entering it to those leaving it, referenced to a zero-thickness vacuum gap on either
//! side (Rumpf, PIER B 35, 241, 2011). As all regions share the gap, the global matrix is
//! the Redheffer star product of the region matrices in the order light meets them.
//!
//! For a layer of thickness `d` with `A = W⁻¹ W_g + V⁻¹ V_g` and `B = W⁻¹ W_g − V⁻¹ V_g`
//!
//! S₁₁ = S₂₂ = D⁻¹ (X B A⁻¹ X A − B), S₁₂ = S₂₁ = D⁻¹ X (A − B A⁻¹ B)
//!
//! with `D = A − X B A⁻¹ X B`. The half-spaces use the one-sided forms built in
//! [`ScatteringMatrix::reflection_side`] and [`ScatteringMatrix::transmission_side`].
//!
//! The vacuum gap has no modes where a harmonic grazes it. Near such incidence
//! configurations `V_g` is singular and the method fails, which is reported rather than
//! regularised; the transfer recursion is unaffected.

use super::{BoundaryAmplitudes, GlobalRelation, Propagator, StackModes};
use crate::{
    eigensolver::LayerModes,
    error::SolverError,
    linalg::{identity, ComplexMatrix, ComplexVector, MatrixOps},
    policy::SolverPolicy,
};
use num_complex::Complex;

#[derive(Clone, Debug, PartialEq)]
/// A two-port scattering matrix in block form
pub struct ScatteringMatrix {
    /// Reflection of waves incident from the top
    pub s11: ComplexMatrix,
    /// Transmission of waves incident from the bottom
    pub s12: ComplexMatrix,
    /// Transmission of waves incident from the top
    pub s21: ComplexMatrix,
    /// Reflection of waves incident from the bottom
    pub s22: ComplexMatrix,
}

impl ScatteringMatrix {
    /// The matrix of an empty region, which is the identity of the star product
    pub fn identity(n: usize) -> Self {
        Self {
            s11: ComplexMatrix::zeros(n, n),
            s12: identity(n),
            s21: identity(n),
            s22: ComplexMatrix::zeros(n, n),
        }
    }

    /// The Redheffer star product `self ⋆ other`, with `self` above `other`
    pub fn star(&self, other: &Self, policy: &SolverPolicy) -> Result<Self, SolverError> {
        let unit = identity(self.s11.nrows());
        let down = (&unit - &other.s11 * &self.s22).invert(policy, "star product (I - S11 S22')")?;
        let up = (&unit - &self.s22 * &other.s11).invert(policy, "star product (I - S22' S11)")?;
        let d = &self.s12 * down;
        let f = &other.s21 * up;
        Ok(Self {
            s11: &self.s11 + &d * &other.s11 * &self.s21,
            s12: &d * &other.s12,
            s21: &f * &self.s21,
            s22: &other.s22 + &f * &self.s22 * &other.s12,
        })
    }

    /// The interface between the incidence half-space and the gap
    pub fn reflection_side(
        region: &LayerModes,
        gap: &GapModes,
        policy: &SolverPolicy,
    ) -> Result<Self, SolverError> {
        let (a, b) = gap.interface(region, policy)?;
        let a_inverse = a.invert(policy, "reflection side matrix A")?;
        let b_a_inverse = &b * &a_inverse;
        Ok(Self {
            s11: -(&a_inverse * &b),
            s12: &a_inverse * Complex::from(2.),
            s21: (&a - &b_a_inverse * &b) * Complex::from(0.5),
            s22: b_a_inverse,
        })
    }

    /// The interface between the gap and the transmission half-space
    pub fn transmission_side(
        region: &LayerModes,
        gap: &GapModes,
        policy: &SolverPolicy,
    ) -> Result<Self, SolverError> {
        let (a, b) = gap.interface(region, policy)?;
        let a_inverse = a.invert(policy, "transmission side matrix A")?;
        let b_a_inverse = &b * &a_inverse;
        Ok(Self {
            s11: b_a_inverse.clone(),
            s12: (&a - &b_a_inverse * &b) * Complex::from(0.5),
            s21: &a_inverse * Complex::from(2.),
            s22: -(&a_inverse * &b),
        })
    }

    /// A layer of normalised thickness `k0 d` embedded between two gaps
    pub fn layer(
        modes: &LayerModes,
        gap: &GapModes,
        distance: f64,
        policy: &SolverPolicy,
    ) -> Result<Self, SolverError> {
        let w_inverse = modes.w().invert(policy, "mode matrix W")?;
        let v_inverse = modes.v().invert(policy, "mode matrix V")?;
        let wg = &w_inverse * gap.modes.w();
        let vg = &v_inverse * gap.modes.v();
        let a = &wg + &vg;
        let b = wg - vg;
        let a_inverse = a.invert(policy, "layer matrix A")?;
        let x = modes.exponentials(distance, policy);

        let x_b_a_inverse_x = (&b * &a_inverse).scale_rows(&x).scale_columns(&x);
        let d = &a - &x_b_a_inverse_x * &b;
        let d_inverse = d.invert(policy, "layer matrix D")?;
        let reflection = &d_inverse * (&x_b_a_inverse_x * &a - &b);
        let transmission = &d_inverse * (&a - &b * &a_inverse * &b).scale_rows(&x);
        Ok(Self {
            s11: reflection.clone(),
            s12: transmission.clone(),
            s21: transmission,
            s22: reflection,
        })
    }
}

impl GlobalRelation for ScatteringMatrix {
    fn outgoing(&self, incident: &ComplexVector) -> Result<BoundaryAmplitudes, SolverError> {
        Ok(BoundaryAmplitudes {
            reflected: &self.s11 * incident,
            transmitted: &self.s21 * incident,
        })
    }
}

#[derive(Clone, Debug)]
/// The modes of the vacuum gap, checked to be free of grazing harmonics
pub struct GapModes {
    modes: LayerModes,
    v_inverse: ComplexMatrix,
}

impl GapModes {
    /// Checks the gap supports a magnetic-like mode for every harmonic.
    ///
    /// A harmonic grazes the gap when `|q|²` falls below the grazing tolerance.
    pub fn new(modes: LayerModes, policy: &SolverPolicy) -> Result<Self, SolverError> {
        if let Some((harmonic, q)) = modes
            .q()
            .iter()
            .enumerate()
            .find(|(_, q)| q.norm_sqr() < policy.grazing_tolerance)
        {
            return Err(SolverError::singular(format!(
                "gap admittance V_g: harmonic {harmonic} grazes the gap medium (q = {q:e})"
            )));
        }
        let v_inverse = modes.v().invert(policy, "gap admittance V_g")?;
        Ok(Self { modes, v_inverse })
    }

    /// `(A, B)` for an interface between the gap and a half-space with modes `region`
    fn interface(
        &self,
        region: &LayerModes,
        policy: &SolverPolicy,
    ) -> Result<(ComplexMatrix, ComplexMatrix), SolverError> {
        let w_inverse = self.modes.w().invert(policy, "gap mode matrix W_g")?;
        let w = w_inverse * region.w();
        let v = &self.v_inverse * region.v();
        Ok((&w + &v, w - v))
    }
}

/// Composes a stack with scattering matrices and the Redheffer star product
pub struct ScatteringPropagator<'a> {
    policy: &'a SolverPolicy,
    gap: GapModes,
}

impl<'a> ScatteringPropagator<'a> {
    /// A propagator referencing every region to the vacuum gap `gap`
    pub fn new(policy: &'a SolverPolicy, gap: LayerModes) -> Result<Self, SolverError> {
        Ok(Self {
            policy,
            gap: GapModes::new(gap, policy)?,
        })
    }
}

impl Propagator for ScatteringPropagator<'_> {
    type Relation = ScatteringMatrix;

    #[tracing::instrument(name = "Scattering Matrix Composition", skip_all)]
    fn propagate(&self, modes: StackModes) -> Result<ScatteringMatrix, SolverError> {
        let StackModes {
            reflection,
            transmission,
            layers,
            k0,
        } = modes;
        let global = ScatteringMatrix::identity(reflection.dimension()).star(
            &ScatteringMatrix::reflection_side(&reflection, &self.gap, self.policy)?,
            self.policy,
        )?;

        let global = layers.iter().enumerate().try_fold(
            global,
            |global, (index, (layer, thickness))| {
                tracing::trace!("Composing layer {index}");
                ScatteringMatrix::layer(layer, &self.gap, k0 * thickness, self.policy)
                    .and_then(|matrix| global.star(&matrix, self.policy))
                    .map_err(|e| e.within(&format!("layer {index}")))
            },
        )?;

        global.star(
            &ScatteringMatrix::transmission_side(&transmission, &self.gap, self.policy)?,
            self.policy,
        )
    }
}

#[cfg(test)]
mod test {
    use super::{GapModes, ScatteringMatrix, ScatteringPropagator};
    use crate::{
        eigensolver::{homogeneous, planar::PlanarPolarization, LayerModes},
        error::SolverError,
        linalg::ComplexVector,
        policy::SolverPolicy,
        propagation::{GlobalRelation, Propagator, StackModes, TransferPropagator},
        wavevector::delta_vector,
    };
    use approx::assert_relative_eq;
    use num_complex::Complex;
    use std::f64::consts::PI;

    fn medium(kx: &ComplexVector, eps: Complex<f64>, policy: &SolverPolicy) -> LayerModes {
        homogeneous::planar(kx, eps, Complex::from(1.), PlanarPolarization::Te, &policy.branch)
    }

    #[test]
    fn star_product_with_the_identity_is_neutral() {
        let policy = SolverPolicy::default();
        let kx = ComplexVector::from_vec(vec![Complex::from(0.3), Complex::from(-0.5)]);
        let gap = GapModes::new(medium(&kx, Complex::from(1.), &policy), &policy).unwrap();
        let layer = ScatteringMatrix::layer(
            &medium(&kx, Complex::new(3., 0.1), &policy),
            &gap,
            2.,
            &policy,
        )
        .unwrap();
        let left = ScatteringMatrix::identity(2).star(&layer, &policy).unwrap();
        let right = layer.star(&ScatteringMatrix::identity(2), &policy).unwrap();
        for product in [left, right] {
            assert_relative_eq!((&product.s11 - &layer.s11).norm(), 0., epsilon = 1e-14);
            assert_relative_eq!((&product.s21 - &layer.s21).norm(), 0., epsilon = 1e-14);
            assert_relative_eq!((&product.s22 - &layer.s22).norm(), 0., epsilon = 1e-14);
        }
    }

    #[test]
    fn homogeneous_slabs_agree_with_the_transfer_recursion() {
        let policy = SolverPolicy::default();
        let kx = ComplexVector::from_vec(vec![Complex::from(0.4)]);
        let modes = StackModes {
            reflection: medium(&kx, Complex::from(1.), &policy),
            transmission: medium(&kx, Complex::from(2.25), &policy),
            layers: vec![
                (medium(&kx, Complex::from(6.), &policy), 0.13),
                (medium(&kx, Complex::new(2., 0.3), &policy), 0.4),
            ],
            k0: 2. * PI,
        };
        let gap = medium(&kx, Complex::from(1.), &policy);
        let scattering = ScatteringPropagator::new(&policy, gap)
            .unwrap()
            .propagate(modes.clone())
            .unwrap()
            .outgoing(&delta_vector(1))
            .unwrap();
        let transfer = TransferPropagator::new(&policy)
            .propagate(modes)
            .unwrap()
            .outgoing(&delta_vector(1))
            .unwrap();
        assert_relative_eq!(
            (scattering.reflected[0] - transfer.reflected[0]).norm(),
            0.,
            epsilon = 1e-10
        );
        assert_relative_eq!(
            (scattering.transmitted[0] - transfer.transmitted[0]).norm(),
            0.,
            epsilon = 1e-10
        );
    }

    #[test]
    fn grazing_gap_harmonics_are_singular() {
        let policy = SolverPolicy::default();
        let kx = ComplexVector::from_vec(vec![Complex::from(2. * (PI / 6.).sin())]);
        let gap = medium(&kx, Complex::from(1.), &policy);
        let result = ScatteringPropagator::new(&policy, gap);
        assert!(matches!(result, Err(SolverError::SingularMatrix { .. })));
    }
}
