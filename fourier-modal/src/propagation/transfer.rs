//! # Transfer matrix recursion
//!
//! The enhanced transmittance matrix approach of Moharam et al. (JOSA A 12, 1077, 1995).
//!
//! The recursion starts from the transmission half-space, where the tangential fields at
//! the bottom interface are `s = f T_N`, `u = g T_N` with `f = W_II`, `g = V_II` and
//! `T = I`. Each layer `l`, visited from the bottom of the stack to the top, is folded in
//! with
//!
//! a = ½ (W⁻¹ f + V⁻¹ g), b = ½ (W⁻¹ f − V⁻¹ g)
//!
//! f ← W (I + X b a⁻¹ X), g ← V (I − X b a⁻¹ X), T ← T a⁻¹ X
//!
//! where `X = exp(−k0 q d)` is diagonal. Only decaying exponentials appear, so thick or
//! lossy layers do not overflow. Finally the incidence half-space closes the system
//!
//! (g + V_I f) T₁ = 2 V_I c_inc, r = f T₁ − c_inc, t = T T₁
//!
//! The per-layer `(X, a⁻¹, b)` are kept in a [`LayerRecord`] so the internal fields can be
//! recovered from `T₁` without repeating the recursion.

use super::{BoundaryAmplitudes, GlobalRelation, Propagator, StackModes};
use crate::{
    eigensolver::LayerModes,
    error::SolverError,
    linalg::{identity, ComplexMatrix, ComplexVector, MatrixOps},
    policy::SolverPolicy,
};
use num_complex::Complex;

#[derive(Clone, Debug)]
/// The running state of the recursion
pub(crate) struct TransferState {
    f: ComplexMatrix,
    g: ComplexMatrix,
    t: ComplexMatrix,
}

impl TransferState {
    /// The state at the interface with the transmission half-space
    fn initial(transmission: &LayerModes) -> Self {
        Self {
            f: transmission.w().clone(),
            g: transmission.v().clone(),
            t: identity(transmission.dimension()),
        }
    }
}

#[derive(Clone, Debug)]
/// The quantities of one layer needed to rebuild its internal fields
pub struct LayerRecord {
    pub(crate) modes: LayerModes,
    pub(crate) thickness: f64,
    pub(crate) x: ComplexVector,
    pub(crate) a_inverse: ComplexMatrix,
    pub(crate) b: ComplexMatrix,
}

impl LayerRecord {
    /// The modes of the layer
    pub fn modes(&self) -> &LayerModes {
        &self.modes
    }

    /// The layer thickness
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Amplitudes of the backward modes at the bottom of the layer, and the forward
    /// amplitudes at the top of the next layer, from the forward amplitudes `forward` at
    /// the top of this one.
    pub(crate) fn descend(&self, forward: &ComplexVector) -> (ComplexVector, ComplexVector) {
        let next = &self.a_inverse * forward.component_mul(&self.x);
        let backward = &self.b * &next;
        (backward, next)
    }
}

#[derive(Clone, Debug)]
/// The fully folded stack, with the record of every layer
pub struct TransferRelation {
    state: TransferState,
    incidence_admittance: ComplexMatrix,
    records: Vec<LayerRecord>,
    policy: SolverPolicy,
}

impl TransferRelation {
    /// The records of every layer, top first
    pub fn records(&self) -> &[LayerRecord] {
        &self.records
    }

    /// The forward amplitudes `T₁` at the top of the stack
    pub fn top_amplitudes(&self, incident: &ComplexVector) -> Result<ComplexVector, SolverError> {
        let system = &self.state.g + &self.incidence_admittance * &self.state.f;
        let source = &self.incidence_admittance * incident * Complex::from(2.);
        Ok(system.invert(&self.policy, "boundary system (g + V_I f)")? * source)
    }
}

impl GlobalRelation for TransferRelation {
    fn outgoing(&self, incident: &ComplexVector) -> Result<BoundaryAmplitudes, SolverError> {
        let top = self.top_amplitudes(incident)?;
        Ok(BoundaryAmplitudes {
            reflected: &self.state.f * &top - incident,
            transmitted: &self.state.t * &top,
        })
    }
}

/// Composes a stack with the transfer matrix recursion
pub struct TransferPropagator<'a> {
    policy: &'a SolverPolicy,
}

impl<'a> TransferPropagator<'a> {
    /// A propagator applying `policy`
    pub fn new(policy: &'a SolverPolicy) -> Self {
        Self { policy }
    }

    fn fold_layer(
        &self,
        state: TransferState,
        modes: LayerModes,
        thickness: f64,
        k0: f64,
    ) -> Result<(TransferState, LayerRecord), SolverError> {
        let x = modes.exponentials(k0 * thickness, self.policy);
        let w_inverse = modes.w().invert(self.policy, "mode matrix W")?;
        let v_inverse = modes.v().invert(self.policy, "mode matrix V")?;
        let wf = w_inverse * &state.f;
        let vg = v_inverse * &state.g;
        let half = Complex::from(0.5);
        let a = (&wf + &vg) * half;
        let b = (wf - vg) * half;
        let a_inverse = a.invert(self.policy, "interface matrix a")?;

        let xbax = (&b * &a_inverse).scale_rows(&x).scale_columns(&x);
        let unit = identity(modes.dimension());
        let state = TransferState {
            f: modes.w() * (&unit + &xbax),
            g: modes.v() * (unit - xbax),
            t: state.t * a_inverse.scale_columns(&x),
        };
        Ok((
            state,
            LayerRecord {
                modes,
                thickness,
                x,
                a_inverse,
                b,
            },
        ))
    }
}

impl Propagator for TransferPropagator<'_> {
    type Relation = TransferRelation;

    #[tracing::instrument(name = "Transfer Matrix Recursion", skip_all)]
    fn propagate(&self, modes: StackModes) -> Result<TransferRelation, SolverError> {
        let StackModes {
            reflection,
            transmission,
            layers,
            k0,
        } = modes;

        let (state, mut records) = layers.into_iter().enumerate().rev().try_fold(
            (TransferState::initial(&transmission), Vec::new()),
            |(state, mut records), (index, (layer, thickness))| {
                tracing::trace!("Folding layer {index}");
                let (state, record) = self
                    .fold_layer(state, layer, thickness, k0)
                    .map_err(|e| e.within(&format!("layer {index}")))?;
                records.push(record);
                Ok::<_, SolverError>((state, records))
            },
        )?;
        records.reverse();

        Ok(TransferRelation {
            state,
            incidence_admittance: reflection.v().clone(),
            records,
            policy: *self.policy,
        })
    }
}

#[cfg(test)]
mod test {
    use super::TransferPropagator;
    use crate::{
        eigensolver::{homogeneous, planar::PlanarPolarization},
        linalg::ComplexVector,
        policy::SolverPolicy,
        propagation::{GlobalRelation, Propagator, StackModes},
        wavevector::delta_vector,
    };
    use approx::assert_relative_eq;
    use num_complex::Complex;
    use std::f64::consts::PI;

    fn normal_incidence(n: usize) -> ComplexVector {
        ComplexVector::from_element(n, Complex::from(1e-10))
    }

    #[test]
    fn a_single_interface_reproduces_fresnel() {
        let policy = SolverPolicy::default();
        let kx = normal_incidence(1);
        let modes = StackModes {
            reflection: homogeneous::planar(
                &kx,
                Complex::from(1.),
                Complex::from(1.),
                PlanarPolarization::Te,
                &policy.branch,
            ),
            transmission: homogeneous::planar(
                &kx,
                Complex::from(2.25),
                Complex::from(1.),
                PlanarPolarization::Te,
                &policy.branch,
            ),
            layers: vec![],
            k0: 1.,
        };
        let relation = TransferPropagator::new(&policy).propagate(modes).unwrap();
        let amplitudes = relation.outgoing(&delta_vector(1)).unwrap();
        // r = (n1 - n2) / (n1 + n2), t = 2 n1 / (n1 + n2)
        assert_relative_eq!(amplitudes.reflected[0].re, -0.2, epsilon = 1e-12);
        assert_relative_eq!(amplitudes.transmitted[0].re, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn a_half_wave_layer_is_transparent() {
        let policy = SolverPolicy::default();
        let kx = normal_incidence(1);
        let slab = |eps: f64| {
            homogeneous::planar(
                &kx,
                Complex::from(eps),
                Complex::from(1.),
                PlanarPolarization::Te,
                &policy.branch,
            )
        };
        // n d = λ / 2 with k0 = 2π / λ and λ = 1
        let modes = StackModes {
            reflection: slab(1.),
            transmission: slab(1.),
            layers: vec![(slab(4.), 0.25)],
            k0: 2. * PI,
        };
        let relation = TransferPropagator::new(&policy).propagate(modes).unwrap();
        let amplitudes = relation.outgoing(&delta_vector(1)).unwrap();
        assert_relative_eq!(amplitudes.reflected[0].norm(), 0., epsilon = 1e-9);
        assert_relative_eq!(amplitudes.transmitted[0].norm(), 1., epsilon = 1e-9);
        assert_eq!(relation.records().len(), 1);
    }

    #[test]
    fn very_thick_absorbing_layers_do_not_overflow() {
        let policy = SolverPolicy::default();
        let kx = normal_incidence(1);
        let medium = |eps: Complex<f64>| {
            homogeneous::planar(&kx, eps, Complex::from(1.), PlanarPolarization::Te, &policy.branch)
        };
        let modes = StackModes {
            reflection: medium(Complex::from(1.)),
            transmission: medium(Complex::from(1.)),
            layers: vec![(medium(Complex::new(4., 2.)), 1e6)],
            k0: 2. * PI,
        };
        let relation = TransferPropagator::new(&policy).propagate(modes).unwrap();
        let amplitudes = relation.outgoing(&delta_vector(1)).unwrap();
        assert!(amplitudes.reflected[0].is_finite());
        assert_eq!(amplitudes.transmitted[0], Complex::from(0.));
    }
}
