//! # Field reconstruction
//!
//! Rebuilds the electromagnetic field inside the layers from the transfer recursion.
//!
//! Starting from the forward amplitudes `c⁺ = T₁` at the top of the stack, each layer
//! contributes backward amplitudes `c⁻ = b a⁻¹ X c⁺` referenced to its bottom interface,
//! and hands `a⁻¹ X c⁺` to the layer below. At a depth `z` inside the layer
//!
//! s = W (e^{−k0 q z} c⁺ + e^{−k0 q (d − z)} c⁻), u = V (e^{−k0 q z} c⁺ − e^{−k0 q (d − z)} c⁻)
//!
//! and the harmonics are summed as `Σ_n a_n exp(i k0 (kx_n x + ky_n y))` over one period.
//! Magnetic components are returned in units of `E / η0`.

use crate::{
    error::SolverError,
    formulation::Formulation,
    grating::{GratingSpec, LayerStack},
    linalg::ComplexVector,
    policy::SolverPolicy,
    propagation::transfer::{LayerRecord, TransferRelation},
};
use ndarray::{s, Array1, Array2, Array4, ArrayView3};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
/// A cartesian field component
pub enum FieldComponent {
    /// Electric field along x
    Ex,
    /// Electric field along y
    Ey,
    /// Electric field along z
    Ez,
    /// Magnetic field along x
    Hx,
    /// Magnetic field along y
    Hy,
    /// Magnetic field along z
    Hz,
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
/// The number of samples along each axis of the unit cell
pub struct Resolution {
    /// Samples per period along x
    pub x: usize,
    /// Samples per period along y
    pub y: usize,
    /// Samples per layer along z
    pub z: usize,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            x: 100,
            y: 1,
            z: 100,
        }
    }
}

#[derive(Clone, Debug)]
/// The sampled field in one unit cell of the stack
pub struct FieldCell {
    data: Array4<Complex<f64>>,
    components: Vec<FieldComponent>,
    samples_per_layer: usize,
}

impl FieldCell {
    /// The field indexed as `[depth, y, x, component]`
    pub fn data(&self) -> &Array4<Complex<f64>> {
        &self.data
    }

    /// The components stored along the last axis
    pub fn components(&self) -> &[FieldComponent] {
        &self.components
    }

    /// A single component indexed as `[depth, y, x]`
    pub fn component(&self, component: FieldComponent) -> Option<ArrayView3<'_, Complex<f64>>> {
        let idx = self.components.iter().position(|&c| c == component)?;
        Some(self.data.slice(s![.., .., .., idx]))
    }

    /// The depth samples belonging to layer `layer`
    pub fn layer_depths(&self, layer: usize) -> std::ops::Range<usize> {
        layer * self.samples_per_layer..(layer + 1) * self.samples_per_layer
    }

    /// Consumes the cell, returning the raw array
    pub fn into_inner(self) -> Array4<Complex<f64>> {
        self.data
    }
}

/// Samples the internal field of a stack solved with the transfer recursion
pub(crate) struct FieldReconstructor<'a, F> {
    formulation: &'a F,
    policy: &'a SolverPolicy,
    k0: f64,
    extent: (f64, f64),
}

impl<'a, F: Formulation> FieldReconstructor<'a, F> {
    /// One-dimensional gratings are sampled over a square cell of side `Λx`
    pub(crate) fn new(formulation: &'a F, spec: &GratingSpec, policy: &'a SolverPolicy) -> Self {
        let period = spec.period();
        Self {
            formulation,
            policy,
            k0: spec.k0(),
            extent: (period.x, period.y.unwrap_or(period.x)),
        }
    }

    #[tracing::instrument(name = "Field Reconstruction", skip_all)]
    pub(crate) fn reconstruct(
        &self,
        stack: &LayerStack,
        relation: &TransferRelation,
        incident: &ComplexVector,
        resolution: Resolution,
    ) -> Result<FieldCell, SolverError> {
        if resolution.x == 0 || resolution.y == 0 || resolution.z == 0 {
            return Err(SolverError::InvalidSpec(format!(
                "field resolution must be positive along every axis, found {resolution:?}"
            )));
        }
        if stack.len() != relation.records().len() {
            return Err(SolverError::InvalidSpec(format!(
                "the solution describes {} layers, the stack has {}",
                relation.records().len(),
                stack.len()
            )));
        }

        let components = self.formulation.field_components();
        let phases = self.lateral_phases(resolution);
        let mut data = Array4::zeros((
            stack.len() * resolution.z,
            resolution.y,
            resolution.x,
            components.len(),
        ));

        let mut forward = relation.top_amplitudes(incident)?;
        for (index, (layer, record)) in stack.iter().zip(relation.records()).enumerate() {
            tracing::trace!("Reconstructing layer {index}");
            let (backward, next) = record.descend(&forward);
            for k in 0..resolution.z {
                let depth = record.thickness() * k as f64 / resolution.z as f64;
                let (s, u) = modal_fields(record, &forward, &backward, self.k0 * depth, self.k0, self.policy);
                let harmonics = self
                    .formulation
                    .field_harmonics(layer, &s, &u)
                    .map_err(|e| e.within(&format!("layer {index}")))?;
                for (c, amplitudes) in harmonics.iter().enumerate() {
                    let values = phases.dot(&Array1::from_iter(amplitudes.iter().copied()));
                    for (idx, value) in values.iter().enumerate() {
                        data[[index * resolution.z + k, idx / resolution.x, idx % resolution.x, c]] =
                            *value;
                    }
                }
            }
            forward = next;
        }

        Ok(FieldCell {
            data,
            components: components.to_vec(),
            samples_per_layer: resolution.z,
        })
    }

    /// `exp(i k0 (kx_n x + ky_n y))` with rows indexing the lateral samples, x fastest
    fn lateral_phases(&self, resolution: Resolution) -> Array2<Complex<f64>> {
        let wavevectors = self.formulation.wavevectors();
        let (kx, ky) = (wavevectors.kx(), wavevectors.ky());
        let (width, height) = self.extent;
        Array2::from_shape_fn(
            (resolution.y * resolution.x, wavevectors.len()),
            |(sample, n)| {
                let x = (sample % resolution.x) as f64 * width / resolution.x as f64;
                let y = (sample / resolution.x) as f64 * height / resolution.y as f64;
                Complex::new(0., self.k0 * (kx[n] * x + ky[n] * y)).exp()
            },
        )
    }
}

/// The modal fields `(s, u)` at normalised depth `depth` below the top of a layer
pub(crate) fn modal_fields(
    record: &LayerRecord,
    forward: &ComplexVector,
    backward: &ComplexVector,
    depth: f64,
    k0: f64,
    policy: &SolverPolicy,
) -> (ComplexVector, ComplexVector) {
    let modes = record.modes();
    let remaining = k0 * record.thickness() - depth;
    let down = modes
        .exponentials(depth, policy)
        .component_mul(forward);
    let up = modes
        .exponentials(remaining, policy)
        .component_mul(backward);
    (modes.w() * (&down + &up), modes.v() * (down - up))
}
