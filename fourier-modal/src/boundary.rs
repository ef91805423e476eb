//! # Boundary matching
//!
//! Converts the tangential amplitudes leaving the stack into diffraction efficiencies.
//!
//! The power carried along `z` by a plane wave of tangential amplitude `a` in a medium of
//! permeability `μ` is proportional to `|a|² Re(kz / μ)`. Normalising by the incident power
//! gives
//!
//! R_m = |r_m|² Re(kz_I,m / ξ_I) / Re(kz_inc / ξ_I), T_m = |t_m|² Re(kz_II,m / ξ_II) / Re(kz_inc / ξ_I)
//!
//! where `ξ = μ` when the amplitudes are electric fields and `ξ = ε` when they are the
//! magnetic field of a TM wave. In the vector formulations the longitudinal components
//! follow from `∇·E = 0` and enter `|r_m|²` and `|t_m|²`.

use crate::{
    error::{SolverError, SolverWarning},
    grating::GratingKind,
    linalg::ComplexVector,
    propagation::{BoundaryAmplitudes, GlobalRelation},
};
use ndarray::{Array1, Array2};
use num_complex::Complex;

#[derive(Clone, Debug)]
/// Efficiencies of every retained diffraction order
pub struct DiffractionResult {
    kind: GratingKind,
    orders: Vec<(i32, i32)>,
    reflection: Array1<f64>,
    transmission: Array1<f64>,
    warnings: Vec<SolverWarning>,
}

impl DiffractionResult {
    /// The order `(m_x, m_y)` of each entry, ascending with x fastest
    pub fn orders(&self) -> &[(i32, i32)] {
        &self.orders
    }

    /// Reflection efficiencies
    pub fn reflection(&self) -> &Array1<f64> {
        &self.reflection
    }

    /// Transmission efficiencies
    pub fn transmission(&self) -> &Array1<f64> {
        &self.transmission
    }

    /// The total reflected power
    pub fn total_reflection(&self) -> f64 {
        self.reflection.sum()
    }

    /// The total transmitted power
    pub fn total_transmission(&self) -> f64 {
        self.transmission.sum()
    }

    /// The reflection and transmission efficiency of a single order
    pub fn order(&self, mx: i32, my: i32) -> Option<(f64, f64)> {
        self.orders
            .iter()
            .position(|&order| order == (mx, my))
            .map(|idx| (self.reflection[idx], self.transmission[idx]))
    }

    /// Reflection efficiencies of a two-dimensional grating indexed as `[m_y + N, m_x + N]`
    pub fn reflection_grid(&self) -> Option<Array2<f64>> {
        self.as_grid(&self.reflection)
    }

    /// Transmission efficiencies of a two-dimensional grating indexed as `[m_y + N, m_x + N]`
    pub fn transmission_grid(&self) -> Option<Array2<f64>> {
        self.as_grid(&self.transmission)
    }

    /// Accuracy warnings raised during the solve
    pub fn warnings(&self) -> &[SolverWarning] {
        &self.warnings
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<SolverWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    fn as_grid(&self, values: &Array1<f64>) -> Option<Array2<f64>> {
        if self.kind != GratingKind::TwoDimensional {
            return None;
        }
        let ff = (values.len() as f64).sqrt().round() as usize;
        values.clone().into_shape((ff, ff)).ok()
    }
}

#[derive(Clone, Debug)]
enum Matching {
    /// The amplitudes are a single scalar field per harmonic
    Scalar,
    /// The amplitudes are `[Sx, Sy]`, the normal component is recovered from `∇·E = 0`
    Vector {
        kx: ComplexVector,
        ky: ComplexVector,
        kz_reflection: ComplexVector,
        kz_transmission: ComplexVector,
    },
}

/// Weights the outgoing amplitudes by the power flux of each order
#[derive(Clone, Debug)]
pub struct BoundaryMatcher {
    kind: GratingKind,
    orders: Vec<(i32, i32)>,
    matching: Matching,
    reflection_weights: Array1<f64>,
    transmission_weights: Array1<f64>,
}

impl BoundaryMatcher {
    /// A matcher for planar gratings, where `reflection_divisor` and
    /// `transmission_divisor` are the half-space `ξ`, and `kz_incident` is the normal
    /// component of the incident wavevector
    pub fn scalar(
        kind: GratingKind,
        orders: Vec<(i32, i32)>,
        kz_reflection: &ComplexVector,
        kz_transmission: &ComplexVector,
        reflection_divisor: Complex<f64>,
        transmission_divisor: Complex<f64>,
        kz_incident: f64,
    ) -> Self {
        let incident_flux = (Complex::from(kz_incident) / reflection_divisor).re;
        Self {
            kind,
            orders,
            matching: Matching::Scalar,
            reflection_weights: flux_weights(kz_reflection, reflection_divisor, incident_flux),
            transmission_weights: flux_weights(kz_transmission, transmission_divisor, incident_flux),
        }
    }

    /// A matcher for conical and two-dimensional gratings between non-magnetic half-spaces
    pub fn vector(
        kind: GratingKind,
        orders: Vec<(i32, i32)>,
        kx: ComplexVector,
        ky: ComplexVector,
        kz_reflection: ComplexVector,
        kz_transmission: ComplexVector,
        kz_incident: f64,
    ) -> Self {
        let unit = Complex::from(1.);
        Self {
            kind,
            orders,
            reflection_weights: flux_weights(&kz_reflection, unit, kz_incident),
            transmission_weights: flux_weights(&kz_transmission, unit, kz_incident),
            matching: Matching::Vector {
                kx,
                ky,
                kz_reflection,
                kz_transmission,
            },
        }
    }

    /// Solves the global relation for `incident` and weights the outgoing amplitudes
    pub fn match_relation<R: GlobalRelation>(
        &self,
        relation: &R,
        incident: &ComplexVector,
    ) -> Result<(DiffractionResult, BoundaryAmplitudes), SolverError> {
        let amplitudes = relation.outgoing(incident)?;
        let (reflection, transmission) = self.efficiencies(&amplitudes);
        if !reflection.iter().chain(transmission.iter()).all(|e| e.is_finite()) {
            return Err(SolverError::singular(
                "outgoing amplitudes are not finite".to_string(),
            ));
        }
        Ok((
            DiffractionResult {
                kind: self.kind,
                orders: self.orders.clone(),
                reflection,
                transmission,
                warnings: Vec::new(),
            },
            amplitudes,
        ))
    }

    /// Per-order reflection and transmission efficiencies
    pub fn efficiencies(&self, amplitudes: &BoundaryAmplitudes) -> (Array1<f64>, Array1<f64>) {
        let (reflected, transmitted) = match &self.matching {
            Matching::Scalar => (
                amplitudes.reflected.map(|a| a.norm_sqr()),
                amplitudes.transmitted.map(|a| a.norm_sqr()),
            ),
            Matching::Vector {
                kx,
                ky,
                kz_reflection,
                kz_transmission,
            } => (
                vector_intensity(&amplitudes.reflected, kx, ky, kz_reflection, 1.),
                vector_intensity(&amplitudes.transmitted, kx, ky, kz_transmission, -1.),
            ),
        };
        (
            Array1::from_iter(
                reflected
                    .iter()
                    .zip(self.reflection_weights.iter())
                    .map(|(intensity, weight)| intensity * weight),
            ),
            Array1::from_iter(
                transmitted
                    .iter()
                    .zip(self.transmission_weights.iter())
                    .map(|(intensity, weight)| intensity * weight),
            ),
        )
    }
}

/// `Re(kz / ξ) / incident_flux` for every order
fn flux_weights(kz: &ComplexVector, divisor: Complex<f64>, incident_flux: f64) -> Array1<f64> {
    kz.iter().map(|kz| (kz / divisor).re / incident_flux).collect()
}

/// `|a_x|² + |a_y|² + |a_z|²` for tangential amplitudes `[a_x, a_y]`, with
/// `a_z = sign (kx a_x + ky a_y) / kz` where `sign` is `+1` for reflected waves
/// travelling toward `−z` and `−1` for transmitted waves.
fn vector_intensity(
    amplitudes: &ComplexVector,
    kx: &ComplexVector,
    ky: &ComplexVector,
    kz: &ComplexVector,
    sign: f64,
) -> nalgebra::DVector<f64> {
    let n = kx.len();
    nalgebra::DVector::from_fn(n, |m, _| {
        let (ax, ay) = (amplitudes[m], amplitudes[m + n]);
        let az = (kx[m] * ax + ky[m] * ay) / kz[m] * sign;
        ax.norm_sqr() + ay.norm_sqr() + az.norm_sqr()
    })
}
