//! Modes of conical and two-dimensional gratings, where both polarisations couple.
//!
//! With `s = [Sx, Sy]` and `u = [Ux, Uy]` the coupling matrices are
//!
//! P = [[Kx E⁻¹ Ky, M − Kx E⁻¹ Kx], [Ky E⁻¹ Ky − M, −Ky E⁻¹ Kx]]
//!
//! Q = [[Kx M⁻¹ Ky, E − Kx M⁻¹ Kx], [Ky M⁻¹ Ky − A⁻¹, −Ky M⁻¹ Kx]]
//!
//! The normal field `Ez` is divided by `E` following Laurent's rule, while the `Ex` term
//! of `Uy'` uses the inverse rule through `A⁻¹`, as the normal component of the
//! displacement is continuous across the x interfaces of a lamellar profile.

use super::{homogeneous, Degeneracy, LayerEigensolver, LayerModes};
use crate::{
    error::SolverError,
    grating::Layer,
    linalg::{block, identity, ComplexMatrix, ComplexVector, MatrixOps},
    policy::SolverPolicy,
};
use num_complex::Complex;
use num_traits::Zero;
use std::cmp::Ordering;

impl LayerEigensolver<'_> {
    /// Coupled-polarisation modes, eigen-decomposing `P Q` and taking `V = −Q W q⁻¹`.
    ///
    /// The modes are returned in two families of equal size, ranked by the weight of the
    /// `Sx` block in each eigenvector.
    pub fn vector(
        &self,
        kx: &ComplexVector,
        ky: &ComplexVector,
        layer: &Layer,
    ) -> Result<(LayerModes, Option<Degeneracy>), SolverError> {
        if let Some((permittivity, permeability)) = layer.uniform_values() {
            return Ok((
                homogeneous::vector(kx, ky, permittivity, permeability, &self.policy().branch)?,
                None,
            ));
        }
        let n = kx.len();
        let (p, q_matrix) = coupling_matrices(kx, ky, layer, self.policy())?;
        let (q, w, degeneracy) = self.decompose(&p * &q_matrix)?;
        if let Some(mode) = q.iter().position(|q| q.is_zero()) {
            return Err(SolverError::singular(format!(
                "mode {mode} has a vanishing propagation constant"
            )));
        }
        let v = -(q_matrix * w.scale_columns(&q.map(|q| Complex::from(1.) / q)));

        let order = family_order(&w, n);
        let q = ComplexVector::from_iterator(2 * n, order.iter().map(|&k| q[k]));
        let w = w.select_columns(order.iter());
        let v = v.select_columns(order.iter());
        Ok((LayerModes::new(q, w, v).with_families(n), degeneracy))
    }
}

/// The coupling matrices `P` and `Q` of a patterned layer
pub(crate) fn coupling_matrices(
    kx: &ComplexVector,
    ky: &ComplexVector,
    layer: &Layer,
    policy: &SolverPolicy,
) -> Result<(ComplexMatrix, ComplexMatrix), SolverError> {
    let n = kx.len();
    let e = layer.permittivity();
    let e_inverse = e.inverse(policy, "permittivity matrix")?;
    let a_inverse = layer
        .reciprocal_permittivity()
        .ok_or_else(|| {
            SolverError::InvalidSpec(
                "coupled modes of a patterned layer need the reciprocal permittivity matrix"
                    .into(),
            )
        })?
        .inverse(policy, "reciprocal permittivity matrix")?;
    let (m, m_inverse) = match layer.permeability() {
        None => (identity(n), identity(n)),
        Some(permeability) => (
            permeability.matrix().clone(),
            permeability.inverse(policy, "permeability matrix")?,
        ),
    };

    // K_left X K_right for diagonal wavevector matrices
    let sandwich = |matrix: &ComplexMatrix, left: &ComplexVector, right: &ComplexVector| {
        matrix.scale_rows(left).scale_columns(right)
    };

    let p = block(
        &sandwich(&e_inverse, kx, ky),
        &(&m - sandwich(&e_inverse, kx, kx)),
        &(sandwich(&e_inverse, ky, ky) - &m),
        &-sandwich(&e_inverse, ky, kx),
    );
    let q = block(
        &sandwich(&m_inverse, kx, ky),
        &(e.matrix() - sandwich(&m_inverse, kx, kx)),
        &(sandwich(&m_inverse, ky, ky) - a_inverse),
        &-sandwich(&m_inverse, ky, kx),
    );
    Ok((p, q))
}

/// Column order placing the `n` eigenvectors with the largest `Sx` weight first
fn family_order(w: &ComplexMatrix, n: usize) -> Vec<usize> {
    let weights = w
        .column_iter()
        .map(|column| column.rows(0, n).norm_squared())
        .collect::<Vec<_>>();
    let mut order = (0..w.ncols()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        weights[b]
            .partial_cmp(&weights[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}
