//! Modes of planar gratings, where TE and TM decouple into scalar problems.

use super::{homogeneous, Degeneracy, LayerEigensolver, LayerModes};
use crate::{
    error::SolverError,
    grating::Layer,
    linalg::{ComplexMatrix, ComplexVector, MatrixOps},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// The two decoupled polarisations of a planar grating
pub(crate) enum PlanarPolarization {
    Te,
    Tm,
}

impl LayerEigensolver<'_> {
    /// TE modes: `s = Sy`, `u = Ux`, eigen-decomposing `M (Kx M⁻¹ Kx − E)`
    pub fn transverse_electric(
        &self,
        kx: &ComplexVector,
        layer: &Layer,
    ) -> Result<(LayerModes, Option<Degeneracy>), SolverError> {
        if let Some((permittivity, permeability)) = layer.uniform_values() {
            return Ok((
                homogeneous::planar(
                    kx,
                    permittivity,
                    permeability,
                    PlanarPolarization::Te,
                    &self.policy().branch,
                ),
                None,
            ));
        }
        let e = layer.permittivity().matrix();
        let (omega_squared, permeability_inverse) = match layer.permeability() {
            None => (
                ComplexMatrix::from_diagonal(&kx.component_mul(kx)) - e,
                None,
            ),
            Some(permeability) => {
                let inverse = permeability.inverse(self.policy(), "permeability matrix")?;
                let inner = inverse.scale_rows(kx).scale_columns(kx) - e;
                (permeability.matrix() * inner, Some(inverse))
            }
        };

        let (q, w, degeneracy) = self.decompose(omega_squared)?;
        let wq = w.scale_columns(&q);
        let v = match permeability_inverse {
            None => wq,
            Some(inverse) => inverse * wq,
        };
        Ok((LayerModes::new(q, w, v), degeneracy))
    }

    /// TM modes: `s = Uy`, `u = Sx`, eigen-decomposing `A⁻¹ (Kx E⁻¹ Kx − M)`
    pub fn transverse_magnetic(
        &self,
        kx: &ComplexVector,
        layer: &Layer,
    ) -> Result<(LayerModes, Option<Degeneracy>), SolverError> {
        if let Some((permittivity, permeability)) = layer.uniform_values() {
            return Ok((
                homogeneous::planar(
                    kx,
                    permittivity,
                    permeability,
                    PlanarPolarization::Tm,
                    &self.policy().branch,
                ),
                None,
            ));
        }
        let reciprocal = layer.reciprocal_permittivity().ok_or_else(|| {
            SolverError::InvalidSpec(
                "TM modes of a patterned layer need the reciprocal permittivity matrix".into(),
            )
        })?;
        let a = reciprocal.matrix();
        let a_inverse = reciprocal.inverse(self.policy(), "reciprocal permittivity matrix")?;
        let e_inverse = layer
            .permittivity()
            .inverse(self.policy(), "permittivity matrix")?;

        let mut inner = e_inverse.scale_rows(kx).scale_columns(kx);
        match layer.permeability() {
            None => {
                for i in 0..inner.nrows() {
                    inner[(i, i)] -= 1.;
                }
            }
            Some(permeability) => inner -= permeability.matrix(),
        }

        let (q, w, degeneracy) = self.decompose(a_inverse * inner)?;
        let v = a * w.scale_columns(&q);
        Ok((LayerModes::new(q, w, v), degeneracy))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        convolution::{ConvolutionMatrix, ConvolutionMatrixBuilder, Profile},
        eigensolver::LayerEigensolver,
        grating::Layer,
        linalg::{ComplexMatrix, ComplexVector, MatrixOps},
        policy::SolverPolicy,
    };
    use approx::assert_relative_eq;
    use num_complex::Complex;

    fn patterned_layer(order: usize) -> Layer {
        let builder = ConvolutionMatrixBuilder::new().with_fourier_order(order);
        let values = (0..20)
            .map(|idx| if idx < 7 { 12.1 } else { 2.25 })
            .collect::<Vec<_>>();
        Layer::from_profile(100., &Profile::from_real_line(&values), &builder).unwrap()
    }

    fn wavevectors(order: usize) -> ComplexVector {
        ComplexVector::from_fn(2 * order + 1, |i, _| {
            Complex::from(0.3 - (i as f64 - order as f64) * 1.2)
        })
    }

    /// Checks the modes solve the first order system `s' = P u`, `u' = Q s` with forward waves
    fn assert_first_order_system(p: &ComplexMatrix, w: &ComplexMatrix, v: &ComplexMatrix, q: &ComplexVector) {
        // for a forward mode s = W e^{-qz}, u = V e^{-qz}, so -W q = P V
        let lhs = -w.scale_columns(q);
        let rhs = p * v;
        assert_relative_eq!((lhs - rhs).norm(), 0., epsilon = 1e-9);
    }

    #[test]
    fn te_modes_satisfy_the_coupled_equations() {
        let order = 4;
        let layer = patterned_layer(order);
        let kx = wavevectors(order);
        let policy = SolverPolicy::default();
        let (modes, _) = LayerEigensolver::new(&policy)
            .transverse_electric(&kx, &layer)
            .unwrap();
        let p = -ComplexMatrix::identity(9, 9);
        assert_first_order_system(&p, modes.w(), modes.v(), modes.q());
    }

    #[test]
    fn tm_modes_satisfy_the_coupled_equations() {
        let order = 4;
        let layer = patterned_layer(order);
        let kx = wavevectors(order);
        let policy = SolverPolicy::default();
        let (modes, _) = LayerEigensolver::new(&policy)
            .transverse_magnetic(&kx, &layer)
            .unwrap();
        let p = -layer
            .reciprocal_permittivity()
            .unwrap()
            .inverse(&policy, "test")
            .unwrap();
        assert_first_order_system(&p, modes.w(), modes.v(), modes.q());
    }

    #[test]
    fn propagation_constants_respect_the_branch() {
        let order = 6;
        let layer = patterned_layer(order);
        let kx = wavevectors(order);
        let policy = SolverPolicy::default();
        let (modes, _) = LayerEigensolver::new(&policy)
            .transverse_electric(&kx, &layer)
            .unwrap();
        for q in modes.q().iter() {
            assert!(q.re >= 0.);
            if q.re.abs() < 1e-8 * q.norm() {
                assert!(q.im <= 0.);
            }
        }
    }

    #[test]
    fn patterned_layers_without_a_reciprocal_matrix_cannot_solve_tm() {
        let matrix = ConvolutionMatrixBuilder::new()
            .with_fourier_order(1)
            .build(&Profile::from_real_line(&[1., 4.]))
            .unwrap();
        let layer = Layer::new(10., matrix).unwrap();
        let policy = SolverPolicy::default();
        let kx = wavevectors(1);
        let solver = LayerEigensolver::new(&policy);
        assert!(solver.transverse_electric(&kx, &layer).is_ok());
        assert!(solver.transverse_magnetic(&kx, &layer).is_err());
    }

    #[test]
    fn homogeneous_layers_skip_the_decomposition() {
        let layer = Layer::new(10., ConvolutionMatrix::uniform(Complex::from(4.), 3)).unwrap();
        let policy = SolverPolicy::default();
        let kx = wavevectors(1);
        let (modes, degeneracy) = LayerEigensolver::new(&policy)
            .transverse_electric(&kx, &layer)
            .unwrap();
        assert!(degeneracy.is_none());
        assert_eq!(modes.w(), &ComplexMatrix::identity(3, 3));
        let expected = policy.branch.propagation_constant(kx[1] * kx[1] - 4.);
        assert_relative_eq!((modes.q()[1] - expected).norm(), 0.);
    }
}
