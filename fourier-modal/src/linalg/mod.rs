//! # Linear algebra
//!
//! The dense complex matrix capability the solver is written against. Every inversion,
//! eigen-decomposition and diagonal product in the pipeline goes through [`MatrixOps`] or
//! [`eigen::eigendecompose`], so the numerical backend is confined to this module.

pub(crate) mod eigen;

pub use eigen::{eigendecompose, Eigendecomposition};

use crate::{error::SolverError, policy::SolverPolicy};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;

/// A dense complex matrix
pub type ComplexMatrix = DMatrix<Complex<f64>>;
/// A dense complex column vector
pub type ComplexVector = DVector<Complex<f64>>;

/// Operations on dense complex matrices which can fail numerically
pub trait MatrixOps: Sized {
    /// The inverse, refused when the matrix is singular or its condition estimate exceeds the policy
    fn invert(&self, policy: &SolverPolicy, context: &str) -> Result<Self, SolverError>;
    /// Solves `self * x = rhs`
    fn solve(
        &self,
        rhs: &ComplexMatrix,
        policy: &SolverPolicy,
        context: &str,
    ) -> Result<ComplexMatrix, SolverError>;
    /// The maximum absolute column sum
    fn one_norm(&self) -> f64;
    /// Whether every element is finite
    fn all_finite(&self) -> bool;
    /// Computes `diag(d) * self`, scaling row `i` by `d[i]`
    fn scale_rows(&self, d: &ComplexVector) -> Self;
    /// Computes `self * diag(d)`, scaling column `j` by `d[j]`
    fn scale_columns(&self, d: &ComplexVector) -> Self;
}

impl MatrixOps for ComplexMatrix {
    fn invert(&self, policy: &SolverPolicy, context: &str) -> Result<Self, SolverError> {
        if !self.all_finite() {
            return Err(SolverError::singular(format!(
                "{context} contains non-finite elements"
            )));
        }
        let inverse = self
            .clone()
            .try_inverse()
            .ok_or_else(|| SolverError::singular(format!("{context} is not invertible")))?;
        if !inverse.all_finite() {
            return Err(SolverError::singular(format!(
                "inverse of {context} is not finite"
            )));
        }
        let condition = self.one_norm() * inverse.one_norm();
        if condition > policy.maximum_condition_number {
            return Err(SolverError::singular(format!(
                "{context} is ill-conditioned (condition estimate {condition:e})"
            )));
        }
        Ok(inverse)
    }

    fn solve(
        &self,
        rhs: &ComplexMatrix,
        policy: &SolverPolicy,
        context: &str,
    ) -> Result<ComplexMatrix, SolverError> {
        Ok(self.invert(policy, context)? * rhs)
    }

    fn one_norm(&self) -> f64 {
        self.column_iter()
            .map(|column| column.iter().map(|element| element.norm()).sum::<f64>())
            .fold(0_f64, f64::max)
    }

    fn all_finite(&self) -> bool {
        self.iter().all(|element| element.is_finite())
    }

    fn scale_rows(&self, d: &ComplexVector) -> Self {
        DMatrix::from_fn(self.nrows(), self.ncols(), |i, j| d[i] * self[(i, j)])
    }

    fn scale_columns(&self, d: &ComplexVector) -> Self {
        DMatrix::from_fn(self.nrows(), self.ncols(), |i, j| self[(i, j)] * d[j])
    }
}

/// Assembles a square matrix from four equally sized square blocks
pub(crate) fn block(
    top_left: &ComplexMatrix,
    top_right: &ComplexMatrix,
    bottom_left: &ComplexMatrix,
    bottom_right: &ComplexMatrix,
) -> ComplexMatrix {
    let n = top_left.nrows();
    let mut out = ComplexMatrix::zeros(2 * n, 2 * n);
    out.slice_mut((0, 0), (n, n)).copy_from(top_left);
    out.slice_mut((0, n), (n, n)).copy_from(top_right);
    out.slice_mut((n, 0), (n, n)).copy_from(bottom_left);
    out.slice_mut((n, n), (n, n)).copy_from(bottom_right);
    out
}

/// Stacks two vectors of equal length
pub(crate) fn stack(top: &ComplexVector, bottom: &ComplexVector) -> ComplexVector {
    ComplexVector::from_iterator(
        top.len() + bottom.len(),
        top.iter().chain(bottom.iter()).copied(),
    )
}

/// The complex identity of dimension `n`
pub(crate) fn identity(n: usize) -> ComplexMatrix {
    ComplexMatrix::identity(n, n)
}

#[cfg(test)]
mod test {
    use super::{block, ComplexMatrix, ComplexVector, MatrixOps};
    use crate::{error::SolverError, policy::SolverPolicy};
    use approx::assert_relative_eq;
    use num_complex::Complex;

    #[test]
    fn inverse_of_a_well_conditioned_matrix_is_accepted() {
        let matrix = ComplexMatrix::from_row_slice(
            2,
            2,
            &[
                Complex::new(2., 1.),
                Complex::new(1., 0.),
                Complex::new(0., -1.),
                Complex::new(3., 0.),
            ],
        );
        let inverse = matrix.invert(&SolverPolicy::default(), "test").unwrap();
        let product = &matrix * &inverse;
        assert_relative_eq!(
            (product - ComplexMatrix::identity(2, 2)).norm(),
            0_f64,
            epsilon = 1e-14
        );
    }

    #[test]
    fn singular_matrices_are_reported() {
        let matrix = ComplexMatrix::from_element(3, 3, Complex::new(1., 0.));
        let result = matrix.invert(&SolverPolicy::default(), "rank one");
        assert!(matches!(result, Err(SolverError::SingularMatrix { .. })));
    }

    #[test]
    fn nearly_singular_matrices_are_reported() {
        let mut matrix = ComplexMatrix::identity(2, 2);
        matrix[(1, 1)] = Complex::new(1e-16, 0.);
        let result = matrix.invert(&SolverPolicy::default(), "nearly singular");
        assert!(matches!(result, Err(SolverError::SingularMatrix { .. })));
    }

    #[test]
    fn diagonal_scaling_matches_dense_products() {
        let matrix = ComplexMatrix::from_fn(3, 3, |i, j| Complex::new(i as f64, j as f64 + 1.));
        let d = ComplexVector::from_fn(3, |i, _| Complex::new(1., i as f64));
        let diagonal = ComplexMatrix::from_diagonal(&d);
        assert_relative_eq!(
            (matrix.scale_rows(&d) - &diagonal * &matrix).norm(),
            0_f64,
            epsilon = 1e-14
        );
        assert_relative_eq!(
            (matrix.scale_columns(&d) - &matrix * &diagonal).norm(),
            0_f64,
            epsilon = 1e-14
        );
    }

    #[test]
    fn blocks_are_placed_in_quadrants() {
        let a = ComplexMatrix::from_element(2, 2, Complex::new(1., 0.));
        let b = ComplexMatrix::from_element(2, 2, Complex::new(2., 0.));
        let c = ComplexMatrix::from_element(2, 2, Complex::new(3., 0.));
        let d = ComplexMatrix::from_element(2, 2, Complex::new(4., 0.));
        let assembled = block(&a, &b, &c, &d);
        assert_eq!(assembled[(0, 0)], Complex::new(1., 0.));
        assert_eq!(assembled[(1, 3)], Complex::new(2., 0.));
        assert_eq!(assembled[(3, 0)], Complex::new(3., 0.));
        assert_eq!(assembled[(3, 3)], Complex::new(4., 0.));
    }
}
