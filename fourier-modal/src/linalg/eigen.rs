//! Eigen-decomposition of general complex matrices.
//!
//! The matrix is reduced to complex Schur form `A = Z T Z^H`. The eigenvalues are the
//! diagonal of the upper-triangular factor `T`, and the eigenvectors of `T` follow from
//! back-substitution on `(T - λ_k I) x = 0` with `x_k = 1`. They are mapped back through
//! `Z` and normalised. nalgebra only returns eigenvectors for Hermitian matrices, so the
//! general case is recovered from the Schur factor here.
//!
//! When two eigenvalues coincide the back-substitution pivot `T_ii - λ_k` vanishes. A
//! deterministic perturbation, proportional to the degeneracy tolerance and the scale of
//! `T`, replaces any pivot smaller than itself. The eigenvector matrix built this way is
//! `Z` times a unit upper-triangular matrix, so it stays invertible.

use super::{ComplexMatrix, ComplexVector};
use crate::{error::SolverError, policy::SolverPolicy};
use nalgebra::Schur;
use num_complex::Complex;
use num_traits::{One, Zero};

/// Partial solutions larger than this are rescaled during back-substitution
const RESCALE_THRESHOLD: f64 = 1e150;

#[derive(Clone, Debug)]
/// Eigenvalues and unit-norm eigenvectors, stored as columns
pub struct Eigendecomposition {
    /// The eigenvalues, in the order produced by the Schur reduction
    pub eigenvalues: ComplexVector,
    /// Column `k` is the eigenvector of `eigenvalues[k]`
    pub eigenvectors: ComplexMatrix,
    /// Number of eigenvalue pairs closer than the degeneracy tolerance
    pub degenerate_pairs: usize,
    /// The smallest relative separation between two eigenvalues
    pub minimum_separation: f64,
}

/// Decomposes a square complex matrix into eigenvalues and eigenvectors
pub fn eigendecompose(
    matrix: ComplexMatrix,
    policy: &SolverPolicy,
) -> Result<Eigendecomposition, SolverError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(SolverError::eigen(format!(
            "matrix is not square ({} x {})",
            n,
            matrix.ncols()
        )));
    }
    if !matrix.iter().all(|element| element.is_finite()) {
        return Err(SolverError::eigen("matrix contains non-finite elements"));
    }

    let schur = Schur::try_new(matrix, f64::EPSILON, policy.maximum_schur_iterations)
        .ok_or_else(|| {
            SolverError::eigen(format!(
                "Schur iteration did not converge within {} sweeps",
                policy.maximum_schur_iterations
            ))
        })?;
    let (z, t) = schur.unpack();

    let eigenvalues = t.diagonal();
    let scale = t
        .iter()
        .fold(0_f64, |acc, element| acc.max(element.norm()))
        .max(f64::MIN_POSITIVE);

    let (degenerate_pairs, minimum_separation) =
        degeneracy(&eigenvalues, scale, policy.degeneracy_tolerance);

    let smallest_pivot = (policy.degeneracy_tolerance * scale).max(f64::MIN_POSITIVE);
    let mut eigenvectors = ComplexMatrix::zeros(n, n);
    for k in 0..n {
        let lambda = t[(k, k)];
        let mut x = ComplexVector::zeros(n);
        x[k] = Complex::<f64>::one();
        for i in (0..k).rev() {
            let numerator = ((i + 1)..=k)
                .fold(Complex::<f64>::zero(), |acc, j| acc + t[(i, j)] * x[j]);
            let mut pivot = t[(i, i)] - lambda;
            if pivot.norm() < smallest_pivot {
                pivot = Complex::new(smallest_pivot, 0_f64);
            }
            x[i] = -numerator / pivot;
            let magnitude = x[i].norm();
            if magnitude > RESCALE_THRESHOLD {
                for element in x.iter_mut() {
                    *element /= magnitude;
                }
            }
        }
        let vector = &z * x;
        let norm = vector.norm();
        if !norm.is_finite() || norm == 0_f64 {
            return Err(SolverError::eigen(format!(
                "eigenvector {k} could not be normalised"
            )));
        }
        eigenvectors.set_column(k, &(vector / Complex::from(norm)));
    }

    if !eigenvalues.iter().all(|element| element.is_finite()) {
        return Err(SolverError::eigen("non-finite eigenvalues"));
    }

    Ok(Eigendecomposition {
        eigenvalues,
        eigenvectors,
        degenerate_pairs,
        minimum_separation,
    })
}

/// Counts eigenvalue pairs separated by less than `tolerance * scale`
fn degeneracy(eigenvalues: &ComplexVector, scale: f64, tolerance: f64) -> (usize, f64) {
    let mut pairs = 0;
    let mut minimum = f64::INFINITY;
    for (i, a) in eigenvalues.iter().enumerate() {
        for b in eigenvalues.iter().skip(i + 1) {
            let separation = (a - b).norm() / scale;
            minimum = minimum.min(separation);
            if separation < tolerance {
                pairs += 1;
            }
        }
    }
    (pairs, minimum)
}

#[cfg(test)]
mod test {
    use super::eigendecompose;
    use crate::{
        linalg::{ComplexMatrix, MatrixOps},
        policy::SolverPolicy,
    };
    use approx::assert_relative_eq;
    use num_complex::Complex;

    fn test_matrix(n: usize) -> ComplexMatrix {
        ComplexMatrix::from_fn(n, n, |i, j| {
            let x = (i * 7 + j * 3) as f64;
            Complex::new((0.37 * x).sin() + if i == j { i as f64 } else { 0. }, (0.11 * x).cos())
        })
    }

    #[test]
    fn eigenpairs_satisfy_the_eigenvalue_equation() {
        let matrix = test_matrix(12);
        let decomposition = eigendecompose(matrix.clone(), &SolverPolicy::default()).unwrap();
        for (k, lambda) in decomposition.eigenvalues.iter().enumerate() {
            let v = decomposition.eigenvectors.column(k);
            let residual = &matrix * v - v * *lambda;
            assert_relative_eq!(residual.norm(), 0_f64, epsilon = 1e-10);
        }
    }

    #[test]
    fn triangular_matrix_eigenvalues_are_its_diagonal() {
        let matrix = ComplexMatrix::from_row_slice(
            2,
            2,
            &[
                Complex::new(2., 0.),
                Complex::new(1., 0.),
                Complex::new(0., 0.),
                Complex::new(3., 0.),
            ],
        );
        let decomposition = eigendecompose(matrix, &SolverPolicy::default()).unwrap();
        let mut values = decomposition
            .eigenvalues
            .iter()
            .map(|value| value.re)
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(values[0], 2_f64, epsilon = 1e-12);
        assert_relative_eq!(values[1], 3_f64, epsilon = 1e-12);
        assert_eq!(decomposition.degenerate_pairs, 0);
    }

    #[test]
    fn degenerate_spectra_are_counted_and_eigenvectors_stay_independent() {
        let mut matrix = ComplexMatrix::identity(4, 4);
        matrix[(3, 3)] = Complex::new(2., 0.);
        let decomposition = eigendecompose(matrix, &SolverPolicy::default()).unwrap();
        // three equal eigenvalues form three pairs
        assert_eq!(decomposition.degenerate_pairs, 3);
        assert!(decomposition
            .eigenvectors
            .invert(&SolverPolicy::default(), "eigenvectors")
            .is_ok());
    }
}
