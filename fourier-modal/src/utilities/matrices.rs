use crate::linalg::ComplexMatrix;

/// Tests for hermiticity of a matrix, relative to its largest element
pub(crate) fn is_hermitian(matrix: &ComplexMatrix) -> bool {
    if !matrix.is_square() {
        return false;
    }
    let scale = largest_element(matrix);
    matrix
        .iter()
        .zip(matrix.transpose().iter())
        .all(|(element, adjoint_element)| {
            (element - adjoint_element.conj()).norm() <= scale * std::f64::EPSILON * 100_f64
        })
}

#[cfg(test)]
/// Tests whether every diagonal of a matrix is constant, so element `[m, n]` depends only on `m - n`
pub(crate) fn is_toeplitz(matrix: &ComplexMatrix) -> bool {
    let scale = largest_element(matrix);
    (1..matrix.nrows()).all(|m| {
        (1..matrix.ncols()).all(|n| {
            (matrix[(m, n)] - matrix[(m - 1, n - 1)]).norm() <= scale * std::f64::EPSILON * 100_f64
        })
    })
}

fn largest_element(matrix: &ComplexMatrix) -> f64 {
    matrix
        .iter()
        .fold(0_f64, |acc, element| acc.max(element.norm()))
        .max(std::f64::MIN_POSITIVE)
}
