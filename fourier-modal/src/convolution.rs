//! # Convolution matrices
//!
//! Fourier factorisation of periodic permittivity and permeability profiles.
//!
//! A profile is supplied as the pixels of one unit cell, as produced by a rasteriser. The
//! pixels are treated as a piecewise-constant function, so the Fourier coefficients are
//! exact at every order rather than aliased:
//!
//! ε_p = F[p mod N] / N · exp(iπp/N) · sinc(πp/N)
//!
//! where `F` is the unnormalised discrete Fourier transform of the pixels with kernel
//! `exp(+2πi p j / N)`. The convolution matrix has element `[m, n] = ε_{m-n}`, where `m` and
//! `n` run over the harmonic orders `-N..=N` in ascending order. In two dimensions the
//! harmonics are flattened row-major with the x order varying fastest.

use crate::{
    error::SolverError,
    linalg::{ComplexMatrix, MatrixOps},
    policy::SolverPolicy,
};
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex;
use num_traits::{One, Zero};
use rustfft::FftPlanner;
use std::f64::consts::PI;

#[derive(Clone, Debug, PartialEq)]
/// The pixels of one period of a scalar material profile
pub enum Profile {
    /// A profile varying only along x
    Line(Array1<Complex<f64>>),
    /// A profile varying along x and y, indexed as `[y, x]`
    Grid(Array2<Complex<f64>>),
}

impl Profile {
    /// A profile with the same value everywhere
    pub fn uniform(value: Complex<f64>) -> Self {
        Self::Line(Array1::from_elem(1, value))
    }

    /// A lossless profile varying along x
    pub fn from_real_line(values: &[f64]) -> Self {
        Self::Line(values.iter().map(|&value| Complex::from(value)).collect())
    }

    /// A lossless two-dimensional profile, indexed as `[y, x]`
    pub fn from_real_grid(values: Array2<f64>) -> Self {
        Self::Grid(values.mapv(Complex::from))
    }

    /// The value of the profile if it is the same at every pixel
    pub fn uniform_value(&self) -> Option<Complex<f64>> {
        let mut pixels = self.pixels();
        let first = *pixels.next()?;
        pixels.all(|&pixel| pixel == first).then(|| first)
    }

    /// The pointwise reciprocal of the profile, used for the inverse factorisation rule
    pub fn reciprocal(&self) -> Result<Self, SolverError> {
        if self.pixels().any(|pixel| pixel.is_zero()) {
            return Err(SolverError::singular(
                "profile has a zero-valued pixel, its reciprocal is undefined",
            ));
        }
        Ok(match self {
            Self::Line(values) => Self::Line(values.mapv(|value| Complex::<f64>::one() / value)),
            Self::Grid(values) => Self::Grid(values.mapv(|value| Complex::<f64>::one() / value)),
        })
    }

    fn pixels(&self) -> Box<dyn Iterator<Item = &Complex<f64>> + '_> {
        match self {
            Self::Line(values) => Box::new(values.iter()),
            Self::Grid(values) => Box::new(values.iter()),
        }
    }

    fn validate(&self) -> Result<(), SolverError> {
        let is_empty = match self {
            Self::Line(values) => values.is_empty(),
            Self::Grid(values) => values.is_empty(),
        };
        if is_empty {
            return Err(SolverError::InvalidSpec("profile has no pixels".into()));
        }
        if !self.pixels().all(|pixel| pixel.is_finite()) {
            return Err(SolverError::InvalidSpec(
                "profile contains non-finite pixels".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// The harmonic basis a convolution matrix is expressed in
pub enum Expansion {
    /// `2N + 1` harmonics along x
    OneDimensional,
    /// `(2N + 1)²` harmonics over x and y
    TwoDimensional,
}

impl Expansion {
    /// The number of harmonics for truncation order `fourier_order`
    pub fn harmonics(&self, fourier_order: usize) -> usize {
        let ff = 2 * fourier_order + 1;
        match self {
            Self::OneDimensional => ff,
            Self::TwoDimensional => ff * ff,
        }
    }
}

/// Builds convolution matrices at a fixed truncation order
pub struct ConvolutionMatrixBuilder<Order> {
    fourier_order: Order,
    expansion: Expansion,
}

impl ConvolutionMatrixBuilder<()> {
    /// A builder for the one-dimensional expansion
    pub fn new() -> Self {
        Self {
            fourier_order: (),
            expansion: Expansion::OneDimensional,
        }
    }
}

impl Default for ConvolutionMatrixBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Order> ConvolutionMatrixBuilder<Order> {
    /// Sets the truncation order `N`
    pub fn with_fourier_order(self, fourier_order: usize) -> ConvolutionMatrixBuilder<usize> {
        ConvolutionMatrixBuilder {
            fourier_order,
            expansion: self.expansion,
        }
    }

    /// Sets the harmonic basis
    pub fn with_expansion(self, expansion: Expansion) -> Self {
        Self {
            fourier_order: self.fourier_order,
            expansion,
        }
    }
}

impl ConvolutionMatrixBuilder<usize> {
    /// The convolution matrix of `profile`
    pub fn build(&self, profile: &Profile) -> Result<ConvolutionMatrix, SolverError> {
        profile.validate()?;
        let harmonics = self.expansion.harmonics(self.fourier_order);
        if let Some(value) = profile.uniform_value() {
            return Ok(ConvolutionMatrix::uniform(value, harmonics));
        }
        let matrix = match (self.expansion, profile) {
            (Expansion::OneDimensional, Profile::Line(values)) => {
                self.toeplitz_1d(values.view())
            }
            (Expansion::OneDimensional, Profile::Grid(values)) => {
                if values.nrows() != 1 {
                    return Err(SolverError::InvalidSpec(format!(
                        "a one-dimensional grating needs a line profile, found a {} x {} grid",
                        values.nrows(),
                        values.ncols()
                    )));
                }
                self.toeplitz_1d(values.row(0))
            }
            (Expansion::TwoDimensional, Profile::Line(values)) => {
                let grid = values
                    .clone()
                    .into_shape((1, values.len()))
                    .map_err(|e| SolverError::InvalidSpec(e.to_string()))?;
                self.toeplitz_2d(&grid)
            }
            (Expansion::TwoDimensional, Profile::Grid(values)) => self.toeplitz_2d(values),
        };
        Ok(ConvolutionMatrix {
            matrix,
            uniform: None,
        })
    }

    /// The convolution matrix of `1 / profile`, whose inverse applies Li's inverse rule
    pub fn build_reciprocal(&self, profile: &Profile) -> Result<ConvolutionMatrix, SolverError> {
        profile.validate()?;
        self.build(&profile.reciprocal()?)
    }

    fn toeplitz_1d(&self, values: ArrayView1<Complex<f64>>) -> ComplexMatrix {
        let coefficients = pixel_coefficients(&inverse_dft(values.to_vec()), 2 * self.fourier_order);
        let ff = 2 * self.fourier_order + 1;
        ComplexMatrix::from_fn(ff, ff, |m, n| {
            coefficients[offset(m as isize - n as isize, self.fourier_order)]
        })
    }

    fn toeplitz_2d(&self, values: &Array2<Complex<f64>>) -> ComplexMatrix {
        let (ny, nx) = values.dim();
        let transformed = inverse_dft_2d(values);
        let reach = 2 * self.fourier_order;
        let form_x = form_factors(nx, reach);
        let form_y = form_factors(ny, reach);
        let normalisation = (nx * ny) as f64;
        let coefficient = |p: isize, q: isize| -> Complex<f64> {
            let column = p.rem_euclid(nx as isize) as usize;
            let row = q.rem_euclid(ny as isize) as usize;
            transformed[[row, column]] / normalisation
                * form_x[offset(p, self.fourier_order)]
                * form_y[offset(q, self.fourier_order)]
        };
        let ff = 2 * self.fourier_order + 1;
        ComplexMatrix::from_fn(ff * ff, ff * ff, |row, column| {
            let (row_y, row_x) = ((row / ff) as isize, (row % ff) as isize);
            let (column_y, column_x) = ((column / ff) as isize, (column % ff) as isize);
            coefficient(row_x - column_x, row_y - column_y)
        })
    }
}

/// Index of coefficient `p` in a table running from `-2N` to `2N`
fn offset(p: isize, fourier_order: usize) -> usize {
    (p + 2 * fourier_order as isize) as usize
}

/// The unnormalised transform `F[k] = Σ_j x_j exp(+2πi k j / n)`
fn inverse_dft(mut buffer: Vec<Complex<f64>>) -> Vec<Complex<f64>> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_inverse(buffer.len());
    fft.process(&mut buffer);
    buffer
}

fn inverse_dft_2d(values: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let mut out = values.to_owned();
    for mut row in out.rows_mut() {
        let transformed = inverse_dft(row.to_vec());
        row.assign(&ArrayView1::from(&transformed[..]));
    }
    for mut column in out.columns_mut() {
        let transformed = inverse_dft(column.to_vec());
        column.assign(&ArrayView1::from(&transformed[..]));
    }
    out
}

/// Pixel form factors `exp(iπp/n) sinc(πp/n)` for `p` in `-reach..=reach`
fn form_factors(n: usize, reach: usize) -> Vec<Complex<f64>> {
    (-(reach as isize)..=reach as isize)
        .map(|p| {
            if p == 0 {
                return Complex::<f64>::one();
            }
            let phase = PI * p as f64 / n as f64;
            Complex::from_polar(phase.sin() / phase, phase)
        })
        .collect()
}

/// Fourier coefficients `ε_p` for `p` in `-reach..=reach` from the transformed pixels
fn pixel_coefficients(transformed: &[Complex<f64>], reach: usize) -> Vec<Complex<f64>> {
    let n = transformed.len();
    form_factors(n, reach)
        .into_iter()
        .zip(-(reach as isize)..=reach as isize)
        .map(|(form, p)| transformed[p.rem_euclid(n as isize) as usize] / n as f64 * form)
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
/// The Fourier-domain operator representing multiplication by a periodic profile
pub struct ConvolutionMatrix {
    matrix: ComplexMatrix,
    uniform: Option<Complex<f64>>,
}

impl ConvolutionMatrix {
    /// The scaled identity representing a homogeneous medium
    pub fn uniform(value: Complex<f64>, harmonics: usize) -> Self {
        Self {
            matrix: ComplexMatrix::identity(harmonics, harmonics) * value,
            uniform: Some(value),
        }
    }

    /// Wraps a precomputed convolution matrix
    pub fn from_matrix(matrix: ComplexMatrix) -> Result<Self, SolverError> {
        if !matrix.is_square() {
            return Err(SolverError::InvalidSpec(format!(
                "convolution matrices must be square, found {} x {}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        Ok(Self {
            matrix,
            uniform: None,
        })
    }

    /// The dense matrix
    pub fn matrix(&self) -> &ComplexMatrix {
        &self.matrix
    }

    /// The profile value when the profile is homogeneous
    pub fn uniform_value(&self) -> Option<Complex<f64>> {
        self.uniform
    }

    /// The number of harmonics the matrix acts on
    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    /// Whether the matrix is Hermitian, which holds for real lossless profiles
    pub fn is_hermitian(&self) -> bool {
        crate::utilities::matrices::is_hermitian(&self.matrix)
    }

    /// The inverse matrix, which is a reported error when the profile is singular
    pub fn inverse(&self, policy: &SolverPolicy, context: &str) -> Result<ComplexMatrix, SolverError> {
        match self.uniform {
            Some(value) if value.is_zero() => Err(SolverError::singular(format!(
                "{context} is a zero-valued homogeneous medium"
            ))),
            Some(value) => Ok(ComplexMatrix::identity(self.dimension(), self.dimension())
                * (Complex::<f64>::one() / value)),
            None => self.matrix.invert(policy, context),
        }
    }
}
