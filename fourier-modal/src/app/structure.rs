//! The structure file read by the binary.
//!
//! Each layer is described by a background permittivity and a list of rectangular
//! blocks, positioned in fractions of the period, which are rasterised onto a regular
//! pixel grid before the Fourier transform.

use super::ApplicationError;
use crate::{
    convolution::Profile,
    error::SolverError,
    grating::{GratingKind, GratingSpec, LayerStack, Period, Polarization},
};
use config::{Config, File};
use ndarray::{Array1, Array2};
use num_complex::Complex;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PolarizationKind {
    Te,
    Tm,
    Linear,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Structure {
    kind: GratingKind,
    /// `[Λx]` or `[Λx, Λy]`
    period: Vec<f64>,
    fourier_order: usize,
    wavelengths: Vec<f64>,
    #[serde(default)]
    theta: f64,
    #[serde(default)]
    phi: f64,
    polarization: PolarizationKind,
    /// Degrees from the TM direction, read for linear polarisation only
    #[serde(default)]
    polarization_angle: f64,
    #[serde(default = "unit_index")]
    incidence_index: f64,
    #[serde(default = "unit_complex_index")]
    transmission_index: [f64; 2],
    #[serde(default)]
    layers: Vec<LayerDescription>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LayerDescription {
    thickness: f64,
    #[serde(default = "default_pixels")]
    pixels: usize,
    #[serde(default = "single_pixel")]
    pixels_y: usize,
    /// Real and imaginary parts of the permittivity outside every block
    background: [f64; 2],
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Block {
    /// Extent along x as fractions of the period
    x: [f64; 2],
    #[serde(default = "full_cell")]
    y: [f64; 2],
    permittivity: [f64; 2],
}

fn unit_index() -> f64 {
    1.
}

fn unit_complex_index() -> [f64; 2] {
    [1., 0.]
}

fn default_pixels() -> usize {
    512
}

fn single_pixel() -> usize {
    1
}

fn full_cell() -> [f64; 2] {
    [0., 1.]
}

impl Structure {
    pub(crate) fn build(path: PathBuf) -> Result<Self, ApplicationError> {
        let s = Config::builder().add_source(File::from(path)).build()?;
        Ok(s.try_deserialize()?)
    }

    pub(crate) fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// The grating at the first wavelength of the sweep
    pub(crate) fn grating_spec(&self) -> Result<GratingSpec, ApplicationError> {
        let wavelength = *self
            .wavelengths
            .first()
            .ok_or_else(|| ApplicationError::Structure("no wavelengths were given".into()))?;
        let period = match self.period.as_slice() {
            [x] => Period::line(*x),
            [x, y] => Period::lattice(*x, *y),
            other => {
                return Err(ApplicationError::Structure(format!(
                    "the period takes one or two values, found {}",
                    other.len()
                )))
            }
        };
        let polarization = match self.polarization {
            PolarizationKind::Te => Polarization::Te,
            PolarizationKind::Tm => Polarization::Tm,
            PolarizationKind::Linear => Polarization::Linear {
                psi: self.polarization_angle.to_radians(),
            },
        };
        Ok(GratingSpec::builder()
            .with_kind(self.kind)
            .with_period(period)
            .with_wavelength(wavelength)
            .with_fourier_order(self.fourier_order)
            .with_angles(self.theta, self.phi)
            .with_polarization(polarization)
            .with_media(
                self.incidence_index,
                Complex::new(self.transmission_index[0], self.transmission_index[1]),
            )
            .build()?)
    }

    /// Rasterises every layer and builds its convolution matrices
    pub(crate) fn layer_stack(&self, kind: GratingKind) -> Result<LayerStack, SolverError> {
        let thicknesses = self
            .layers
            .iter()
            .map(|layer| layer.thickness)
            .collect::<Vec<_>>();
        let profiles = self
            .layers
            .iter()
            .map(|layer| layer.profile(kind))
            .collect::<Vec<_>>();
        LayerStack::from_profiles(&thicknesses, &profiles, self.fourier_order, kind)
    }
}

impl LayerDescription {
    fn profile(&self, kind: GratingKind) -> Profile {
        let background = Complex::new(self.background[0], self.background[1]);
        let value_at = |x: f64, y: f64| {
            self.blocks
                .iter()
                .rev()
                .find(|block| {
                    (block.x[0]..block.x[1]).contains(&x) && (block.y[0]..block.y[1]).contains(&y)
                })
                .map(|block| Complex::new(block.permittivity[0], block.permittivity[1]))
                .unwrap_or(background)
        };
        let centre = |idx: usize, count: usize| (idx as f64 + 0.5) / count as f64;
        match kind {
            GratingKind::TwoDimensional => {
                Profile::Grid(Array2::from_shape_fn((self.pixels_y, self.pixels), |(y, x)| {
                    value_at(centre(x, self.pixels), centre(y, self.pixels_y))
                }))
            }
            _ => Profile::Line(Array1::from_shape_fn(self.pixels, |x| {
                value_at(centre(x, self.pixels), 0.5)
            })),
        }
    }
}
