//! # Grating
//!
//! The description of a periodic structure and the plane wave illuminating it.
//!
//! A [`GratingSpec`] fixes everything which is shared by every layer in a solve: the
//! dimensionality of the grating, its period, the truncation order, the wavelength, the
//! incidence angles and the two half-spaces. The layers themselves live in a
//! [`LayerStack`]. Lengths carry no units, but the wavelength, the periods and the layer
//! thicknesses must all be expressed in the same one.

mod layer;

pub use layer::{Layer, LayerStack};

use crate::{convolution::Expansion, error::SolverError};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::f64::consts::PI;

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// The dimensionality of the grating and of the incident plane
pub enum GratingKind {
    /// Periodic along x, with the plane of incidence containing x
    OneDimensional,
    /// Periodic along x, with an arbitrary azimuth of the plane of incidence
    Conical,
    /// Periodic along x and y
    TwoDimensional,
}

impl GratingKind {
    /// The harmonic basis convolution matrices must be built in
    pub fn expansion(&self) -> Expansion {
        match self {
            Self::OneDimensional | Self::Conical => Expansion::OneDimensional,
            Self::TwoDimensional => Expansion::TwoDimensional,
        }
    }

    /// The number of retained harmonics at truncation order `fourier_order`
    pub fn harmonics(&self, fourier_order: usize) -> usize {
        self.expansion().harmonics(fourier_order)
    }
}

impl TryFrom<u8> for GratingKind {
    type Error = SolverError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::OneDimensional),
            1 => Ok(Self::Conical),
            2 => Ok(Self::TwoDimensional),
            _ => Err(SolverError::InvalidSpec(format!(
                "grating type must be 0, 1 or 2, found {value}"
            ))),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
/// Polarisation of the incident plane wave
pub enum Polarization {
    /// Electric field normal to the plane of incidence
    Te,
    /// Magnetic field normal to the plane of incidence
    Tm,
    /// A linear combination, `psi` (radians) is measured from the TM direction
    Linear {
        /// Polarisation angle
        psi: f64,
    },
}

impl Polarization {
    /// The polarisation angle in radians
    pub fn psi(&self) -> f64 {
        match self {
            Self::Te => PI / 2.,
            Self::Tm => 0.,
            Self::Linear { psi } => *psi,
        }
    }

    /// Amplitude of the TE component of the incident field
    pub fn te_amplitude(&self) -> f64 {
        match self {
            Self::Te => 1.,
            Self::Tm => 0.,
            Self::Linear { psi } => psi.sin(),
        }
    }

    /// Amplitude of the TM component of the incident field
    pub fn tm_amplitude(&self) -> f64 {
        match self {
            Self::Te => 0.,
            Self::Tm => 1.,
            Self::Linear { psi } => psi.cos(),
        }
    }
}

impl TryFrom<u8> for Polarization {
    type Error = SolverError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Te),
            1 => Ok(Self::Tm),
            _ => Err(SolverError::InvalidSpec(format!(
                "polarisation must be 0 (TE) or 1 (TM), found {value}"
            ))),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq)]
/// Direction of the incident plane wave, in radians
pub struct Incidence {
    /// Polar angle measured from the surface normal
    pub theta: f64,
    /// Azimuth of the plane of incidence measured from the x axis
    pub phi: f64,
}

impl Incidence {
    /// Incidence along the surface normal
    pub fn normal() -> Self {
        Self { theta: 0., phi: 0. }
    }

    /// Incidence from angles in degrees
    pub fn from_degrees(theta: f64, phi: f64) -> Self {
        Self {
            theta: theta.to_radians(),
            phi: phi.to_radians(),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq)]
/// The lattice period of the grating
pub struct Period {
    /// Period along x
    pub x: f64,
    /// Period along y, required for two-dimensional gratings
    pub y: Option<f64>,
}

impl Period {
    /// A grating periodic along x only
    pub fn line(x: f64) -> Self {
        Self { x, y: None }
    }

    /// A grating periodic along x and y
    pub fn lattice(x: f64, y: f64) -> Self {
        Self { x, y: Some(y) }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// An immutable description of a grating and its illumination
pub struct GratingSpec {
    kind: GratingKind,
    period: Period,
    fourier_order: usize,
    wavelength: f64,
    incidence: Incidence,
    polarization: Polarization,
    incidence_index: f64,
    transmission_index: Complex<f64>,
}

impl GratingSpec {
    /// Creates a new builder
    pub fn builder() -> GratingSpecBuilder<(), (), ()> {
        GratingSpecBuilder::new()
    }

    /// The grating dimensionality
    pub fn kind(&self) -> GratingKind {
        self.kind
    }

    /// The lattice period
    pub fn period(&self) -> Period {
        self.period
    }

    /// The truncation order `N`
    pub fn fourier_order(&self) -> usize {
        self.fourier_order
    }

    /// The number of retained harmonics
    pub fn harmonics(&self) -> usize {
        self.kind.harmonics(self.fourier_order)
    }

    /// The free-space wavelength
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// The free-space wavevector `2π / λ`
    pub fn k0(&self) -> f64 {
        2. * PI / self.wavelength
    }

    /// The direction of the incident wave
    pub fn incidence(&self) -> Incidence {
        self.incidence
    }

    /// The polarisation of the incident wave
    pub fn polarization(&self) -> Polarization {
        self.polarization
    }

    /// The refractive index of the incidence half-space
    pub fn incidence_index(&self) -> f64 {
        self.incidence_index
    }

    /// The refractive index of the transmission half-space
    pub fn transmission_index(&self) -> Complex<f64> {
        self.transmission_index
    }

    /// The relative permittivity of the incidence half-space
    pub fn incidence_permittivity(&self) -> Complex<f64> {
        Complex::from(self.incidence_index.powi(2))
    }

    /// The relative permittivity of the transmission half-space
    pub fn transmission_permittivity(&self) -> Complex<f64> {
        self.transmission_index.powi(2)
    }

    /// The same grating illuminated at another wavelength
    pub fn at_wavelength(&self, wavelength: f64) -> Result<Self, SolverError> {
        let spec = Self {
            wavelength,
            ..self.clone()
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), SolverError> {
        let positive = |value: f64, name: &str| {
            if value.is_finite() && value > 0. {
                Ok(())
            } else {
                Err(SolverError::InvalidSpec(format!(
                    "{name} must be finite and positive, found {value}"
                )))
            }
        };
        positive(self.wavelength, "wavelength")?;
        positive(self.period.x, "period along x")?;
        positive(self.incidence_index, "incidence index")?;
        match (self.kind, self.period.y) {
            (GratingKind::TwoDimensional, Some(y)) => positive(y, "period along y")?,
            (GratingKind::TwoDimensional, None) => {
                return Err(SolverError::InvalidSpec(
                    "a two-dimensional grating needs a period along y".into(),
                ))
            }
            _ => {}
        }

        if !self.transmission_index.is_finite() || self.transmission_index.re <= 0. {
            return Err(SolverError::InvalidSpec(format!(
                "transmission index must be finite with a positive real part, found {}",
                self.transmission_index
            )));
        }
        if self.transmission_index.im < 0. {
            return Err(SolverError::InvalidSpec(format!(
                "transmission index {} describes a gain medium",
                self.transmission_index
            )));
        }

        let Incidence { theta, phi } = self.incidence;
        if !(theta.is_finite() && (0. ..PI / 2.).contains(&theta)) {
            return Err(SolverError::InvalidSpec(format!(
                "polar angle must lie in [0°, 90°), found {}°",
                theta.to_degrees()
            )));
        }
        if !phi.is_finite() {
            return Err(SolverError::InvalidSpec("azimuth is not finite".into()));
        }

        match (self.kind, self.polarization) {
            (GratingKind::OneDimensional, Polarization::Linear { .. }) => {
                return Err(SolverError::InvalidSpec(
                    "a one-dimensional grating in classical mounting needs TE or TM polarisation, use a conical grating for mixed polarisation".into(),
                ))
            }
            (_, Polarization::Linear { psi }) if !psi.is_finite() => {
                return Err(SolverError::InvalidSpec(
                    "polarisation angle is not finite".into(),
                ))
            }
            _ => {}
        }
        if self.kind == GratingKind::OneDimensional && phi != 0. {
            return Err(SolverError::InvalidSpec(format!(
                "a one-dimensional grating in classical mounting needs zero azimuth, found {}°, use a conical grating instead",
                phi.to_degrees()
            )));
        }
        Ok(())
    }
}

/// Builds a [`GratingSpec`]. The kind, period and wavelength are required.
pub struct GratingSpecBuilder<Kind, Per, Wavelength> {
    kind: Kind,
    period: Per,
    wavelength: Wavelength,
    fourier_order: usize,
    incidence: Incidence,
    polarization: Polarization,
    incidence_index: f64,
    transmission_index: Complex<f64>,
}

impl GratingSpecBuilder<(), (), ()> {
    fn new() -> Self {
        Self {
            kind: (),
            period: (),
            wavelength: (),
            fourier_order: 0,
            incidence: Incidence::normal(),
            polarization: Polarization::Te,
            incidence_index: 1.,
            transmission_index: Complex::from(1.),
        }
    }
}

impl<Kind, Per, Wavelength> GratingSpecBuilder<Kind, Per, Wavelength> {
    /// Sets the grating dimensionality
    pub fn with_kind(self, kind: GratingKind) -> GratingSpecBuilder<GratingKind, Per, Wavelength> {
        GratingSpecBuilder {
            kind,
            period: self.period,
            wavelength: self.wavelength,
            fourier_order: self.fourier_order,
            incidence: self.incidence,
            polarization: self.polarization,
            incidence_index: self.incidence_index,
            transmission_index: self.transmission_index,
        }
    }

    /// Sets the lattice period
    pub fn with_period(self, period: Period) -> GratingSpecBuilder<Kind, Period, Wavelength> {
        GratingSpecBuilder {
            kind: self.kind,
            period,
            wavelength: self.wavelength,
            fourier_order: self.fourier_order,
            incidence: self.incidence,
            polarization: self.polarization,
            incidence_index: self.incidence_index,
            transmission_index: self.transmission_index,
        }
    }

    /// Sets the free-space wavelength
    pub fn with_wavelength(self, wavelength: f64) -> GratingSpecBuilder<Kind, Per, f64> {
        GratingSpecBuilder {
            kind: self.kind,
            period: self.period,
            wavelength,
            fourier_order: self.fourier_order,
            incidence: self.incidence,
            polarization: self.polarization,
            incidence_index: self.incidence_index,
            transmission_index: self.transmission_index,
        }
    }

    /// Sets the truncation order `N`
    pub fn with_fourier_order(mut self, fourier_order: usize) -> Self {
        self.fourier_order = fourier_order;
        self
    }

    /// Sets the polar and azimuthal angles of incidence, in degrees
    pub fn with_angles(mut self, theta: f64, phi: f64) -> Self {
        self.incidence = Incidence::from_degrees(theta, phi);
        self
    }

    /// Sets the polarisation
    pub fn with_polarization(mut self, polarization: Polarization) -> Self {
        self.polarization = polarization;
        self
    }

    /// Sets the polarisation angle in degrees, measured from the TM direction
    pub fn with_polarization_angle(mut self, psi: f64) -> Self {
        self.polarization = Polarization::Linear {
            psi: psi.to_radians(),
        };
        self
    }

    /// Sets the refractive indices of the incidence and transmission half-spaces
    pub fn with_media(mut self, incidence_index: f64, transmission_index: Complex<f64>) -> Self {
        self.incidence_index = incidence_index;
        self.transmission_index = transmission_index;
        self
    }
}

impl GratingSpecBuilder<GratingKind, Period, f64> {
    /// Validates and assembles the description
    pub fn build(self) -> Result<GratingSpec, SolverError> {
        let spec = GratingSpec {
            kind: self.kind,
            period: self.period,
            fourier_order: self.fourier_order,
            wavelength: self.wavelength,
            incidence: self.incidence,
            polarization: self.polarization,
            incidence_index: self.incidence_index,
            transmission_index: self.transmission_index,
        };
        spec.validate()?;
        Ok(spec)
    }
}
