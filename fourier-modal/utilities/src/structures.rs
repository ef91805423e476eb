//! Canonical structures shared by the tests and benchmarks.

use fourier_modal::{
    GratingKind, GratingSpec, LayerStack, Period, Polarization, Profile, SolverError,
};
use ndarray::{Array1, Array2};
use num_complex::Complex;

/// A binary line profile, filled with `inside` over the first `fill` fraction of the period
pub fn lamellar_profile(pixels: usize, fill: f64, inside: f64, outside: f64) -> Profile {
    let filled = (fill * pixels as f64).round() as usize;
    Profile::Line(Array1::from_shape_fn(pixels, |idx| {
        Complex::from(if idx < filled { inside } else { outside })
    }))
}

/// A square pillar of side `fill` periods in the corner of the cell
pub fn pillar_profile(pixels: usize, fill: f64, inside: f64, outside: f64) -> Profile {
    let filled = (fill * pixels as f64).round() as usize;
    Profile::Grid(Array2::from_shape_fn((pixels, pixels), |(y, x)| {
        Complex::from(if x < filled && y < filled {
            inside
        } else {
            outside
        })
    }))
}

/// The silicon lamellar grating on glass used throughout the test suite
pub fn lamellar_grating(
    kind: GratingKind,
    fourier_order: usize,
    polarization: Polarization,
) -> Result<(GratingSpec, LayerStack), SolverError> {
    let (theta, phi) = match kind {
        GratingKind::OneDimensional => (10., 0.),
        _ => (10., 30.),
    };
    let period = match kind {
        GratingKind::TwoDimensional => Period::lattice(700., 700.),
        _ => Period::line(700.),
    };
    let spec = GratingSpec::builder()
        .with_kind(kind)
        .with_period(period)
        .with_wavelength(900.)
        .with_fourier_order(fourier_order)
        .with_angles(theta, phi)
        .with_polarization(polarization)
        .with_media(1., Complex::from(1.45))
        .build()?;
    let profile = match kind {
        GratingKind::TwoDimensional => pillar_profile(64, 0.5, 12.1, 1.),
        _ => lamellar_profile(700, 0.5, 12.1, 1.),
    };
    let stack = LayerStack::from_profiles(&[460.], &[profile], fourier_order, kind)?;
    Ok((spec, stack))
}
