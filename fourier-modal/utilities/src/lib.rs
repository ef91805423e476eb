pub mod structures;

use fourier_modal::Profile;
use num_complex::Complex;
use rand::{thread_rng, Rng};

/// A line profile of `pixels` samples with random lossless permittivities in `[1, max)`
pub fn random_line_profile(pixels: usize, max: f64) -> Profile {
    let mut rng = thread_rng();
    Profile::Line(
        (0..pixels)
            .map(|_| Complex::from(rng.gen_range(1.0..max)))
            .collect(),
    )
}
