use super::GratingKind;
use crate::{
    convolution::{ConvolutionMatrix, ConvolutionMatrixBuilder, Profile},
    error::SolverError,
};
use num_complex::Complex;

#[derive(Clone, Debug)]
/// A single patterned or homogeneous layer
pub struct Layer {
    thickness: f64,
    permittivity: ConvolutionMatrix,
    reciprocal_permittivity: Option<ConvolutionMatrix>,
    permeability: Option<ConvolutionMatrix>,
}

impl Layer {
    /// A layer described by its permittivity convolution matrix alone.
    ///
    /// Such a layer can only be used for TE planar gratings unless it is homogeneous, as
    /// every other formulation needs the reciprocal permittivity.
    pub fn new(thickness: f64, permittivity: ConvolutionMatrix) -> Result<Self, SolverError> {
        if !(thickness.is_finite() && thickness >= 0.) {
            return Err(SolverError::InvalidSpec(format!(
                "layer thickness must be finite and non-negative, found {thickness}"
            )));
        }
        Ok(Self {
            thickness,
            permittivity,
            reciprocal_permittivity: None,
            permeability: None,
        })
    }

    /// Attaches the convolution matrix of the reciprocal permittivity
    pub fn with_reciprocal_permittivity(
        mut self,
        reciprocal: ConvolutionMatrix,
    ) -> Result<Self, SolverError> {
        self.check_dimension(&reciprocal, "reciprocal permittivity")?;
        self.reciprocal_permittivity = Some(reciprocal);
        Ok(self)
    }

    /// Attaches the convolution matrix of a magnetic permeability profile
    pub fn with_permeability(mut self, permeability: ConvolutionMatrix) -> Result<Self, SolverError> {
        self.check_dimension(&permeability, "permeability")?;
        self.permeability = Some(permeability);
        Ok(self)
    }

    /// Builds both permittivity convolution matrices from a sampled profile
    pub fn from_profile(
        thickness: f64,
        profile: &Profile,
        builder: &ConvolutionMatrixBuilder<usize>,
    ) -> Result<Self, SolverError> {
        Self::new(thickness, builder.build(profile)?)?
            .with_reciprocal_permittivity(builder.build_reciprocal(profile)?)
    }

    /// The layer thickness
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// The permittivity convolution matrix `E`
    pub fn permittivity(&self) -> &ConvolutionMatrix {
        &self.permittivity
    }

    /// The convolution matrix `A` of the reciprocal permittivity, if supplied
    pub fn reciprocal_permittivity(&self) -> Option<&ConvolutionMatrix> {
        self.reciprocal_permittivity.as_ref()
    }

    /// The permeability convolution matrix `M`, absent for non-magnetic layers
    pub fn permeability(&self) -> Option<&ConvolutionMatrix> {
        self.permeability.as_ref()
    }

    /// The number of harmonics the layer is expanded in
    pub fn dimension(&self) -> usize {
        self.permittivity.dimension()
    }

    /// The permittivity and permeability when the layer is homogeneous
    pub fn uniform_values(&self) -> Option<(Complex<f64>, Complex<f64>)> {
        let permittivity = self.permittivity.uniform_value()?;
        let permeability = match &self.permeability {
            Some(permeability) => permeability.uniform_value()?,
            None => Complex::from(1.),
        };
        Some((permittivity, permeability))
    }

    fn check_dimension(&self, other: &ConvolutionMatrix, name: &str) -> Result<(), SolverError> {
        if other.dimension() != self.dimension() {
            return Err(SolverError::InvalidSpec(format!(
                "{name} matrix has dimension {}, the permittivity has {}",
                other.dimension(),
                self.dimension()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
/// The ordered layers between the incidence and transmission half-spaces, top first
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    /// A stack from layers ordered from the incidence side
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Builds a stack from sampled permittivity profiles
    pub fn from_profiles(
        thicknesses: &[f64],
        profiles: &[Profile],
        fourier_order: usize,
        kind: GratingKind,
    ) -> Result<Self, SolverError> {
        if thicknesses.len() != profiles.len() {
            return Err(SolverError::InvalidSpec(format!(
                "{} thicknesses were given for {} layer profiles",
                thicknesses.len(),
                profiles.len()
            )));
        }
        let builder = ConvolutionMatrixBuilder::new()
            .with_fourier_order(fourier_order)
            .with_expansion(kind.expansion());
        let layers = thicknesses
            .iter()
            .zip(profiles)
            .enumerate()
            .map(|(index, (&thickness, profile))| {
                Layer::from_profile(thickness, profile, &builder)
                    .map_err(|e| e.within(&format!("layer {index}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { layers })
    }

    /// The layers, top first
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Iterates the layers, top first
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    /// The number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the stack has no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The same layers in the opposite order
    pub fn reversed(&self) -> Self {
        Self {
            layers: self.layers.iter().rev().cloned().collect(),
        }
    }

    /// Checks every layer is expanded in `harmonics` harmonics
    pub(crate) fn validate(&self, harmonics: usize) -> Result<(), SolverError> {
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.dimension() != harmonics {
                return Err(SolverError::InvalidSpec(format!(
                    "layer {index} is expanded in {} harmonics, the grating retains {harmonics}",
                    layer.dimension()
                )));
            }
        }
        Ok(())
    }
}
