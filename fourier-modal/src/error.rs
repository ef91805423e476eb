//! # Error
//!
//! Errors raised by the solve pipeline, and the non-fatal warnings which are
//! attached to a successful result.

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Failures of the solve pipeline
pub enum SolverError {
    /// A matrix which must be inverted is singular or too ill-conditioned to invert safely
    #[error("singular matrix: {context}")]
    #[diagnostic(
        code(fourier_modal::singular_matrix),
        help("singular scattering matrices occur at incidence configurations where a gap or half-space order grazes; perturb the angle or use the transfer method")
    )]
    SingularMatrix {
        /// Which matrix failed, and in which layer or at which incidence
        context: String,
    },
    /// The eigen-decomposition did not converge, or produced non-finite modes
    #[error("eigen-decomposition failed: {context}")]
    #[diagnostic(code(fourier_modal::eigen_decomposition))]
    EigenDecomposition {
        /// The layer in which the failure occurred
        context: String,
    },
    /// The requested combination of grating and algorithm is not implemented
    #[error("unsupported configuration: {0}")]
    #[diagnostic(code(fourier_modal::unsupported_configuration))]
    UnsupportedConfiguration(String),
    /// The grating or layer stack is malformed
    #[error("invalid specification: {0}")]
    #[diagnostic(code(fourier_modal::invalid_spec))]
    InvalidSpec(String),
}

impl SolverError {
    pub(crate) fn singular(context: impl Into<String>) -> Self {
        Self::SingularMatrix {
            context: context.into(),
        }
    }

    pub(crate) fn eigen(context: impl Into<String>) -> Self {
        Self::EigenDecomposition {
            context: context.into(),
        }
    }

    /// Attach additional context, for example the layer index, to a numerical failure
    pub(crate) fn within(self, location: &str) -> Self {
        match self {
            Self::SingularMatrix { context } => Self::SingularMatrix {
                context: format!("{context} ({location})"),
            },
            Self::EigenDecomposition { context } => Self::EigenDecomposition {
                context: format!("{context} ({location})"),
            },
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Events which reduce numerical accuracy but do not prevent a solution
pub enum SolverWarning {
    /// Near-equal eigenvalues were found and separated by a deterministic perturbation
    DegenerateEigenvalues {
        /// Index of the layer in the stack
        layer: usize,
        /// Number of eigenvalue pairs closer than the degeneracy tolerance
        pairs: usize,
        /// The smallest relative separation found
        separation: f64,
    },
    /// Harmonic wavevector components which were exactly zero were replaced by the perturbation
    PerturbedWavevector {
        /// Number of substituted components
        count: usize,
        /// The substituted value
        perturbation: f64,
    },
}

impl std::fmt::Display for SolverWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateEigenvalues {
                layer,
                pairs,
                separation,
            } => write!(
                f,
                "layer {layer}: {pairs} degenerate eigenvalue pairs, minimum separation {separation:e}"
            ),
            Self::PerturbedWavevector {
                count,
                perturbation,
            } => write!(
                f,
                "{count} zero wavevector components replaced by {perturbation:e}"
            ),
        }
    }
}
