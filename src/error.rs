//! Error types for flux recovery and error estimation.
use crate::quadrature::QuadratureError;
use fluxrec_sparse::cg::SolveError;
use fluxrec_sparse::OperatorError;
use std::error::Error;
use std::fmt;

/// Errors reported by projectors, estimators and indicator accumulators.
///
/// Every variant is fatal for the call that produced it. Non-convergence of the projection
/// solver is *not* an error: it is reported through
/// [`SolveStatus`](crate::estimator::SolveStatus) instead.
#[derive(Debug)]
#[non_exhaustive]
pub enum EstimatorError {
    /// The output buffer does not have the size of the smooth space's true dofs.
    OutputSizeMismatch { expected: usize, actual: usize },
    /// The input field does not have the size of the primal space's true dofs.
    InputSizeMismatch { expected: usize, actual: usize },
    /// The output size is not a positive integer multiple of the input size.
    UnevenBlocking { input: usize, output: usize },
    /// Component-wise projection of complex-valued fields is not implemented.
    UnsupportedComplexBlocks { vdim: usize },
    InvalidSettings(String),
    InvalidMaterial(String),
    MissingMaterial { attribute: usize },
    /// The finite element spaces handed to a constructor do not fit together.
    SpaceMismatch(String),
    Assembly(eyre::Report),
    Operator(OperatorError),
    Solver(SolveError<f64>),
    Quadrature(QuadratureError),
    IndicatorSizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputSizeMismatch { expected, actual } => {
                write!(f, "Invalid output size {} for flux projection (expected {})", actual, expected)
            }
            Self::InputSizeMismatch { expected, actual } => {
                write!(f, "Invalid input size {} (expected {})", actual, expected)
            }
            Self::UnevenBlocking { input, output } => write!(
                f,
                "Output size {} is not a positive multiple of input size {}, does not yield even blocking",
                output, input
            ),
            Self::UnsupportedComplexBlocks { vdim } => write!(
                f,
                "Flux projection with {} components is not implemented for complex-valued fields",
                vdim
            ),
            Self::InvalidSettings(msg) => write!(f, "Invalid solver settings: {}", msg),
            Self::InvalidMaterial(msg) => write!(f, "Invalid material: {}", msg),
            Self::MissingMaterial { attribute } => {
                write!(f, "No material is defined for element attribute {}", attribute)
            }
            Self::SpaceMismatch(msg) => write!(f, "Incompatible finite element spaces: {}", msg),
            Self::Assembly(err) => write!(f, "Operator assembly failed: {}", err),
            Self::Operator(err) => write!(f, "Error applying operator: {}", err),
            Self::Solver(err) => write!(f, "Projection solve failed: {}", err),
            Self::Quadrature(err) => write!(f, "Quadrature unavailable: {}", err),
            Self::IndicatorSizeMismatch { expected, actual } => write!(
                f,
                "Error indicator contribution has {} entries, but the accumulator holds {}",
                actual, expected
            ),
        }
    }
}

impl Error for EstimatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Assembly(err) => Some(&**err),
            Self::Operator(err) => Some(&**err),
            Self::Solver(err) => Some(err),
            Self::Quadrature(err) => Some(err),
            _ => None,
        }
    }
}

impl From<eyre::Report> for EstimatorError {
    fn from(err: eyre::Report) -> Self {
        Self::Assembly(err)
    }
}

impl From<QuadratureError> for EstimatorError {
    fn from(err: QuadratureError) -> Self {
        Self::Quadrature(err)
    }
}
