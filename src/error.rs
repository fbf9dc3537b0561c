//! Error types for optimization, mixture-model and operator routines.

use std::fmt;

/// Result type used throughout the crate.
pub type OptimResult<T> = Result<T, OptimError>;

/// Errors that can occur in iterative solvers, the mixture model and operators.
#[derive(Debug, Clone)]
pub enum OptimError {
    /// Unknown convergence criterion name.
    UnsupportedCriterion { criterion: String },

    /// Mixture weights with a negative entry or a non-positive sum.
    InvalidWeights { message: String },

    /// Operand shapes (or list lengths) are incompatible.
    ShapeMismatch {
        expected: String,
        got: String,
        context: String,
    },

    /// The Anderson linear system could not be solved.
    SingularSystem { context: String },

    /// Explicitly unsupported configuration.
    NotImplemented { feature: String },

    /// Invalid parameter value.
    InvalidParameter { parameter: String, message: String },

    /// Error from underlying numr operation.
    NumrError(String),
}

impl OptimError {
    pub(crate) fn shape_mismatch(
        context: impl Into<String>,
        expected: impl fmt::Debug,
        got: impl fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
            context: context.into(),
        }
    }

    pub(crate) fn invalid_parameter(
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for OptimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedCriterion { criterion } => {
                write!(
                    f,
                    "Unsupported convergence criterion '{}' (expected 'residual' or 'cost')",
                    criterion
                )
            }
            Self::InvalidWeights { message } => {
                write!(f, "Invalid mixture weights: {}", message)
            }
            Self::ShapeMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "Shape mismatch in {}: expected {}, got {}",
                    context, expected, got
                )
            }
            Self::SingularSystem { context } => {
                write!(f, "Singular linear system in {}", context)
            }
            Self::NotImplemented { feature } => {
                write!(f, "Not implemented: {}", feature)
            }
            Self::InvalidParameter { parameter, message } => {
                write!(f, "Invalid parameter '{}': {}", parameter, message)
            }
            Self::NumrError(msg) => {
                write!(f, "numr error: {}", msg)
            }
        }
    }
}

impl std::error::Error for OptimError {}

impl From<numr::error::Error> for OptimError {
    fn from(err: numr::error::Error) -> Self {
        Self::NumrError(err.to_string())
    }
}
