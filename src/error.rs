use thiserror::Error;

use crate::parameters::bounds::BoundsError;

/// Error types for the stonefit-rs library.
#[derive(Error, Debug)]
pub enum BindingError {
    /// The mass-balance residual has the same sign at both ends of `[0, Rtot]`,
    /// so no free-receptor concentration in range satisfies it.
    #[error("No physical solution: f(0) = {f_lower:e} and f(Rtot) = {f_upper:e} share a sign")]
    NoPhysicalSolution { f_lower: f64, f_upper: f64 },

    /// A power or product left the representable range of `f64`.
    #[error("Floating-point overflow evaluating {0}")]
    Overflow(String),

    /// The bracketed root finder ran out of iterations.
    #[error("Root finder did not converge after {iterations} iterations")]
    RootNotConverged { iterations: usize },

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Error for invalid parameter values or arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during derived computations (normalization, statistics).
    #[error("Computation error: {0}")]
    InvalidComputation(String),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    /// A dataset row could not be parsed.
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BindingError {
    /// Whether this error means the model cannot be evaluated at the given
    /// parameters, as opposed to a caller or environment mistake.
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            BindingError::NoPhysicalSolution { .. }
                | BindingError::Overflow(_)
                | BindingError::RootNotConverged { .. }
                | BindingError::InvalidInput(_)
        )
    }
}

/// Result type alias for stonefit-rs operations.
pub type Result<T> = std::result::Result<T, BindingError>;
