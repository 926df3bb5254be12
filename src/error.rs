use thiserror::Error;

/// Result alias for fallible minimizer setup and runs.
pub type Result<T> = std::result::Result<T, MinimizeError>;

/// Errors raised at configuration time or when shapes disagree.
///
/// Numerical trouble during a run is not an error: it shows up as a skipped
/// update, a restart, or a [`TerminationReason`](crate::TerminationReason).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MinimizeError {
    /// Tolerance must be non-negative (and not NaN).
    #[error("tolerance must be >= 0, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },

    /// The iteration budget must be positive.
    #[error("max iterations must be > 0, got {max_iterations}")]
    InvalidMaxIterations { max_iterations: usize },

    /// Two vectors or a vector and a matrix disagree on length.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The objective has no inputs.
    #[error("objective has zero dimensions")]
    EmptyProblem,

    /// A supplied Hessian-inverse estimate is not symmetric.
    #[error("matrix is not symmetric at ({row}, {col})")]
    AsymmetricMatrix { row: usize, col: usize },

    /// `step` was called before `initialize`.
    #[error("minimizer has not been initialized")]
    NotInitialized,

    /// A line-minimizer parameter is out of range.
    #[error("invalid line search parameter `{name}`: {reason}")]
    InvalidLineSearch {
        name: &'static str,
        reason: &'static str,
    },
}
