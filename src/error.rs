//! Error types for cvxlin.

use thiserror::Error;

/// Error type for cvxlin operations.
///
/// Solver outcomes (infeasible, unbounded, numerical trouble) are not errors;
/// they are reported through [`crate::SolveStatus`].
#[derive(Debug, Error)]
pub enum CvxError {
    /// Problem is not DCP-compliant.
    #[error("Problem is not DCP: {0}")]
    NotDcp(String),

    /// Solver failed before producing a status.
    #[error("Solver error: {0}")]
    SolverError(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Invalid problem specification.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Invalid atom or builder argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested solver cannot handle a cone the problem uses.
    #[error("Solver {solver} does not support {cone} constraints")]
    SolverCapability { solver: String, cone: String },

    /// A parameter value does not match the parameter's declared sign.
    #[error("Parameter value must be {expected}")]
    ParameterSign { expected: String },

    /// A parameter or variable has no value where one is required.
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

/// Result type for cvxlin operations.
pub type Result<T> = std::result::Result<T, CvxError>;
