use thiserror::Error;

/// Result type for silc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the substitution engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported evaluation: {message}")]
    UnsupportedEvaluation { message: String },

    #[error("constant substitution did not converge for {unit} within {passes} passes")]
    NonConvergence { unit: String, passes: usize },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an unsupported-evaluation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedEvaluation { message: message.into() }
    }

    /// Create a non-convergence error for a program unit
    pub fn non_convergence(unit: impl Into<String>, passes: usize) -> Self {
        Self::NonConvergence { unit: unit.into(), passes }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}
