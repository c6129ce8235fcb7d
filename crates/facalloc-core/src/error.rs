//! Unified error type for facility allocation runs
//!
//! Every failure is terminal for the current optimization run. The variants
//! follow the pipeline stage that detects them:
//!
//! - [`AllocError::MalformedInput`]: structural input problems found by the
//!   model builder before any constraint is emitted
//! - [`AllocError::Infeasible`] / [`AllocError::Unbounded`]: reported by the
//!   solver and surfaced unchanged
//! - [`AllocError::Extraction`]: a solved assignment references a variable the
//!   model never declared
//!
//! # Example
//!
//! ```ignore
//! use facalloc_core::{AllocError, AllocResult};
//!
//! fn run(problem: &ProblemData) -> AllocResult<()> {
//!     problem.validate()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Error type for all facility allocation operations.
#[derive(Error, Debug)]
pub enum AllocError {
    /// Input data violates a structural rule (missing tiers, zero horizon,
    /// undefined demand entries, ...)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// No assignment satisfies every constraint
    #[error("Problem infeasible: {0}")]
    Infeasible(String),

    /// The objective has no finite optimum
    #[error("Problem unbounded: {0}")]
    Unbounded(String),

    /// Solved assignment does not match the emitted model
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Any other backend failure
    #[error("Solver error: {0}")]
    Solver(String),

    /// I/O errors (instance files, result files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AllocError {
    /// Shorthand used by the validation rules.
    pub fn malformed(msg: impl Into<String>) -> Self {
        AllocError::MalformedInput(msg.into())
    }

    /// True for the two outcomes a solver reports about the model itself.
    pub fn is_solver_verdict(&self) -> bool {
        matches!(self, AllocError::Infeasible(_) | AllocError::Unbounded(_))
    }
}

/// Convenience type alias for Results using AllocError.
pub type AllocResult<T> = Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AllocError::malformed("facility 2 has no capacity tiers");
        assert!(err.to_string().contains("Malformed input"));
        assert!(err.to_string().contains("facility 2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AllocError = io_err.into();
        assert!(matches!(err, AllocError::Io(_)));
    }

    #[test]
    fn test_solver_verdicts() {
        assert!(AllocError::Infeasible("x".into()).is_solver_verdict());
        assert!(AllocError::Unbounded("x".into()).is_solver_verdict());
        assert!(!AllocError::Extraction("x".into()).is_solver_verdict());
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> AllocResult<()> {
            Err(AllocError::malformed("horizon must be positive"))
        }

        fn outer() -> AllocResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(AllocError::MalformedInput(_))));
    }
}
