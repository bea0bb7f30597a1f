//! Error types for predicate compilation and filter configuration.
//!
//! Evaluation itself never fails: missing temporal data resolves to an
//! undefined value that excludes the cell. Everything reported here happens
//! before the first row is touched.

use crate::compute::bind::ExprType;
use thiserror::Error;

pub use cellwhen_types::{IntervalParseError, TimestampParseError};

/// A malformed `WHEN` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: ExprType,
        found: ExprType,
    },

    #[error("invalid argument to '{function}': {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("{what} may only appear as the argument of when(), min_timestamp() or max_timestamp()")]
    MisplacedReference { what: String },

    #[error("WHEN predicate must evaluate to a boolean, found {found}")]
    NonBooleanPredicate { found: ExprType },
}

#[derive(Debug, Error)]
pub enum WhenError {
    #[error("invalid WHEN predicate: {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    TimestampParse(#[from] TimestampParseError),

    #[error(transparent)]
    IntervalParse(#[from] IntervalParseError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no WHEN predicate was supplied")]
    MissingPredicate,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WhenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_messages() {
        let err = CompileError::Arity {
            name: "when".into(),
            expected: 1,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "function 'when' expects 1 argument(s), got 2"
        );

        let err = CompileError::NonBooleanPredicate {
            found: ExprType::Timestamp,
        };
        assert_eq!(
            err.to_string(),
            "WHEN predicate must evaluate to a boolean, found timestamp"
        );
    }

    #[test]
    fn test_wrapping() {
        let err: WhenError = CompileError::UnknownFunction {
            name: "latest".into(),
        }
        .into();
        assert!(matches!(err, WhenError::Compile(_)));
        assert_eq!(
            err.to_string(),
            "invalid WHEN predicate: unknown function 'latest'"
        );
    }
}
