//! Generation error types

use standin_resolver::ResolveError;
use thiserror::Error;

/// Type alias for generation results
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Errors that abort a generation request
///
/// Every variant is terminal: generation either produces a whole artifact
/// or one of these, never a partial result.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The declaration could not be turned into a subject
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The subject cannot be doubled or wrapped
    #[error("Cannot generate for `{method}`{}: {reason}", parameter_suffix(.parameter))]
    Validity {
        /// Offending function or `Contract::method`
        method: String,
        /// Offending parameter or result, when one is to blame
        parameter: Option<String>,
        /// What is wrong
        reason: String,
    },

    /// Synthesized code failed to parse; always a generator defect
    #[error("Generated code for `{subject}` is malformed: {message}")]
    Assembly {
        /// Subject being generated
        subject: String,
        /// Parser diagnostic
        message: String,
    },

    /// Generator options are unusable
    #[error("Invalid generator options: {message}")]
    Options {
        /// What is wrong
        message: String,
    },
}

impl GenerateError {
    /// Validity error for a whole method
    pub fn invalid(method: impl Into<String>, reason: impl Into<String>) -> Self {
        GenerateError::Validity {
            method: method.into(),
            parameter: None,
            reason: reason.into(),
        }
    }

    /// Validity error for one parameter or result of a method
    pub fn invalid_parameter(
        method: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GenerateError::Validity {
            method: method.into(),
            parameter: Some(parameter.into()),
            reason: reason.into(),
        }
    }
}

fn parameter_suffix(parameter: &Option<String>) -> String {
    match parameter {
        Some(name) => format!(" (`{name}`)"),
        None => String::new(),
    }
}
