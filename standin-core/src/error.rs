//! Error types for the signature model

use thiserror::Error;

/// Errors raised while building model values from user input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A name that must be a Rust identifier is not one
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A type argument supplied with a request does not parse as a type
    #[error("Invalid type argument `{argument}`: {message}")]
    InvalidTypeArgument {
        /// The argument as written
        argument: String,
        /// Parser diagnostic
        message: String,
    },

    /// A request names no target
    #[error("Generation request has an empty target name")]
    EmptyTarget,
}

/// Result alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
