//! Resolution error types

use standin_core::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for resolution results
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors raised while turning a declaration into a subject
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No package is registered or found under the import path
    #[error("Package not found: {path}")]
    PackageNotFound {
        /// Import path that was requested
        path: String,
    },

    /// Source for a package failed to parse
    #[error("Parse error in package {path}: {message}")]
    Parse {
        /// Import path of the package
        path: String,
        /// Parser diagnostic
        message: String,
    },

    /// Source for a package could not be read
    #[error("IO error reading package {path}: {error}")]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        error: std::io::Error,
    },

    /// The requested declaration does not exist in the package
    #[error("Declaration `{name}` not found in package {package}")]
    NotFound {
        /// Declaration name
        name: String,
        /// Package that was searched
        package: String,
    },

    /// A supertrait could not be loaded
    #[error("Cannot resolve embedded contract `{name}` of `{contract}`: {reason}")]
    UnresolvableEmbedded {
        /// Contract doing the embedding
        contract: String,
        /// Embedded contract as written
        name: String,
        /// What went wrong
        reason: String,
    },

    /// Supertrait expansion came back to a trait already being expanded
    #[error("Cyclic contract embedding: {path}")]
    CyclicEmbedding {
        /// Expansion path, ending at the repeated trait
        path: String,
    },

    /// The declaration uses a shape the model cannot represent
    #[error("Unsupported declaration shape in `{name}`: {reason}")]
    UnsupportedShape {
        /// Declaration or method name
        name: String,
        /// What is unsupported
        reason: String,
    },

    /// A contract without a single method
    #[error("Contract `{name}` has no usable methods")]
    NoMethods {
        /// Contract name
        name: String,
    },

    /// A parameter or result that cannot be read
    #[error("Malformed field `{field}` in `{method}`: {reason}")]
    MalformedField {
        /// Method owning the field
        method: String,
        /// Field as written
        field: String,
        /// What is wrong
        reason: String,
    },

    /// Wrong number of type arguments for a generic declaration
    #[error("`{name}` takes {expected} type argument(s) but {got} were supplied")]
    TypeArguments {
        /// Declaration name
        name: String,
        /// Declared type parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Invalid request data
    #[error(transparent)]
    Model(#[from] ModelError),
}
