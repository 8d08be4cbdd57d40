//! Standin Signature Model
//!
//! This crate holds the language-neutral description of a callable that the
//! rest of the generator works from:
//! - **Signatures**: ordered parameters, results, and type parameters
//! - **Qualified types**: declared type, owned capture form, comparability,
//!   and the external names the type needs in scope
//! - **Subjects**: a resolved function or contract, ready for generation
//! - **Naming policy**: the stateless tables that name unnamed fields
//! - **Requests**: the immutable description of one generation run

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod naming;
pub mod request;
pub mod types;

pub use error::{ModelError, Result};
pub use model::{
    Callback, ContractKind, ContractSubject, FunctionSubject, Method, Output, Parameter,
    ReceiverKind, Signature, Subject, TraitRef, TypeParameter,
};
pub use request::{GenerationRequest, Mode};
pub use types::{
    CallableKind, CallablePassing, Capture, CaptureKind, Comparability, ExternalRef,
    PrimitiveClass, QualifiedType, StorageProblem, Visibility,
};
