//! Standin Symbol Resolver
//!
//! This crate turns raw Rust declarations into the uniform subjects the
//! generators consume:
//! - Package loading through a pluggable [`PackageLoader`]
//! - `use`-table based qualification of every name a signature mentions
//! - Supertrait expansion with cycle detection
//! - Synthesized contracts for types with inherent methods
//! - Callback recognition and comparability classification

pub mod callback;
mod contract;
pub mod declaration;
pub mod error;
pub mod loader;
pub mod package;
pub mod qualify;
pub mod resolver;
pub mod scope;
mod signature;
pub mod subst;
pub mod typeinfo;

pub use declaration::Declaration;
pub use error::{ResolveError, Result};
pub use loader::{MemoryLoader, PackageLoader};
pub use package::{Package, UseTable, LOCAL};
pub use resolver::{ResolutionContext, Resolver};
pub use scope::Scope;
pub use typeinfo::{DeriveTypeInfo, NoTypeInfo, TypeInfo};
