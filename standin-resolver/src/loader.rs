//! Package loading

use crate::error::{ResolveError, Result};
use crate::package::{Package, LOCAL};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Fetches parsed packages by import path
///
/// `"."` names the local package: the module the artifact is generated
/// for. Every other import path is an absolute module path such as
/// `crate::store` or `ledger::model`.
pub trait PackageLoader {
    /// Load the package at `import_path`
    fn load(&self, import_path: &str) -> Result<Arc<Package>>;
}

/// Loader over sources registered up front
#[derive(Debug, Default)]
pub struct MemoryLoader {
    local: Option<Arc<Package>>,
    packages: FxHashMap<String, Arc<Package>>,
}

impl MemoryLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the local package, reachable as `"."` and as `module_path`
    pub fn with_local(mut self, module_path: &str, source: &str) -> Result<Self> {
        let package = Arc::new(Package::parse(LOCAL, module_path, source, None)?);
        self.local = Some(package);
        Ok(self)
    }

    /// Register a package under its module path
    pub fn with_package(mut self, module_path: &str, source: &str) -> Result<Self> {
        let package = Package::parse(module_path, module_path, source, None)?;
        self.packages
            .insert(module_path.to_string(), Arc::new(package));
        Ok(self)
    }
}

impl PackageLoader for MemoryLoader {
    fn load(&self, import_path: &str) -> Result<Arc<Package>> {
        if let Some(local) = &self.local {
            if import_path == LOCAL || import_path == local.module_path {
                return Ok(local.clone());
            }
        }
        debug!("Loading package {}", import_path);
        self.packages
            .get(import_path)
            .cloned()
            .ok_or_else(|| ResolveError::PackageNotFound {
                path: import_path.to_string(),
            })
    }
}
