//! Package loading from a crate on disk

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use standin_resolver::{Package, PackageLoader, ResolveError, LOCAL};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Loads `crate::...` module paths from a crate's `src/` tree
///
/// Parsed files are kept for the life of the loader. Paths rooted in
/// another crate are never read and report [`ResolveError::PackageNotFound`].
pub struct FsLoader {
    crate_root: PathBuf,
    local: Option<(String, PathBuf)>,
    cache: Mutex<FxHashMap<String, Arc<Package>>>,
}

impl FsLoader {
    /// A loader for the crate whose `Cargo.toml` sits in `crate_root`
    pub fn new(crate_root: impl Into<PathBuf>) -> Self {
        Self {
            crate_root: crate_root.into(),
            local: None,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Treat `file`, the module at `module_path`, as the local package
    pub fn with_local(mut self, module_path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.local = Some((module_path.into(), file.into()));
        self
    }

    /// Crate directory this loader reads from
    pub fn crate_root(&self) -> &Path {
        &self.crate_root
    }

    /// File declaring the module at `module_path`, if it exists
    ///
    /// `crate` maps to `src/lib.rs` or `src/main.rs`; `crate::a::b` maps to
    /// `src/a/b.rs` or `src/a/b/mod.rs`.
    pub fn module_file(&self, module_path: &str) -> Option<PathBuf> {
        let mut segments = module_path.split("::");
        if segments.next() != Some("crate") {
            return None;
        }
        let src = self.crate_root.join("src");
        let rest: Vec<&str> = segments.collect();
        let candidates = match rest.split_last() {
            None => vec![src.join("lib.rs"), src.join("main.rs")],
            Some((last, parents)) => {
                let dir = parents.iter().fold(src, |dir, segment| dir.join(segment));
                vec![dir.join(format!("{last}.rs")), dir.join(last).join("mod.rs")]
            }
        };
        candidates.into_iter().find(|candidate| candidate.is_file())
    }

    /// Module path of `file` inside this crate (`src/a/b.rs` is `crate::a::b`)
    pub fn module_path_of(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(self.crate_root.join("src")).ok()?;
        let mut segments = vec!["crate".to_string()];
        let components: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        let (file_name, dirs) = components.split_last()?;
        segments.extend(dirs.iter().cloned());
        let stem = file_name.strip_suffix(".rs")?;
        match (stem, dirs.is_empty()) {
            ("mod", false) => {}
            ("lib" | "main", true) => {}
            _ => segments.push(stem.to_string()),
        }
        Some(segments.join("::"))
    }

    fn read(&self, import_path: &str, module_path: &str, file: &Path) -> Result<Arc<Package>, ResolveError> {
        debug!("Reading package {} from {}", module_path, file.display());
        let source = std::fs::read_to_string(file).map_err(|error| ResolveError::Io {
            path: file.to_path_buf(),
            error,
        })?;
        let package = Package::parse(import_path, module_path, &source, Some(file.to_path_buf()))?;
        Ok(Arc::new(package))
    }
}

impl PackageLoader for FsLoader {
    fn load(&self, import_path: &str) -> Result<Arc<Package>, ResolveError> {
        let local = self
            .local
            .as_ref()
            .filter(|(module_path, _)| import_path == LOCAL || import_path == module_path.as_str());
        let key = if local.is_some() { LOCAL } else { import_path };
        if let Some(package) = self.cache.lock().get(key) {
            return Ok(package.clone());
        }

        let package = match local {
            Some((module_path, file)) => self.read(LOCAL, module_path, file)?,
            None => {
                let file = self
                    .module_file(import_path)
                    .ok_or_else(|| ResolveError::PackageNotFound {
                        path: import_path.to_string(),
                    })?;
                self.read(import_path, import_path, &file)?
            }
        };
        self.cache.lock().insert(key.to_string(), package.clone());
        Ok(package)
    }
}

/// Nearest ancestor of `file` holding a `Cargo.toml`
pub fn find_crate_root(file: &Path) -> Option<PathBuf> {
    file.ancestors()
        .skip(1)
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
}
