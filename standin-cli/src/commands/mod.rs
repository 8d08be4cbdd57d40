//! Command implementations

pub mod generate;
pub mod init;
pub mod inspect;

use crate::config::Config;
use crate::loader::{find_crate_root, FsLoader};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the target's declaring file sits, as given on the command line
#[derive(Debug, Clone)]
pub struct SourceArgs {
    /// File the artifact is generated for
    pub source: PathBuf,
    /// Module path of `source`; derived from its location when absent
    pub module: Option<String>,
    /// Crate directory; falls back to the config, then to the nearest `Cargo.toml`
    pub crate_root: Option<PathBuf>,
}

/// A loader whose local package is `args.source`
pub fn open_loader(args: &SourceArgs, config: &Config) -> Result<FsLoader> {
    if !args.source.is_file() {
        anyhow::bail!("source file {} does not exist", args.source.display());
    }
    let source = args
        .source
        .canonicalize()
        .with_context(|| format!("locating {}", args.source.display()))?;
    let crate_root = match args.crate_root.as_ref().or(config.paths.crate_root.as_ref()) {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("locating crate root {}", root.display()))?,
        None => find_crate_root(&source)
            .with_context(|| format!("no Cargo.toml above {}", source.display()))?,
    };
    let loader = FsLoader::new(crate_root);
    let module = match &args.module {
        Some(module) => module.clone(),
        None => loader
            .module_path_of(&source)
            .unwrap_or_else(|| "crate".to_string()),
    };
    debug!(
        "Local package {} at {} (crate root {})",
        module,
        source.display(),
        loader.crate_root().display()
    );
    Ok(loader.with_local(module, source))
}

/// Path relative to the working directory when possible, for messages
fn shown(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
