//! Write a starter `standin.toml`

use crate::config::{save_config, Config, PathsConfig, CONFIG_FILE};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the default configuration into `dir`, refusing to replace one unless `force`
pub fn init(dir: &Path, output_dir: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to replace it)", path.display());
    }
    let config = Config {
        paths: PathsConfig {
            crate_root: None,
            output_dir,
        },
        ..Config::default()
    };
    save_config(&config, &path)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = init(dir.path(), Some(PathBuf::from("tests/doubles")), false).unwrap();
        let config = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.generator, Default::default());
        assert_eq!(config.paths.output_dir, Some(PathBuf::from("tests/doubles")));

        assert!(init(dir.path(), None, false).is_err());
        init(dir.path(), None, true).unwrap();
        assert_eq!(load_config(Some(path)).unwrap().paths.output_dir, None);
    }
}
