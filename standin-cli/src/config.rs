//! Configuration handling for the standin CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use standin_codegen::GeneratorOptions;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "standin.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorOptions,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the crate's `Cargo.toml`
    #[serde(default)]
    pub crate_root: Option<PathBuf>,

    /// Where artifacts go when `--output` is not given
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Load configuration from `path`, or from `standin.toml` when present
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => read_config(&path),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.is_file() {
                read_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
    config
        .generator
        .validate()
        .with_context(|| format!("checking config {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_partial_files_keep_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[generator]\ntimeout_ms = 250\n\n[paths]\noutput_dir = \"tests/doubles\"\n",
        )
        .unwrap();
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.generator.timeout_ms, 250);
        assert_eq!(config.generator.framework_alias, "_standin");
        assert_eq!(config.paths.output_dir, Some(PathBuf::from("tests/doubles")));
        assert_eq!(config.paths.crate_root, None);
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = Config::default();
        config.generator.header = false;
        config.paths.crate_root = Some(PathBuf::from("/work/app"));
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(Some(path)).unwrap(), config);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[generator]\nframework_alias = \"rt\"\n").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(format!("{err:#}").contains("framework alias `rt`"));
    }
}
