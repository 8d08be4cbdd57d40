//! Generator configuration

use crate::error::{GenerateError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs that shape every artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Path of the runtime support crate
    pub runtime_path: String,
    /// Alias the runtime is imported under; must start with `_standin`
    pub framework_alias: String,
    /// Default time an expectation waits for a call, in milliseconds
    pub timeout_ms: u64,
    /// Whether to emit the "generated code" header comment
    pub header: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            runtime_path: "::standin_runtime".to_string(),
            framework_alias: "_standin".to_string(),
            timeout_ms: 1000,
            header: true,
        }
    }
}

impl GeneratorOptions {
    /// Default expectation timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check the options can be rendered into valid code
    pub fn validate(&self) -> Result<()> {
        if !self.framework_alias.starts_with("_standin")
            || syn::parse_str::<syn::Ident>(&self.framework_alias).is_err()
        {
            return Err(GenerateError::Options {
                message: format!(
                    "framework alias `{}` must be an identifier starting with `_standin`",
                    self.framework_alias
                ),
            });
        }
        if syn::parse_str::<syn::Path>(&self.runtime_path).is_err() {
            return Err(GenerateError::Options {
                message: format!("runtime path `{}` is not a path", self.runtime_path),
            });
        }
        if self.timeout_ms == 0 {
            return Err(GenerateError::Options {
                message: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = GeneratorOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_rejects_unreserved_alias() {
        let options = GeneratorOptions {
            framework_alias: "rt".to_string(),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(GenerateError::Options { .. })));
    }
}
