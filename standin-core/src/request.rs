//! Generation requests

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which artifact family to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Stand in for a dependency of the unit under test
    Dependency,
    /// Wrap the unit under test itself
    Target,
    /// Decide from the declaration shape
    #[default]
    Unspecified,
}

impl Mode {
    /// Resolve `Unspecified`: functions default to targets, contracts to doubles
    pub fn resolve(self, is_function: bool) -> Mode {
        match self {
            Mode::Unspecified if is_function => Mode::Target,
            Mode::Unspecified => Mode::Dependency,
            other => other,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Dependency => "dependency",
            Mode::Target => "target",
            Mode::Unspecified => "unspecified",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dependency" | "dep" | "double" => Ok(Mode::Dependency),
            "target" | "tgt" => Ok(Mode::Target),
            "unspecified" | "auto" | "" => Ok(Mode::Unspecified),
            other => Err(format!("unknown mode `{other}` (expected dependency or target)")),
        }
    }
}

/// Everything one generation run needs to know besides the declaration
///
/// Built once per invocation and never changed afterwards; the `with_*`
/// builders consume and return the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Name of the declaration to generate for
    pub target_name: String,
    /// Name the declaration has in the artifact's own module
    pub local_name: String,
    /// Import path of the package declaring the target (`"."` for local)
    pub package_name: String,
    /// Requested artifact family
    pub mode: Mode,
    /// Type arguments instantiating a generic target, as source text
    pub type_arguments: Vec<String>,
    /// Replaces the derived artifact base name
    pub artifact_name: Option<String>,
}

impl GenerationRequest {
    /// Request generation for `target_name` declared in the local package
    pub fn new(target_name: impl Into<String>) -> Result<Self> {
        let target_name = target_name.into();
        if target_name.trim().is_empty() {
            return Err(ModelError::EmptyTarget);
        }
        if syn::parse_str::<syn::Ident>(&target_name).is_err() {
            return Err(ModelError::InvalidIdentifier(target_name));
        }
        Ok(Self {
            local_name: target_name.clone(),
            target_name,
            package_name: ".".to_string(),
            mode: Mode::Unspecified,
            type_arguments: Vec::new(),
            artifact_name: None,
        })
    }

    /// Set the package the target is declared in
    pub fn with_package(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    /// Set the name the target has where the artifact lives
    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = local_name.into();
        self
    }

    /// Set the artifact family
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the artifact base name
    pub fn with_artifact_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if syn::parse_str::<syn::Ident>(&name).is_err() {
            return Err(ModelError::InvalidIdentifier(name));
        }
        self.artifact_name = Some(name);
        Ok(self)
    }

    /// Instantiate a generic target with the given type arguments
    pub fn with_type_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the target lives in the artifact's own package
    pub fn is_local(&self) -> bool {
        self.package_name == "."
    }

    /// Parse `type_arguments` as Rust types
    pub fn parsed_type_arguments(&self) -> Result<Vec<syn::Type>> {
        self.type_arguments
            .iter()
            .map(|argument| {
                syn::parse_str::<syn::Type>(argument).map_err(|err| {
                    ModelError::InvalidTypeArgument {
                        argument: argument.clone(),
                        message: err.to_string(),
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_mode_resolves_by_shape() {
        assert_eq!(Mode::Unspecified.resolve(true), Mode::Target);
        assert_eq!(Mode::Unspecified.resolve(false), Mode::Dependency);
        assert_eq!(Mode::Target.resolve(false), Mode::Target);
        assert_eq!(Mode::Dependency.resolve(true), Mode::Dependency);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Dependency".parse::<Mode>(), Ok(Mode::Dependency));
        assert_eq!("target".parse::<Mode>(), Ok(Mode::Target));
        assert!("sideways".parse::<Mode>().is_err());
    }

    #[test]
    fn test_request_builders() {
        let request = GenerationRequest::new("Store")
            .unwrap()
            .with_package("crate::store")
            .with_mode(Mode::Target)
            .with_type_arguments(["u32", "Vec<String>"]);
        assert_eq!(request.local_name, "Store");
        assert!(!request.is_local());
        assert_eq!(request.parsed_type_arguments().unwrap().len(), 2);
    }

    #[test]
    fn test_request_rejects_bad_names() {
        assert_eq!(GenerationRequest::new("  "), Err(ModelError::EmptyTarget));
        assert!(matches!(
            GenerationRequest::new("not an ident"),
            Err(ModelError::InvalidIdentifier(_))
        ));
        let request = GenerationRequest::new("Store").unwrap();
        assert!(request.with_artifact_name("1bad").is_err());
    }

    #[test]
    fn test_bad_type_argument_is_reported() {
        let request = GenerationRequest::new("Store")
            .unwrap()
            .with_type_arguments(["Vec<"]);
        match request.parsed_type_arguments() {
            Err(ModelError::InvalidTypeArgument { argument, .. }) => assert_eq!(argument, "Vec<"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
