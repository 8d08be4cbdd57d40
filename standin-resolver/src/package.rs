//! Parsed packages and their `use` tables

use crate::error::{ResolveError, Result};
use rustc_hash::FxHashMap;
use standin_core::Visibility;
use std::path::PathBuf;
use syn::{Item, UseTree};

/// Import path of the package the artifact is generated for
pub const LOCAL: &str = ".";

/// One parsed Rust module
#[derive(Debug)]
pub struct Package {
    /// Path the package was loaded under (`"."` for the local package)
    pub import_path: String,
    /// Absolute module path items are reachable through (`crate::store`)
    pub module_path: String,
    /// File the source came from, when it came from disk
    pub file: Option<PathBuf>,
    /// Top-level items
    pub items: Vec<Item>,
    /// Names bound by `use` items
    pub uses: UseTable,
}

impl Package {
    /// Parse `source` as the module at `module_path`
    pub fn parse(
        import_path: impl Into<String>,
        module_path: impl Into<String>,
        source: &str,
        file: Option<PathBuf>,
    ) -> Result<Self> {
        let import_path = import_path.into();
        let module_path = module_path.into();
        let parsed = syn::parse_file(source).map_err(|err| ResolveError::Parse {
            path: import_path.clone(),
            message: err.to_string(),
        })?;
        let uses = UseTable::collect(&parsed.items, &module_path);
        Ok(Self {
            import_path,
            module_path,
            file,
            items: parsed.items,
            uses,
        })
    }

    /// Whether this is the package the artifact is generated for
    pub fn is_local(&self) -> bool {
        self.import_path == LOCAL
    }

    /// Root segment of the module path (`crate` or an external crate name)
    pub fn crate_root(&self) -> &str {
        self.module_path
            .split("::")
            .next()
            .unwrap_or(self.module_path.as_str())
    }

    /// Top-level item named `name`
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| item_name(item).is_some_and(|ident| ident == name))
    }

    /// Declared visibility of the item named `name`
    pub fn visibility_of(&self, name: &str) -> Option<Visibility> {
        self.item(name).and_then(item_visibility)
    }

    /// Full path of an item declared in this package
    pub fn item_path(&self, name: &str) -> String {
        format!("{}::{}", self.module_path, name)
    }

    /// Turn `self::`, `super::` and `crate::` prefixes, and paths through a
    /// child module, into an absolute path
    pub fn absolute(&self, segments: &[String]) -> Vec<String> {
        normalize_with_modules(segments, &self.module_path, &child_modules(&self.items))
    }
}

/// Names of the `mod` items among `items`
pub fn child_modules(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Item::Mod(item) => Some(item.ident.to_string()),
            _ => None,
        })
        .collect()
}

/// Identifier of a named item, if it has one
pub fn item_name(item: &Item) -> Option<String> {
    let ident = match item {
        Item::Struct(item) => &item.ident,
        Item::Enum(item) => &item.ident,
        Item::Union(item) => &item.ident,
        Item::Trait(item) => &item.ident,
        Item::Type(item) => &item.ident,
        Item::Fn(item) => &item.sig.ident,
        Item::Const(item) => &item.ident,
        Item::Static(item) => &item.ident,
        Item::Mod(item) => &item.ident,
        _ => return None,
    };
    Some(ident.to_string())
}

/// Visibility of a named item
pub fn item_visibility(item: &Item) -> Option<Visibility> {
    let vis = match item {
        Item::Struct(item) => &item.vis,
        Item::Enum(item) => &item.vis,
        Item::Union(item) => &item.vis,
        Item::Trait(item) => &item.vis,
        Item::Type(item) => &item.vis,
        Item::Fn(item) => &item.vis,
        Item::Const(item) => &item.vis,
        Item::Static(item) => &item.vis,
        Item::Mod(item) => &item.vis,
        _ => return None,
    };
    Some(visibility(vis))
}

/// Map syntax visibility onto the model's classification
pub fn visibility(vis: &syn::Visibility) -> Visibility {
    match vis {
        syn::Visibility::Public(_) => Visibility::Public,
        syn::Visibility::Restricted(_) => Visibility::Restricted,
        syn::Visibility::Inherited => Visibility::Private,
    }
}

/// Resolve leading `self`/`super`/`crate` segments against `module_path`
pub fn normalize_segments(segments: &[String], module_path: &str) -> Vec<String> {
    let module: Vec<String> = module_path.split("::").map(str::to_string).collect();
    let Some(first) = segments.first() else {
        return Vec::new();
    };
    match first.as_str() {
        "self" => module.into_iter().chain(segments[1..].iter().cloned()).collect(),
        "crate" => {
            let root = module.first().cloned().unwrap_or_else(|| "crate".to_string());
            std::iter::once(root)
                .chain(segments[1..].iter().cloned())
                .collect()
        }
        "super" => {
            let mut base = module;
            let mut rest = segments;
            while rest.first().is_some_and(|segment| segment == "super") {
                if base.len() > 1 {
                    base.pop();
                }
                rest = &rest[1..];
            }
            base.into_iter().chain(rest.iter().cloned()).collect()
        }
        _ => segments.to_vec(),
    }
}

/// Like [`normalize_segments`], but a path starting at one of `modules`
/// (children of the module at `module_path`) is taken as relative to it
pub fn normalize_with_modules(
    segments: &[String],
    module_path: &str,
    modules: &[String],
) -> Vec<String> {
    match segments.first() {
        Some(first) if modules.contains(first) => module_path
            .split("::")
            .map(str::to_string)
            .chain(segments.iter().cloned())
            .collect(),
        _ => normalize_segments(segments, module_path),
    }
}

/// Split `a::b::Name` into (`a::b`, `Name`)
pub fn split_item_path(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once("::")
}

/// Names bound by the `use` items of one module
#[derive(Debug, Default, Clone)]
pub struct UseTable {
    bindings: FxHashMap<String, String>,
    globs: Vec<String>,
    modules: Vec<String>,
}

impl UseTable {
    /// Collect the bindings of every top-level `use` in `items`
    pub fn collect(items: &[Item], module_path: &str) -> Self {
        let mut table = UseTable {
            modules: child_modules(items),
            ..UseTable::default()
        };
        for item in items {
            if let Item::Use(item_use) = item {
                let prefix = if item_use.leading_colon.is_some() {
                    vec![String::new()]
                } else {
                    Vec::new()
                };
                table.walk(&item_use.tree, prefix, module_path);
            }
        }
        table
    }

    fn walk(&mut self, tree: &UseTree, prefix: Vec<String>, module_path: &str) {
        match tree {
            UseTree::Path(path) => {
                let mut next = prefix;
                next.push(path.ident.to_string());
                self.walk(&path.tree, next, module_path);
            }
            UseTree::Name(name) => {
                if name.ident == "self" {
                    if let Some(last) = prefix.last().cloned() {
                        self.bind(last, &prefix, module_path);
                    }
                } else {
                    let mut full = prefix;
                    full.push(name.ident.to_string());
                    self.bind(name.ident.to_string(), &full, module_path);
                }
            }
            UseTree::Rename(rename) => {
                if rename.rename == "_" {
                    return;
                }
                let mut full = prefix;
                if rename.ident != "self" {
                    full.push(rename.ident.to_string());
                }
                self.bind(rename.rename.to_string(), &full, module_path);
            }
            UseTree::Glob(_) => {
                let absolute = normalize_with_modules(&prefix, module_path, &self.modules);
                self.globs.push(absolute.join("::"));
            }
            UseTree::Group(group) => {
                for item in &group.items {
                    self.walk(item, prefix.clone(), module_path);
                }
            }
        }
    }

    fn bind(&mut self, name: String, full: &[String], module_path: &str) {
        let absolute = normalize_with_modules(full, module_path, &self.modules);
        self.bindings.insert(name, absolute.join("::"));
    }

    /// Full path bound to `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    /// Glob-imported module paths, in source order
    pub fn globs(&self) -> &[String] {
        &self.globs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        path.split("::").map(str::to_string).collect()
    }

    #[test]
    fn test_normalize_relative_prefixes() {
        assert_eq!(
            normalize_segments(&segments("self::User"), "crate::store").join("::"),
            "crate::store::User"
        );
        assert_eq!(
            normalize_segments(&segments("super::model::User"), "crate::store").join("::"),
            "crate::model::User"
        );
        assert_eq!(
            normalize_segments(&segments("crate::model::User"), "ledger::store").join("::"),
            "ledger::model::User"
        );
        assert_eq!(
            normalize_segments(&segments("std::io::Error"), "crate").join("::"),
            "std::io::Error"
        );
    }

    #[test]
    fn test_use_table_bindings() {
        let source = r#"
            use std::collections::{HashMap, BTreeMap as Ordered};
            use super::model::{self, User};
            use std::io;
            use crate::prelude::*;
            use std::fmt::Write as _;
        "#;
        let package = Package::parse("crate::store", "crate::store", source, None).unwrap();
        assert_eq!(
            package.uses.get("HashMap"),
            Some("std::collections::HashMap")
        );
        assert_eq!(
            package.uses.get("Ordered"),
            Some("std::collections::BTreeMap")
        );
        assert_eq!(package.uses.get("model"), Some("crate::model"));
        assert_eq!(package.uses.get("User"), Some("crate::model::User"));
        assert_eq!(package.uses.get("io"), Some("std::io"));
        assert_eq!(package.uses.get("Write"), None);
        assert_eq!(package.uses.globs(), ["crate::prelude".to_string()]);
    }

    #[test]
    fn test_paths_through_child_modules() {
        let source = r#"
            pub mod base;
            mod detail { pub struct Inner; }
            use base::Base;
            use detail::*;
            use std::io::Error;
        "#;
        let package = Package::parse(LOCAL, "crate::store", source, None).unwrap();
        assert_eq!(package.uses.get("Base"), Some("crate::store::base::Base"));
        assert_eq!(package.uses.get("Error"), Some("std::io::Error"));
        assert_eq!(package.uses.globs(), ["crate::store::detail".to_string()]);
        assert_eq!(
            package.absolute(&segments("base::Base")).join("::"),
            "crate::store::base::Base"
        );
        assert_eq!(package.absolute(&segments("std::fmt::Debug")).join("::"), "std::fmt::Debug");
    }

    #[test]
    fn test_items_and_visibility() {
        let source = r#"
            pub struct User;
            pub(crate) enum Role { Admin }
            struct Hidden;
            pub trait Store {}
        "#;
        let package = Package::parse(LOCAL, "crate", source, None).unwrap();
        assert!(package.is_local());
        assert_eq!(package.visibility_of("User"), Some(Visibility::Public));
        assert_eq!(package.visibility_of("Role"), Some(Visibility::Restricted));
        assert_eq!(package.visibility_of("Hidden"), Some(Visibility::Private));
        assert_eq!(package.item_path("Store"), "crate::Store");
        assert!(package.item("Missing").is_none());
    }

    #[test]
    fn test_parse_error_names_package() {
        let err = Package::parse("crate::broken", "crate::broken", "fn (", None).unwrap_err();
        assert!(err.to_string().contains("crate::broken"));
    }
}
