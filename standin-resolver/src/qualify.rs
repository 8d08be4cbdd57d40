//! Path normalization and external-name collection
//!
//! Declarations are read in the module that declares them; the artifact
//! lives elsewhere. Relative prefixes (`self::`, `super::`, `crate::` of a
//! foreign crate) are rewritten to absolute paths, and every single name
//! the artifact must import is recorded as an [`ExternalRef`].

use crate::package::normalize_segments;
use crate::scope::Scope;
use quote::format_ident;
use standin_core::{ExternalRef, Visibility};
use std::collections::BTreeSet;
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{Path, PathSegment, Type};
use tracing::debug;

/// Names that never need an import
pub const PRELUDE: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
    "i128", "isize", "f32", "f64", "Self", "Option", "Some", "None", "Result", "Ok", "Err", "Vec",
    "String", "Box", "ToString", "ToOwned", "Clone", "Copy", "Send", "Sync", "Sized", "Unpin",
    "Drop", "Fn", "FnMut", "FnOnce", "Iterator", "IntoIterator", "DoubleEndedIterator",
    "ExactSizeIterator", "Extend", "Default", "Eq", "PartialEq", "Ord", "PartialOrd", "AsRef",
    "AsMut", "Into", "From", "TryFrom", "TryInto", "FromIterator",
];

struct Qualifier<'s, 'p> {
    scope: &'s Scope<'p>,
    externals: BTreeSet<ExternalRef>,
}

impl<'s, 'p> Qualifier<'s, 'p> {
    fn new(scope: &'s Scope<'p>) -> Self {
        Self {
            scope,
            externals: BTreeSet::new(),
        }
    }

    fn absolutize(&self, path: &mut Path) {
        let names: Vec<String> = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        let keywords = names
            .iter()
            .take_while(|name| matches!(name.as_str(), "self" | "super" | "crate"))
            .count();
        let absolute = normalize_segments(&names, &self.scope.package.module_path);
        let prefix_len = absolute.len().saturating_sub(names.len() - keywords);
        let mut segments: Punctuated<PathSegment, syn::Token![::]> = absolute[..prefix_len]
            .iter()
            .map(|name| PathSegment::from(format_ident!("{}", name)))
            .collect();
        for segment in path.segments.iter().skip(keywords) {
            segments.push(segment.clone());
        }
        path.segments = segments;
    }

    fn record(&mut self, head: &str, multi_segment: bool) {
        let package = self.scope.package;
        if self.scope.is_generic(head) {
            return;
        }
        if let Some(full) = package.uses.get(head) {
            self.externals.insert(ExternalRef {
                name: head.to_string(),
                path: full.to_string(),
                local: package.is_local(),
                visibility: Visibility::Unknown,
            });
            return;
        }
        if let Some(visibility) = package.visibility_of(head) {
            self.externals.insert(ExternalRef {
                name: head.to_string(),
                path: package.item_path(head),
                local: package.is_local(),
                visibility,
            });
            return;
        }
        if PRELUDE.contains(&head) || multi_segment {
            return;
        }
        let module = package
            .uses
            .globs()
            .first()
            .cloned()
            .unwrap_or_else(|| package.module_path.clone());
        debug!(
            "Name `{}` is not declared in {}; assuming {}::{}",
            head, package.module_path, module, head
        );
        self.externals.insert(ExternalRef {
            name: head.to_string(),
            path: format!("{module}::{head}"),
            local: package.is_local(),
            visibility: Visibility::Unknown,
        });
    }
}

impl VisitMut for Qualifier<'_, '_> {
    fn visit_path_mut(&mut self, path: &mut Path) {
        if path.leading_colon.is_none() {
            if let Some(first) = path.segments.first() {
                let head = first.ident.to_string();
                match head.as_str() {
                    "self" | "super" | "crate" => self.absolutize(path),
                    _ => self.record(&head, path.segments.len() > 1),
                }
            }
        }
        visit_mut::visit_path_mut(self, path);
    }
}

/// Normalize `ty` in `scope` and collect the names it needs
pub fn qualify_type(ty: &Type, scope: &Scope<'_>) -> (Type, Vec<ExternalRef>) {
    let mut qualifier = Qualifier::new(scope);
    let mut ty = ty.clone();
    qualifier.visit_type_mut(&mut ty);
    (ty, qualifier.externals.into_iter().collect())
}

/// Normalize a path (a trait reference or a bound) in `scope`
pub fn qualify_path(path: &Path, scope: &Scope<'_>) -> (Path, Vec<ExternalRef>) {
    let mut qualifier = Qualifier::new(scope);
    let mut path = path.clone();
    qualifier.visit_path_mut(&mut path);
    (path, qualifier.externals.into_iter().collect())
}

/// Normalize a type parameter bound in `scope`
pub fn qualify_bound(
    bound: &syn::TypeParamBound,
    scope: &Scope<'_>,
) -> (syn::TypeParamBound, Vec<ExternalRef>) {
    let mut qualifier = Qualifier::new(scope);
    let mut bound = bound.clone();
    qualifier.visit_type_param_bound_mut(&mut bound);
    (bound, qualifier.externals.into_iter().collect())
}

/// Normalize every path in a declared signature; names are not collected
pub fn normalize_signature(sig: &syn::Signature, scope: &Scope<'_>) -> syn::Signature {
    let mut qualifier = Qualifier::new(scope);
    let mut sig = sig.clone();
    qualifier.visit_signature_mut(&mut sig);
    sig
}
