//! Import planning
//!
//! Every external name the subject mentions is either imported once or,
//! when that is impossible, spelled out in full wherever it appears:
//! - two paths binding the same name: the first path in sorted order is
//!   imported, the others are written in full
//! - a name equal to a generated item: written in full
//! - a name inside the reserved `_standin` prefix: imported as `<name>_user`

use crate::error::{GenerateError, Result};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use standin_core::{ExternalRef, Subject};
use std::collections::{BTreeMap, BTreeSet};
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{Path, PathSegment};
use tracing::debug;

/// The `use` declarations of one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSet {
    runtime: Path,
    alias: String,
    user: BTreeMap<String, Option<String>>,
}

impl ImportSet {
    /// User imports as `(path, alias)` in render order
    pub fn user(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.user
            .iter()
            .map(|(path, alias)| (path.as_str(), alias.as_deref()))
    }

    /// Framework import first, then user imports sorted by path
    pub fn render(&self) -> TokenStream {
        let runtime = &self.runtime;
        let alias = format_ident!("{}", self.alias);
        let user = self.user.iter().map(|(path, alias)| {
            let path = path_from(path);
            match alias {
                Some(alias) => {
                    let alias = format_ident!("{}", alias);
                    quote!(use #path as #alias;)
                }
                None => quote!(use #path;),
            }
        });
        quote! {
            use #runtime as #alias;
            #(#user)*
        }
    }
}

#[derive(Debug, Clone)]
enum Binding {
    /// Imported under `alias` (or its own name) from `path`
    Import { path: String, alias: Option<String> },
    /// Never imported; every occurrence is written in full
    Qualified,
}

/// Decide the imports of `subject` and rewrite its names to match
///
/// `reserved` holds every item name the artifact declares.
pub fn plan(
    subject: &mut Subject,
    reserved: &BTreeSet<String>,
    runtime_path: &str,
    alias: &str,
) -> Result<ImportSet> {
    let runtime: Path = syn::parse_str(runtime_path).map_err(|err| GenerateError::Options {
        message: format!("runtime path `{runtime_path}`: {err}"),
    })?;

    let mut candidates: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for external in subject.externals() {
        candidates
            .entry(external.name)
            .or_default()
            .insert(external.path);
    }

    let mut bindings = BTreeMap::new();
    for (name, paths) in &candidates {
        let Some(first) = paths.iter().next() else {
            continue;
        };
        if paths.len() > 1 {
            debug!(
                "`{}` is bound to {} paths; importing {} and qualifying the rest",
                name,
                paths.len(),
                first
            );
        }
        let binding = if reserved.contains(name) {
            debug!("`{}` collides with a generated item; qualifying it", name);
            Binding::Qualified
        } else if name.starts_with(alias) {
            Binding::Import {
                path: first.clone(),
                alias: Some(format!("{name}_user")),
            }
        } else {
            Binding::Import {
                path: first.clone(),
                alias: None,
            }
        };
        bindings.insert(name.clone(), binding);
    }

    requalify(subject, &bindings);

    let user = bindings
        .into_values()
        .filter_map(|binding| match binding {
            Binding::Import { path, alias } => Some((path, alias)),
            Binding::Qualified => None,
        })
        .collect();
    Ok(ImportSet {
        runtime,
        alias: alias.to_string(),
        user,
    })
}

/// Replacement for every name in `externals` that is not in scope as written
fn replacements(
    externals: &[ExternalRef],
    bindings: &BTreeMap<String, Binding>,
) -> BTreeMap<String, Path> {
    let mut map = BTreeMap::new();
    for external in externals {
        let replacement = match bindings.get(&external.name) {
            Some(Binding::Import { path, alias }) if *path == external.path => match alias {
                Some(alias) => path_from(alias),
                None => continue,
            },
            Some(_) => path_from(&external.path),
            None => continue,
        };
        map.insert(external.name.clone(), replacement);
    }
    map
}

fn requalify(subject: &mut Subject, bindings: &BTreeMap<String, Binding>) {
    match subject {
        Subject::Function(_) => {
            let map = replacements(&subject.externals(), bindings);
            if !map.is_empty() {
                subject.rewrite(&mut Requalify { map: &map });
            }
        }
        Subject::Contract(contract) => {
            let map = replacements(&contract.externals, bindings);
            let mut visitor = Requalify { map: &map };
            for type_param in &mut contract.type_params {
                for bound in &mut type_param.bounds {
                    visitor.visit_type_param_bound_mut(bound);
                }
            }
            for trait_ref in &mut contract.traits {
                let map = replacements(&trait_ref.externals, bindings);
                Requalify { map: &map }.visit_path_mut(&mut trait_ref.path);
            }
            for method in &mut contract.methods {
                let map = replacements(&method.signature.externals(), bindings);
                if map.is_empty() {
                    continue;
                }
                let mut visitor = Requalify { map: &map };
                method.signature.rewrite(&mut visitor);
                visitor.visit_signature_mut(&mut method.decl);
            }
        }
    }
}

struct Requalify<'m> {
    map: &'m BTreeMap<String, Path>,
}

impl VisitMut for Requalify<'_> {
    fn visit_path_mut(&mut self, path: &mut Path) {
        if path.leading_colon.is_none() {
            let replacement = path
                .segments
                .first()
                .and_then(|first| self.map.get(&first.ident.to_string()));
            if let Some(replacement) = replacement {
                let mut segments: Punctuated<PathSegment, syn::Token![::]> =
                    replacement.segments.clone();
                let mut written = path.segments.iter();
                if let (Some(first), Some(last)) = (written.next(), segments.last_mut()) {
                    last.arguments = first.arguments.clone();
                }
                for segment in written {
                    segments.push(segment.clone());
                }
                path.segments = segments;
            }
        }
        visit_mut::visit_path_mut(self, path);
    }
}

fn path_from(text: &str) -> Path {
    let segments: Punctuated<PathSegment, syn::Token![::]> = text
        .split("::")
        .map(|segment| PathSegment::from(format_ident!("{}", segment)))
        .collect();
    Path {
        leading_colon: None,
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;
    use syn::parse_quote;

    #[test]
    fn test_requalify_keeps_arguments_and_tail() {
        let mut map = BTreeMap::new();
        map.insert("Entry".to_string(), path_from("crate::model::Entry"));
        let mut ty: syn::Type = parse_quote!(Vec<Entry<u8>>);
        Requalify { map: &map }.visit_type_mut(&mut ty);
        assert_eq!(
            ty.to_token_stream().to_string(),
            "Vec < crate :: model :: Entry < u8 > >"
        );
    }

    #[test]
    fn test_replacements_only_touch_shadowed_names() {
        let external = |name: &str, path: &str| ExternalRef {
            name: name.to_string(),
            path: path.to_string(),
            local: true,
            visibility: standin_core::Visibility::Public,
        };
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "Entry".to_string(),
            Binding::Import {
                path: "crate::a::Entry".to_string(),
                alias: None,
            },
        );
        let map = replacements(
            &[external("Entry", "crate::a::Entry")],
            &bindings,
        );
        assert!(map.is_empty());
        let map = replacements(
            &[external("Entry", "crate::b::Entry")],
            &bindings,
        );
        assert_eq!(
            map["Entry"].to_token_stream().to_string(),
            "crate :: b :: Entry"
        );
    }
}
