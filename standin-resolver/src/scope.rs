//! Name scopes used while resolving a declaration

use crate::package::Package;
use rustc_hash::FxHashMap;
use syn::{GenericParam, Generics, TypeParamBound, WherePredicate};

/// The package a declaration lives in plus the generic parameters in scope
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    /// Declaring package
    pub package: &'a Package,
    generics: FxHashMap<String, Vec<TypeParamBound>>,
}

impl<'a> Scope<'a> {
    /// Scope with no generic parameters
    pub fn new(package: &'a Package) -> Self {
        Self {
            package,
            generics: FxHashMap::default(),
        }
    }

    /// Extend the scope with the type parameters of `generics`
    pub fn with_generics(&self, generics: &Generics) -> Scope<'a> {
        let mut scope = self.clone();
        for param in &generics.params {
            if let GenericParam::Type(type_param) = param {
                scope
                    .generics
                    .entry(type_param.ident.to_string())
                    .or_default()
                    .extend(type_param.bounds.iter().cloned());
            }
        }
        if let Some(where_clause) = &generics.where_clause {
            for predicate in &where_clause.predicates {
                let WherePredicate::Type(predicate) = predicate else {
                    continue;
                };
                let syn::Type::Path(bounded) = &predicate.bounded_ty else {
                    continue;
                };
                let Some(ident) = bounded.path.get_ident() else {
                    continue;
                };
                if let Some(bounds) = scope.generics.get_mut(&ident.to_string()) {
                    bounds.extend(predicate.bounds.iter().cloned());
                }
            }
        }
        scope
    }

    /// Whether `name` is a type parameter in scope
    pub fn is_generic(&self, name: &str) -> bool {
        self.generics.contains_key(name)
    }

    /// Bounds declared for the type parameter `name`
    pub fn bounds_of(&self, name: &str) -> Option<&[TypeParamBound]> {
        self.generics.get(name).map(Vec::as_slice)
    }

    /// Whether the type parameter `name` is bounded by `PartialEq` or `Eq`
    pub fn generic_comparable(&self, name: &str) -> Option<bool> {
        let bounds = self.generics.get(name)?;
        Some(bounds.iter().any(|bound| match bound {
            TypeParamBound::Trait(trait_bound) => trait_bound
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "PartialEq" || segment.ident == "Eq"),
            _ => false,
        }))
    }
}
