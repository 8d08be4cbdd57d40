//! Type-parameter substitution

use crate::error::{ResolveError, Result};
use rustc_hash::FxHashMap;
use syn::visit_mut::{self, VisitMut};
use syn::{GenericParam, Generics, Type};

/// Maps type-parameter names to the types that instantiate them
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: FxHashMap<String, Type>,
}

impl Substitution {
    /// Pair the type parameters of `generics` with `arguments`
    ///
    /// Empty `arguments` yields the identity substitution.
    pub fn new(name: &str, generics: &Generics, arguments: &[Type]) -> Result<Self> {
        if arguments.is_empty() {
            return Ok(Self::default());
        }
        let params: Vec<String> = type_param_names(generics);
        if params.len() != arguments.len() {
            return Err(ResolveError::TypeArguments {
                name: name.to_string(),
                expected: params.len(),
                got: arguments.len(),
            });
        }
        Ok(Self {
            map: params.into_iter().zip(arguments.iter().cloned()).collect(),
        })
    }

    /// Substitution from explicit name/type pairs
    pub fn from_pairs(pairs: Vec<(String, Type)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Substitution for a supertrait: its parameters map to `arguments`
    /// after `self` has been applied to them
    pub fn nested(&self, generics: &Generics, arguments: &[Type]) -> Self {
        let map = type_param_names(generics)
            .into_iter()
            .zip(arguments.iter().map(|arg| self.apply_type(arg)))
            .collect();
        Self { map }
    }

    /// Whether nothing is substituted
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether `name` is substituted
    pub fn binds(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Apply to a type
    pub fn apply_type(&self, ty: &Type) -> Type {
        let mut ty = ty.clone();
        if !self.is_empty() {
            Substitute { map: &self.map }.visit_type_mut(&mut ty);
        }
        ty
    }

    /// Apply to a path
    pub fn apply_path(&self, path: &syn::Path) -> syn::Path {
        let mut path = path.clone();
        if !self.is_empty() {
            Substitute { map: &self.map }.visit_path_mut(&mut path);
        }
        path
    }

    /// Apply to a bound
    pub fn apply_bound(&self, bound: &syn::TypeParamBound) -> syn::TypeParamBound {
        let mut bound = bound.clone();
        if !self.is_empty() {
            Substitute { map: &self.map }.visit_type_param_bound_mut(&mut bound);
        }
        bound
    }

    /// Apply to a whole signature
    pub fn apply_signature(&self, sig: &syn::Signature) -> syn::Signature {
        let mut sig = sig.clone();
        if !self.is_empty() {
            Substitute { map: &self.map }.visit_signature_mut(&mut sig);
        }
        sig
    }
}

/// Names of the type parameters of `generics`, in order
pub fn type_param_names(generics: &Generics) -> Vec<String> {
    generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(type_param) => Some(type_param.ident.to_string()),
            _ => None,
        })
        .collect()
}

struct Substitute<'m> {
    map: &'m FxHashMap<String, Type>,
}

impl VisitMut for Substitute<'_> {
    // A rewritten receiver type prints as `&self: &T`, which is not a valid signature
    fn visit_receiver_mut(&mut self, _: &mut syn::Receiver) {}

    fn visit_type_mut(&mut self, ty: &mut Type) {
        if let Type::Path(path) = ty {
            if path.qself.is_none() {
                if let Some(ident) = path.path.get_ident() {
                    if let Some(replacement) = self.map.get(&ident.to_string()) {
                        *ty = replacement.clone();
                        return;
                    }
                }
            }
        }
        visit_mut::visit_type_mut(self, ty);
    }
}
