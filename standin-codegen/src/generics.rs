//! Generic parameter lists of generated items
//!
//! Records are generic only over the contract parameters their fields
//! mention. The union, the double and the wrapper carry every parameter.
//! Bounds are only ever written on `impl` blocks.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use standin_core::TypeParameter;
use std::collections::BTreeSet;
use syn::visit::{self, Visit};
use syn::{TraitBoundModifier, Type, TypeParamBound};

/// An ordered subset of a contract's type parameters
#[derive(Debug, Clone, Default)]
pub struct Params {
    params: Vec<TypeParameter>,
}

impl Params {
    /// All of `params`
    pub fn new(params: &[TypeParameter]) -> Self {
        Self {
            params: params.to_vec(),
        }
    }

    /// The parameters some type in `types` mentions, in declaration order
    pub fn used_by<'t>(&self, types: impl IntoIterator<Item = &'t Type>) -> Self {
        let mut scan = NameScan::default();
        for ty in types {
            scan.visit_type(ty);
        }
        Self {
            params: self
                .params
                .iter()
                .filter(|param| scan.names.contains(&param.name))
                .cloned()
                .collect(),
        }
    }

    /// Parameters in `self` that no type in `types` mentions
    pub fn unused_by<'t>(&self, types: impl IntoIterator<Item = &'t Type>) -> Self {
        let used = self.used_by(types);
        Self {
            params: self
                .params
                .iter()
                .filter(|param| !used.params.iter().any(|u| u.name == param.name))
                .cloned()
                .collect(),
        }
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn idents(&self) -> Vec<proc_macro2::Ident> {
        self.params
            .iter()
            .map(|param| format_ident!("{}", param.name))
            .collect()
    }

    /// `<T, U>`, or nothing
    pub fn args(&self) -> TokenStream {
        if self.params.is_empty() {
            return TokenStream::new();
        }
        let idents = self.idents();
        quote!(<#(#idents),*>)
    }

    /// `<'a, T, U>`
    pub fn args_with_lifetime(&self) -> TokenStream {
        let idents = self.idents();
        quote!(<'a #(, #idents)*>)
    }

    /// `<'_, T, U>`
    pub fn args_with_anonymous_lifetime(&self) -> TokenStream {
        let idents = self.idents();
        quote!(<'_ #(, #idents)*>)
    }

    fn bound_list(&self) -> Vec<TokenStream> {
        self.params
            .iter()
            .map(|param| {
                let ident = format_ident!("{}", param.name);
                let bounds = param.bounds.iter().filter(|bound| !is_maybe(bound));
                quote!(#ident: #(#bounds +)* ::std::marker::Send + 'static)
            })
            .collect()
    }

    /// `<T: Declared + Send + 'static, ..>`, or nothing
    pub fn bounded(&self) -> TokenStream {
        if self.params.is_empty() {
            return TokenStream::new();
        }
        let bounds = self.bound_list();
        quote!(<#(#bounds),*>)
    }

    /// `<'a, T: Declared + Send + 'static, ..>`
    pub fn bounded_with_lifetime(&self) -> TokenStream {
        let bounds = self.bound_list();
        quote!(<'a #(, #bounds)*>)
    }

    /// `PhantomData` over the parameters, as a type
    pub fn phantom(&self) -> TokenStream {
        let idents = self.idents();
        quote!(::std::marker::PhantomData<fn() -> (#(#idents,)*)>)
    }
}

fn is_maybe(bound: &TypeParamBound) -> bool {
    matches!(bound, TypeParamBound::Trait(trait_bound) if matches!(trait_bound.modifier, TraitBoundModifier::Maybe(_)))
}

#[derive(Default)]
struct NameScan {
    names: BTreeSet<String>,
}

impl<'ast> Visit<'ast> for NameScan {
    fn visit_path(&mut self, path: &'ast syn::Path) {
        if path.leading_colon.is_none() {
            if let Some(first) = path.segments.first() {
                self.names.insert(first.ident.to_string());
            }
        }
        visit::visit_path(self, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn param(name: &str, bounds: Vec<TypeParamBound>) -> TypeParameter {
        TypeParameter {
            name: name.to_string(),
            bounds,
            callback: false,
        }
    }

    #[test]
    fn test_used_by_keeps_declaration_order() {
        let params = Params::new(&[param("K", vec![]), param("V", vec![])]);
        let types: Vec<Type> = vec![parse_quote!(Option<V>), parse_quote!(Vec<(K, u8)>)];
        assert_eq!(params.used_by(&types).args().to_string(), "< K , V >");
        let only_v: Vec<Type> = vec![parse_quote!(V)];
        assert_eq!(params.used_by(&only_v).args().to_string(), "< V >");
        assert!(params.used_by(&Vec::<Type>::new()).args().is_empty());
        assert_eq!(params.unused_by(&only_v).args().to_string(), "< K >");
    }

    #[test]
    fn test_bounds_add_send_and_drop_maybe_sized() {
        let params = Params::new(&[param(
            "T",
            vec![parse_quote!(Clone), parse_quote!(?Sized)],
        )]);
        assert_eq!(
            params.bounded().to_string(),
            "< T : Clone + :: std :: marker :: Send + 'static >"
        );
        assert_eq!(
            params.bounded_with_lifetime().to_string(),
            "< 'a , T : Clone + :: std :: marker :: Send + 'static >"
        );
    }
}
