//! Recognizing callable parameter types

use crate::scope::Scope;
use standin_core::{CallableKind, CallablePassing};
use syn::{GenericArgument, Item, PathArguments, ReturnType, Type, TypeParamBound};

/// Shape of a callable type before its signature is resolved
#[derive(Debug, Clone)]
pub struct CallableShape {
    /// Which `Fn*` trait applies
    pub kind: CallableKind,
    /// How the callable is handed over
    pub passing: CallablePassing,
    /// Argument types
    pub inputs: Vec<Type>,
    /// Return type
    pub output: ReturnType,
    /// Bounds other than the `Fn*` bound
    pub extra_bounds: Vec<TypeParamBound>,
    /// Type parameter naming the callable
    pub generic: Option<String>,
}

/// Classify `ty` as a callable, if it is one
///
/// Recognized: `&dyn Fn..`, `&mut dyn FnMut..`, `Box<dyn Fn..>`,
/// `impl Fn..`, a type parameter bounded by `Fn*` (by value or by
/// reference), `fn(..)` pointers, and local aliases of any of these.
pub fn classify(ty: &Type, scope: &Scope<'_>) -> Option<CallableShape> {
    classify_at(ty, scope, 0)
}

fn classify_at(ty: &Type, scope: &Scope<'_>, depth: usize) -> Option<CallableShape> {
    match ty {
        Type::Paren(inner) => classify_at(&inner.elem, scope, depth),
        Type::Group(inner) => classify_at(&inner.elem, scope, depth),
        Type::Reference(reference) => {
            let passing = if reference.mutability.is_some() {
                CallablePassing::BorrowedMut
            } else {
                CallablePassing::Borrowed
            };
            let mut shape = match peel(&reference.elem) {
                Type::TraitObject(object) => from_bounds(object.bounds.iter())?,
                Type::ImplTrait(opaque) => from_bounds(opaque.bounds.iter())?,
                Type::Path(path) => generic_shape(&path.path, scope)?,
                _ => return None,
            };
            shape.passing = passing;
            Some(shape)
        }
        Type::ImplTrait(opaque) => from_bounds(opaque.bounds.iter()),
        Type::BareFn(bare) => {
            if bare.variadic.is_some() {
                return None;
            }
            Some(CallableShape {
                kind: CallableKind::Pointer,
                passing: CallablePassing::Owned,
                inputs: bare.inputs.iter().map(|arg| arg.ty.clone()).collect(),
                output: bare.output.clone(),
                extra_bounds: Vec::new(),
                generic: None,
            })
        }
        Type::Path(path) if path.qself.is_none() => {
            if let Some(boxed) = boxed_object(&path.path) {
                let mut shape = from_bounds(boxed)?;
                shape.passing = CallablePassing::Boxed;
                return Some(shape);
            }
            if let Some(shape) = generic_shape(&path.path, scope) {
                return Some(shape);
            }
            if depth > 0 {
                return None;
            }
            let ident = path.path.get_ident()?;
            match scope.package.item(&ident.to_string())? {
                Item::Type(alias) if alias.generics.params.is_empty() => {
                    classify_at(&alias.ty, scope, depth + 1)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn peel(ty: &Type) -> &Type {
    match ty {
        Type::Paren(inner) => peel(&inner.elem),
        Type::Group(inner) => peel(&inner.elem),
        other => other,
    }
}

fn boxed_object(path: &syn::Path) -> Option<syn::punctuated::Iter<'_, TypeParamBound>> {
    let last = path.segments.last()?;
    if last.ident != "Box" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(ty) => match peel(ty) {
            Type::TraitObject(object) => Some(object.bounds.iter()),
            _ => None,
        },
        _ => None,
    }
}

fn generic_shape(path: &syn::Path, scope: &Scope<'_>) -> Option<CallableShape> {
    let ident = path.get_ident()?.to_string();
    let bounds = scope.bounds_of(&ident)?;
    let mut shape = from_bounds(bounds.iter())?;
    shape.generic = Some(ident);
    Some(shape)
}

fn from_bounds<'b>(bounds: impl Iterator<Item = &'b TypeParamBound>) -> Option<CallableShape> {
    let mut callable = None;
    let mut extra_bounds = Vec::new();
    for bound in bounds {
        match fn_trait(bound) {
            Some(found) if callable.is_none() => callable = Some(found),
            _ => extra_bounds.push(bound.clone()),
        }
    }
    let (kind, inputs, output) = callable?;
    Some(CallableShape {
        kind,
        passing: CallablePassing::Owned,
        inputs,
        output,
        extra_bounds,
        generic: None,
    })
}

fn fn_trait(bound: &TypeParamBound) -> Option<(CallableKind, Vec<Type>, ReturnType)> {
    let TypeParamBound::Trait(trait_bound) = bound else {
        return None;
    };
    let last = trait_bound.path.segments.last()?;
    let kind = match last.ident.to_string().as_str() {
        "Fn" => CallableKind::Fn,
        "FnMut" => CallableKind::FnMut,
        "FnOnce" => CallableKind::FnOnce,
        _ => return None,
    };
    let PathArguments::Parenthesized(args) = &last.arguments else {
        return None;
    };
    Some((kind, args.inputs.iter().cloned().collect(), args.output.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Package, LOCAL};
    use syn::parse_quote;

    fn package() -> Package {
        Package::parse(
            LOCAL,
            "crate",
            "pub type Visitor = Box<dyn FnMut(&str) -> bool + Send>; pub struct Plain;",
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_borrowed_trait_objects() {
        let package = package();
        let scope = Scope::new(&package);
        let shape = classify(&parse_quote!(&dyn Fn(u32) -> u32), &scope).unwrap();
        assert_eq!(shape.kind, CallableKind::Fn);
        assert_eq!(shape.passing, CallablePassing::Borrowed);
        assert_eq!(shape.inputs.len(), 1);

        let shape = classify(&parse_quote!(&mut (dyn FnMut(&[u8]) + Send)), &scope).unwrap();
        assert_eq!(shape.kind, CallableKind::FnMut);
        assert_eq!(shape.passing, CallablePassing::BorrowedMut);
        assert_eq!(shape.extra_bounds.len(), 1);
    }

    #[test]
    fn test_boxed_impl_and_pointer() {
        let package = package();
        let scope = Scope::new(&package);
        let shape = classify(&parse_quote!(Box<dyn FnOnce() + Send + 'static>), &scope).unwrap();
        assert_eq!(shape.kind, CallableKind::FnOnce);
        assert_eq!(shape.passing, CallablePassing::Boxed);
        assert_eq!(shape.extra_bounds.len(), 2);

        let shape = classify(&parse_quote!(impl Fn(i64)), &scope).unwrap();
        assert_eq!(shape.passing, CallablePassing::Owned);

        let shape = classify(&parse_quote!(fn(u8, u8) -> u8), &scope).unwrap();
        assert_eq!(shape.kind, CallableKind::Pointer);
        assert_eq!(shape.inputs.len(), 2);
    }

    #[test]
    fn test_generic_parameter_bounded_by_fn() {
        let package = package();
        let generics: syn::Generics = parse_quote!(<F: FnMut(usize) -> bool, T>);
        let scope = Scope::new(&package).with_generics(&generics);
        let shape = classify(&parse_quote!(F), &scope).unwrap();
        assert_eq!(shape.generic.as_deref(), Some("F"));
        assert_eq!(shape.passing, CallablePassing::Owned);

        let shape = classify(&parse_quote!(&mut F), &scope).unwrap();
        assert_eq!(shape.passing, CallablePassing::BorrowedMut);
        assert!(classify(&parse_quote!(T), &scope).is_none());
    }

    #[test]
    fn test_local_alias_is_followed() {
        let package = package();
        let scope = Scope::new(&package);
        let shape = classify(&parse_quote!(Visitor), &scope).unwrap();
        assert_eq!(shape.kind, CallableKind::FnMut);
        assert_eq!(shape.passing, CallablePassing::Boxed);
        assert!(classify(&parse_quote!(Plain), &scope).is_none());
        assert!(classify(&parse_quote!(&dyn std::fmt::Debug), &scope).is_none());
    }
}
