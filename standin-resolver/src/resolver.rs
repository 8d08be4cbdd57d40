//! Declaration to subject resolution

use crate::declaration::Declaration;
use crate::error::{ResolveError, Result};
use crate::loader::PackageLoader;
use crate::package::{visibility, Package};
use crate::scope::Scope;
use crate::subst::Substitution;
use crate::typeinfo::TypeInfo;
use quote::{format_ident, quote};
use standin_core::{FunctionSubject, GenerationRequest, Subject, Visibility};
use std::sync::Arc;
use syn::punctuated::Punctuated;
use syn::{Path, PathSegment, Type};
use tracing::{debug, info};

/// Collaborators the resolver reads declarations and type facts through
#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// Fetches packages by import path
    pub loader: &'a dyn PackageLoader,
    /// Classifies comparability
    pub type_info: &'a dyn TypeInfo,
}

/// Turns declarations into subjects
pub struct Resolver<'a> {
    pub(crate) context: ResolutionContext<'a>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over the given collaborators
    pub fn new(context: ResolutionContext<'a>) -> Self {
        Self { context }
    }

    /// Locate the declaration a request names
    pub fn find(&self, request: &GenerationRequest) -> Result<Declaration> {
        let package = self.context.loader.load(&request.package_name)?;
        Declaration::find(package, &request.target_name)
    }

    /// Locate and resolve the declaration a request names
    pub fn resolve_request(&self, request: &GenerationRequest) -> Result<(Declaration, Subject)> {
        let declaration = self.find(request)?;
        let type_arguments = request.parsed_type_arguments()?;
        let subject = self.resolve(&declaration, &type_arguments)?;
        Ok((declaration, subject))
    }

    /// Resolve a declaration, instantiating it with `type_arguments` when given
    pub fn resolve(&self, declaration: &Declaration, type_arguments: &[Type]) -> Result<Subject> {
        info!(
            "Resolving {} `{}` from {}",
            declaration.shape(),
            declaration.name(),
            declaration.package().import_path
        );
        let subject = match declaration {
            Declaration::Function { sig, vis, package } => Subject::Function(self.function(
                sig,
                visibility(vis),
                package,
                type_arguments,
                false,
            )?),
            Declaration::FunctionType { alias, package } => {
                let sig = alias_signature(alias, package)?;
                Subject::Function(self.function(
                    &sig,
                    visibility(&alias.vis),
                    package,
                    type_arguments,
                    true,
                )?)
            }
            Declaration::Contract { item, package } => {
                Subject::Contract(self.contract(item, package, type_arguments)?)
            }
            Declaration::StructWithMethods {
                ident,
                generics,
                vis,
                impls,
                package,
            } => Subject::Contract(self.struct_contract(
                ident,
                generics,
                visibility(vis),
                impls,
                package,
                type_arguments,
            )?),
        };
        debug!("Resolved `{}`", subject.name());
        Ok(subject)
    }

    fn function(
        &self,
        sig: &syn::Signature,
        vis: Visibility,
        package: &Arc<Package>,
        type_arguments: &[Type],
        from_alias: bool,
    ) -> Result<FunctionSubject> {
        let name = sig.ident.to_string();
        let subst = Substitution::new(&name, &sig.generics, type_arguments)?;
        let scope = Scope::new(package);
        let resolved = self.signature(&name, sig, &scope, &subst)?;
        Ok(FunctionSubject {
            name: name.clone(),
            signature: resolved.signature,
            decl: resolved.decl,
            path: absolute_path(&package.item_path(&name)),
            externals: resolved.bound_externals,
            package: package.import_path.clone(),
            public: vis == Visibility::Public,
            from_alias,
        })
    }
}

/// Build a path from `a::b::c` text without re-parsing
pub(crate) fn absolute_path(text: &str) -> Path {
    let segments: Punctuated<PathSegment, syn::Token![::]> = text
        .split("::")
        .map(|segment| PathSegment::from(format_ident!("{}", segment)))
        .collect();
    Path {
        leading_colon: None,
        segments,
    }
}

/// Synthesize the signature of a function-type alias
fn alias_signature(alias: &syn::ItemType, package: &Package) -> Result<syn::Signature> {
    let scope = Scope::new(package).with_generics(&alias.generics);
    let ident = &alias.ident;
    let malformed = |reason: String| ResolveError::MalformedField {
        method: ident.to_string(),
        field: ident.to_string(),
        reason,
    };
    let (inputs, output, variadic) = match alias.ty.as_ref() {
        Type::BareFn(bare) => {
            let inputs: Vec<proc_macro2::TokenStream> = bare
                .inputs
                .iter()
                .map(|arg| {
                    let ty = &arg.ty;
                    match &arg.name {
                        Some((name, _)) => quote!(#name: #ty),
                        None => quote!(_: #ty),
                    }
                })
                .collect();
            (inputs, bare.output.clone(), bare.variadic.is_some())
        }
        other => {
            let shape = crate::callback::classify(other, &scope)
                .ok_or_else(|| malformed("not a function type".to_string()))?;
            let inputs = shape.inputs.iter().map(|ty| quote!(_: #ty)).collect();
            (inputs, shape.output, false)
        }
    };
    let tokens = quote!(fn #ident(#(#inputs),*) #output);
    let mut sig: syn::Signature =
        syn::parse2(tokens).map_err(|err| malformed(err.to_string()))?;
    sig.generics = alias.generics.clone();
    if variadic {
        sig.variadic = Some(syn::Variadic {
            attrs: Vec::new(),
            pat: None,
            dots: Default::default(),
            comma: None,
        });
    }
    Ok(sig)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
