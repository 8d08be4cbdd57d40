//! Contract expansion: traits with their supertraits, and types with methods

use crate::error::{ResolveError, Result};
use crate::package::{split_item_path, Package};
use crate::qualify::{qualify_bound, qualify_path};
use crate::resolver::{absolute_path, Resolver};
use crate::scope::Scope;
use crate::subst::{type_param_names, Substitution};
use rustc_hash::FxHashSet;
use standin_core::naming::snake_case;
use standin_core::{
    ContractKind, ContractSubject, ExternalRef, Method, ReceiverKind, TraitRef, TypeParameter,
    Visibility,
};
use std::sync::Arc;
use syn::{
    GenericArgument, GenericParam, Generics, ImplItem, Item, ItemImpl, ItemTrait, PathArguments,
    TraitItem, Type, TypeParamBound,
};
use tracing::{debug, warn};

/// Supertraits that carry no methods and are skipped during expansion
const MARKERS: &[&str] = &[
    "Send", "Sync", "Sized", "Unpin", "Clone", "Copy", "Debug", "Display", "Default", "Eq",
    "PartialEq", "Ord", "PartialOrd", "Hash", "Any",
];

/// Markers a generated double satisfies on its own
const SATISFIED: &[&str] = &["Send", "Sync", "Sized", "Unpin", "Clone", "Debug", "Any"];

#[derive(Default)]
struct Expansion {
    visited: FxHashSet<String>,
    stack: Vec<String>,
    traits: Vec<TraitRef>,
    methods: Vec<Method>,
    names: FxHashSet<String>,
    keys: FxHashSet<String>,
}

impl Expansion {
    fn key_for(&mut self, trait_name: &str, name: &str) -> String {
        let mut key = if self.names.insert(name.to_string()) {
            name.to_string()
        } else {
            let renamed = format!("{}_{}", snake_case(trait_name), name);
            debug!(
                "Method `{}` of `{}` is also declared by another contract; keyed as `{}`",
                name, trait_name, renamed
            );
            renamed
        };
        while !self.keys.insert(key.clone()) {
            key.push('_');
        }
        key
    }
}

impl Resolver<'_> {
    /// Resolve a trait and splice in the methods of every supertrait
    pub(crate) fn contract(
        &self,
        item: &ItemTrait,
        package: &Arc<Package>,
        type_arguments: &[Type],
    ) -> Result<ContractSubject> {
        let name = item.ident.to_string();
        let subst = Substitution::new(&name, &item.generics, type_arguments)?;
        let scope = Scope::new(package).with_generics(&item.generics);
        let (type_params, externals) = self.open_params(&item.generics, &scope, &subst);

        let visibility = crate::package::visibility(&item.vis);
        let own = ExternalRef {
            name: name.clone(),
            path: package.item_path(&name),
            local: package.is_local(),
            visibility,
        };
        let path = instantiated_path(&name, &item.generics, type_arguments);

        let mut expansion = Expansion::default();
        self.expand(&mut expansion, item, package, &subst, path, vec![own])?;
        if expansion.methods.is_empty() {
            return Err(ResolveError::NoMethods { name });
        }
        debug!(
            "Contract `{}` expanded to {} trait(s) and {} method(s)",
            name,
            expansion.traits.len(),
            expansion.methods.len()
        );
        Ok(ContractSubject {
            name,
            kind: ContractKind::Trait,
            type_params,
            traits: expansion.traits,
            methods: expansion.methods,
            externals,
            package: package.import_path.clone(),
            public: visibility == Visibility::Public,
        })
    }

    fn expand(
        &self,
        expansion: &mut Expansion,
        item: &ItemTrait,
        package: &Arc<Package>,
        subst: &Substitution,
        path: syn::Path,
        externals: Vec<ExternalRef>,
    ) -> Result<()> {
        let name = item.ident.to_string();
        let key = package.item_path(&name);
        if expansion.stack.contains(&key) {
            let mut cycle = expansion.stack.clone();
            cycle.push(key);
            return Err(ResolveError::CyclicEmbedding {
                path: cycle.join(" -> "),
            });
        }
        if !expansion.visited.insert(key.clone()) {
            debug!("Contract {} already expanded through another path", key);
            return Ok(());
        }
        check_trait_shape(item)?;
        expansion.stack.push(key);

        let origin = expansion.traits.len();
        expansion.traits.push(TraitRef {
            name: name.clone(),
            path,
            externals,
        });

        let scope = Scope::new(package).with_generics(&item.generics);
        for trait_item in &item.items {
            match trait_item {
                TraitItem::Fn(function) => {
                    let method_name = function.sig.ident.to_string();
                    let owner = format!("{name}::{method_name}");
                    let resolved = self.signature(&owner, &function.sig, &scope, subst)?;
                    let key = expansion.key_for(&name, &method_name);
                    expansion.methods.push(Method {
                        name: method_name,
                        key,
                        origin,
                        receiver: ReceiverKind::of(&function.sig),
                        decl: resolved.decl,
                        signature: resolved.signature,
                    });
                }
                TraitItem::Type(assoc) => {
                    return Err(ResolveError::UnsupportedShape {
                        name: format!("{name}::{}", assoc.ident),
                        reason: "associated types are not supported".to_string(),
                    });
                }
                TraitItem::Const(assoc) => {
                    return Err(ResolveError::UnsupportedShape {
                        name: format!("{name}::{}", assoc.ident),
                        reason: "associated constants are not supported".to_string(),
                    });
                }
                _ => warn!("Skipping unrecognized item in trait `{}`", name),
            }
        }

        for bound in &item.supertraits {
            let TypeParamBound::Trait(trait_bound) = bound else {
                continue;
            };
            let Some(last) = trait_bound.path.segments.last() else {
                continue;
            };
            let super_name = last.ident.to_string();
            if MARKERS.contains(&super_name.as_str()) {
                if !SATISFIED.contains(&super_name.as_str()) {
                    warn!(
                        "Supertrait `{}` of `{}` is skipped; generated doubles do not implement it",
                        super_name, name
                    );
                }
                continue;
            }
            let (super_item, super_package) =
                self.find_trait(&trait_bound.path, &scope, package, &name)?;
            let (qualified, mut super_externals) = qualify_path(&trait_bound.path, &scope);
            if trait_bound.path.segments.len() == 1 && !Arc::ptr_eq(&super_package, package) {
                // A glob import is only settled by loading; record where the trait was found
                let declared = super_item.ident.to_string();
                for external in &mut super_externals {
                    if external.name == super_name {
                        external.path = super_package.item_path(&declared);
                        if let Some(visibility) = super_package.visibility_of(&declared) {
                            external.visibility = visibility;
                        }
                    }
                }
            }
            let arguments = type_arguments_of(&qualified);
            let nested = subst.nested(&super_item.generics, &arguments);
            let super_path = subst.apply_path(&qualified);
            self.expand(
                expansion,
                &super_item,
                &super_package,
                &nested,
                super_path,
                super_externals,
            )?;
        }

        expansion.stack.pop();
        Ok(())
    }

    fn find_trait(
        &self,
        path: &syn::Path,
        scope: &Scope<'_>,
        package: &Arc<Package>,
        contract: &str,
    ) -> Result<(ItemTrait, Arc<Package>)> {
        let written = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>();
        let unresolvable = |reason: String| ResolveError::UnresolvableEmbedded {
            contract: contract.to_string(),
            name: written.join("::"),
            reason,
        };

        let candidates: Vec<String> = if written.len() == 1 {
            let name = &written[0];
            if let Some(Item::Trait(found)) = package.item(name) {
                return Ok((found.clone(), package.clone()));
            }
            match scope.package.uses.get(name) {
                Some(full) => vec![full.to_string()],
                None => scope
                    .package
                    .uses
                    .globs()
                    .iter()
                    .map(|glob| format!("{glob}::{name}"))
                    .collect(),
            }
        } else {
            let absolute = package.absolute(&written);
            let full = match scope.package.uses.get(&absolute[0]) {
                Some(prefix) => std::iter::once(prefix.to_string())
                    .chain(absolute[1..].iter().cloned())
                    .collect::<Vec<_>>()
                    .join("::"),
                None => absolute.join("::"),
            };
            vec![full]
        };

        // Globs are tried in source order; the first module declaring the
        // trait wins and the last failure is reported
        let mut failure = unresolvable(format!(
            "not declared in {} and not imported",
            package.module_path
        ));
        for full in &candidates {
            let Some((module, name)) = split_item_path(full) else {
                failure = unresolvable(format!("`{full}` has no module path"));
                continue;
            };
            let loaded = match self.context.loader.load(module) {
                Ok(loaded) => loaded,
                Err(err) => {
                    failure = unresolvable(err.to_string());
                    continue;
                }
            };
            match loaded.item(name) {
                Some(Item::Trait(found)) => return Ok((found.clone(), loaded.clone())),
                Some(_) => failure = unresolvable(format!("`{full}` is not a trait")),
                None => failure = unresolvable(format!("`{name}` not found in {module}")),
            }
        }
        Err(failure)
    }

    /// Resolve the inherent methods of a struct, enum or union as a contract
    pub(crate) fn struct_contract(
        &self,
        ident: &syn::Ident,
        generics: &Generics,
        visibility: Visibility,
        impls: &[ItemImpl],
        package: &Arc<Package>,
        type_arguments: &[Type],
    ) -> Result<ContractSubject> {
        let name = ident.to_string();
        if generics
            .params
            .iter()
            .any(|param| !matches!(param, GenericParam::Type(_)))
        {
            return Err(ResolveError::UnsupportedShape {
                name,
                reason: "lifetime and const parameters are not supported".to_string(),
            });
        }
        let subst = Substitution::new(&name, generics, type_arguments)?;
        let scope = Scope::new(package).with_generics(generics);
        let (type_params, externals) = self.open_params(generics, &scope, &subst);
        let path = instantiated_path(&name, generics, type_arguments);
        let self_type = Type::Path(syn::TypePath {
            qself: None,
            path: path.clone(),
        });

        let mut candidates = Vec::new();
        for item_impl in impls {
            let renames = impl_renames(item_impl, generics);
            for impl_item in &item_impl.items {
                let ImplItem::Fn(function) = impl_item else {
                    continue;
                };
                let method_name = function.sig.ident.to_string();
                if function.sig.receiver().is_none() {
                    debug!("Skipping associated function {}::{}", name, method_name);
                    continue;
                }
                if !package.is_local() && !matches!(function.vis, syn::Visibility::Public(_)) {
                    debug!("Skipping non-public method {}::{}", name, method_name);
                    continue;
                }
                let sig = renames.apply_signature(&function.sig);
                candidates.push((method_name, sig));
            }
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let self_subst = Substitution::from_pairs(vec![("Self".to_string(), self_type)]);
        let mut methods = Vec::new();
        for (method_name, sig) in candidates {
            let owner = format!("{name}::{method_name}");
            let sig = self_subst.apply_signature(&sig);
            let resolved = self.signature(&owner, &sig, &scope, &subst)?;
            methods.push(Method {
                key: method_name.clone(),
                name: method_name,
                origin: 0,
                receiver: ReceiverKind::of(&sig),
                decl: resolved.decl,
                signature: resolved.signature,
            });
        }
        if methods.is_empty() {
            return Err(ResolveError::NoMethods { name });
        }
        debug!("Type `{}` has {} method(s)", name, methods.len());

        let own = ExternalRef {
            name: name.clone(),
            path: package.item_path(&name),
            local: package.is_local(),
            visibility,
        };
        Ok(ContractSubject {
            name: name.clone(),
            kind: ContractKind::Struct,
            type_params,
            traits: vec![TraitRef {
                name,
                path,
                externals: vec![own],
            }],
            methods,
            externals,
            package: package.import_path.clone(),
            public: visibility == Visibility::Public,
        })
    }

    fn open_params(
        &self,
        generics: &Generics,
        scope: &Scope<'_>,
        subst: &Substitution,
    ) -> (Vec<TypeParameter>, Vec<ExternalRef>) {
        if !subst.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let mut externals = Vec::new();
        let type_params = type_param_names(generics)
            .into_iter()
            .map(|name| {
                let bounds = scope
                    .bounds_of(&name)
                    .unwrap_or_default()
                    .iter()
                    .map(|bound| {
                        let (bound, names) = qualify_bound(bound, scope);
                        externals.extend(names);
                        bound
                    })
                    .collect();
                TypeParameter {
                    name,
                    bounds,
                    callback: false,
                }
            })
            .collect();
        (type_params, externals)
    }
}

fn check_trait_shape(item: &ItemTrait) -> Result<()> {
    for param in &item.generics.params {
        let reason = match param {
            GenericParam::Lifetime(lifetime) => {
                format!("lifetime parameter `{}` is not supported", lifetime.lifetime)
            }
            GenericParam::Const(constant) => {
                format!("const generic parameter `{}` is not supported", constant.ident)
            }
            GenericParam::Type(_) => continue,
        };
        return Err(ResolveError::UnsupportedShape {
            name: item.ident.to_string(),
            reason,
        });
    }
    Ok(())
}

/// `Name` or `Name<args..>`, where args are the supplied type arguments or
/// the declared parameter names
fn instantiated_path(name: &str, generics: &Generics, type_arguments: &[Type]) -> syn::Path {
    let mut path = absolute_path(name);
    let arguments: Vec<Type> = if type_arguments.is_empty() {
        type_param_names(generics)
            .iter()
            .map(|param| Type::Path(syn::TypePath {
                qself: None,
                path: absolute_path(param),
            }))
            .collect()
    } else {
        type_arguments.to_vec()
    };
    if !arguments.is_empty() {
        if let Some(last) = path.segments.last_mut() {
            last.arguments = PathArguments::AngleBracketed(syn::AngleBracketedGenericArguments {
                colon2_token: None,
                lt_token: Default::default(),
                args: arguments.into_iter().map(GenericArgument::Type).collect(),
                gt_token: Default::default(),
            });
        }
    }
    path
}

fn type_arguments_of(path: &syn::Path) -> Vec<Type> {
    let Some(last) = path.segments.last() else {
        return Vec::new();
    };
    match &last.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Map an impl block's own parameter names onto the type's parameter names
fn impl_renames(item_impl: &ItemImpl, generics: &Generics) -> Substitution {
    let Type::Path(self_ty) = item_impl.self_ty.as_ref() else {
        return Substitution::default();
    };
    let declared = type_param_names(generics);
    let written = type_arguments_of(&self_ty.path);
    let pairs = written
        .iter()
        .zip(declared.iter())
        .filter_map(|(written, declared)| match written {
            Type::Path(path) => {
                let ident = path.path.get_ident()?.to_string();
                (ident != *declared).then(|| {
                    (
                        ident,
                        Type::Path(syn::TypePath {
                            qself: None,
                            path: absolute_path(declared),
                        }),
                    )
                })
            }
            _ => None,
        })
        .collect();
    Substitution::from_pairs(pairs)
}
