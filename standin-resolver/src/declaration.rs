//! Declaration shapes accepted by the resolver

use crate::callback;
use crate::error::{ResolveError, Result};
use crate::package::Package;
use crate::scope::Scope;
use std::sync::Arc;
use syn::{ForeignItem, Item, ItemImpl, Type};
use tracing::debug;

/// A raw declaration, located in its package
///
/// This is the closed set of shapes the resolver turns into a subject;
/// nothing downstream of the resolver sees it.
#[derive(Debug, Clone)]
pub enum Declaration {
    /// A free `fn`, or a `fn` in an `extern` block (recorded as `unsafe`)
    Function {
        /// Declared signature
        sig: syn::Signature,
        /// Declared visibility
        vis: syn::Visibility,
        /// Declaring package
        package: Arc<Package>,
    },
    /// A trait
    Contract {
        /// The trait item
        item: syn::ItemTrait,
        /// Declaring package
        package: Arc<Package>,
    },
    /// A struct, enum or union together with its inherent `impl` blocks
    StructWithMethods {
        /// Type name
        ident: syn::Ident,
        /// Type generics
        generics: syn::Generics,
        /// Declared visibility
        vis: syn::Visibility,
        /// Inherent impls found in the package
        impls: Vec<ItemImpl>,
        /// Declaring package
        package: Arc<Package>,
    },
    /// A type alias of a callable type
    FunctionType {
        /// The alias item
        alias: syn::ItemType,
        /// Declaring package
        package: Arc<Package>,
    },
}

impl Declaration {
    /// Find the declaration named `name` in `package`
    pub fn find(package: Arc<Package>, name: &str) -> Result<Self> {
        for item in &package.items {
            let found = match item {
                Item::Fn(item) if item.sig.ident == name => Some(Declaration::Function {
                    sig: item.sig.clone(),
                    vis: item.vis.clone(),
                    package: package.clone(),
                }),
                Item::Trait(item) if item.ident == name => Some(Declaration::Contract {
                    item: item.clone(),
                    package: package.clone(),
                }),
                Item::Struct(item) if item.ident == name => {
                    Some(Self::with_methods(&item.ident, &item.generics, &item.vis, &package))
                }
                Item::Enum(item) if item.ident == name => {
                    Some(Self::with_methods(&item.ident, &item.generics, &item.vis, &package))
                }
                Item::Union(item) if item.ident == name => {
                    Some(Self::with_methods(&item.ident, &item.generics, &item.vis, &package))
                }
                Item::Type(alias) if alias.ident == name => {
                    let scope = Scope::new(&package).with_generics(&alias.generics);
                    if callback::classify(&alias.ty, &scope).is_none() {
                        return Err(ResolveError::UnsupportedShape {
                            name: name.to_string(),
                            reason: "type alias does not name a function type".to_string(),
                        });
                    }
                    Some(Declaration::FunctionType {
                        alias: alias.clone(),
                        package: package.clone(),
                    })
                }
                Item::ForeignMod(foreign) => foreign.items.iter().find_map(|foreign_item| {
                    match foreign_item {
                        ForeignItem::Fn(item) if item.sig.ident == name => {
                            let mut sig = item.sig.clone();
                            if sig.unsafety.is_none() {
                                sig.unsafety = Some(Default::default());
                            }
                            Some(Declaration::Function {
                                sig,
                                vis: item.vis.clone(),
                                package: package.clone(),
                            })
                        }
                        _ => None,
                    }
                }),
                _ => None,
            };
            if let Some(declaration) = found {
                debug!(
                    "Found {} `{}` in {}",
                    declaration.shape(),
                    name,
                    package.module_path
                );
                return Ok(declaration);
            }
        }
        Err(ResolveError::NotFound {
            name: name.to_string(),
            package: package.import_path.clone(),
        })
    }

    fn with_methods(
        ident: &syn::Ident,
        generics: &syn::Generics,
        vis: &syn::Visibility,
        package: &Arc<Package>,
    ) -> Self {
        let impls = package
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Impl(item_impl)
                    if item_impl.trait_.is_none() && self_type_is(&item_impl.self_ty, ident) =>
                {
                    Some(item_impl.clone())
                }
                _ => None,
            })
            .collect();
        Declaration::StructWithMethods {
            ident: ident.clone(),
            generics: generics.clone(),
            vis: vis.clone(),
            impls,
            package: package.clone(),
        }
    }

    /// Declared name
    pub fn name(&self) -> String {
        match self {
            Declaration::Function { sig, .. } => sig.ident.to_string(),
            Declaration::Contract { item, .. } => item.ident.to_string(),
            Declaration::StructWithMethods { ident, .. } => ident.to_string(),
            Declaration::FunctionType { alias, .. } => alias.ident.to_string(),
        }
    }

    /// Declaring package
    pub fn package(&self) -> &Arc<Package> {
        match self {
            Declaration::Function { package, .. }
            | Declaration::Contract { package, .. }
            | Declaration::StructWithMethods { package, .. }
            | Declaration::FunctionType { package, .. } => package,
        }
    }

    /// Whether the declaration is a function or function type
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Declaration::Function { .. } | Declaration::FunctionType { .. }
        )
    }

    /// Short description of the shape, for logs and diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            Declaration::Function { .. } => "function",
            Declaration::Contract { .. } => "trait",
            Declaration::StructWithMethods { .. } => "type with methods",
            Declaration::FunctionType { .. } => "function type",
        }
    }
}

fn self_type_is(ty: &Type, ident: &syn::Ident) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == *ident),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::LOCAL;

    fn package(source: &str) -> Arc<Package> {
        Arc::new(Package::parse(LOCAL, "crate", source, None).unwrap())
    }

    #[test]
    fn test_finds_each_shape() {
        let package = package(
            r#"
            pub fn add(a: i32, b: i32) -> i32 { a + b }
            pub trait Store { fn get(&self) -> u8; }
            pub struct Cache;
            impl Cache { pub fn size(&self) -> usize { 0 } }
            impl Default for Cache { fn default() -> Self { Cache } }
            pub type Op = fn(i32, i32) -> i32;
            pub type Name = String;
            extern "C" { fn printf(fmt: *const u8, ...) -> i32; }
            "#,
        );
        assert_eq!(Declaration::find(package.clone(), "add").unwrap().shape(), "function");
        assert_eq!(Declaration::find(package.clone(), "Store").unwrap().shape(), "trait");
        match Declaration::find(package.clone(), "Cache").unwrap() {
            Declaration::StructWithMethods { impls, .. } => assert_eq!(impls.len(), 1),
            other => panic!("unexpected {}", other.shape()),
        }
        assert_eq!(Declaration::find(package.clone(), "Op").unwrap().shape(), "function type");
        assert!(Declaration::find(package.clone(), "printf").unwrap().is_function());
        assert!(matches!(
            Declaration::find(package.clone(), "Name"),
            Err(ResolveError::UnsupportedShape { .. })
        ));
        assert!(matches!(
            Declaration::find(package, "missing"),
            Err(ResolveError::NotFound { .. })
        ));
    }
}
