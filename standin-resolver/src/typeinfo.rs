//! Comparability classification

use crate::loader::PackageLoader;
use crate::package::{split_item_path, Package};
use crate::scope::Scope;
use syn::punctuated::Punctuated;
use syn::{GenericArgument, Item, PathArguments, Type};
use tracing::trace;

/// Answers whether values of a type support `==`
///
/// `None` means the answer is unknown, which callers treat as "not
/// comparable".
pub trait TypeInfo {
    /// Classify `ty` as it appears in `scope`
    fn is_comparable(&self, ty: &Type, scope: &Scope<'_>) -> Option<bool>;
}

/// Type information that knows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTypeInfo;

impl TypeInfo for NoTypeInfo {
    fn is_comparable(&self, _ty: &Type, _scope: &Scope<'_>) -> Option<bool> {
        None
    }
}

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
    "i128", "isize", "f32", "f64", "String",
];

const CONTAINERS: &[&str] = &[
    "Option", "Result", "Vec", "VecDeque", "Box", "Rc", "Arc", "Cow", "HashMap", "BTreeMap",
    "HashSet", "BTreeSet", "Reverse", "Wrapping",
];

const COMPARABLE_STD: &[&str] = &[
    "PathBuf", "Path", "OsString", "OsStr", "CString", "CStr", "Duration", "Ordering",
    "IpAddr", "Ipv4Addr", "Ipv6Addr", "SocketAddr", "NonZeroU32", "NonZeroU64", "NonZeroUsize",
];

const MAX_ALIAS_DEPTH: usize = 8;

/// Classifies by structure, standard types, and `#[derive(PartialEq)]` /
/// `impl PartialEq` on named declarations reachable through the loader
pub struct DeriveTypeInfo<'a> {
    loader: &'a dyn PackageLoader,
}

impl<'a> DeriveTypeInfo<'a> {
    /// Classify with declarations fetched from `loader`
    pub fn new(loader: &'a dyn PackageLoader) -> Self {
        Self { loader }
    }

    fn classify(&self, ty: &Type, scope: &Scope<'_>, depth: usize) -> Option<bool> {
        match ty {
            Type::Reference(reference) => self.classify(&reference.elem, scope, depth),
            Type::Paren(inner) => self.classify(&inner.elem, scope, depth),
            Type::Group(inner) => self.classify(&inner.elem, scope, depth),
            Type::Array(array) => self.classify(&array.elem, scope, depth),
            Type::Slice(slice) => self.classify(&slice.elem, scope, depth),
            Type::Tuple(tuple) => all(tuple.elems.iter().map(|elem| self.classify(elem, scope, depth))),
            Type::BareFn(_) => Some(true),
            Type::Path(path) if path.qself.is_none() => self.classify_path(&path.path, scope, depth),
            _ => None,
        }
    }

    fn classify_path(&self, path: &syn::Path, scope: &Scope<'_>, depth: usize) -> Option<bool> {
        let last = path.segments.last()?;
        let name = last.ident.to_string();
        if path.segments.len() == 1 {
            if let Some(comparable) = scope.generic_comparable(&name) {
                return Some(comparable);
            }
            if let Some(answer) = self.declared(scope.package, &name, &last.arguments, scope, depth) {
                return Some(answer);
            }
            if let Some(full) = scope.package.uses.get(&name) {
                if let Some(answer) = self.lookup(full, &last.arguments, scope, depth) {
                    return Some(answer);
                }
            }
        } else {
            let full = path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            if let Some(answer) = self.lookup(&full, &last.arguments, scope, depth) {
                return Some(answer);
            }
        }
        if PRIMITIVES.contains(&name.as_str()) || COMPARABLE_STD.contains(&name.as_str()) {
            return Some(true);
        }
        if CONTAINERS.contains(&name.as_str()) {
            return self.arguments(&last.arguments, scope, depth);
        }
        None
    }

    fn arguments(&self, arguments: &PathArguments, scope: &Scope<'_>, depth: usize) -> Option<bool> {
        match arguments {
            PathArguments::None => Some(true),
            PathArguments::AngleBracketed(args) => all(args.args.iter().filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(self.classify(ty, scope, depth)),
                _ => None,
            })),
            PathArguments::Parenthesized(_) => None,
        }
    }

    fn lookup(
        &self,
        full: &str,
        arguments: &PathArguments,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Option<bool> {
        let (module, name) = split_item_path(full)?;
        let package = self.loader.load(module).ok()?;
        self.declared(&package, name, arguments, scope, depth)
    }

    fn declared(
        &self,
        package: &Package,
        name: &str,
        arguments: &PathArguments,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Option<bool> {
        if depth > MAX_ALIAS_DEPTH {
            return None;
        }
        let item = package.item(name)?;
        let answer = match item {
            Item::Struct(item) => Some(derives_partial_eq(&item.attrs)),
            Item::Enum(item) => Some(derives_partial_eq(&item.attrs)),
            Item::Union(item) => Some(derives_partial_eq(&item.attrs)),
            Item::Type(alias) => {
                let alias_scope = Scope::new(package).with_generics(&alias.generics);
                return self.classify(&alias.ty, &alias_scope, depth + 1);
            }
            _ => None,
        };
        let answer = match answer {
            Some(false) if implements_partial_eq(package, name) => Some(true),
            other => other,
        };
        trace!("{}::{} comparable: {:?}", package.module_path, name, answer);
        match answer {
            Some(true) => match self.arguments(arguments, scope, depth) {
                Some(true) => Some(true),
                _ => Some(false),
            },
            other => other,
        }
    }
}

impl TypeInfo for DeriveTypeInfo<'_> {
    fn is_comparable(&self, ty: &Type, scope: &Scope<'_>) -> Option<bool> {
        self.classify(ty, scope, 0)
    }
}

fn all(answers: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    let mut result = true;
    for answer in answers {
        match answer {
            Some(true) => {}
            Some(false) => result = false,
            None => return None,
        }
    }
    Some(result)
}

fn derives_partial_eq(attrs: &[syn::Attribute]) -> bool {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("derive"))
        .filter_map(|attr| {
            attr.parse_args_with(Punctuated::<syn::Path, syn::Token![,]>::parse_terminated)
                .ok()
        })
        .flatten()
        .any(|path| {
            path.segments
                .last()
                .is_some_and(|segment| segment.ident == "PartialEq")
        })
}

fn implements_partial_eq(package: &Package, name: &str) -> bool {
    package.items.iter().any(|item| {
        let Item::Impl(item_impl) = item else {
            return false;
        };
        let Some((_, trait_path, _)) = &item_impl.trait_ else {
            return false;
        };
        let names_partial_eq = trait_path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "PartialEq");
        let for_name = match item_impl.self_ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == name),
            _ => false,
        };
        names_partial_eq && for_name
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use syn::parse_quote;

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with_local(
                "crate::store",
                r#"
                use crate::model::{Entry, Blob};
                #[derive(Debug, Clone, PartialEq)]
                pub struct User { name: String }
                pub struct Opaque;
                pub struct Manual;
                impl PartialEq for Manual { fn eq(&self, _: &Self) -> bool { true } }
                pub type Users = Vec<User>;
                "#,
            )
            .unwrap()
            .with_package(
                "crate::model",
                "#[derive(PartialEq, Eq)] pub struct Entry; pub struct Blob;",
            )
            .unwrap()
    }

    fn check(loader: &MemoryLoader, ty: Type) -> Option<bool> {
        let package = loader.load(".").unwrap();
        let scope = Scope::new(&package);
        DeriveTypeInfo::new(loader).is_comparable(&ty, &scope)
    }

    #[test]
    fn test_structural_types() {
        let loader = loader();
        assert_eq!(check(&loader, parse_quote!(i32)), Some(true));
        assert_eq!(check(&loader, parse_quote!(&str)), Some(true));
        assert_eq!(check(&loader, parse_quote!((u8, String, [u16; 4]))), Some(true));
        assert_eq!(check(&loader, parse_quote!(Option<Vec<u64>>)), Some(true));
        assert_eq!(check(&loader, parse_quote!(fn(u8) -> u8)), Some(true));
        assert_eq!(check(&loader, parse_quote!(dyn std::fmt::Debug)), None);
    }

    #[test]
    fn test_named_declarations() {
        let loader = loader();
        assert_eq!(check(&loader, parse_quote!(User)), Some(true));
        assert_eq!(check(&loader, parse_quote!(Opaque)), Some(false));
        assert_eq!(check(&loader, parse_quote!(Manual)), Some(true));
        assert_eq!(check(&loader, parse_quote!(Users)), Some(true));
        assert_eq!(check(&loader, parse_quote!(Entry)), Some(true));
        assert_eq!(check(&loader, parse_quote!(Blob)), Some(false));
        assert_eq!(check(&loader, parse_quote!(crate::model::Entry)), Some(true));
        assert_eq!(check(&loader, parse_quote!(Vec<Opaque>)), Some(false));
    }

    #[test]
    fn test_unknown_types_are_unknown() {
        let loader = loader();
        assert_eq!(check(&loader, parse_quote!(Mystery)), None);
        assert_eq!(check(&loader, parse_quote!(Vec<Mystery>)), None);
    }

    #[test]
    fn test_generic_bounds() {
        let loader = loader();
        let package = loader.load(".").unwrap();
        let generics: syn::Generics = parse_quote!(<T: PartialEq, U>);
        let scope = Scope::new(&package).with_generics(&generics);
        let info = DeriveTypeInfo::new(&loader);
        assert_eq!(info.is_comparable(&parse_quote!(Vec<T>), &scope), Some(true));
        assert_eq!(info.is_comparable(&parse_quote!(U), &scope), Some(false));
    }

    #[test]
    fn test_no_type_info_is_conservative() {
        let loader = loader();
        let package = loader.load(".").unwrap();
        assert_eq!(
            NoTypeInfo.is_comparable(&parse_quote!(i32), &Scope::new(&package)),
            None
        );
    }
}
