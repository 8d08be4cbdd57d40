//! Qualified types: a declared type plus everything generation needs to know about it

use syn::visit::{self, Visit};
use syn::{parse_quote, GenericArgument, PathArguments, Type};

/// How values of a type are compared in generated assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparability {
    /// `PartialEq` is known to hold; generated code compares with `==`
    Comparable,
    /// Nothing is known; generated code compares `Debug` renderings
    Structural,
}

/// Coarse classification used by the field naming policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveClass {
    /// `String`, `str`, `Cow<str>`
    Textual,
    /// Any built-in integer type
    Integral,
    /// `f32` / `f64`
    Floating,
    /// Everything else
    Other,
}

impl PrimitiveClass {
    /// Classify a type, looking through references and parentheses
    pub fn of(ty: &Type) -> Self {
        match ty {
            Type::Reference(reference) => Self::of(&reference.elem),
            Type::Paren(inner) => Self::of(&inner.elem),
            Type::Group(inner) => Self::of(&inner.elem),
            Type::Path(path) if path.qself.is_none() => {
                let Some(last) = path.path.segments.last() else {
                    return PrimitiveClass::Other;
                };
                match last.ident.to_string().as_str() {
                    "String" | "str" => PrimitiveClass::Textual,
                    "Cow" if first_type_argument_is(&last.arguments, "str") => {
                        PrimitiveClass::Textual
                    }
                    "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32"
                    | "u64" | "u128" | "usize" => PrimitiveClass::Integral,
                    "f32" | "f64" => PrimitiveClass::Floating,
                    _ => PrimitiveClass::Other,
                }
            }
            _ => PrimitiveClass::Other,
        }
    }
}

fn first_type_argument_is(arguments: &PathArguments, name: &str) -> bool {
    let PathArguments::AngleBracketed(args) = arguments else {
        return false;
    };
    args.args.iter().any(|arg| match arg {
        GenericArgument::Type(Type::Path(path)) => path.path.is_ident(name),
        _ => false,
    })
}

/// What a borrowed value is turned into when it has to outlive the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// Not a reference: stored as-is
    Owned,
    /// `&str` stored as `String`
    Str,
    /// `&[T]` stored as `Vec<T>`
    Slice,
    /// `&Path` stored as `PathBuf`
    Path,
    /// `&OsStr` stored as `OsString`
    OsStr,
    /// `&CStr` stored as `CString`
    CStr,
    /// `&T` stored as a clone of `T`
    Value,
}

/// Capture shape of a parameter or result type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capture {
    /// Owned representation
    pub kind: CaptureKind,
    /// Whether the declared reference was `&mut`
    pub mutable: bool,
}

impl Capture {
    /// The capture of a type that is already owned
    pub const OWNED: Capture = Capture {
        kind: CaptureKind::Owned,
        mutable: false,
    };

    /// Determine the capture shape of a declared type
    pub fn of(ty: &Type) -> Capture {
        match ty {
            Type::Reference(reference) => Capture {
                kind: referent_kind(&reference.elem),
                mutable: reference.mutability.is_some(),
            },
            Type::Paren(inner) => Self::of(&inner.elem),
            Type::Group(inner) => Self::of(&inner.elem),
            _ => Capture::OWNED,
        }
    }

    /// Whether the declared type is a reference
    pub fn is_borrowed(&self) -> bool {
        self.kind != CaptureKind::Owned
    }

    /// Owned form of `ty` under this capture
    pub fn owned_type(&self, ty: &Type) -> Type {
        let referent = match peel(ty) {
            Type::Reference(reference) => peel(&reference.elem),
            _ => return ty.clone(),
        };
        match self.kind {
            CaptureKind::Owned => ty.clone(),
            CaptureKind::Str => parse_quote!(String),
            CaptureKind::Slice => match referent {
                Type::Slice(slice) => {
                    let elem = &slice.elem;
                    parse_quote!(Vec<#elem>)
                }
                other => other.clone(),
            },
            CaptureKind::Path => parse_quote!(::std::path::PathBuf),
            CaptureKind::OsStr => parse_quote!(::std::ffi::OsString),
            CaptureKind::CStr => parse_quote!(::std::ffi::CString),
            CaptureKind::Value => referent.clone(),
        }
    }
}

fn peel(ty: &Type) -> &Type {
    match ty {
        Type::Paren(inner) => peel(&inner.elem),
        Type::Group(inner) => peel(&inner.elem),
        other => other,
    }
}

fn referent_kind(elem: &Type) -> CaptureKind {
    match peel(elem) {
        Type::Slice(_) => CaptureKind::Slice,
        Type::Path(path) if path.qself.is_none() => {
            let name = path
                .path
                .segments
                .last()
                .map(|segment| segment.ident.to_string())
                .unwrap_or_default();
            match name.as_str() {
                "str" => CaptureKind::Str,
                "Path" => CaptureKind::Path,
                "OsStr" => CaptureKind::OsStr,
                "CStr" => CaptureKind::CStr,
                _ => CaptureKind::Value,
            }
        }
        _ => CaptureKind::Value,
    }
}

/// Where an external name is declared, as far as the resolver could tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    /// `pub`
    Public,
    /// `pub(crate)`, `pub(super)`, `pub(in ..)`
    Restricted,
    /// No visibility modifier
    Private,
    /// Reached through a `use`; the declaration was not inspected
    Unknown,
}

/// A name the generated artifact must bring into scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalRef {
    /// Binding name as written in the declaration (`HashMap`)
    pub name: String,
    /// Full path the name refers to (`std::collections::HashMap`)
    pub path: String,
    /// Declared in the local (`"."`) package
    pub local: bool,
    /// Declared visibility
    pub visibility: Visibility,
}

impl ExternalRef {
    /// Whether this name cannot be reached from outside its declaring package
    pub fn is_unexported(&self) -> bool {
        !self.local && self.visibility == Visibility::Private
    }
}

/// Why a type cannot be stored in a call record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProblem {
    /// A reference or non-`'static` lifetime below the top level
    NestedBorrow,
    /// `impl Trait`, `!`, or another type that cannot be named
    Opaque,
    /// A borrowed trait object or other unsized referent
    Unsized,
    /// Mentions `Self`
    SelfType,
}

impl StorageProblem {
    /// Human-readable explanation used in validity errors
    pub fn describe(&self) -> &'static str {
        match self {
            StorageProblem::NestedBorrow => "contains a borrow that cannot outlive the call",
            StorageProblem::Opaque => "is an opaque type that cannot be stored",
            StorageProblem::Unsized => "borrows an unsized value that cannot be cloned",
            StorageProblem::SelfType => "refers to `Self`",
        }
    }
}

/// A declared type annotated for generation
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedType {
    /// The type as declared (paths normalized, aliases kept)
    pub ty: Type,
    /// Owned form stored in records
    pub captured: Type,
    /// How `ty` is turned into `captured`
    pub capture: Capture,
    /// Equality strategy for assertions
    pub comparability: Comparability,
    /// Naming class
    pub class: PrimitiveClass,
    /// Names the type needs in scope
    pub externals: Vec<ExternalRef>,
}

impl QualifiedType {
    /// Build a qualified type; capture form and naming class are derived from `ty`
    pub fn new(ty: Type, comparability: Comparability, externals: Vec<ExternalRef>) -> Self {
        let capture = Capture::of(&ty);
        let captured = capture.owned_type(&ty);
        let class = PrimitiveClass::of(&ty);
        Self {
            ty,
            captured,
            capture,
            comparability,
            class,
            externals,
        }
    }

    /// Whether generated comparisons may use `==`
    pub fn is_comparable(&self) -> bool {
        self.comparability == Comparability::Comparable
    }

    /// Reason the captured form cannot be stored, if any
    pub fn storage_problem(&self) -> Option<StorageProblem> {
        if self.capture.kind == CaptureKind::Value
            && matches!(
                peel(&self.captured),
                Type::TraitObject(_) | Type::ImplTrait(_) | Type::Slice(_)
            )
        {
            return Some(StorageProblem::Unsized);
        }
        let mut scan = StorageScan::default();
        scan.visit_type(&self.captured);
        scan.problem
    }
}

#[derive(Default)]
struct StorageScan {
    problem: Option<StorageProblem>,
}

impl StorageScan {
    fn flag(&mut self, problem: StorageProblem) {
        if self.problem.is_none() {
            self.problem = Some(problem);
        }
    }
}

impl<'ast> Visit<'ast> for StorageScan {
    fn visit_type_reference(&mut self, _: &'ast syn::TypeReference) {
        self.flag(StorageProblem::NestedBorrow);
    }

    fn visit_lifetime(&mut self, lifetime: &'ast syn::Lifetime) {
        if lifetime.ident != "static" {
            self.flag(StorageProblem::NestedBorrow);
        }
    }

    fn visit_type_impl_trait(&mut self, _: &'ast syn::TypeImplTrait) {
        self.flag(StorageProblem::Opaque);
    }

    fn visit_type_never(&mut self, _: &'ast syn::TypeNever) {
        self.flag(StorageProblem::Opaque);
    }

    fn visit_path(&mut self, path: &'ast syn::Path) {
        if path
            .segments
            .first()
            .is_some_and(|segment| segment.ident == "Self")
        {
            self.flag(StorageProblem::SelfType);
        }
        visit::visit_path(self, path);
    }
}

/// How a callable parameter behaves when invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    /// `Fn`
    Fn,
    /// `FnMut`
    FnMut,
    /// `FnOnce`
    FnOnce,
    /// `fn(..)` pointer
    Pointer,
}

impl CallableKind {
    /// Trait name for the `Fn*` family (pointers report `Fn`)
    pub fn trait_name(&self) -> &'static str {
        match self {
            CallableKind::Fn | CallableKind::Pointer => "Fn",
            CallableKind::FnMut => "FnMut",
            CallableKind::FnOnce => "FnOnce",
        }
    }
}

/// How a callable parameter is handed to the callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallablePassing {
    /// `&dyn Fn..` / `&F`
    Borrowed,
    /// `&mut dyn FnMut..` / `&mut F`
    BorrowedMut,
    /// `Box<dyn Fn..>`
    Boxed,
    /// `impl Fn..`, a generic `F`, or a `fn` pointer
    Owned,
}
