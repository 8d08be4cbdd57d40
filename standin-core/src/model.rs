//! The uniform signature model every generator consumes
//!
//! A [`Subject`] is produced once by the resolver and never mutated by
//! generation; rewriting passes (substitution, qualification) build new
//! values through [`Subject::rewrite`].

use crate::types::{CallableKind, CallablePassing, ExternalRef, QualifiedType};
use syn::visit_mut::VisitMut;

/// One parameter of a signature
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name used in generated signatures: the declared identifier, or `arg<index>`
    pub name: String,
    /// Name of the record field holding the captured value
    pub field: String,
    /// Declared type
    pub ty: QualifiedType,
    /// C-variadic tail (`...`)
    pub variadic: bool,
    /// Position in the parameter list, receiver excluded
    pub index: usize,
    /// Whether `name` was written in the declaration
    pub declared: bool,
    /// Present when the parameter is a callable that must be served during the call
    pub callback: Option<Callback>,
}

impl Parameter {
    /// Whether the parameter is served through the callback sub-protocol
    pub fn is_callback(&self) -> bool {
        self.callback.is_some()
    }
}

/// One result of a signature
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Positional name (`r<index>`)
    pub name: String,
    /// Name of the record field
    pub field: String,
    /// Declared type
    pub ty: QualifiedType,
    /// Position in the result list
    pub index: usize,
}

/// A type parameter together with its declared constraint
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParameter {
    /// Parameter name
    pub name: String,
    /// Declared bounds, inline and `where` clause combined
    pub bounds: Vec<syn::TypeParamBound>,
    /// Bound by an `Fn*` trait and consumed by a callback parameter
    pub callback: bool,
}

/// Ordered parameters, results and type parameters of a callable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    /// Parameters in declaration order
    pub params: Vec<Parameter>,
    /// Results in declaration order
    pub outputs: Vec<Output>,
    /// Type parameters in declaration order
    pub type_params: Vec<TypeParameter>,
}

impl Signature {
    /// Parameters that are not callbacks
    pub fn value_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|param| !param.is_callback())
    }

    /// Parameters that are callbacks
    pub fn callback_params(&self) -> impl Iterator<Item = (&Parameter, &Callback)> {
        self.params
            .iter()
            .filter_map(|param| param.callback.as_ref().map(|callback| (param, callback)))
    }

    /// Whether any parameter is a callback
    pub fn has_callbacks(&self) -> bool {
        self.params.iter().any(Parameter::is_callback)
    }

    /// Whether the callable returns nothing
    pub fn is_result_less(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Whether any parameter is C-variadic
    pub fn is_variadic(&self) -> bool {
        self.params.iter().any(|param| param.variadic)
    }

    /// Names every qualified type in this signature needs in scope
    pub fn externals(&self) -> Vec<ExternalRef> {
        let mut names = Vec::new();
        for param in &self.params {
            names.extend(param.ty.externals.iter().cloned());
            if let Some(callback) = &param.callback {
                names.extend(callback.signature.externals());
            }
        }
        for output in &self.outputs {
            names.extend(output.ty.externals.iter().cloned());
        }
        names
    }

    /// Apply a syntax rewrite to every type and bound in the signature
    pub fn rewrite(&mut self, visitor: &mut dyn VisitMut) {
        for param in &mut self.params {
            rewrite_qualified(&mut param.ty, visitor);
            if let Some(callback) = &mut param.callback {
                callback.signature.rewrite(visitor);
                for bound in &mut callback.extra_bounds {
                    visitor.visit_type_param_bound_mut(bound);
                }
            }
        }
        for output in &mut self.outputs {
            rewrite_qualified(&mut output.ty, visitor);
        }
        for type_param in &mut self.type_params {
            for bound in &mut type_param.bounds {
                visitor.visit_type_param_bound_mut(bound);
            }
        }
    }
}

fn rewrite_qualified(ty: &mut QualifiedType, visitor: &mut dyn VisitMut) {
    visitor.visit_type_mut(&mut ty.ty);
    visitor.visit_type_mut(&mut ty.captured);
}

/// A parameter whose type resolves to a callable
#[derive(Debug, Clone, PartialEq)]
pub struct Callback {
    /// Which `Fn*` trait (or pointer) the callable satisfies
    pub kind: CallableKind,
    /// How the callable is passed
    pub passing: CallablePassing,
    /// The callable's own arguments and results
    pub signature: Signature,
    /// Extra bounds written alongside the `Fn*` bound (`Send`, `'static`, ..)
    pub extra_bounds: Vec<syn::TypeParamBound>,
    /// Method-level type parameter that names the callable, if any
    pub generic: Option<String>,
}

/// How a method receives `self`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    /// `&self`
    Ref,
    /// `&mut self`
    RefMut,
    /// `self` / `mut self`
    Value,
    /// Typed receivers such as `self: Box<Self>` or `self: Arc<Self>`
    Other,
    /// Associated function without a receiver
    None,
}

impl ReceiverKind {
    /// Classify the receiver of a declared signature
    pub fn of(sig: &syn::Signature) -> Self {
        match sig.receiver() {
            None => ReceiverKind::None,
            Some(receiver) if receiver.colon_token.is_some() => ReceiverKind::Other,
            Some(receiver) => match &receiver.reference {
                Some(_) if receiver.mutability.is_some() => ReceiverKind::RefMut,
                Some(_) => ReceiverKind::Ref,
                None => ReceiverKind::Value,
            },
        }
    }
}

/// A method of a contract
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Declared name
    pub name: String,
    /// Unique key used to name generated items; equals `name` unless another
    /// contract in the embedding graph declares the same name
    pub key: String,
    /// Index into [`ContractSubject::traits`] of the declaring trait
    pub origin: usize,
    /// Receiver shape
    pub receiver: ReceiverKind,
    /// Declaration with type arguments substituted and local paths normalized
    pub decl: syn::Signature,
    /// Normalized signature
    pub signature: Signature,
}

/// A trait whose methods are part of a contract
#[derive(Debug, Clone, PartialEq)]
pub struct TraitRef {
    /// Trait name
    pub name: String,
    /// Path to the trait as generated code should name it, generic arguments included
    pub path: syn::Path,
    /// Names the path needs in scope
    pub externals: Vec<ExternalRef>,
}

/// Declaration shape a contract was synthesized from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// A trait and its supertraits
    Trait,
    /// Inherent methods of a struct or enum
    Struct,
}

/// A resolved contract: a named set of methods
#[derive(Debug, Clone, PartialEq)]
pub struct ContractSubject {
    /// Contract name
    pub name: String,
    /// Declaration shape
    pub kind: ContractKind,
    /// Generic parameters left open (none when type arguments were supplied)
    pub type_params: Vec<TypeParameter>,
    /// Requested trait first, then expanded supertraits. For a struct the
    /// single entry is the struct type itself.
    pub traits: Vec<TraitRef>,
    /// Methods in expansion order (trait) or alphabetical order (struct)
    pub methods: Vec<Method>,
    /// Names needed by type-parameter bounds
    pub externals: Vec<ExternalRef>,
    /// Import path of the declaring package
    pub package: String,
    /// Declared `pub`
    pub public: bool,
}

impl ContractSubject {
    /// Methods declared by the trait at `origin`
    pub fn methods_of(&self, origin: usize) -> impl Iterator<Item = &Method> {
        self.methods
            .iter()
            .filter(move |method| method.origin == origin)
    }

    /// Whether the contract is generic
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// A resolved free function (or function type)
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSubject {
    /// Function name
    pub name: String,
    /// Normalized signature
    pub signature: Signature,
    /// Declaration with type arguments substituted and local paths normalized
    pub decl: syn::Signature,
    /// Path generated code uses to call the function
    pub path: syn::Path,
    /// Names needed by type-parameter bounds and the function path
    pub externals: Vec<ExternalRef>,
    /// Import path of the declaring package
    pub package: String,
    /// Declared `pub`
    pub public: bool,
    /// Synthesized from a function-type alias
    pub from_alias: bool,
}

/// A resolved declaration: the only shape generators consume
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// A free function or function type
    Function(FunctionSubject),
    /// A trait or struct-with-methods
    Contract(ContractSubject),
}

impl Subject {
    /// Declared name
    pub fn name(&self) -> &str {
        match self {
            Subject::Function(function) => &function.name,
            Subject::Contract(contract) => &contract.name,
        }
    }

    /// Whether the subject is a free function
    pub fn is_function(&self) -> bool {
        matches!(self, Subject::Function(_))
    }

    /// Every external name the subject needs in scope
    pub fn externals(&self) -> Vec<ExternalRef> {
        match self {
            Subject::Function(function) => {
                let mut names = function.externals.clone();
                names.extend(function.signature.externals());
                names
            }
            Subject::Contract(contract) => {
                let mut names = contract.externals.clone();
                for trait_ref in &contract.traits {
                    names.extend(trait_ref.externals.iter().cloned());
                }
                for method in &contract.methods {
                    names.extend(method.signature.externals());
                }
                names
            }
        }
    }

    /// Apply a syntax rewrite to every type, bound and path in the subject
    pub fn rewrite(&mut self, visitor: &mut dyn VisitMut) {
        match self {
            Subject::Function(function) => {
                function.signature.rewrite(visitor);
                visitor.visit_signature_mut(&mut function.decl);
                visitor.visit_path_mut(&mut function.path);
            }
            Subject::Contract(contract) => {
                for type_param in &mut contract.type_params {
                    for bound in &mut type_param.bounds {
                        visitor.visit_type_param_bound_mut(bound);
                    }
                }
                for trait_ref in &mut contract.traits {
                    visitor.visit_path_mut(&mut trait_ref.path);
                }
                for method in &mut contract.methods {
                    method.signature.rewrite(visitor);
                    visitor.visit_signature_mut(&mut method.decl);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_receiver_kinds() {
        let cases: Vec<(syn::Signature, ReceiverKind)> = vec![
            (parse_quote!(fn a(&self)), ReceiverKind::Ref),
            (parse_quote!(fn b(&mut self, x: u8)), ReceiverKind::RefMut),
            (parse_quote!(fn c(self)), ReceiverKind::Value),
            (parse_quote!(fn d(mut self)), ReceiverKind::Value),
            (parse_quote!(fn e(self: Box<Self>)), ReceiverKind::Other),
            (parse_quote!(fn f(x: u8)), ReceiverKind::None),
        ];
        for (sig, expected) in cases {
            assert_eq!(ReceiverKind::of(&sig), expected, "{}", sig.ident);
        }
    }
}
