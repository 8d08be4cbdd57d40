//! Per-method emission plans
//!
//! A [`MethodPlan`] is the subject's view of one method reduced to what
//! the generators print: field and binding identifiers, declared and
//! captured types, and the expressions that move values between the two.

use crate::names::{CallbackNames, MethodNames};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use standin_core::{
    CallableKind, CallablePassing, Capture, CaptureKind, Output, Parameter, ReceiverKind,
    Signature,
};
use syn::visit_mut::{self, VisitMut};
use syn::{FnArg, Pat, Type, TypeParamBound};

/// Settings every emitter needs
#[derive(Debug, Clone)]
pub struct Env {
    /// Alias the runtime crate is imported under
    pub rt: Ident,
    /// Default expectation timeout in milliseconds
    pub timeout_ms: u64,
}

impl Env {
    /// Expression for the default timeout
    pub fn timeout(&self) -> TokenStream {
        let rt = &self.rt;
        let millis = self.timeout_ms;
        quote!(#rt::Duration::from_millis(#millis))
    }

    /// Equality test between a recorded value and an expected one
    pub fn equal(&self, comparable: bool, left: TokenStream, right: TokenStream) -> TokenStream {
        let rt = &self.rt;
        if comparable {
            quote!(#left == #right)
        } else {
            quote!(#rt::deep_equal!(#left, #right))
        }
    }

    /// Rendering of a value for failure messages
    pub fn show(&self, value: TokenStream) -> TokenStream {
        let rt = &self.rt;
        quote!(#rt::show!(#value))
    }
}

/// A parameter or callback argument stored by value in a record
#[derive(Debug, Clone)]
pub struct ValueField {
    /// Record field
    pub field: Ident,
    /// Binding in generated signatures
    pub name: Ident,
    /// Name for messages
    pub label: String,
    /// Declared type with named lifetimes elided
    pub ty: Type,
    /// Owned form
    pub captured: Type,
    /// How the declared form becomes the owned one
    pub capture: Capture,
    /// Whether `==` may be used
    pub comparable: bool,
}

impl ValueField {
    fn new(param: &Parameter) -> Self {
        Self {
            field: format_ident!("{}", param.field),
            name: format_ident!("{}", param.name),
            label: crate::names::strip_raw(&param.name).to_string(),
            ty: elide_lifetimes(&param.ty.ty),
            captured: param.ty.captured.clone(),
            capture: param.ty.capture,
            comparable: param.ty.is_comparable(),
        }
    }

    /// Owned copy of `value`, which has the declared type
    pub fn capture_expr(&self, value: TokenStream) -> TokenStream {
        capture(self.capture, value)
    }

    /// Declared form of `stored`, which has the owned type
    pub fn reborrow(&self, stored: TokenStream) -> TokenStream {
        reborrow(self.capture, stored)
    }

    /// Whether the owned binding must be `mut` to be re-borrowed
    pub fn needs_mut(&self) -> bool {
        self.capture.mutable && self.capture.is_borrowed()
    }

    /// `field` or `mut field`, for destructuring patterns
    pub fn binding(&self) -> TokenStream {
        let field = &self.field;
        if self.needs_mut() {
            quote!(mut #field)
        } else {
            quote!(#field)
        }
    }
}

/// One result of a method or callback
#[derive(Debug, Clone)]
pub struct OutputField {
    /// Record field
    pub field: Ident,
    /// Binding used when a return value is destructured (`r0`)
    pub positional: Ident,
    /// Declared type with named lifetimes elided
    pub ty: Type,
    /// Owned form
    pub captured: Type,
    /// How the declared form becomes the owned one
    pub capture: Capture,
    /// Whether `==` may be used
    pub comparable: bool,
}

impl OutputField {
    fn new(output: &Output) -> Self {
        Self {
            field: format_ident!("{}", output.field),
            positional: format_ident!("{}", output.name),
            ty: elide_lifetimes(&output.ty.ty),
            captured: output.ty.captured.clone(),
            capture: output.ty.capture,
            comparable: output.ty.is_comparable(),
        }
    }

    /// Owned copy of `value`, which has the declared type
    pub fn capture_expr(&self, value: TokenStream) -> TokenStream {
        capture(self.capture, value)
    }

    /// Declared form of the owned `value`, leaked when the declared type borrows
    pub fn release(&self, value: TokenStream) -> TokenStream {
        let leak = quote!(::std::boxed::Box::leak);
        let leaked = match self.capture.kind {
            CaptureKind::Owned => return value,
            CaptureKind::Str => quote!(#leak(#value.into_boxed_str())),
            CaptureKind::Slice => quote!(#leak(#value.into_boxed_slice())),
            CaptureKind::Path => quote!(#leak(#value.into_boxed_path())),
            CaptureKind::OsStr => quote!(#leak(#value.into_boxed_os_str())),
            CaptureKind::CStr => quote!(#leak(#value.into_boxed_c_str())),
            CaptureKind::Value => quote!(#leak(::std::boxed::Box::new(#value))),
        };
        if self.capture.mutable {
            leaked
        } else {
            quote!(&*#leaked)
        }
    }
}

fn capture(capture: Capture, value: TokenStream) -> TokenStream {
    match capture.kind {
        CaptureKind::Owned => value,
        CaptureKind::Str | CaptureKind::CStr => quote!(::std::borrow::ToOwned::to_owned(&*#value)),
        CaptureKind::Slice => quote!(<[_]>::to_vec(&*#value)),
        CaptureKind::Path => quote!(::std::path::Path::to_path_buf(&*#value)),
        CaptureKind::OsStr => quote!(::std::ffi::OsStr::to_os_string(&*#value)),
        CaptureKind::Value => quote!(::std::clone::Clone::clone(&*#value)),
    }
}

fn reborrow(capture: Capture, stored: TokenStream) -> TokenStream {
    match (capture.kind, capture.mutable) {
        (CaptureKind::Owned, _) => stored,
        (CaptureKind::Value, false) => quote!(&#stored),
        (CaptureKind::Value, true) => quote!(&mut #stored),
        (_, false) => quote!(&*#stored),
        (_, true) => quote!(&mut *#stored),
    }
}

/// A callback parameter
#[derive(Debug, Clone)]
pub struct CallbackPlan {
    /// Generated item names
    pub names: CallbackNames,
    /// Parameter binding
    pub name: Ident,
    /// Declared type with named lifetimes elided
    pub ty: Type,
    /// Which `Fn*` trait the callable satisfies
    pub kind: CallableKind,
    /// How the callable is passed
    pub passing: CallablePassing,
    /// Named by a method-level type parameter
    pub generic: bool,
    /// Bounds besides the `Fn*` bound
    pub extra_bounds: Vec<TypeParamBound>,
    /// The callable's arguments
    pub args: Vec<ValueField>,
    /// The callable's results
    pub outputs: Vec<OutputField>,
}

impl CallbackPlan {
    fn new(
        names: CallbackNames,
        param: &Parameter,
        callback: &standin_core::Callback,
    ) -> Self {
        let signature = &callback.signature;
        Self {
            names,
            name: format_ident!("{}", param.name),
            ty: elide_lifetimes(&param.ty.ty),
            kind: callback.kind,
            passing: callback.passing,
            generic: callback.generic.is_some(),
            extra_bounds: callback.extra_bounds.clone(),
            args: signature.params.iter().map(ValueField::new).collect(),
            outputs: signature.outputs.iter().map(OutputField::new).collect(),
        }
    }

    /// What one invocation returns: `()`, the single result, or a tuple
    pub fn return_type(&self) -> TokenStream {
        let types = self.outputs.iter().map(|output| &output.ty);
        match self.outputs.len() {
            1 => {
                let ty = &self.outputs[0].ty;
                quote!(#ty)
            }
            _ => quote!((#(#types),*)),
        }
    }

    /// Whether the binding must be `mut` to be called
    pub fn needs_mut(&self) -> bool {
        self.kind == CallableKind::FnMut
            && matches!(self.passing, CallablePassing::Boxed | CallablePassing::Owned)
    }

    /// Whether the callable must be taken out of an `Option` before calling
    pub fn is_once(&self) -> bool {
        self.kind == CallableKind::FnOnce
    }

    /// A `dyn` form of the callable, used where the declared type cannot be stored
    ///
    /// Non-generic borrowed and boxed callables keep their declared type;
    /// everything else is boxed.
    pub fn dyn_view(&self) -> TokenStream {
        let declared = !self.generic
            && matches!(
                self.passing,
                CallablePassing::Borrowed | CallablePassing::BorrowedMut | CallablePassing::Boxed
            );
        if declared {
            let ty = &self.ty;
            return quote!(#ty);
        }
        let kind = format_ident!("{}", self.kind.trait_name());
        let args = self.args.iter().map(|arg| &arg.ty);
        let ret = self.return_type();
        let extra = self.extra_bounds.iter().filter(|bound| is_auto_bound(bound));
        quote!(::std::boxed::Box<dyn #kind(#(#args),*) -> #ret #(+ #extra)*>)
    }

    /// Whether a bound besides `Send`, `Sync`, `Unpin` and lifetimes is required
    ///
    /// A boxed view cannot satisfy such bounds.
    pub fn has_foreign_bounds(&self) -> bool {
        self.extra_bounds.iter().any(|bound| !is_auto_bound(bound))
    }

    /// Expression handing `proxy` (a local closure) to the callee
    ///
    /// With `through_view` the callee takes the [`dyn_view`](Self::dyn_view)
    /// form, otherwise the declared form.
    pub fn pass_proxy(&self, proxy: &Ident, through_view: bool) -> TokenStream {
        if through_view && self.boxes_view() {
            return quote!(::std::boxed::Box::new(#proxy));
        }
        match self.passing {
            CallablePassing::Borrowed => quote!(&#proxy),
            CallablePassing::BorrowedMut => quote!(&mut #proxy),
            CallablePassing::Boxed => quote!(::std::boxed::Box::new(#proxy)),
            CallablePassing::Owned => quote!(#proxy),
        }
    }

    /// Expression forwarding a [`dyn_view`](Self::dyn_view) binding to the real callee
    pub fn forward_view(&self) -> TokenStream {
        let name = &self.name;
        if !self.generic && self.passing != CallablePassing::Owned {
            return quote!(#name);
        }
        match self.passing {
            CallablePassing::Borrowed => quote!(&#name),
            CallablePassing::BorrowedMut => quote!(&mut #name),
            CallablePassing::Boxed | CallablePassing::Owned => quote!(#name),
        }
    }

    /// Whether the wrapper's dyn view hides a generic or `impl Trait` parameter
    pub fn boxes_view(&self) -> bool {
        self.generic || self.passing == CallablePassing::Owned
    }
}

fn is_auto_bound(bound: &TypeParamBound) -> bool {
    match bound {
        TypeParamBound::Lifetime(_) => true,
        TypeParamBound::Trait(trait_bound) => trait_bound
            .path
            .segments
            .last()
            .is_some_and(|segment| matches!(segment.ident.to_string().as_str(), "Send" | "Sync" | "Unpin")),
        _ => false,
    }
}

/// A parameter in declaration order
#[derive(Debug, Clone)]
pub enum ParamPlan {
    /// Stored in the call record
    Value(ValueField),
    /// Served through the callback sub-protocol
    Callback(CallbackPlan),
}

/// Everything the generators need about one method (or the function itself)
#[derive(Debug, Clone)]
pub struct MethodPlan {
    /// Generated item names
    pub names: MethodNames,
    /// Declared method identifier
    pub ident: Ident,
    /// Receiver shape
    pub receiver: ReceiverKind,
    /// Normalized declaration
    pub decl: syn::Signature,
    /// Index of the declaring trait
    pub origin: usize,
    /// Parameters in declaration order
    pub params: Vec<ParamPlan>,
    /// Results in declaration order
    pub outputs: Vec<OutputField>,
}

impl MethodPlan {
    /// Plan a method from its resolved signature
    pub fn new(
        names: MethodNames,
        decl: &syn::Signature,
        receiver: ReceiverKind,
        origin: usize,
        signature: &Signature,
    ) -> Self {
        let mut callback_names = names.callbacks.clone().into_iter();
        let params = signature
            .params
            .iter()
            .map(|param| match &param.callback {
                Some(callback) => match callback_names.next() {
                    Some(cb_names) => {
                        ParamPlan::Callback(CallbackPlan::new(cb_names, param, callback))
                    }
                    None => ParamPlan::Value(ValueField::new(param)),
                },
                None => ParamPlan::Value(ValueField::new(param)),
            })
            .collect();
        Self {
            names,
            ident: decl.ident.clone(),
            receiver,
            decl: decl.clone(),
            origin,
            params,
            outputs: signature.outputs.iter().map(OutputField::new).collect(),
        }
    }

    /// Parameters stored in the call record
    pub fn values(&self) -> impl Iterator<Item = &ValueField> {
        self.params.iter().filter_map(|param| match param {
            ParamPlan::Value(value) => Some(value),
            ParamPlan::Callback(_) => None,
        })
    }

    /// Callback parameters
    pub fn callbacks(&self) -> impl Iterator<Item = &CallbackPlan> {
        self.params.iter().filter_map(|param| match param {
            ParamPlan::Callback(callback) => Some(callback),
            ParamPlan::Value(_) => None,
        })
    }

    /// Whether any parameter is a callback
    pub fn has_callbacks(&self) -> bool {
        self.callbacks().next().is_some()
    }

    /// Whether the method returns nothing
    pub fn is_result_less(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Whether any result is a borrow
    pub fn returns_borrow(&self) -> bool {
        self.outputs
            .iter()
            .any(|output| output.capture.is_borrowed())
    }

    /// Whether the declaration is `unsafe`
    pub fn is_unsafe(&self) -> bool {
        self.decl.unsafety.is_some()
    }

    /// Owned types of the stored arguments
    pub fn value_types(&self) -> Vec<&Type> {
        self.values().map(|value| &value.captured).collect()
    }

    /// Owned types of the results
    pub fn output_types(&self) -> Vec<&Type> {
        self.outputs.iter().map(|output| &output.captured).collect()
    }

    /// Every type a record of this method stores, callbacks included
    pub fn record_types(&self) -> Vec<&Type> {
        let mut types = self.value_types();
        types.extend(self.output_types());
        for callback in self.callbacks() {
            types.extend(callback_types(callback));
        }
        types
    }

    /// Declaration with `mut` bindings where a callback needs them
    pub fn impl_decl(&self) -> syn::Signature {
        let mut decl = self.decl.clone();
        let mut params = self.params.iter();
        for input in decl.inputs.iter_mut() {
            let FnArg::Typed(pat_type) = input else {
                continue;
            };
            let Some(param) = params.next() else {
                break;
            };
            if let (ParamPlan::Callback(callback), Pat::Ident(ident)) = (param, pat_type.pat.as_mut()) {
                if callback.needs_mut() {
                    ident.mutability = Some(Default::default());
                }
            }
        }
        decl
    }

    /// Parameter types exactly as declared, named lifetimes included
    pub fn declared_input_types(&self) -> Vec<Type> {
        self.decl
            .inputs
            .iter()
            .filter_map(|input| match input {
                FnArg::Typed(pat_type) => Some((*pat_type.ty).clone()),
                FnArg::Receiver(_) => None,
            })
            .collect()
    }

    /// Lifetime parameters of the declaration
    pub fn lifetimes(&self) -> Vec<syn::Lifetime> {
        self.decl
            .generics
            .lifetimes()
            .map(|param| param.lifetime.clone())
            .collect()
    }

    /// Whether the declaration has type parameters of its own
    pub fn is_generic(&self) -> bool {
        self.decl.generics.type_params().next().is_some()
    }

    /// Declared return type, `()` when there is none
    pub fn return_type(&self) -> TokenStream {
        match &self.decl.output {
            syn::ReturnType::Default => quote!(()),
            syn::ReturnType::Type(_, ty) => {
                let ty = elide_lifetimes(ty);
                quote!(#ty)
            }
        }
    }

    /// Arguments in declaration order as they are passed on to real code
    ///
    /// `value` renders a stored argument, `callback` a callback argument.
    pub fn call_args(
        &self,
        mut value: impl FnMut(&ValueField) -> TokenStream,
        mut callback: impl FnMut(&CallbackPlan) -> TokenStream,
    ) -> Vec<TokenStream> {
        self.params
            .iter()
            .map(|param| match param {
                ParamPlan::Value(field) => value(field),
                ParamPlan::Callback(plan) => callback(plan),
            })
            .collect()
    }
}

/// Owned types a callback's request and response carry
pub fn callback_types(callback: &CallbackPlan) -> Vec<&Type> {
    callback
        .args
        .iter()
        .map(|arg| &arg.captured)
        .chain(callback.outputs.iter().map(|output| &output.captured))
        .collect()
}

/// Replace named lifetimes with elided ones; `'static` is kept
pub fn elide_lifetimes(ty: &Type) -> Type {
    let mut ty = ty.clone();
    Elider.visit_type_mut(&mut ty);
    ty
}

struct Elider;

impl VisitMut for Elider {
    fn visit_type_reference_mut(&mut self, reference: &mut syn::TypeReference) {
        if reference
            .lifetime
            .as_ref()
            .is_some_and(|lifetime| lifetime.ident != "static")
        {
            reference.lifetime = None;
        }
        visit_mut::visit_type_reference_mut(self, reference);
    }

    fn visit_lifetime_mut(&mut self, lifetime: &mut syn::Lifetime) {
        if lifetime.ident != "static" {
            *lifetime = syn::Lifetime::new("'_", lifetime.apostrophe);
        }
    }
}
