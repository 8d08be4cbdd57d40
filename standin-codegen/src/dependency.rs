//! Dependency doubles
//!
//! A double is a controller (`<Base>Double`) owned by the test and any
//! number of stand-ins (`<Base>DoubleImpl`) handed to the code under test.
//! Every call on a stand-in becomes a call record sent to the controller's
//! single queue, and the stand-in blocks until the test answers the record.

use crate::callback::{self, conjunction, local};
use crate::emit::{Artifact, Section};
use crate::generics::Params;
use crate::names::Names;
use crate::plan::{Env, MethodPlan, ParamPlan};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use standin_core::{CallableKind, CallablePassing, ContractKind, ContractSubject, FunctionSubject};
use syn::parse_quote;
use tracing::debug;

/// How call records reach the controller
enum Route<'r> {
    /// Wrapped in a variant of the call union
    Union { union: &'r Ident, args: TokenStream },
    /// Sent as-is; the record is the only item the controller carries
    Direct,
}

impl Route<'_> {
    fn wrap(&self, plan: &MethodPlan, record: TokenStream) -> TokenStream {
        match self {
            Route::Union { union, .. } => {
                let variant = &plan.names.variant;
                quote!(#union::#variant(#record))
            }
            Route::Direct => record,
        }
    }

    fn pattern(&self, plan: &MethodPlan) -> TokenStream {
        self.wrap(plan, quote!(__call))
    }

    /// Item type of the controller's queue
    fn item(&self, plan: &MethodPlan) -> TokenStream {
        match self {
            Route::Union { union, args } => quote!(#union #args),
            Route::Direct => {
                let call = &plan.names.call;
                quote!(#call)
            }
        }
    }
}

/// Emit the double for a trait or a struct's inherent methods
pub fn contract(
    env: &Env,
    artifact: &mut Artifact,
    names: &Names,
    contract: &ContractSubject,
    plans: &[MethodPlan],
) {
    let rt = &env.rt;
    let params = Params::new(&contract.type_params);
    let args = params.args();
    let bounded = params.bounded();
    let union = &names.union;
    let route = Route::Union {
        union,
        args: args.clone(),
    };
    debug!(
        "Generating double `{}` for `{}` with {} method(s)",
        names.double,
        contract.name,
        plans.len()
    );

    if contract.kind == ContractKind::Struct {
        artifact.push(Section::Primary, methods_trait(names, contract, plans));
    }
    let item = quote!(#union #args);
    artifact.push(Section::Primary, controller(env, names, &item, &params));
    artifact.push(Section::Primary, stand_in(env, names, &item, &params));

    for plan in plans {
        artifact.push(Section::Records, records(env, plan, &params));
    }

    let double_impl = &names.double_impl;
    for (origin, trait_ref) in contract.traits.iter().enumerate() {
        let trait_path = match contract.kind {
            ContractKind::Trait => {
                let path = &trait_ref.path;
                quote!(#path)
            }
            ContractKind::Struct => {
                let methods_trait = &names.methods_trait;
                quote!(#methods_trait #args)
            }
        };
        let methods = plans
            .iter()
            .filter(|plan| plan.origin == origin)
            .map(|plan| {
                let decl = plan.impl_decl();
                let body = implementation(env, plan, &route, &params);
                quote!(#decl { #body })
            });
        artifact.push(
            Section::Implementations,
            quote! {
                impl #bounded #trait_path for #double_impl #args {
                    #(#methods)*
                }
            },
        );
    }
    let conformance = match contract.kind {
        ContractKind::Trait => match contract.traits.first() {
            Some(trait_ref) => {
                let path = &trait_ref.path;
                quote!(#path)
            }
            None => quote!(::std::marker::Send),
        },
        ContractKind::Struct => {
            let methods_trait = &names.methods_trait;
            quote!(#methods_trait #args)
        }
    };
    artifact.push(
        Section::Implementations,
        quote! {
            const _: () = {
                fn __conformance #bounded(imp: #double_impl #args) -> impl #conformance {
                    imp
                }
            };
        },
    );

    let variants = plans.iter().map(|plan| {
        let variant = &plan.names.variant;
        let call = &plan.names.call;
        let call_args = params.used_by(plan.record_types()).args();
        quote!(#variant(#call #call_args))
    });
    let labels = plans.iter().map(|plan| {
        let variant = &plan.names.variant;
        let label = &plan.names.label;
        quote!(#union::#variant(_) => #label)
    });
    let all_types: Vec<&syn::Type> = plans.iter().flat_map(|plan| plan.record_types()).collect();
    let unused = params.unused_by(all_types);
    let (phantom_variant, phantom_arm) = if unused.is_empty() {
        (TokenStream::new(), TokenStream::new())
    } else {
        let phantom = unused.phantom();
        (
            quote! {
                #[doc(hidden)]
                __Phantom(#phantom, ::std::convert::Infallible),
            },
            quote!(#union::__Phantom(_, __never) => match *__never {},),
        )
    };
    let union_doc = format!(" A captured call to any method of `{}`", contract.name);
    artifact.push(
        Section::Unions,
        quote! {
            #[doc = #union_doc]
            pub enum #union #args {
                #(#variants,)*
                #phantom_variant
            }

            impl #bounded #rt::MethodCall for #union #args {
                fn method_name(&self) -> &'static str {
                    match self {
                        #(#labels,)*
                        #phantom_arm
                    }
                }
            }
        },
    );

    for plan in plans {
        artifact.push(Section::Builders, expectation(env, plan, &route, &params));
    }

    let accessors = plans.iter().map(|plan| {
        let accessor = &plan.names.accessor;
        let expectation = &plan.names.expectation;
        let anonymous = params.args_with_anonymous_lifetime();
        let doc = format!(" Expectations on calls to `{}`", plan.names.label);
        quote! {
            #[doc = #doc]
            pub fn #accessor(&self) -> #expectation #anonymous {
                #expectation {
                    __controller: &self.__controller,
                    __timeout: self.__controller.timeout(),
                }
            }
        }
    });
    let double = &names.double;
    artifact.push(
        Section::Constructor,
        quote! {
            impl #bounded #double #args {
                #(#accessors)*
            }
        },
    );
}

/// Emit the double for a free function or function type
pub fn function(
    env: &Env,
    artifact: &mut Artifact,
    names: &Names,
    function: &FunctionSubject,
    plan: &MethodPlan,
) {
    let rt = &env.rt;
    let params = Params::default();
    let route = Route::Direct;
    debug!("Generating double `{}` for fn `{}`", names.double, function.name);

    let call = &plan.names.call;
    let item = quote!(#call);
    artifact.push(Section::Primary, controller(env, names, &item, &params));
    artifact.push(Section::Primary, stand_in(env, names, &item, &params));
    artifact.push(Section::Records, records(env, plan, &params));

    let label = &plan.names.label;
    let double_impl = &names.double_impl;
    let mut decl = plan.impl_decl();
    decl.ident = format_ident!("call");
    decl.abi = None;
    decl.unsafety = None;
    decl.constness = None;
    decl.inputs.insert(0, parse_quote!(&self));
    let body = implementation(env, plan, &route, &params);
    let doc = format!(" Stand-in for `{}`", function.name);
    artifact.push(
        Section::Implementations,
        quote! {
            impl #rt::MethodCall for #call {
                fn method_name(&self) -> &'static str {
                    #label
                }
            }

            impl #double_impl {
                #[doc = #doc]
                pub #decl {
                    #body
                }
            }
        },
    );

    if let Some(conformance) = function_conformance(function, plan) {
        artifact.push(Section::Implementations, conformance);
    }

    artifact.push(Section::Builders, expectation(env, plan, &route, &params));

    let expectation = &plan.names.expectation;
    let double = &names.double;
    let func = closure_accessor(plan);
    artifact.push(
        Section::Constructor,
        quote! {
            impl #double {
                /// Expectations on the next call
                pub fn next_call(&self) -> #expectation<'_> {
                    #expectation {
                        __controller: &self.__controller,
                        __timeout: self.__controller.timeout(),
                    }
                }

                #func
            }
        },
    );
}

/// `<Base>Double`: the test-side controller
fn controller(env: &Env, names: &Names, item: &TokenStream, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let double = &names.double;
    let double_impl = &names.double_impl;
    let args = params.args();
    let bounded = params.bounded();
    let timeout = env.timeout();
    let doc = format!(
        " Test-side controller of a `{}` double; hand [`{}`] to the code under test",
        names.base, double_impl
    );
    quote! {
        #[doc = #doc]
        pub struct #double #args {
            __controller: #rt::Controller<#item>,
        }

        impl #bounded #double #args {
            /// A double that panics on unmet expectations
            pub fn new() -> Self {
                Self {
                    __controller: #rt::Controller::new(#rt::PanicReporter::shared(), #timeout),
                }
            }

            /// Report unmet expectations to `reporter` instead
            pub fn with_reporter(mut self, reporter: #rt::SharedReporter) -> Self {
                self.__controller.set_reporter(reporter);
                self
            }

            /// Wait at most `timeout` for each expected call
            pub fn with_timeout(mut self, timeout: #rt::Duration) -> Self {
                self.__controller.set_timeout(timeout);
                self
            }

            /// A stand-in to hand to the code under test
            pub fn imp(&self) -> #double_impl #args {
                #double_impl {
                    __calls: self.__controller.sender(),
                    __reporter: ::std::clone::Clone::clone(self.__controller.reporter()),
                }
            }

            /// Calls received but not claimed by an expectation yet
            pub fn unclaimed_calls(&self) -> usize {
                self.__controller.unclaimed()
            }
        }

        impl #bounded ::std::default::Default for #double #args {
            fn default() -> Self {
                Self::new()
            }
        }
    }
}

/// `<Base>DoubleImpl`: what the code under test calls
fn stand_in(env: &Env, names: &Names, item: &TokenStream, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let double_impl = &names.double_impl;
    let name = double_impl.to_string();
    let args = params.args();
    let doc = format!(" Stands in for `{}`; every call waits for the test to answer it", names.base);
    quote! {
        #[doc = #doc]
        pub struct #double_impl #args {
            __calls: #rt::CallSender<#item>,
            __reporter: #rt::SharedReporter,
        }

        impl #args ::std::clone::Clone for #double_impl #args {
            fn clone(&self) -> Self {
                Self {
                    __calls: ::std::clone::Clone::clone(&self.__calls),
                    __reporter: ::std::clone::Clone::clone(&self.__reporter),
                }
            }
        }

        impl #args ::std::fmt::Debug for #double_impl #args {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(#name).finish_non_exhaustive()
            }
        }
    }
}

/// Call record, response, and callback records of one method
fn records(env: &Env, plan: &MethodPlan, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let call = &plan.names.call;
    let response = &plan.names.response;
    let label = &plan.names.label;
    let record = params.used_by(plan.record_types());
    let record_args = record.args();
    let record_bounded = record.bounded();
    let answer = params.used_by(plan.output_types());
    let answer_args = answer.args();

    let fields = plan.values().map(|value| {
        let field = &value.field;
        let ty = &value.captured;
        quote!(pub #field: #ty)
    });
    let slots = plan.callbacks().map(|callback| {
        let slot = &callback.names.slot;
        let request = callback::request_type(callback, params);
        quote!(#slot: #rt::CallbackInvoker<#request>,)
    });
    let reporter = if plan.has_callbacks() {
        quote!(__reporter: #rt::SharedReporter,)
    } else {
        TokenStream::new()
    };

    let outcome = if plan.is_result_less() {
        quote!(Resolve)
    } else {
        let fields = plan.outputs.iter().map(|output| {
            let field = &output.field;
            let ty = &output.captured;
            quote!(#field: #ty)
        });
        quote!(Return { #(#fields),* })
    };

    let inject = match plan.outputs.as_slice() {
        [] => quote! {
            /// Let the call return
            pub fn resolve(self) {
                self.__responder.respond(#response::Resolve);
            }
        },
        [output] => {
            let field = &output.field;
            let ty = &output.captured;
            quote! {
                /// Make the call return `result`
                pub fn inject_result(self, result: #ty) {
                    self.__responder.respond(#response::Return { #field: result });
                }
            }
        }
        outputs => {
            let fields: Vec<_> = outputs.iter().map(|output| &output.field).collect();
            let types = outputs.iter().map(|output| &output.captured);
            quote! {
                /// Make the call return these values, in declaration order
                pub fn inject_results(self, #(#fields: #types),*) {
                    self.__responder.respond(#response::Return { #(#fields),* });
                }
            }
        }
    };
    let invokes = plan
        .callbacks()
        .map(|callback| callback::invoke_method(env, callback, params));
    let callback_records = plan.callbacks().map(|callback| {
        let request = callback::request_record(env, callback, params, false);
        let result = callback::result_record(env, callback, params);
        quote!(#request #result)
    });

    let call_doc = format!(" A captured call to `{label}`; answer it exactly once");
    let response_doc = format!(" How a call to `{label}` ends");
    quote! {
        #[doc = #call_doc]
        pub struct #call #record_args {
            #(#fields,)*
            #(#slots)*
            #reporter
            __responder: #rt::Responder<#response #answer_args>,
        }

        #[doc = #response_doc]
        #[doc(hidden)]
        pub enum #response #answer_args {
            #outcome,
            Panic(#rt::PanicPayload),
        }

        impl #record_bounded #call #record_args {
            #inject

            /// Make the call panic with `payload`
            pub fn inject_panic(self, payload: impl ::std::any::Any + ::std::marker::Send) {
                self.__responder.respond(#response::Panic(#rt::payload(payload)));
            }

            #(#invokes)*
        }

        #(#callback_records)*
    }
}

/// Body of a stand-in method
fn implementation(env: &Env, plan: &MethodPlan, route: &Route<'_>, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let call = &plan.names.call;
    let response = &plan.names.response;

    let captures = plan.values().map(|value| {
        let field = &value.field;
        let name = &value.name;
        let captured = value.capture_expr(quote!(#name));
        quote!(#field: #captured,)
    });
    let channels = plan.callbacks().map(|callback| {
        let invoker = local(callback, "invoker");
        let requests = local(callback, "requests");
        quote!(let (#invoker, #requests) = #rt::callback_channel();)
    });
    let slots = plan.callbacks().map(|callback| {
        let slot = &callback.names.slot;
        let invoker = local(callback, "invoker");
        quote!(#slot: #invoker,)
    });
    let reporter = if plan.has_callbacks() {
        quote!(__reporter: ::std::clone::Clone::clone(&self.__reporter),)
    } else {
        TokenStream::new()
    };
    let record = route.wrap(
        plan,
        quote! {
            #call {
                #(#captures)*
                #(#slots)*
                #reporter
                __responder,
            }
        },
    );

    let served = callback::servers(env, plan, params);
    let setup = &served.setup;
    let wait = if plan.has_callbacks() {
        let list = &served.list;
        quote!(#rt::wait_serving(__pending, #list))
    } else {
        quote!(__pending.wait())
    };

    let finish = if plan.is_result_less() {
        quote!(#response::Resolve => {})
    } else {
        let fields: Vec<_> = plan.outputs.iter().map(|output| &output.field).collect();
        let released: Vec<_> = plan
            .outputs
            .iter()
            .map(|output| {
                let field = &output.field;
                output.release(quote!(#field))
            })
            .collect();
        let value = match released.as_slice() {
            [single] => quote!(#single),
            _ => quote!((#(#released),*)),
        };
        quote!(#response::Return { #(#fields),* } => #value)
    };

    quote! {
        let (__responder, __pending) = #rt::exchange();
        #(#channels)*
        self.__calls.send(#record);
        #(#setup)*
        let __response = #wait;
        match __response {
            #finish,
            #response::Panic(__payload) => ::std::panic::resume_unwind(__payload),
        }
    }
}

/// `<Base><Method>Expectation`: claims the next matching call
fn expectation(env: &Env, plan: &MethodPlan, route: &Route<'_>, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let expectation = &plan.names.expectation;
    let call = &plan.names.call;
    let label = &plan.names.label;
    let call_args = params.used_by(plan.record_types()).args();
    let with_lifetime = params.args_with_lifetime();
    let bounded_with_lifetime = params.bounded_with_lifetime();
    let item = route.item(plan);
    let pattern = route.pattern(plan);

    let claimed = format!("a call to `{label}`");
    let mut methods = vec![quote! {
        /// Wait at most `timeout` for the call
        pub fn within(mut self, timeout: #rt::Duration) -> Self {
            self.__timeout = timeout;
            self
        }

        /// Claim the next call, whatever its arguments
        pub fn expect_called(self) -> #call #call_args {
            self.__controller.next_matching(#label, #claimed, self.__timeout, |__call| match __call {
                #pattern => ::std::result::Result::Ok(__call),
                __other => ::std::result::Result::Err(__other),
            })
        }
    }];

    let values: Vec<_> = plan.values().collect();
    if !values.is_empty() {
        let names: Vec<_> = values.iter().map(|value| &value.name).collect();
        let types: Vec<_> = values.iter().map(|value| &value.captured).collect();
        let equal = conjunction(values.iter().map(|value| {
            let field = &value.field;
            let name = &value.name;
            env.equal(value.comparable, quote!(__call.#field), quote!(#name))
        }));
        let matched = conjunction(values.iter().map(|value| {
            let field = &value.field;
            let name = &value.name;
            quote!(#rt::Matcher::matches(&#name, &__call.#field))
        }));
        let equal_format = format!(
            "a call to `{}` with {}",
            label,
            values
                .iter()
                .map(|value| format!("{} = {{}}", value.label))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let should_format = format!(
            "a call to `{}` where {}",
            label,
            values
                .iter()
                .map(|value| format!("{} is {{}}", value.label))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let shown = names.iter().map(|name| env.show(quote!(#name)));
        let described = names.iter().map(|name| quote!(#rt::Matcher::describe(&#name)));
        methods.push(quote! {
            /// Claim the next call whose arguments equal these values
            pub fn expect_args_are(self, #(#names: #types),*) -> #call #call_args {
                let __description = format!(#equal_format, #(#shown),*);
                self.__controller.next_matching(#label, &__description, self.__timeout, |__call| match __call {
                    #pattern if #equal => ::std::result::Result::Ok(__call),
                    __other => ::std::result::Result::Err(__other),
                })
            }

            /// Claim the next call whose arguments satisfy these matchers
            pub fn expect_args_should(self, #(#names: impl #rt::Matcher<#types>),*) -> #call #call_args {
                let __description = format!(#should_format, #(#described),*);
                self.__controller.next_matching(#label, &__description, self.__timeout, |__call| match __call {
                    #pattern if #matched => ::std::result::Result::Ok(__call),
                    __other => ::std::result::Result::Err(__other),
                })
            }
        });
    }

    methods.push(match plan.outputs.as_slice() {
        [] => quote! {
            /// Claim the next call and let it return
            pub fn resolve(self) {
                self.expect_called().resolve();
            }
        },
        [output] => {
            let ty = &output.captured;
            quote! {
                /// Claim the next call and make it return `result`
                pub fn inject_result(self, result: #ty) {
                    self.expect_called().inject_result(result);
                }
            }
        }
        outputs => {
            let fields: Vec<_> = outputs.iter().map(|output| &output.field).collect();
            let types = outputs.iter().map(|output| &output.captured);
            quote! {
                /// Claim the next call and make it return these values
                pub fn inject_results(self, #(#fields: #types),*) {
                    self.expect_called().inject_results(#(#fields),*);
                }
            }
        }
    });
    methods.push(quote! {
        /// Claim the next call and make it panic with `payload`
        pub fn inject_panic(self, payload: impl ::std::any::Any + ::std::marker::Send) {
            self.expect_called().inject_panic(payload);
        }
    });

    let doc = format!(" Expectations on the next call to `{label}`");
    quote! {
        #[doc = #doc]
        pub struct #expectation #with_lifetime {
            __controller: &'a #rt::Controller<#item>,
            __timeout: #rt::Duration,
        }

        impl #bounded_with_lifetime #expectation #with_lifetime {
            #(#methods)*
        }
    }
}

/// `const _: fn(..) = path;` when the function's type can be written down
fn function_conformance(function: &FunctionSubject, plan: &MethodPlan) -> Option<TokenStream> {
    let unnameable = plan.callbacks().any(|callback| {
        callback.passing == CallablePassing::Owned && callback.kind != CallableKind::Pointer
    });
    if function.from_alias || plan.is_generic() || unnameable {
        return None;
    }
    let path = &function.path;
    let lifetimes = plan.lifetimes();
    let binder = if lifetimes.is_empty() {
        TokenStream::new()
    } else {
        quote!(for<#(#lifetimes),*>)
    };
    let unsafety = &plan.decl.unsafety;
    let abi = &plan.decl.abi;
    let inputs = plan.declared_input_types();
    let output = &plan.decl.output;
    Some(quote! {
        const _: #binder #unsafety #abi fn(#(#inputs),*) #output = #path;
    })
}

/// `func()`: the double as a plain closure, when its type can be written down
fn closure_accessor(plan: &MethodPlan) -> TokenStream {
    let boxes = plan.callbacks().any(|callback| callback.boxes_view());
    if plan.is_generic() || plan.returns_borrow() || plan.is_unsafe() || boxes {
        return TokenStream::new();
    }
    let names: Vec<_> = plan
        .params
        .iter()
        .map(|param| match param {
            ParamPlan::Value(value) => value.name.clone(),
            ParamPlan::Callback(callback) => callback.name.clone(),
        })
        .collect();
    let types: Vec<_> = plan
        .params
        .iter()
        .map(|param| match param {
            ParamPlan::Value(value) => &value.ty,
            ParamPlan::Callback(callback) => &callback.ty,
        })
        .collect();
    let ret = plan.return_type();
    quote! {
        /// The double as a closure, for code that takes the function by value
        pub fn func(
            &self,
        ) -> impl Fn(#(#types),*) -> #ret + ::std::clone::Clone + ::std::marker::Send + ::std::marker::Sync + 'static {
            let imp = self.imp();
            move |#(#names: #types),*| imp.call(#(#names),*)
        }
    }
}

/// `<Base>Methods`: a struct's inherent methods as a trait, implemented by the struct
pub fn methods_trait(names: &Names, contract: &ContractSubject, plans: &[MethodPlan]) -> TokenStream {
    let methods_trait = &names.methods_trait;
    let params = Params::new(&contract.type_params);
    let args = params.args();
    let bounded = params.bounded();
    let Some(owner) = contract.traits.first() else {
        return TokenStream::new();
    };
    let path = &owner.path;

    let decls: Vec<syn::Signature> = plans
        .iter()
        .map(|plan| {
            let mut decl = plan.decl.clone();
            decl.constness = None;
            decl
        })
        .collect();
    let forwards = plans.iter().zip(&decls).map(|(plan, decl)| {
        let ident = &plan.ident;
        let arguments = plan.call_args(
            |value| {
                let name = &value.name;
                quote!(#name)
            },
            |callback| {
                let name = &callback.name;
                quote!(#name)
            },
        );
        let call = quote!(<#path>::#ident(self, #(#arguments),*));
        let call = if plan.is_unsafe() {
            quote!(unsafe { #call })
        } else {
            call
        };
        quote!(#decl { #call })
    });
    let doc = format!(" The methods of `{}`, as a contract", contract.name);
    quote! {
        #[doc = #doc]
        pub trait #methods_trait #bounded {
            #(#decls;)*
        }

        impl #bounded #methods_trait #args for #path {
            #(#forwards)*
        }
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
