//! Target wrappers
//!
//! A wrapper launches the real callable on its own thread (`start`), waits
//! for exactly one outcome, and asserts on it. Callback arguments are
//! proxies that forward every invocation to the test, which answers them
//! through `expect_<param>_called`.
//!
//! Contracts get one wrapper per method, handed out by `<Base>Target`, plus
//! an `<Base>Interceptor` that implements the contract by forwarding each
//! call through a wrapper.

use crate::callback::{self, conjunction, joined, local};
use crate::emit::{Artifact, Section};
use crate::generics::Params;
use crate::names::Names;
use crate::plan::{CallbackPlan, Env, MethodPlan, ParamPlan};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use standin_core::{ContractKind, ContractSubject, FunctionSubject, ReceiverKind};
use tracing::debug;

/// What a per-method wrapper runs on the launched thread
enum Callee<'c> {
    /// `<I as Trait>::method(&*guard, ..)` on the shared implementation
    Method { owner: TokenStream, inner: &'c TokenStream },
    /// `(*callable)(..)` on the wrapped function
    Function,
}

/// Emit the wrapper family for a trait or a struct's inherent methods
pub fn contract(
    env: &Env,
    artifact: &mut Artifact,
    names: &Names,
    contract: &ContractSubject,
    plans: &[MethodPlan],
) {
    let rt = &env.rt;
    let target = &names.target;
    let interceptor = &names.interceptor;
    debug!(
        "Generating target `{}` for `{}` with {} method(s)",
        target,
        contract.name,
        plans.len()
    );
    let Some(owner) = contract.traits.first() else {
        return;
    };
    let owner_path = &owner.path;

    // Trait targets wrap any implementation; struct targets wrap the struct
    let (args, bounded, inner) = match contract.kind {
        ContractKind::Trait => (
            quote!(<I>),
            quote!(<I: #owner_path + ::std::marker::Send + ::std::marker::Sync + 'static>),
            quote!(I),
        ),
        ContractKind::Struct => (TokenStream::new(), TokenStream::new(), quote!(#owner_path)),
    };

    if contract.kind == ContractKind::Struct {
        artifact.push(
            Section::Primary,
            crate::dependency::methods_trait(names, contract, plans),
        );
    }

    let target_doc = format!(
        " Wraps an implementation of `{}`; each accessor runs one method on its own thread",
        contract.name
    );
    let interceptor_doc = format!(
        " Implements `{}` by running every call through a [`{}`]",
        contract.name, target
    );
    artifact.push(
        Section::Primary,
        quote! {
            #[doc = #target_doc]
            pub struct #target #args {
                __inner: #rt::Arc<#rt::RwLock<#inner>>,
                __reporter: #rt::SharedReporter,
                __timeout: #rt::Duration,
            }

            #[doc = #interceptor_doc]
            pub struct #interceptor #args {
                __target: #target #args,
            }

            impl #args ::std::clone::Clone for #target #args {
                fn clone(&self) -> Self {
                    Self {
                        __inner: #rt::Arc::clone(&self.__inner),
                        __reporter: ::std::clone::Clone::clone(&self.__reporter),
                        __timeout: self.__timeout,
                    }
                }
            }

            impl #args ::std::clone::Clone for #interceptor #args {
                fn clone(&self) -> Self {
                    Self {
                        __target: ::std::clone::Clone::clone(&self.__target),
                    }
                }
            }
        },
    );

    for plan in plans {
        artifact.push(Section::Records, records(env, plan));
    }

    for (origin, trait_ref) in contract.traits.iter().enumerate() {
        let trait_path = match contract.kind {
            ContractKind::Trait => {
                let path = &trait_ref.path;
                quote!(#path)
            }
            ContractKind::Struct => {
                let methods_trait = &names.methods_trait;
                quote!(#methods_trait)
            }
        };
        let methods = plans
            .iter()
            .filter(|plan| plan.origin == origin)
            .map(|plan| intercepted(env, plan));
        artifact.push(
            Section::Implementations,
            quote! {
                impl #bounded #trait_path for #interceptor #args {
                    #(#methods)*
                }
            },
        );
    }

    for plan in plans {
        let callee_owner = match contract.kind {
            ContractKind::Trait => {
                let path = &contract.traits[plan.origin].path;
                quote!(<I as #path>)
            }
            ContractKind::Struct => quote!(<#owner_path>),
        };
        let callee = Callee::Method {
            owner: callee_owner,
            inner: &inner,
        };
        artifact.push(
            Section::Builders,
            method_target(env, plan, &callee, &args, &bounded),
        );
    }

    let accessors = plans.iter().map(|plan| {
        let accessor = &plan.names.accessor;
        let method_target = &plan.names.target;
        let fields = callback_fields(plan).into_iter().map(|(field, _)| field);
        let doc = format!(" A wrapper running `{}` on the shared implementation", plan.names.label);
        quote! {
            #[doc = #doc]
            pub fn #accessor(&self) -> #method_target #args {
                #method_target {
                    __inner: #rt::Arc::clone(&self.__inner),
                    __completion: ::std::option::Option::None,
                    #(#fields: ::std::option::Option::None,)*
                    __reporter: ::std::clone::Clone::clone(&self.__reporter),
                    __timeout: self.__timeout,
                }
            }
        }
    });
    let timeout = env.timeout();
    artifact.push(
        Section::Constructor,
        quote! {
            impl #bounded #target #args {
                /// Wrap `inner`; failures panic the test
                pub fn new(inner: #inner) -> Self {
                    Self {
                        __inner: #rt::Arc::new(#rt::RwLock::new(inner)),
                        __reporter: #rt::PanicReporter::shared(),
                        __timeout: #timeout,
                    }
                }

                /// Report failures to `reporter` instead
                pub fn with_reporter(mut self, reporter: #rt::SharedReporter) -> Self {
                    self.__reporter = reporter;
                    self
                }

                /// Wait at most `timeout` for each callback request
                pub fn with_timeout(mut self, timeout: #rt::Duration) -> Self {
                    self.__timeout = timeout;
                    self
                }

                /// An implementation of the contract that runs every call through a wrapper
                pub fn interceptor(&self) -> #interceptor #args {
                    #interceptor {
                        __target: ::std::clone::Clone::clone(self),
                    }
                }

                #(#accessors)*
            }
        },
    );
}

/// Emit the wrapper for a free function or function type
pub fn function(
    env: &Env,
    artifact: &mut Artifact,
    names: &Names,
    function: &FunctionSubject,
    plan: &MethodPlan,
) {
    let rt = &env.rt;
    let target = &names.target;
    debug!("Generating target `{}` for fn `{}`", target, function.name);

    artifact.push(Section::Records, records(env, plan));
    artifact.push(
        Section::Builders,
        method_target(env, plan, &Callee::Function, &TokenStream::new(), &TokenStream::new()),
    );

    let callable = callable_type(plan);
    let fields = callback_fields(plan).into_iter().map(|(field, _)| field);
    let timeout = env.timeout();
    let default = default_callable(function, plan).map(|callable| {
        quote! {
            impl ::std::default::Default for #target {
                fn default() -> Self {
                    Self::new(#callable)
                }
            }
        }
    });
    artifact.push(
        Section::Constructor,
        quote! {
            impl #target {
                /// Wrap `callable`; failures panic the test
                pub fn new(callable: impl #callable + 'static) -> Self {
                    Self {
                        __callable: #rt::Arc::new(callable),
                        __completion: ::std::option::Option::None,
                        #(#fields: ::std::option::Option::None,)*
                        __reporter: #rt::PanicReporter::shared(),
                        __timeout: #timeout,
                    }
                }

                /// Report failures to `reporter` instead
                pub fn with_reporter(mut self, reporter: #rt::SharedReporter) -> Self {
                    self.__reporter = reporter;
                    self
                }

                /// Wait at most `timeout` for each callback request
                pub fn with_timeout(mut self, timeout: #rt::Duration) -> Self {
                    self.__timeout = timeout;
                    self
                }
            }

            #default
        },
    );
}

/// `[for<'a>] Fn(views) -> R + Send + Sync`: what a function wrapper calls
fn callable_type(plan: &MethodPlan) -> TokenStream {
    let lifetimes = plan.lifetimes();
    let binder = if lifetimes.is_empty() {
        TokenStream::new()
    } else {
        quote!(for<#(#lifetimes),*>)
    };
    let declared = plan.declared_input_types();
    let views = plan.params.iter().zip(&declared).map(|(param, declared)| match param {
        ParamPlan::Callback(callback) if callback.boxes_view() => callback.dyn_view(),
        _ => quote!(#declared),
    });
    let output = &plan.decl.output;
    quote!(#binder Fn(#(#views),*) #output + ::std::marker::Send + ::std::marker::Sync)
}

/// What `Default` wraps: the function itself, or a closure adapting boxed views
fn default_callable(function: &FunctionSubject, plan: &MethodPlan) -> Option<TokenStream> {
    if function.from_alias || plan.is_unsafe() {
        return None;
    }
    let path = &function.path;
    if !plan.callbacks().any(CallbackPlan::boxes_view) {
        return Some(quote!(#path));
    }
    let adaptable = plan.lifetimes().is_empty()
        && !plan.returns_borrow()
        && !plan.callbacks().any(CallbackPlan::has_foreign_bounds);
    if !adaptable {
        return None;
    }
    let bindings = plan.call_args(
        |value| {
            let name = &value.name;
            let ty = &value.ty;
            quote!(#name: #ty)
        },
        |callback| {
            let name = &callback.name;
            let view = if callback.boxes_view() {
                callback.dyn_view()
            } else {
                let ty = &callback.ty;
                quote!(#ty)
            };
            quote!(#name: #view)
        },
    );
    let forwarded = plan.call_args(
        |value| {
            let name = &value.name;
            quote!(#name)
        },
        CallbackPlan::forward_view,
    );
    Some(quote!(|#(#bindings),*| #path(#(#forwarded),*)))
}

/// `(field, request type)` of each callback request slot on a wrapper
fn callback_fields(plan: &MethodPlan) -> Vec<(Ident, TokenStream)> {
    plan.callbacks()
        .map(|callback| {
            (
                local(callback, "requests"),
                callback::request_type(callback, &Params::default()),
            )
        })
        .collect()
}

/// Returns record and callback request records of one method
fn records(env: &Env, plan: &MethodPlan) -> TokenStream {
    let returns = &plan.names.returns;
    let fields = plan.outputs.iter().map(|output| {
        let field = &output.field;
        let ty = &output.captured;
        quote!(pub #field: #ty)
    });
    let requests = plan
        .callbacks()
        .map(|callback| callback::request_record(env, callback, &Params::default(), true));
    let doc = format!(" What `{}` returned, in owned form", plan.names.label);
    quote! {
        #[doc = #doc]
        pub struct #returns {
            #(#fields,)*
        }

        #(#requests)*
    }
}

/// `<Base><Method>Target`: launch, wait and assert for one callable
fn method_target(
    env: &Env,
    plan: &MethodPlan,
    callee: &Callee<'_>,
    args: &TokenStream,
    bounded: &TokenStream,
) -> TokenStream {
    let rt = &env.rt;
    let method_target = &plan.names.target;
    let returns = &plan.names.returns;
    let label = &plan.names.label;
    let slots = callback_fields(plan);
    let slot_fields: Vec<_> = slots.iter().map(|(field, _)| field).collect();
    let slot_types = slots.iter().map(|(_, ty)| ty);

    let held = match callee {
        Callee::Method { inner, .. } => quote!(__inner: #rt::Arc<#rt::RwLock<#inner>>,),
        Callee::Function => {
            let callable = callable_type(plan);
            quote!(__callable: #rt::Arc<dyn #callable>,)
        }
    };

    let values: Vec<_> = plan.values().collect();
    let names: Vec<_> = values.iter().map(|value| &value.name).collect();
    let captured: Vec<_> = values.iter().map(|value| &value.captured).collect();
    let declared: Vec<_> = values.iter().map(|value| &value.ty).collect();
    let captures = values.iter().map(|value| {
        let name = &value.name;
        value.capture_expr(quote!(#name))
    });
    let unsafety = match callee {
        Callee::Method { .. } if plan.is_unsafe() => quote!(unsafe),
        _ => TokenStream::new(),
    };

    let launch = launch_body(env, plan, callee);
    let request_types = slots.iter().map(|(_, ty)| quote!(#rt::CallbackRequests<#ty>,));

    let mut methods = vec![quote! {
        fn __launch(&self, #(#names: #captured),*) -> (#rt::Completion<#returns>, #(#request_types)*) {
            #launch
        }

        /// Launch the call on its own thread and return immediately
        pub #unsafety fn start(&mut self, #(#names: #declared),*) -> &mut Self {
            let (__completion, #(#slot_fields,)*) = self.__launch(#(#captures),*);
            self.__completion = ::std::option::Option::Some(__completion);
            #(self.#slot_fields = ::std::option::Option::Some(#slot_fields);)*
            self
        }

        fn __wait(&mut self) -> &#rt::Outcome<#returns> {
            match self.__completion.as_mut() {
                ::std::option::Option::Some(__completion) => __completion.wait(),
                ::std::option::Option::None => self
                    .__reporter
                    .fatal(::std::format!("`{}` was waited on but never started", #label)),
            }
        }
    }];

    let waited = format!("`{label}`");
    if plan.is_result_less() {
        methods.push(quote! {
            /// Block until the call finishes; later calls return at once
            pub fn wait_for_completion(&mut self) -> &#rt::Outcome<#returns> {
                self.__wait()
            }

            /// Report an error unless the call completed without panicking
            pub fn expect_completes(&mut self) {
                let __reporter = ::std::clone::Clone::clone(&self.__reporter);
                if let #rt::Outcome::Panicked(__payload) = self.__wait() {
                    __reporter.error(::std::format!(
                        "{} panicked with {} but was expected to complete",
                        #waited,
                        #rt::describe_payload(__payload)
                    ));
                }
            }
        });
    } else {
        let expected: Vec<Ident> = (0..plan.outputs.len())
            .map(|index| format_ident!("expected{}", index))
            .collect();
        let matchers: Vec<Ident> = (0..plan.outputs.len())
            .map(|index| format_ident!("m{}", index))
            .collect();
        let types: Vec<_> = plan.outputs.iter().map(|output| &output.captured).collect();
        let equal = conjunction(plan.outputs.iter().zip(&expected).map(|(output, expected)| {
            let field = &output.field;
            env.equal(output.comparable, quote!(__returns.#field), quote!(#expected))
        }));
        let matched = conjunction(plan.outputs.iter().zip(&matchers).map(|(output, matcher)| {
            let field = &output.field;
            quote!(#rt::Matcher::matches(&#matcher, &__returns.#field))
        }));
        let shown_actual = joined(
            plan.outputs
                .iter()
                .map(|output| {
                    let field = &output.field;
                    env.show(quote!(__returns.#field))
                })
                .collect(),
        );
        let shown_expected = joined(expected.iter().map(|name| env.show(quote!(#name))).collect());
        let described = joined(
            matchers
                .iter()
                .map(|matcher| quote!(#rt::Matcher::describe(&#matcher)))
                .collect(),
        );
        methods.push(quote! {
            /// Block until the call finishes; later calls return at once
            pub fn wait_for_response(&mut self) -> &#rt::Outcome<#returns> {
                self.__wait()
            }

            /// Report an error unless the call returned these values
            pub fn expect_returns_equal(&mut self, #(#expected: #types),*) {
                let __reporter = ::std::clone::Clone::clone(&self.__reporter);
                match self.__wait() {
                    #rt::Outcome::Returned(__returns) => {
                        if !(#equal) {
                            __reporter.error(::std::format!(
                                "{} returned {} but {} was expected",
                                #waited,
                                #shown_actual,
                                #shown_expected
                            ));
                        }
                    }
                    #rt::Outcome::Panicked(__payload) => __reporter.error(::std::format!(
                        "{} panicked with {} but was expected to return {}",
                        #waited,
                        #rt::describe_payload(__payload),
                        #shown_expected
                    )),
                }
            }

            /// Report an error unless every returned value satisfies its matcher
            pub fn expect_returns_should(&mut self, #(#matchers: impl #rt::Matcher<#types>),*) {
                let __reporter = ::std::clone::Clone::clone(&self.__reporter);
                match self.__wait() {
                    #rt::Outcome::Returned(__returns) => {
                        if !(#matched) {
                            __reporter.error(::std::format!(
                                "{} returned {} but {} was expected",
                                #waited,
                                #shown_actual,
                                #described
                            ));
                        }
                    }
                    #rt::Outcome::Panicked(__payload) => __reporter.error(::std::format!(
                        "{} panicked with {} but was expected to return {}",
                        #waited,
                        #rt::describe_payload(__payload),
                        #described
                    )),
                }
            }
        });
    }

    let shown_returned = if plan.is_result_less() {
        quote!(::std::string::String::from("normally"))
    } else {
        joined(
            plan.outputs
                .iter()
                .map(|output| {
                    let field = &output.field;
                    env.show(quote!(__returns.#field))
                })
                .collect(),
        )
    };
    methods.push(quote! {
        /// Report an error unless the call panicked with `expected`
        pub fn expect_panic_equals<P>(&mut self, expected: P)
        where
            P: ::std::any::Any + ::std::cmp::PartialEq + ::std::fmt::Debug,
        {
            let __reporter = ::std::clone::Clone::clone(&self.__reporter);
            match self.__wait() {
                #rt::Outcome::Panicked(__payload) => {
                    if !#rt::panic_matches(__payload, &expected) {
                        __reporter.error(::std::format!(
                            "{} panicked with {} but {:?} was expected",
                            #waited,
                            #rt::describe_payload(__payload),
                            expected
                        ));
                    }
                }
                #rt::Outcome::Returned(__returns) => __reporter.error(::std::format!(
                    "{} returned {} but was expected to panic with {:?}",
                    #waited,
                    #shown_returned,
                    expected
                )),
            }
        }
    });

    for (callback, (field, request)) in plan.callbacks().zip(&slots) {
        let expect_called = &callback.names.expect_called;
        let never = format!(
            "callback `{}` of `{}` was expected but the call was never started",
            callback.names.label, label
        );
        let timed_out = format!(
            "callback `{}` of `{}` was not invoked in time",
            callback.names.label, label
        );
        let doc = format!(
            " Claim the next invocation of callback `{}`; answer it exactly once",
            callback.names.label
        );
        methods.push(quote! {
            #[doc = #doc]
            pub fn #expect_called(&self) -> #request {
                let ::std::option::Option::Some(__requests) = self.#field.as_ref() else {
                    self.__reporter.fatal(::std::string::String::from(#never))
                };
                match __requests.next(self.__timeout) {
                    ::std::option::Option::Some(__request) => __request,
                    ::std::option::Option::None => {
                        self.__reporter.fatal(::std::string::String::from(#timed_out))
                    }
                }
            }
        });
    }

    let doc = format!(" Runs `{label}` on its own thread and asserts on the outcome");
    quote! {
        #[doc = #doc]
        pub struct #method_target #args {
            #held
            __completion: ::std::option::Option<#rt::Completion<#returns>>,
            #(#slot_fields: ::std::option::Option<#rt::CallbackRequests<#slot_types>>,)*
            __reporter: #rt::SharedReporter,
            __timeout: #rt::Duration,
        }

        impl #bounded #method_target #args {
            #(#methods)*
        }
    }
}

/// Body of `__launch`: open callback channels, then run the call on a new thread
fn launch_body(env: &Env, plan: &MethodPlan, callee: &Callee<'_>) -> TokenStream {
    let rt = &env.rt;
    let returns = &plan.names.returns;
    let channels = plan.callbacks().map(|callback| {
        let invoker = local(callback, "invoker");
        let requests = local(callback, "requests");
        quote!(let (#invoker, #requests) = #rt::callback_channel();)
    });
    let proxies = plan.callbacks().map(|callback| callback::proxy(env, callback));
    let rebinds = plan.values().filter(|value| value.needs_mut()).map(|value| {
        let name = &value.name;
        quote!(let mut #name = #name;)
    });
    let through_view = matches!(callee, Callee::Function);
    let arguments = plan.call_args(
        |value| {
            let name = &value.name;
            value.reborrow(quote!(#name))
        },
        |callback| callback.pass_proxy(&local(callback, "proxy"), through_view),
    );

    let (hold, call) = match callee {
        Callee::Method { owner, .. } => {
            let ident = &plan.ident;
            // Shared receivers run side by side; only `&mut self` excludes others
            let (guard, receiver) = match plan.receiver {
                ReceiverKind::RefMut => (quote!(let mut __guard = __inner.write();), quote!(&mut *__guard)),
                _ => (quote!(let __guard = __inner.read();), quote!(&*__guard)),
            };
            let invocation = quote!(#owner::#ident(#receiver, #(#arguments),*));
            let invocation = if plan.is_unsafe() {
                quote!(unsafe { #invocation })
            } else {
                invocation
            };
            (
                quote!(let __inner = #rt::Arc::clone(&self.__inner);),
                quote! {
                    #guard
                    let __returned = #invocation;
                },
            )
        }
        Callee::Function => (
            quote!(let __callable = #rt::Arc::clone(&self.__callable);),
            quote!(let __returned = (*__callable)(#(#arguments),*);),
        ),
    };

    let positional: Vec<_> = plan.outputs.iter().map(|output| &output.positional).collect();
    let destructure = match positional.as_slice() {
        [] => quote!(let () = __returned;),
        [single] => quote!(let #single = __returned;),
        _ => quote!(let (#(#positional),*) = __returned;),
    };
    let fields = plan.outputs.iter().map(|output| {
        let field = &output.field;
        let positional = &output.positional;
        let value = output.capture_expr(quote!(#positional));
        quote!(#field: #value)
    });
    let requests = plan.callbacks().map(|callback| local(callback, "requests"));

    quote! {
        #(#channels)*
        #hold
        let __completion = #rt::launch(move || {
            #(#proxies)*
            #(#rebinds)*
            #call
            #destructure
            let __returns = #returns { #(#fields),* };
            __returns
        });
        (__completion, #(#requests,)*)
    }
}

/// An interceptor method: launch through the wrapper, serve callbacks, hand back the outcome
fn intercepted(env: &Env, plan: &MethodPlan) -> TokenStream {
    let rt = &env.rt;
    let accessor = &plan.names.accessor;
    let returns = &plan.names.returns;
    let decl = plan.impl_decl();
    let captures = plan.values().map(|value| {
        let name = &value.name;
        value.capture_expr(quote!(#name))
    });
    let requests: Vec<_> = plan.callbacks().map(|callback| local(callback, "requests")).collect();
    let served = callback::servers(env, plan, &Params::default());
    let setup = &served.setup;
    let wait = if plan.has_callbacks() {
        let list = &served.list;
        quote!(__completion.wait_serving(#list);)
    } else {
        TokenStream::new()
    };
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
        [] => quote!(()),
        [single] => quote!(#single),
        _ => quote!((#(#released),*)),
    };
    quote! {
        #decl {
            let (mut __completion, #(#requests,)*) = self.__target.#accessor().__launch(#(#captures),*);
            #(#setup)*
            #wait
            match __completion.into_outcome() {
                #rt::Outcome::Returned(#returns { #(#fields),* }) => #value,
                #rt::Outcome::Panicked(__payload) => ::std::panic::resume_unwind(__payload),
            }
        }
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
