//! Callback sub-protocol emission shared by doubles and wrappers
//!
//! Each callback parameter gets a request record carrying its owned
//! arguments and a single-use responder. The side holding the real callable
//! serves requests (see [`servers`]); the other side turns invocations into
//! requests, either from the test (`invoke_<param>` on a double's call
//! record) or from a proxy closure handed to the wrapped code.

use crate::generics::Params;
use crate::plan::{callback_types, CallbackPlan, Env, MethodPlan};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

/// A local binding derived from a callback parameter (`__visit_invoker`)
pub fn local(callback: &CallbackPlan, suffix: &str) -> Ident {
    format_ident!("__{}_{}", callback.names.label, suffix)
}

/// Owned form of what one invocation returns
pub fn owned_return(callback: &CallbackPlan) -> TokenStream {
    let types: Vec<_> = callback.outputs.iter().map(|output| &output.captured).collect();
    match types.as_slice() {
        [single] => quote!(#single),
        _ => quote!((#(#types),*)),
    }
}

/// Generic parameters a callback's records need
pub fn request_params(callback: &CallbackPlan, params: &Params) -> Params {
    params.used_by(callback_types(callback))
}

fn result_params(callback: &CallbackPlan, params: &Params) -> Params {
    params.used_by(callback.outputs.iter().map(|output| &output.captured))
}

/// `Request<T>` as a type
pub fn request_type(callback: &CallbackPlan, params: &Params) -> TokenStream {
    let request = &callback.names.request;
    let args = request_params(callback, params).args();
    quote!(#request #args)
}

/// The request record, plus response injection when the test answers it
pub fn request_record(env: &Env, callback: &CallbackPlan, params: &Params, answered_by_test: bool) -> TokenStream {
    let rt = &env.rt;
    let request = &callback.names.request;
    let own = request_params(callback, params);
    let args = own.args();
    let fields = callback.args.iter().map(|arg| {
        let field = &arg.field;
        let ty = &arg.captured;
        quote!(pub #field: #ty)
    });
    let ret = owned_return(callback);
    let doc = format!(
        " One invocation of callback `{}`; answer it exactly once",
        callback.names.label
    );
    let record = quote! {
        #[doc = #doc]
        pub struct #request #args {
            #(#fields,)*
            __responder: #rt::Responder<::std::result::Result<#ret, #rt::PanicPayload>>,
        }
    };
    if !answered_by_test {
        return record;
    }

    let bounded = own.bounded();
    let inject = match callback.outputs.as_slice() {
        [] => quote! {
            /// Let the callback return
            pub fn resolve(self) {
                self.__responder.respond(::std::result::Result::Ok(()));
            }
        },
        [output] => {
            let ty = &output.captured;
            quote! {
                /// Make the callback return `result`
                pub fn inject_result(self, result: #ty) {
                    self.__responder.respond(::std::result::Result::Ok(result));
                }
            }
        }
        outputs => {
            let names: Vec<_> = outputs.iter().map(|output| &output.field).collect();
            let types = outputs.iter().map(|output| &output.captured);
            quote! {
                /// Make the callback return these values
                pub fn inject_results(self, #(#names: #types),*) {
                    self.__responder.respond(::std::result::Result::Ok((#(#names),*)));
                }
            }
        }
    };
    quote! {
        #record

        impl #bounded #request #args {
            #inject

            /// Make the callback panic with `payload`
            pub fn inject_panic(self, payload: impl ::std::any::Any + ::std::marker::Send) {
                self.__responder
                    .respond(::std::result::Result::Err(#rt::payload(payload)));
            }
        }
    }
}

/// Typed outcome of an invocation the test asked for
pub fn result_record(env: &Env, callback: &CallbackPlan, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let result = &callback.names.result;
    let own = result_params(callback, params);
    let args = own.args();
    let bounded = own.bounded();
    let ret = owned_return(callback);

    let expected: Vec<Ident> = (0..callback.outputs.len())
        .map(|index| format_ident!("expected{}", index))
        .collect();
    let matchers: Vec<Ident> = (0..callback.outputs.len())
        .map(|index| format_ident!("m{}", index))
        .collect();
    let types: Vec<_> = callback.outputs.iter().map(|output| &output.captured).collect();
    let single = callback.outputs.len() == 1;
    let access = |index: usize| -> TokenStream {
        if single {
            quote!((*__returned))
        } else {
            let index = syn::Index::from(index);
            quote!(__returned.#index)
        }
    };

    let accepted = conjunction(callback.outputs.iter().enumerate().map(|(index, output)| {
        env.equal(output.comparable, access(index), {
            let expected = &expected[index];
            quote!(#expected)
        })
    }));
    let shown_expected = joined(expected.iter().map(|name| env.show(quote!(#name))).collect());
    let shown_actual = joined(
        (0..callback.outputs.len())
            .map(|index| env.show(access(index)))
            .collect(),
    );
    let matched = conjunction(matchers.iter().enumerate().map(|(index, matcher)| {
        let value = access(index);
        quote!(#rt::Matcher::matches(&#matcher, &#value))
    }));
    let described = joined(
        matchers
            .iter()
            .map(|matcher| quote!(#rt::Matcher::describe(&#matcher)))
            .collect(),
    );
    quote! {
        /// Outcome of one invocation of the callback
        pub struct #result #args(#rt::CallbackResult<#ret>);

        impl #bounded #result #args {
            /// Report an error unless the callback returned these values
            pub fn expect_returned(&self, #(#expected: #types),*) {
                self.0.check_returned(
                    |__returned| #accepted,
                    || #shown_expected,
                    |__returned| #shown_actual,
                );
            }

            /// Report an error unless every returned value satisfies its matcher
            pub fn expect_returned_should(&self, #(#matchers: impl #rt::Matcher<#types>),*) {
                self.0.check_returned(
                    |__returned| #matched,
                    || #described,
                    |__returned| #shown_actual,
                );
            }

            /// Report an error unless the callback panicked with `expected`
            pub fn expect_panic_with<P>(&self, expected: P)
            where
                P: ::std::any::Any + ::std::cmp::PartialEq + ::std::fmt::Debug,
            {
                self.0.expect_panic_with(expected);
            }

            /// What the callback returned, if it returned
            pub fn returned(&self) -> ::std::option::Option<&#ret> {
                self.0.returned()
            }
        }
    }
}

/// `a, b` from rendered parts, `()` when there are none
pub fn joined(parts: Vec<TokenStream>) -> TokenStream {
    match parts.as_slice() {
        [] => quote!(::std::string::String::from("()")),
        [single] => quote!(#single),
        _ => quote!([#(#parts),*].join(", ")),
    }
}

/// `a && b && ..`, or `true` when there is nothing to check
pub fn conjunction(conditions: impl IntoIterator<Item = TokenStream>) -> TokenStream {
    let mut conditions = conditions.into_iter();
    match conditions.next() {
        Some(first) => quote!(#first #(&& #conditions)*),
        None => quote!(true),
    }
}

/// `invoke_<param>` on a double's call record
pub fn invoke_method(env: &Env, callback: &CallbackPlan, params: &Params) -> TokenStream {
    let rt = &env.rt;
    let invoke = &callback.names.invoke;
    let slot = &callback.names.slot;
    let request = &callback.names.request;
    let result = &callback.names.result;
    let result_args = result_params(callback, params).args();
    let label = &callback.names.label;
    let names = callback.args.iter().map(|arg| &arg.name);
    let types = callback.args.iter().map(|arg| &arg.ty);
    let captures = callback.args.iter().map(|arg| {
        let field = &arg.field;
        let value = arg.capture_expr({
            let name = &arg.name;
            quote!(#name)
        });
        quote!(#field: #value)
    });
    let doc = format!(" Invoke callback `{label}` and wait for its outcome");
    quote! {
        #[doc = #doc]
        pub fn #invoke(&self, #(#names: #types),*) -> #result #result_args {
            let (__responder, __pending) = #rt::exchange();
            self.#slot.invoke(#request {
                #(#captures,)*
                __responder,
            });
            #result(#rt::CallbackResult::new(
                #label,
                __pending.wait(),
                ::std::clone::Clone::clone(&self.__reporter),
            ))
        }
    }
}

/// Statements that serve a method's callbacks, and the server list for `wait_serving`
///
/// Expects `__<param>_requests` bindings and the real callables bound to
/// their parameter names.
pub struct Servers {
    /// Setup statements
    pub setup: Vec<TokenStream>,
    /// `&mut [&mut dyn Serve]` expression
    pub list: TokenStream,
}

pub fn servers(env: &Env, method: &MethodPlan, params: &Params) -> Servers {
    let rt = &env.rt;
    let mut setup = Vec::new();
    let mut list = Vec::new();
    for callback in method.callbacks() {
        let name = &callback.name;
        let request = &callback.names.request;
        let request_type = request_type(callback, params);
        let requests = local(callback, "requests");
        let server = local(callback, "server");
        let once = local(callback, "once");
        let bindings: Vec<Ident> = (0..callback.args.len())
            .map(|index| format_ident!("__arg{}", index))
            .collect();
        let pattern = callback.args.iter().zip(&bindings).map(|(arg, binding)| {
            let field = &arg.field;
            if arg.needs_mut() {
                quote!(#field: mut #binding)
            } else {
                quote!(#field: #binding)
            }
        });
        let call_args: Vec<_> = callback
            .args
            .iter()
            .zip(&bindings)
            .map(|(arg, binding)| arg.reborrow(quote!(#binding)))
            .collect();

        let respond = if callback.is_once() {
            setup.push(quote!(let mut #once = ::std::option::Option::Some(#name);));
            let message = format!("callback `{}` invoked more than once", callback.names.label);
            quote! {
                match #once.take() {
                    ::std::option::Option::Some(__callback) => {
                        __responder.respond(#rt::catch(move || __callback(#(#call_args),*)));
                    }
                    ::std::option::Option::None => {
                        __responder.respond(::std::result::Result::Err(#rt::payload(#message)));
                    }
                }
            }
        } else {
            quote! {
                __responder.respond(#rt::catch(|| #name(#(#call_args),*)));
            }
        };

        setup.push(quote! {
            let mut #server = #rt::CallbackServer::new(#requests, |__request: #request_type| {
                let #request { #(#pattern,)* __responder } = __request;
                #respond
            });
        });
        list.push(quote!(&mut #server as &mut dyn #rt::Serve));
    }
    Servers {
        setup,
        list: quote!(&mut [#(#list),*]),
    }
}

/// `let mut __<param>_proxy = ..;`: a closure that forwards invocations to the test
///
/// Expects an `__<param>_invoker` binding to move into the closure.
pub fn proxy(env: &Env, callback: &CallbackPlan) -> TokenStream {
    let rt = &env.rt;
    let proxy = local(callback, "proxy");
    let invoker = local(callback, "invoker");
    let request = &callback.names.request;
    let names = callback.args.iter().map(|arg| &arg.name);
    let types = callback.args.iter().map(|arg| &arg.ty);
    let ret = callback.return_type();
    let captures = callback.args.iter().map(|arg| {
        let field = &arg.field;
        let value = arg.capture_expr({
            let name = &arg.name;
            quote!(#name)
        });
        quote!(#field: #value)
    });
    quote! {
        let mut #proxy = move |#(#names: #types),*| -> #ret {
            let (__responder, __pending) = #rt::exchange();
            #invoker.invoke(#request {
                #(#captures,)*
                __responder,
            });
            match __pending.wait() {
                ::std::result::Result::Ok(__value) => __value,
                ::std::result::Result::Err(__payload) => ::std::panic::resume_unwind(__payload),
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::Names;
    use standin_core::{CallableKind, CallablePassing, QualifiedType};
    use syn::parse_quote;

    fn visit_plan(kind: CallableKind, passing: CallablePassing) -> CallbackPlan {
        let arg = standin_core::Parameter {
            name: "arg0".to_string(),
            field: "s".to_string(),
            ty: QualifiedType::new(parse_quote!(&str), standin_core::Comparability::Comparable, vec![]),
            variadic: false,
            index: 0,
            declared: false,
            callback: None,
        };
        let output = standin_core::Output {
            name: "r0".to_string(),
            field: "b".to_string(),
            ty: QualifiedType::new(parse_quote!(bool), standin_core::Comparability::Comparable, vec![]),
            index: 0,
        };
        let callback = standin_core::Callback {
            kind,
            passing,
            signature: standin_core::Signature {
                params: vec![arg],
                outputs: vec![output],
                type_params: vec![],
            },
            extra_bounds: vec![],
            generic: None,
        };
        let param = standin_core::Parameter {
            name: "visit".to_string(),
            field: "a".to_string(),
            ty: QualifiedType::new(
                parse_quote!(&mut dyn FnMut(&str) -> bool),
                standin_core::Comparability::Structural,
                vec![],
            ),
            variadic: false,
            index: 1,
            declared: true,
            callback: Some(callback.clone()),
        };
        let mut plans = MethodPlan::new(
            Names::new("Tree").method("walk", &["visit"]),
            &parse_quote!(fn walk(&self, visit: &mut dyn FnMut(&str) -> bool)),
            standin_core::ReceiverKind::Ref,
            0,
            &standin_core::Signature {
                params: vec![param],
                outputs: vec![],
                type_params: vec![],
            },
        );
        match plans.params.remove(0) {
            crate::plan::ParamPlan::Callback(plan) => plan,
            crate::plan::ParamPlan::Value(_) => panic!("expected a callback plan"),
        }
    }

    fn env() -> Env {
        Env {
            rt: format_ident!("_standin"),
            timeout_ms: 1000,
        }
    }

    #[test]
    fn test_request_record_captures_owned_arguments() {
        let plan = visit_plan(CallableKind::FnMut, CallablePassing::BorrowedMut);
        let text = request_record(&env(), &plan, &Params::default(), false).to_string();
        assert!(text.contains("pub struct TreeWalkVisitRequest"));
        assert!(text.contains("pub s : String"));
        assert!(text.contains("Result < bool , _standin :: PanicPayload >"));
        assert!(!text.contains("inject_result"));

        let answered = request_record(&env(), &plan, &Params::default(), true).to_string();
        assert!(answered.contains("pub fn inject_result (self , result : bool)"));
        assert!(answered.contains("pub fn inject_panic"));
    }

    #[test]
    fn test_result_record_takes_one_expected_value_per_result() {
        let plan = visit_plan(CallableKind::FnMut, CallablePassing::BorrowedMut);
        let text = result_record(&env(), &plan, &Params::default()).to_string();
        assert!(text.contains("pub fn expect_returned (& self , expected0 : bool)"));
        assert!(text.contains("(* __returned) == expected0"));
    }

    #[test]
    fn test_once_callbacks_are_taken_before_serving() {
        let plan = visit_plan(CallableKind::FnOnce, CallablePassing::Boxed);
        let method = MethodPlan {
            params: vec![crate::plan::ParamPlan::Callback(plan)],
            ..dummy_method()
        };
        let served = servers(&env(), &method, &Params::default());
        let setup: Vec<String> = served.setup.iter().map(ToString::to_string).collect();
        assert!(setup[0].starts_with("let mut __visit_once"));
        assert!(setup[1].contains("__visit_once . take ()"));
        assert!(served.list.to_string().contains("& mut __visit_server as & mut dyn _standin :: Serve"));
    }

    fn dummy_method() -> MethodPlan {
        MethodPlan::new(
            Names::new("Tree").method("walk", &[]),
            &parse_quote!(fn walk(&self)),
            standin_core::ReceiverKind::Ref,
            0,
            &standin_core::Signature {
                params: vec![],
                outputs: vec![],
                type_params: vec![],
            },
        )
    }
}
