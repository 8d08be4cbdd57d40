//! Names of generated items
//!
//! Everything is derived from the artifact base name and the method keys
//! assigned by the resolver, so two runs over the same subject always
//! agree.

use proc_macro2::Ident;
use quote::format_ident;
use standin_core::naming::upper_camel;
use std::collections::BTreeSet;

/// Inherent methods of generated doubles and wrappers that accessors must not shadow
pub const BUILDER_METHODS: &[&str] = &[
    "new",
    "with_reporter",
    "with_timeout",
    "imp",
    "unclaimed_calls",
    "interceptor",
    "next_call",
    "default",
    "clone",
    "fmt",
];

/// Contract-level item names
#[derive(Debug, Clone)]
pub struct Names {
    /// Artifact base name
    pub base: String,
    /// Test-side controller (`<Base>Double`)
    pub double: Ident,
    /// Stand-in implementing the contract (`<Base>DoubleImpl`)
    pub double_impl: Ident,
    /// Call union (`<Base>Call`)
    pub union: Ident,
    /// Wrapper (`<Base>Target`)
    pub target: Ident,
    /// Contract implementation forwarding into the wrapper (`<Base>Interceptor`)
    pub interceptor: Ident,
    /// Synthesized trait for a struct's inherent methods (`<Base>Methods`)
    pub methods_trait: Ident,
}

/// Names of the items generated for one method (or the function itself)
#[derive(Debug, Clone)]
pub struct MethodNames {
    /// Text used in messages and `method_name()`
    pub label: String,
    /// Accessor on the double or wrapper
    pub accessor: Ident,
    /// Union variant
    pub variant: Ident,
    /// Call record
    pub call: Ident,
    /// Response record
    pub response: Ident,
    /// Expectation builder
    pub expectation: Ident,
    /// Returns record
    pub returns: Ident,
    /// Per-method wrapper
    pub target: Ident,
    /// One entry per callback parameter, in declaration order
    pub callbacks: Vec<CallbackNames>,
}

/// Names of the items generated for one callback parameter
#[derive(Debug, Clone)]
pub struct CallbackNames {
    /// Parameter name without a raw prefix
    pub label: String,
    /// Request record
    pub request: Ident,
    /// Typed invocation result (doubles only)
    pub result: Ident,
    /// Invocation method on the call record (`invoke_<param>`)
    pub invoke: Ident,
    /// Wrapper method claiming the next request (`expect_<param>_called`)
    pub expect_called: Ident,
    /// Private record field holding the channel end
    pub slot: Ident,
}

impl Names {
    /// Names for an artifact based on `base`
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            double: format_ident!("{}Double", base),
            double_impl: format_ident!("{}DoubleImpl", base),
            union: format_ident!("{}Call", base),
            target: format_ident!("{}Target", base),
            interceptor: format_ident!("{}Interceptor", base),
            methods_trait: format_ident!("{}Methods", base),
        }
    }

    /// Names for the function itself, which has no method key
    pub fn function(&self, name: &str, callbacks: &[&str]) -> MethodNames {
        self.build(name, "", "call", callbacks)
    }

    /// Names for the method keyed `key`
    pub fn method(&self, key: &str, callbacks: &[&str]) -> MethodNames {
        let plain = strip_raw(key);
        let accessor = if BUILDER_METHODS.contains(&plain) {
            format!("{plain}_method")
        } else {
            key.to_string()
        };
        self.build(plain, &upper_camel(key), &accessor, callbacks)
    }

    fn build(&self, label: &str, camel: &str, accessor: &str, callbacks: &[&str]) -> MethodNames {
        let base = &self.base;
        let callbacks = callbacks
            .iter()
            .map(|param| {
                let label = strip_raw(param).to_string();
                let param_camel = upper_camel(param);
                CallbackNames {
                    request: format_ident!("{}{}{}Request", base, camel, param_camel),
                    result: format_ident!("{}{}{}Result", base, camel, param_camel),
                    invoke: format_ident!("invoke_{}", label),
                    expect_called: format_ident!("expect_{}_called", label),
                    slot: format_ident!("__{}", label),
                    label,
                }
            })
            .collect();
        MethodNames {
            label: label.to_string(),
            accessor: format_ident!("{}", accessor),
            variant: format_ident!("{}", if camel.is_empty() { "Call" } else { camel }),
            call: format_ident!("{}{}Call", base, camel),
            response: format_ident!("{}{}Response", base, camel),
            expectation: format_ident!("{}{}Expectation", base, camel),
            returns: format_ident!("{}{}Returns", base, camel),
            target: format_ident!("{}{}Target", base, camel),
            callbacks,
        }
    }

    /// Every item name the artifact may declare
    ///
    /// User names equal to one of these must not be imported.
    pub fn reserved(&self, methods: &[MethodNames]) -> BTreeSet<String> {
        let mut reserved: BTreeSet<String> = [
            &self.double,
            &self.double_impl,
            &self.union,
            &self.target,
            &self.interceptor,
            &self.methods_trait,
        ]
        .iter()
        .map(|ident| ident.to_string())
        .collect();
        for method in methods {
            for ident in [
                &method.call,
                &method.response,
                &method.expectation,
                &method.returns,
                &method.target,
            ] {
                reserved.insert(ident.to_string());
            }
            for callback in &method.callbacks {
                reserved.insert(callback.request.to_string());
                reserved.insert(callback.result.to_string());
            }
        }
        reserved
    }
}

/// Identifier text without a leading `r#`
pub fn strip_raw(name: &str) -> &str {
    name.strip_prefix("r#").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        let names = Names::new("Store");
        let load = names.method("load_all", &["visit"]);
        assert_eq!(load.call.to_string(), "StoreLoadAllCall");
        assert_eq!(load.response.to_string(), "StoreLoadAllResponse");
        assert_eq!(load.expectation.to_string(), "StoreLoadAllExpectation");
        assert_eq!(load.variant.to_string(), "LoadAll");
        assert_eq!(load.accessor.to_string(), "load_all");
        assert_eq!(load.callbacks[0].request.to_string(), "StoreLoadAllVisitRequest");
        assert_eq!(load.callbacks[0].invoke.to_string(), "invoke_visit");
    }

    #[test]
    fn test_function_names_have_no_method_part() {
        let names = Names::new("Add");
        let add = names.function("add", &[]);
        assert_eq!(add.call.to_string(), "AddCall");
        assert_eq!(add.returns.to_string(), "AddReturns");
        assert_eq!(add.target.to_string(), "AddTarget");
    }

    #[test]
    fn test_accessors_avoid_builder_methods() {
        let names = Names::new("Factory");
        assert_eq!(names.method("new", &[]).accessor.to_string(), "new_method");
        assert_eq!(names.method("r#type", &[]).accessor.to_string(), "r#type");
        assert_eq!(names.method("r#type", &[]).call.to_string(), "FactoryTypeCall");
    }

    #[test]
    fn test_reserved_names_cover_records() {
        let names = Names::new("Store");
        let methods = vec![names.method("get", &["each"])];
        let reserved = names.reserved(&methods);
        assert!(reserved.contains("StoreDouble"));
        assert!(reserved.contains("StoreGetCall"));
        assert!(reserved.contains("StoreGetEachRequest"));
        assert!(!reserved.contains("Store"));
    }
}
