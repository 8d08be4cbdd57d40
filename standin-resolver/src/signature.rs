//! Building signatures from declared `fn` signatures

use crate::callback::{self, CallableShape};
use crate::error::{ResolveError, Result};
use crate::qualify::{normalize_signature, qualify_bound, qualify_type};
use crate::resolver::Resolver;
use crate::scope::Scope;
use crate::subst::Substitution;
use quote::{format_ident, quote};
use standin_core::naming;
use standin_core::{
    Callback, Comparability, ExternalRef, Output, Parameter, QualifiedType, Signature,
    TypeParameter,
};
use syn::{FnArg, GenericParam, Generics, Pat, PatIdent, PatType, ReturnType, Type, WherePredicate};
use tracing::trace;

/// A resolved signature together with its normalized declaration
pub(crate) struct Resolved {
    pub signature: Signature,
    pub decl: syn::Signature,
    /// Names needed by the bounds of the signature's own type parameters
    pub bound_externals: Vec<ExternalRef>,
}

struct Draft {
    declared: Option<String>,
    ty: QualifiedType,
    variadic: bool,
    callback: Option<Callback>,
}

impl Resolver<'_> {
    /// Resolve `sig` declared in `scope`; `owner` names it in errors
    pub(crate) fn signature(
        &self,
        owner: &str,
        sig: &syn::Signature,
        scope: &Scope<'_>,
        subst: &Substitution,
    ) -> Result<Resolved> {
        let scope = scope.with_generics(&sig.generics);
        let mut decl = subst.apply_signature(&normalize_signature(sig, &scope));

        let mut drafts = Vec::new();
        for input in sig.inputs.iter().filter_map(typed) {
            let (qualified, externals) = qualify_type(&input.ty, &scope);
            let callback = match callback::classify(&qualified, &scope) {
                Some(shape) => Some(self.callback(owner, &shape, &scope, subst)?),
                None => None,
            };
            drafts.push(Draft {
                declared: declared_name(&input.pat),
                ty: self.qualified(subst.apply_type(&qualified), externals, &scope),
                variadic: false,
                callback,
            });
        }
        if sig.variadic.is_some() {
            drafts.push(Draft {
                declared: None,
                ty: QualifiedType::new(
                    Type::Verbatim(quote!(...)),
                    Comparability::Structural,
                    Vec::new(),
                ),
                variadic: true,
                callback: None,
            });
        }

        let params = name_params(drafts);
        let outputs = self.outputs(&sig.output, &scope, subst);
        let (type_params, bound_externals) =
            self.type_params(owner, &sig.generics, &scope, subst, &params)?;

        strip_bound_params(&mut decl.generics, subst);
        rename_patterns(&mut decl, &params);
        trace!(
            "Resolved {} with {} parameter(s) and {} result(s)",
            owner,
            params.len(),
            outputs.len()
        );

        Ok(Resolved {
            signature: Signature {
                params,
                outputs,
                type_params,
            },
            decl,
            bound_externals,
        })
    }

    pub(crate) fn qualified(
        &self,
        ty: Type,
        externals: Vec<ExternalRef>,
        scope: &Scope<'_>,
    ) -> QualifiedType {
        let comparability = match self.context.type_info.is_comparable(&ty, scope) {
            Some(true) => Comparability::Comparable,
            _ => Comparability::Structural,
        };
        QualifiedType::new(ty, comparability, externals)
    }

    fn outputs(&self, output: &ReturnType, scope: &Scope<'_>, subst: &Substitution) -> Vec<Output> {
        let types: Vec<Type> = match output {
            ReturnType::Default => Vec::new(),
            ReturnType::Type(_, ty) => match ty.as_ref() {
                Type::Tuple(tuple) => tuple.elems.iter().cloned().collect(),
                other => vec![other.clone()],
            },
        };
        let total = types.len();
        types
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                let (qualified, externals) = qualify_type(ty, scope);
                let ty = self.qualified(subst.apply_type(&qualified), externals, scope);
                Output {
                    name: naming::positional_result(index),
                    field: naming::result_field_name(index, ty.class, total),
                    ty,
                    index,
                }
            })
            .collect()
    }

    fn callback(
        &self,
        owner: &str,
        shape: &CallableShape,
        scope: &Scope<'_>,
        subst: &Substitution,
    ) -> Result<Callback> {
        let mut drafts = Vec::new();
        for input in &shape.inputs {
            let (qualified, externals) = qualify_type(input, scope);
            let nested = match callback::classify(&qualified, scope) {
                Some(inner) => Some(self.callback(owner, &inner, scope, subst)?),
                None => None,
            };
            drafts.push(Draft {
                declared: None,
                ty: self.qualified(subst.apply_type(&qualified), externals, scope),
                variadic: false,
                callback: nested,
            });
        }
        Ok(Callback {
            kind: shape.kind,
            passing: shape.passing,
            signature: Signature {
                params: name_params(drafts),
                outputs: self.outputs(&shape.output, scope, subst),
                type_params: Vec::new(),
            },
            extra_bounds: shape
                .extra_bounds
                .iter()
                .map(|bound| subst.apply_bound(&qualify_bound(bound, scope).0))
                .collect(),
            generic: shape.generic.clone(),
        })
    }

    fn type_params(
        &self,
        owner: &str,
        generics: &Generics,
        scope: &Scope<'_>,
        subst: &Substitution,
        params: &[Parameter],
    ) -> Result<(Vec<TypeParameter>, Vec<ExternalRef>)> {
        let mut type_params = Vec::new();
        let mut externals = Vec::new();
        for param in &generics.params {
            match param {
                GenericParam::Type(type_param) => {
                    let name = type_param.ident.to_string();
                    if subst.binds(&name) {
                        continue;
                    }
                    let mut bounds = Vec::new();
                    for bound in scope.bounds_of(&name).unwrap_or_default() {
                        let (bound, names) = qualify_bound(bound, scope);
                        externals.extend(names);
                        bounds.push(subst.apply_bound(&bound));
                    }
                    let callback = params.iter().any(|param| {
                        param
                            .callback
                            .as_ref()
                            .and_then(|callback| callback.generic.as_deref())
                            == Some(name.as_str())
                    });
                    type_params.push(TypeParameter {
                        name,
                        bounds,
                        callback,
                    });
                }
                GenericParam::Const(const_param) => {
                    return Err(ResolveError::UnsupportedShape {
                        name: owner.to_string(),
                        reason: format!(
                            "const generic parameter `{}` is not supported",
                            const_param.ident
                        ),
                    });
                }
                GenericParam::Lifetime(_) => {}
            }
        }
        Ok((type_params, externals))
    }
}

fn typed(arg: &FnArg) -> Option<&PatType> {
    match arg {
        FnArg::Typed(pat_type) => Some(pat_type),
        FnArg::Receiver(_) => None,
    }
}

fn declared_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(ident) => Some(ident.ident.to_string()),
        _ => None,
    }
}

fn name_params(drafts: Vec<Draft>) -> Vec<Parameter> {
    let total = drafts.len();
    let declared: Vec<String> = drafts
        .iter()
        .filter_map(|draft| draft.declared.clone())
        .collect();
    let mut fields_taken = declared.clone();
    let mut names_taken = declared;
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let (name, field, declared) = match draft.declared {
                Some(name) => (name.clone(), name, true),
                None => {
                    let candidate = naming::field_name(index, draft.ty.class, total);
                    let field = naming::disambiguate(&candidate, index, &fields_taken);
                    fields_taken.push(field.clone());
                    let name = naming::disambiguate(
                        &naming::positional_param(index),
                        index,
                        &names_taken,
                    );
                    names_taken.push(name.clone());
                    (name, field, false)
                }
            };
            Parameter {
                name,
                field,
                ty: draft.ty,
                variadic: draft.variadic,
                index,
                declared,
                callback: draft.callback,
            }
        })
        .collect()
}

fn strip_bound_params(generics: &mut Generics, subst: &Substitution) {
    if subst.is_empty() {
        return;
    }
    generics.params = generics
        .params
        .iter()
        .filter(|param| match param {
            GenericParam::Type(type_param) => !subst.binds(&type_param.ident.to_string()),
            _ => true,
        })
        .cloned()
        .collect();
    if let Some(where_clause) = &mut generics.where_clause {
        where_clause.predicates = where_clause
            .predicates
            .iter()
            .filter(|predicate| match predicate {
                WherePredicate::Type(predicate) => !matches!(
                    &predicate.bounded_ty,
                    Type::Path(path) if path.path.get_ident().is_some_and(|ident| subst.binds(&ident.to_string()))
                ),
                _ => true,
            })
            .cloned()
            .collect();
    }
    if generics.params.is_empty() {
        generics.lt_token = None;
        generics.gt_token = None;
    }
}

fn rename_patterns(decl: &mut syn::Signature, params: &[Parameter]) {
    let mut names = params.iter().filter(|param| !param.variadic);
    for arg in decl.inputs.iter_mut() {
        let FnArg::Typed(pat_type) = arg else {
            continue;
        };
        let Some(param) = names.next() else {
            break;
        };
        pat_type.pat = Box::new(Pat::Ident(PatIdent {
            attrs: Vec::new(),
            by_ref: None,
            mutability: None,
            ident: format_ident!("{}", param.name),
            subpat: None,
        }));
    }
}
