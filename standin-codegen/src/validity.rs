//! Shapes the generators cannot express
//!
//! Everything here is checked before any code is emitted, so a subject that
//! passes is guaranteed to produce an artifact.

use crate::error::{GenerateError, Result};
use standin_core::{
    CallableKind, CallablePassing, Callback, ExternalRef, Mode, Parameter, ReceiverKind,
    Signature, Subject,
};
use standin_resolver::LOCAL;

/// Reject `subject` if it cannot be generated in `mode`
pub fn check(subject: &Subject, mode: Mode) -> Result<()> {
    match subject {
        Subject::Function(function) => {
            reachable(&function.name, &function.package, function.public)?;
            exported(&function.name, &subject.externals())?;
            if function.decl.asyncness.is_some() {
                return Err(GenerateError::invalid(
                    &function.name,
                    "`async fn` is not supported",
                ));
            }
            open_generics(&function.name, &function.signature)?;
            signature(&function.name, &function.signature, mode)
        }
        Subject::Contract(contract) => {
            reachable(&contract.name, &contract.package, contract.public)?;
            exported(&contract.name, &contract.externals)?;
            for trait_ref in &contract.traits {
                exported(&trait_ref.name, &trait_ref.externals)?;
            }
            if mode == Mode::Target {
                if let Some(param) = contract.type_params.first() {
                    return Err(GenerateError::invalid_parameter(
                        &contract.name,
                        &param.name,
                        "generic contracts need type arguments in target mode",
                    ));
                }
            }
            for method in &contract.methods {
                let label = format!("{}::{}", contract.name, method.name);
                exported(&label, &method.signature.externals())?;
                if method.decl.asyncness.is_some() {
                    return Err(GenerateError::invalid(&label, "`async fn` is not supported"));
                }
                match (method.receiver, mode) {
                    (ReceiverKind::None, _) => {
                        return Err(GenerateError::invalid(
                            &label,
                            "methods without a `self` receiver cannot be intercepted",
                        ))
                    }
                    (ReceiverKind::Other, _) => {
                        return Err(GenerateError::invalid_parameter(
                            &label,
                            "self",
                            "only `self`, `&self` and `&mut self` receivers are supported",
                        ))
                    }
                    (ReceiverKind::Value, Mode::Target) => {
                        return Err(GenerateError::invalid_parameter(
                            &label,
                            "self",
                            "a wrapped implementation cannot be consumed by value",
                        ))
                    }
                    _ => {}
                }
                open_generics(&label, &method.signature)?;
                signature(&label, &method.signature, mode)?;
            }
            Ok(())
        }
    }
}

fn reachable(name: &str, package: &str, public: bool) -> Result<()> {
    if package != LOCAL && !public {
        return Err(GenerateError::invalid(
            name,
            format!("is not public, so it cannot be used from outside `{package}`"),
        ));
    }
    Ok(())
}

fn exported(owner: &str, externals: &[ExternalRef]) -> Result<()> {
    match externals.iter().find(|external| external.is_unexported()) {
        Some(external) => Err(GenerateError::invalid_parameter(
            owner,
            &external.name,
            format!("`{}` is private to its package", external.path),
        )),
        None => Ok(()),
    }
}

fn open_generics(owner: &str, signature: &Signature) -> Result<()> {
    match signature.type_params.iter().find(|param| !param.callback) {
        Some(param) => Err(GenerateError::invalid_parameter(
            owner,
            &param.name,
            "type parameters other than callbacks must be fixed with type arguments",
        )),
        None => Ok(()),
    }
}

fn signature(owner: &str, signature: &Signature, mode: Mode) -> Result<()> {
    if signature.is_variadic() {
        return Err(GenerateError::invalid(
            owner,
            "C-variadic functions cannot be doubled or wrapped",
        ));
    }
    for param in &signature.params {
        match &param.callback {
            Some(callback) => check_callback(owner, param, callback, mode)?,
            None => stored(owner, param)?,
        }
    }
    for output in &signature.outputs {
        if let Some(problem) = output.ty.storage_problem() {
            return Err(GenerateError::invalid_parameter(
                owner,
                &output.name,
                format!("the result type {}", problem.describe()),
            ));
        }
    }
    Ok(())
}

fn stored(owner: &str, param: &Parameter) -> Result<()> {
    match param.ty.storage_problem() {
        Some(problem) => Err(GenerateError::invalid_parameter(
            owner,
            &param.name,
            format!("the parameter type {}", problem.describe()),
        )),
        None => Ok(()),
    }
}

fn check_callback(owner: &str, param: &Parameter, callback: &Callback, mode: Mode) -> Result<()> {
    let invalid = |reason: &str| GenerateError::invalid_parameter(owner, &param.name, reason);
    if callback.signature.has_callbacks() {
        return Err(invalid("callbacks taking callbacks are not supported"));
    }
    if callback.kind == CallableKind::FnOnce
        && matches!(
            callback.passing,
            CallablePassing::Borrowed | CallablePassing::BorrowedMut
        )
    {
        return Err(invalid("a borrowed `FnOnce` can never be called"));
    }
    if callback.kind == CallableKind::Pointer && mode == Mode::Target {
        return Err(invalid(
            "a `fn` pointer cannot carry the wrapper's callback channel",
        ));
    }
    for arg in &callback.signature.params {
        if let Some(problem) = arg.ty.storage_problem() {
            return Err(invalid(&format!(
                "callback argument `{}` {}",
                arg.name,
                problem.describe()
            )));
        }
    }
    for output in &callback.signature.outputs {
        if output.ty.capture.is_borrowed() {
            return Err(invalid("callbacks returning borrowed values are not supported"));
        }
        if let Some(problem) = output.ty.storage_problem() {
            return Err(invalid(&format!(
                "the callback result {}",
                problem.describe()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validity_tests.rs"]
mod tests;
