//! Standin Code Generation
//!
//! Turns a resolved subject into the source text of one artifact:
//! - **Dependency doubles**: a controller plus a stand-in that queues every
//!   call for the test to claim and answer
//! - **Target wrappers**: launch the real callable on its own thread, then
//!   wait and assert on its single outcome
//! - **Callback sub-protocol** for callable parameters, in both modes
//!
//! Generation is a single pass (validate, plan imports, emit, format) and
//! either returns a whole artifact or one [`GenerateError`].

pub mod callback;
pub mod dependency;
pub mod emit;
pub mod error;
pub mod generics;
pub mod imports;
pub mod names;
pub mod options;
pub mod plan;
pub mod target;
#[cfg(test)]
mod testing;
pub mod validity;

pub use emit::{Artifact, Section};
pub use error::{GenerateError, Result};
pub use options::GeneratorOptions;

use names::{MethodNames, Names};
use plan::{Env, MethodPlan};
use quote::format_ident;
use standin_core::naming::upper_camel;
use standin_core::{GenerationRequest, Mode, ReceiverKind, Signature, Subject};
use standin_resolver::{Declaration, ResolutionContext, ResolveError, Resolver};
use tracing::{debug, info};

/// Header line every artifact starts with
pub const GENERATED_HEADER: &str = "// Code generated by standin. DO NOT EDIT.";

/// Generates artifacts against one set of collaborators
pub struct Generator<'a> {
    context: ResolutionContext<'a>,
    options: GeneratorOptions,
}

impl<'a> Generator<'a> {
    /// A generator with default options
    pub fn new(context: ResolutionContext<'a>) -> Self {
        Self {
            context,
            options: GeneratorOptions::default(),
        }
    }

    /// Replace the options, rejecting unusable ones
    pub fn with_options(mut self, options: GeneratorOptions) -> Result<Self> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    /// Current options
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Find the declaration `request` names, then generate for it
    pub fn generate_request(&self, request: &GenerationRequest) -> Result<String> {
        let declaration = Resolver::new(self.context).find(request)?;
        self.generate(request, &declaration)
    }

    /// Generate the artifact for an already located declaration
    pub fn generate(&self, request: &GenerationRequest, declaration: &Declaration) -> Result<String> {
        let type_arguments = request
            .parsed_type_arguments()
            .map_err(ResolveError::from)?;
        let subject = Resolver::new(self.context).resolve(declaration, &type_arguments)?;
        self.assemble(request, subject)
    }

    fn assemble(&self, request: &GenerationRequest, mut subject: Subject) -> Result<String> {
        let mode = request.mode.resolve(subject.is_function());
        validity::check(&subject, mode)?;

        let base = match &request.artifact_name {
            Some(name) => name.clone(),
            None => upper_camel(&request.local_name),
        };
        let names = Names::new(&base);
        let method_names = method_names(&names, &subject);
        let reserved = names.reserved(&method_names);
        let imports = imports::plan(
            &mut subject,
            &reserved,
            &self.options.runtime_path,
            &self.options.framework_alias,
        )?;
        debug!(
            "Planned {} user import(s) for `{}`",
            imports.user().count(),
            subject.name()
        );

        let env = Env {
            rt: format_ident!("{}", self.options.framework_alias),
            timeout_ms: self.options.timeout_ms,
        };
        let header = self.options.header.then(|| {
            format!(
                "{GENERATED_HEADER}\n// Source: {} `{}` in {}",
                mode, request.target_name, request.package_name
            )
        });
        let mut artifact = Artifact::new(subject.name(), header);
        artifact.push(Section::Imports, imports.render());

        let mut method_names = method_names.into_iter();
        match &subject {
            Subject::Function(function) => {
                let Some(function_names) = method_names.next() else {
                    return Err(assembly(&subject, "no names were derived for the function"));
                };
                let plan = MethodPlan::new(
                    function_names,
                    &function.decl,
                    ReceiverKind::None,
                    0,
                    &function.signature,
                );
                match mode {
                    Mode::Target => target::function(&env, &mut artifact, &names, function, &plan),
                    _ => dependency::function(&env, &mut artifact, &names, function, &plan),
                }
            }
            Subject::Contract(contract) => {
                let plans: Vec<MethodPlan> = contract
                    .methods
                    .iter()
                    .zip(method_names)
                    .map(|(method, names)| {
                        MethodPlan::new(
                            names,
                            &method.decl,
                            method.receiver,
                            method.origin,
                            &method.signature,
                        )
                    })
                    .collect();
                match mode {
                    Mode::Target => target::contract(&env, &mut artifact, &names, contract, &plans),
                    _ => dependency::contract(&env, &mut artifact, &names, contract, &plans),
                }
            }
        }

        info!(
            "Generated {} artifact `{}` ({} items)",
            mode,
            base,
            artifact.len()
        );
        artifact.render()
    }
}

/// Generate one artifact with default options
pub fn generate(
    request: &GenerationRequest,
    declaration: &Declaration,
    context: ResolutionContext<'_>,
) -> Result<String> {
    Generator::new(context).generate(request, declaration)
}

fn method_names(names: &Names, subject: &Subject) -> Vec<MethodNames> {
    match subject {
        Subject::Function(function) => {
            vec![names.function(&function.name, &callback_labels(&function.signature))]
        }
        Subject::Contract(contract) => contract
            .methods
            .iter()
            .map(|method| names.method(&method.key, &callback_labels(&method.signature)))
            .collect(),
    }
}

fn callback_labels(signature: &Signature) -> Vec<&str> {
    signature
        .callback_params()
        .map(|(param, _)| param.name.as_str())
        .collect()
}

fn assembly(subject: &Subject, message: &str) -> GenerateError {
    GenerateError::Assembly {
        subject: subject.name().to_string(),
        message: message.to_string(),
    }
}
