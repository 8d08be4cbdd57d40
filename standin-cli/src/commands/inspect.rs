//! Print the resolved signature model of a target

use super::{open_loader, SourceArgs};
use crate::config::Config;
use anyhow::Result;
use quote::ToTokens;
use serde::Serialize;
use standin_core::{
    ContractKind, GenerationRequest, Method, Mode, Parameter, Signature, Subject,
};
use standin_resolver::{DeriveTypeInfo, ResolutionContext, Resolver};

#[derive(Debug, Clone)]
pub struct InspectArgs {
    pub target: String,
    pub source: SourceArgs,
    pub package: Option<String>,
    pub type_args: Vec<String>,
    /// Print the whole model with `{:#?}` instead of a summary
    pub raw: bool,
}

/// Summary of a resolved subject, as printed by `standin inspect`
#[derive(Debug, Serialize, PartialEq)]
pub struct Report {
    pub name: String,
    pub kind: &'static str,
    pub package: String,
    pub public: bool,
    /// Mode used when none is requested
    pub default_mode: String,
    pub traits: Vec<String>,
    pub methods: Vec<MethodReport>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MethodReport {
    pub key: String,
    pub receiver: String,
    pub params: Vec<ValueReport>,
    pub outputs: Vec<ValueReport>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ValueReport {
    pub field: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub captured: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

impl Report {
    pub fn of(subject: &Subject) -> Self {
        match subject {
            Subject::Function(function) => Self {
                name: function.name.clone(),
                kind: "function",
                package: function.package.clone(),
                public: function.public,
                default_mode: Mode::Unspecified.resolve(true).to_string(),
                traits: Vec::new(),
                methods: vec![method_report(&function.name, "none", &function.signature)],
            },
            Subject::Contract(contract) => Self {
                name: contract.name.clone(),
                kind: match contract.kind {
                    ContractKind::Trait => "trait",
                    ContractKind::Struct => "struct",
                },
                package: contract.package.clone(),
                public: contract.public,
                default_mode: Mode::Unspecified.resolve(false).to_string(),
                traits: contract
                    .traits
                    .iter()
                    .map(|trait_ref| tokens(&trait_ref.path))
                    .collect(),
                methods: contract.methods.iter().map(contract_method).collect(),
            },
        }
    }
}

fn contract_method(method: &Method) -> MethodReport {
    let receiver = format!("{:?}", method.receiver).to_lowercase();
    method_report(&method.key, &receiver, &method.signature)
}

fn method_report(key: &str, receiver: &str, signature: &Signature) -> MethodReport {
    MethodReport {
        key: key.to_string(),
        receiver: receiver.to_string(),
        params: signature.params.iter().map(param_report).collect(),
        outputs: signature
            .outputs
            .iter()
            .map(|output| ValueReport {
                field: output.field.clone(),
                ty: tokens(&output.ty.ty),
                captured: tokens(&output.ty.captured),
                callback: None,
            })
            .collect(),
    }
}

fn param_report(param: &Parameter) -> ValueReport {
    ValueReport {
        field: param.field.clone(),
        ty: tokens(&param.ty.ty),
        captured: tokens(&param.ty.captured),
        callback: param
            .callback
            .as_ref()
            .map(|callback| callback.kind.trait_name().to_string()),
    }
}

/// Tokens of `node` without the spaces `TokenStream`'s display puts everywhere
fn tokens(node: &impl ToTokens) -> String {
    let text = node.to_token_stream().to_string();
    ["< ", " <", " >", " ::", ":: ", "& ", " ,"]
        .iter()
        .fold(text, |text, spaced| text.replace(spaced, spaced.trim()))
}

/// Resolve the target and print what the generator would work from
pub fn inspect(args: &InspectArgs, config: &Config, json: bool) -> Result<()> {
    let mut request = GenerationRequest::new(&args.target)?
        .with_type_arguments(args.type_args.iter().cloned());
    if let Some(package) = &args.package {
        request = request.with_package(package);
    }
    let loader = open_loader(&args.source, config)?;
    let type_info = DeriveTypeInfo::new(&loader);
    let resolver = Resolver::new(ResolutionContext {
        loader: &loader,
        type_info: &type_info,
    });
    let (_, subject) = resolver.resolve_request(&request)?;

    if args.raw {
        println!("{subject:#?}");
    } else if json {
        println!("{}", serde_json::to_string_pretty(&Report::of(&subject))?);
    } else {
        print!("{}", summary(&Report::of(&subject)));
    }
    Ok(())
}

/// Plain-text rendering of a report
pub fn summary(report: &Report) -> String {
    let visibility = if report.public { "pub " } else { "" };
    let mut out = format!(
        "{}{} {} in {} (default mode: {})\n",
        visibility, report.kind, report.name, report.package, report.default_mode
    );
    if !report.traits.is_empty() {
        out.push_str(&format!("  contracts: {}\n", report.traits.join(", ")));
    }
    for method in &report.methods {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|param| match &param.callback {
                Some(kind) => format!("{}: {} [{} callback]", param.field, param.ty, kind),
                None => format!("{}: {}", param.field, param.ty),
            })
            .collect();
        let outputs: Vec<String> = method
            .outputs
            .iter()
            .map(|output| format!("{}: {}", output.field, output.ty))
            .collect();
        out.push_str(&format!(
            "  {} ({}) ({}) -> ({})\n",
            method.key,
            method.receiver,
            params.join(", "),
            outputs.join(", ")
        ));
    }
    out
}
