//! Generate one artifact

use super::{open_loader, shown, SourceArgs};
use crate::config::Config;
use anyhow::{Context, Result};
use standin_codegen::Generator;
use standin_core::naming::snake_case;
use standin_core::{GenerationRequest, Mode};
use standin_resolver::{DeriveTypeInfo, ResolutionContext};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Everything `standin generate` takes
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub target: String,
    pub source: SourceArgs,
    /// Package declaring the target, when it is not the source file itself
    pub package: Option<String>,
    pub mode: Option<Mode>,
    pub name: Option<String>,
    pub type_args: Vec<String>,
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    fn request(&self) -> Result<GenerationRequest> {
        let mut request = GenerationRequest::new(&self.target)?
            .with_mode(self.mode.unwrap_or_default())
            .with_type_arguments(self.type_args.iter().cloned());
        if let Some(package) = &self.package {
            request = request.with_package(package);
        }
        if let Some(name) = &self.name {
            request = request.with_artifact_name(name)?;
        }
        Ok(request)
    }

    /// Explicit `--output`, else `<output_dir>/<target>_standin.rs`, else stdout
    fn destination(&self, config: &Config) -> Option<PathBuf> {
        self.output.clone().or_else(|| {
            config
                .paths
                .output_dir
                .as_ref()
                .map(|dir| dir.join(format!("{}_standin.rs", snake_case(&self.target))))
        })
    }
}

/// Generate the artifact and write it, or print it when no destination is set
///
/// Nothing is written unless generation succeeds as a whole.
pub fn generate(args: &GenerateArgs, config: &Config) -> Result<()> {
    let request = args.request()?;
    let text = render(args, &request, config)?;
    match args.destination(config) {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} for `{}`", shown(&path), args.target);
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// The artifact text for `request`
pub fn render(args: &GenerateArgs, request: &GenerationRequest, config: &Config) -> Result<String> {
    let loader = open_loader(&args.source, config)?;
    let type_info = DeriveTypeInfo::new(&loader);
    let generator = Generator::new(ResolutionContext {
        loader: &loader,
        type_info: &type_info,
    })
    .with_options(config.generator.clone())?;
    Ok(generator.generate_request(request)?)
}
