//! Standin CLI - generate test doubles and target wrappers from Rust declarations

use anyhow::Result;
use clap::{Parser, Subcommand};
use standin_core::Mode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod loader;

use commands::generate::GenerateArgs;
use commands::inspect::InspectArgs;
use commands::{generate, init, inspect, SourceArgs};

#[derive(Parser)]
#[command(name = "standin")]
#[command(about = "Generate test doubles and target wrappers from Rust declarations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults to ./standin.toml when present)
    #[arg(long, global = true, env = "STANDIN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a dependency double or a target wrapper
    Generate {
        /// Function, trait or struct to generate for
        target: String,

        /// File the artifact is generated for
        #[arg(long)]
        source: PathBuf,

        /// Module path of the source file (derived from its location by default)
        #[arg(long)]
        module: Option<String>,

        /// Module declaring the target, when it is not the source file
        #[arg(long)]
        package: Option<String>,

        /// Crate directory holding Cargo.toml
        #[arg(long)]
        crate_root: Option<PathBuf>,

        /// Artifact family (dependency or target)
        #[arg(long)]
        mode: Option<Mode>,

        /// Base name of the generated items
        #[arg(long)]
        name: Option<String>,

        /// Type argument for a generic target, in order
        #[arg(long = "type-arg")]
        type_args: Vec<String>,

        /// Output file (defaults to the configured output directory, else stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved signature model of a target
    Inspect {
        /// Function, trait or struct to inspect
        target: String,

        /// File the target is resolved from
        #[arg(long)]
        source: PathBuf,

        /// Module path of the source file
        #[arg(long)]
        module: Option<String>,

        /// Module declaring the target
        #[arg(long)]
        package: Option<String>,

        /// Crate directory holding Cargo.toml
        #[arg(long)]
        crate_root: Option<PathBuf>,

        /// Type argument for a generic target, in order
        #[arg(long = "type-arg")]
        type_args: Vec<String>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Print the complete model
        #[arg(long, conflicts_with = "json")]
        raw: bool,
    },

    /// Write a starter standin.toml into the current directory
    Init {
        /// Directory generated artifacts should go to
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = config::load_config(cli.config)?;

    match cli.command {
        Commands::Generate {
            target,
            source,
            module,
            package,
            crate_root,
            mode,
            name,
            type_args,
            output,
        } => {
            let args = GenerateArgs {
                target,
                source: SourceArgs {
                    source,
                    module,
                    crate_root,
                },
                package,
                mode,
                name,
                type_args,
                output,
            };
            generate::generate(&args, &config)?;
        }

        Commands::Inspect {
            target,
            source,
            module,
            package,
            crate_root,
            type_args,
            json,
            raw,
        } => {
            let args = InspectArgs {
                target,
                source: SourceArgs {
                    source,
                    module,
                    crate_root,
                },
                package,
                type_args,
                raw,
            };
            inspect::inspect(&args, &config, json)?;
        }

        Commands::Init { output_dir, force } => {
            init::init(&std::env::current_dir()?, output_dir, force)?;
        }
    }

    Ok(())
}
