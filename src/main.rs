//! bpmetadata CLI entry point.
//!
//! This binary provides the command-line interface for bpmetadata.

use bpmetadata::cli::{Cli, Commands, GenerateArgs};
use bpmetadata::document::{self, METADATA_FILE_NAME};
use bpmetadata::resolver::StateFile;
use bpmetadata::{BpMetadataError, Config, MetadataGenerator};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration files looked up in the working directory.
const DEFAULT_CONFIG_FILES: &[&str] = &["bpmetadata.yaml", "bpmetadata.yml", ".bpmetadata.yaml"];

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");

            eprintln!("Error: {e}");

            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut i = 0;
                while let Some(cause) = source {
                    eprintln!("  {i}: {cause}");
                    source = cause.source();
                    i += 1;
                }
            }

            let backtrace = e.backtrace();
            if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
                eprintln!("\nStack backtrace:");
                for line in backtrace.to_string().lines() {
                    if line.contains("bpmetadata::") || line.trim_start().starts_with("at ./src/") {
                        eprintln!("{line}");
                    }
                }
            }

            let code = e
                .downcast_ref::<BpMetadataError>()
                .map_or(1, BpMetadataError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        // RUST_LOG takes precedence over the verbosity flags
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("warn,bpmetadata={base_level}"))
        })
    };

    // Logs go to stderr so stdout stays a clean document
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::debug!("Loading configuration");
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate(args) => {
            config.merge_cli_args(&args);
            config.validate()?;
            generate(config, &args).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Init => {
            let config_path = Path::new(DEFAULT_CONFIG_FILES[0]);

            if config_path.exists() {
                anyhow::bail!("Configuration file already exists: {}", config_path.display());
            }

            std::fs::write(config_path, Config::example_yaml())?;
            println!("Created example configuration: {}", config_path.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate(args) => match document::read_document(&args.file).await {
            Ok(metadata) => {
                println!(
                    "Metadata document is valid: {} ({} variables, {} outputs)",
                    args.file.display(),
                    metadata.spec.interfaces.variables.len(),
                    metadata.spec.interfaces.outputs.len()
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Metadata error: {e}");
                Ok(ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1)))
            }
        },
    }
}

async fn generate(config: Config, args: &GenerateArgs) -> anyhow::Result<()> {
    let bp_root = args.blueprint_root.clone().unwrap_or_else(|| args.path.clone());

    let existing_path = args.existing.clone().or_else(|| {
        let default = args.path.join(METADATA_FILE_NAME);
        default.is_file().then_some(default)
    });
    let existing = match &existing_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Merging with existing metadata");
            Some(document::read_document(path).await?)
        }
        None => None,
    };

    // An explicit --format wins over the output file's extension
    let format = match (&args.output, args.format) {
        (Some(output_path), None) => document::format_for_path(output_path),
        _ => config.output.format,
    };
    let pretty = config.output.pretty;
    let generator = match &args.state_file {
        Some(state_file) => MetadataGenerator::with_state_retriever(config, Box::new(StateFile::new(state_file))),
        None => MetadataGenerator::new(config),
    };

    let metadata = generator
        .generate_with_existing(&args.path, &bp_root, existing.as_ref())
        .await?;

    match &args.output {
        Some(output_path) => document::write_document(output_path, &metadata, format, pretty).await?,
        None => print!("{}", document::render_document(&metadata, format, pretty)?),
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(config_path) = explicit {
        tracing::debug!(path = %config_path.display(), "Loading configuration from explicit path");
        let content = std::fs::read_to_string(config_path)?;
        return Ok(Config::from_yaml(&content)?);
    }

    for path in DEFAULT_CONFIG_FILES {
        if Path::new(path).exists() {
            tracing::debug!(path = %path, "Found configuration file");
            let content = std::fs::read_to_string(path)?;
            return Ok(Config::from_yaml(&content)?);
        }
    }

    tracing::debug!("No configuration file found, using default configuration");
    Ok(Config::default())
}
