//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap, including
//! all commands, arguments, and options.
//!
//! # Commands
//!
//! - `generate`: Extract metadata from a blueprint and write the document
//! - `init`: Create an example configuration file
//! - `validate`: Check that a metadata document can be loaded
//!
//! # Example Usage
//!
//! ```bash
//! # Regenerate metadata.yaml in place, keeping curated connections
//! bpmetadata generate ./terraform-google-example
//!
//! # Metadata for a submodule, requirements read from the blueprint root
//! bpmetadata generate ./modules/run --blueprint-root . --output ./modules/run/metadata.yaml
//!
//! # Back-fill output types from a state file
//! bpmetadata generate . --state-file terraform.tfstate
//!
//! # Initialize configuration
//! bpmetadata init
//!
//! # Validate a metadata document
//! bpmetadata validate metadata.yaml
//! ```

use crate::types::DocumentFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// bpmetadata - Terraform blueprint metadata generator.
#[derive(Parser, Debug)]
#[command(
    name = "bpmetadata",
    author,
    version,
    about = "Terraform blueprint metadata generator",
    long_about = "bpmetadata reads the Terraform configuration of a blueprint and writes a \
                  BlueprintMetadata document describing its variables, outputs, required \
                  IAM roles, service APIs and provider versions, preserving hand-curated \
                  fields from the previous document."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "BPMETADATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the metadata document of a blueprint
    #[command(visible_alias = "g")]
    Generate(GenerateArgs),

    /// Create an example configuration file
    Init,

    /// Validate a metadata document
    Validate(ValidateArgs),
}

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Blueprint or submodule directory
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Root of the blueprint repository (defaults to PATH)
    #[arg(long, value_name = "DIR")]
    pub blueprint_root: Option<PathBuf>,

    /// Previously generated document to merge with (defaults to PATH/metadata.yaml when present)
    #[arg(short, long, value_name = "FILE")]
    pub existing: Option<PathBuf>,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<DocumentFormat>,

    /// Run terraform to resolve output types from state
    #[arg(long)]
    pub resolve_output_types: bool,

    /// Read state from this file instead of running terraform
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Stop at the first setup file that fails to parse
    #[arg(long)]
    pub fail_fast: bool,

    /// Patterns to exclude from parsing (glob patterns)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,
}

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Metadata document to validate
    #[arg(value_name = "FILE", default_value = "metadata.yaml")]
    pub file: PathBuf,
}
