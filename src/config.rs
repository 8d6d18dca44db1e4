//! Configuration module for bpmetadata.
//!
//! This module handles loading and validating configuration from:
//! - YAML configuration files (`bpmetadata.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # bpmetadata.yaml
//!
//! # Scanning options
//! scan:
//!   exclude_patterns:
//!     - "*_override.tf"
//!   continue_on_error: true
//!   max_depth: 1
//!
//! # Where roles and services are declared
//! requirements:
//!   setup_path: test/setup
//!   per_module_roles_local: per_module_roles
//!   per_module_services_local: per_module_services
//!
//! # Output type resolution from Terraform state
//! state:
//!   resolve_output_types: false
//!   terraform_binary: ${TERRAFORM_BIN}
//!
//! # Output options
//! output:
//!   format: yaml
//!   pretty: true
//! ```

use crate::error::{BpMetadataError, Result};
use crate::types::DocumentFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use regex::Regex;
use std::sync::LazyLock;

/// Scanning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// File name patterns to exclude from parsing (glob patterns).
    pub exclude_patterns: Vec<String>,

    /// Keep going when a file fails to parse where extraction tolerates it.
    pub continue_on_error: bool,

    /// Maximum directory depth to read `.tf` files from.
    pub max_depth: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            continue_on_error: true,
            max_depth: default_max_depth(),
        }
    }
}

/// Options locating the declarations of roles and services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementsOptions {
    /// Directory, relative to the blueprint root, holding the setup config.
    pub setup_path: PathBuf,

    /// Name of the local map holding per-module role lists.
    pub per_module_roles_local: String,

    /// Name of the local map holding per-module service lists.
    pub per_module_services_local: String,
}

impl Default for RequirementsOptions {
    fn default() -> Self {
        Self {
            setup_path: PathBuf::from("test/setup"),
            per_module_roles_local: "per_module_roles".to_string(),
            per_module_services_local: "per_module_services".to_string(),
        }
    }
}

/// Output type resolution options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateOptions {
    /// Run Terraform to back-fill output types.
    pub resolve_output_types: bool,

    /// Terraform executable name or path.
    pub terraform_binary: String,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            resolve_output_types: false,
            terraform_binary: "terraform".to_string(),
        }
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Serialization format of the metadata document.
    pub format: DocumentFormat,

    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: DocumentFormat::Yaml,
            pretty: true,
        }
    }
}

/// Main configuration structure with nested sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanning options
    pub scan: ScanOptions,

    /// Roles and services lookup options
    pub requirements: RequirementsOptions,

    /// Output type resolution options
    pub state: StateOptions,

    /// Output options
    pub output: OutputOptions,
}

const fn default_max_depth() -> usize {
    1
}

impl Config {
    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a value is out of range.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content);

        let config: Self = serde_yaml::from_str(&expanded).map_err(|e| {
            BpMetadataError::config_parse(e.to_string(), Some(Box::new(e)), file!(), line!())
        })?;
        config.validate()?;

        tracing::debug!(
            exclude_patterns = config.scan.exclude_patterns.len(),
            continue_on_error = config.scan.continue_on_error,
            resolve_output_types = config.state.resolve_output_types,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_depth == 0 {
            return Err(crate::err!(ConfigValue {
                key: "scan.max_depth".to_string(),
                message: "must be at least 1".to_string(),
            }));
        }
        if let Some(bad) = self
            .scan
            .exclude_patterns
            .iter()
            .find(|p| glob::Pattern::new(p).is_err())
        {
            return Err(crate::err!(ConfigValue {
                key: "scan.exclude_patterns".to_string(),
                message: format!("invalid glob pattern '{bad}'"),
            }));
        }
        if self.state.terraform_binary.trim().is_empty() {
            return Err(crate::err!(ConfigValue {
                key: "state.terraform_binary".to_string(),
                message: "must not be empty".to_string(),
            }));
        }
        Ok(())
    }

    /// Generate an example YAML configuration.
    #[must_use]
    pub fn example_yaml() -> String {
        r#"# bpmetadata configuration file

# Scanning options
scan:
  # File name patterns to skip (glob patterns)
  exclude_patterns: []

  # Skip files that fail to parse while reading roles and services
  continue_on_error: true

  # Directory depth to read .tf files from (1 = module directory only)
  max_depth: 1

# Where the setup configuration declaring roles and services lives
requirements:
  # Relative to the blueprint root
  setup_path: test/setup

  # Local maps keyed by submodule name
  per_module_roles_local: per_module_roles
  per_module_services_local: per_module_services

# Output type resolution
state:
  # Run terraform to back-fill output types from state
  resolve_output_types: false

  # Terraform executable (can use environment variable)
  # terraform_binary: ${TERRAFORM_BIN}
  terraform_binary: terraform

# Output options
output:
  # yaml or json
  format: yaml

  # Pretty-print JSON output
  pretty: true
"#
        .to_string()
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::GenerateArgs) {
        if !args.exclude_patterns.is_empty() {
            self.scan
                .exclude_patterns
                .extend(args.exclude_patterns.iter().cloned());
        }
        if args.fail_fast {
            self.scan.continue_on_error = false;
        }
        if args.resolve_output_types {
            self.state.resolve_output_types = true;
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }
    }
}

static BRACED_ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

static BARE_ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex"));

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    for re in [&*BRACED_ENV_VAR, &*BARE_ENV_VAR] {
        for cap in re.captures_iter(content) {
            if let Ok(value) = std::env::var(&cap[1]) {
                result = result.replace(&cap[0], &value);
            }
        }
    }

    result
}
