//! # bpmetadata
//!
//! Metadata generation for Terraform blueprints.
//!
//! bpmetadata reads the Terraform configuration of a blueprint and produces a
//! `BlueprintMetadata` document describing it, merged with the previously
//! generated document so that hand-curated fields survive regeneration.
//!
//! ## Features
//!
//! - **Interfaces**: variables with types, defaults and the required flag;
//!   outputs with descriptions
//! - **Requirements**: IAM roles and service APIs from the blueprint's setup
//!   configuration, globally or per submodule
//! - **Versions**: Terraform `required_version`, the blueprint's own version
//!   and provider constraints
//! - **Output types**: resolved from Terraform state
//! - **Merging**: connections and output types carried over from the
//!   existing document
//!
//! ## Example
//!
//! ```rust,no_run
//! use bpmetadata::{Config, MetadataGenerator};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let generator = MetadataGenerator::new(Config::default());
//!     let root = Path::new("./terraform-google-example");
//!
//!     let metadata = generator.generate(root, root).await?;
//!     println!("{} variables", metadata.spec.interfaces.variables.len());
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod merger;
pub mod parser;
pub mod resolver;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use error::{BpMetadataError, Result};
pub use types::{
    BlueprintInterface, BlueprintMetadata, BlueprintOutput, BlueprintRoles, BlueprintVariable,
    BlueprintVersion, DocumentFormat, ProviderVersion, RoleLevel,
};

use extractor::Selection;
use parser::{BodyExt, HclParser};
use resolver::{OutputTypeResolver, StateRetriever, TerraformCli};
use types::BlueprintRequirements;

use std::path::Path;

/// Main orchestrator producing the metadata document of a blueprint.
///
/// Interfaces and versions are read from the blueprint directory itself.
/// Roles and services are read from `<root>/<requirements.setup_path>`:
/// when that configuration declares per-module local maps, the entry for the
/// blueprint's module name is used, otherwise the global declarations.
///
/// # Example
///
/// ```rust,no_run
/// use bpmetadata::{Config, MetadataGenerator};
/// use bpmetadata::resolver::StateFile;
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let generator = MetadataGenerator::with_state_retriever(
///         Config::default(),
///         Box::new(StateFile::new("terraform.tfstate")),
///     );
///
///     let metadata = generator
///         .generate(Path::new("./modules/run"), Path::new("."))
///         .await?;
///     println!("{}", metadata.metadata.name);
///     Ok(())
/// }
/// ```
pub struct MetadataGenerator {
    config: Config,
    resolver: Option<OutputTypeResolver>,
}

impl MetadataGenerator {
    /// Create a generator; output types are resolved through the Terraform
    /// binary when `state.resolve_output_types` is set.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let resolver = config
            .state
            .resolve_output_types
            .then(|| OutputTypeResolver::new(Box::new(TerraformCli::new(&config.state))));
        Self { config, resolver }
    }

    /// Create a generator resolving output types from `retriever`.
    #[must_use]
    pub fn with_state_retriever(config: Config, retriever: Box<dyn StateRetriever>) -> Self {
        Self {
            config,
            resolver: Some(OutputTypeResolver::new(retriever)),
        }
    }

    /// Generate the metadata of the blueprint at `bp_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blueprint cannot be parsed or output types
    /// cannot be resolved.
    pub async fn generate(&self, bp_path: &Path, bp_root: &Path) -> Result<BlueprintMetadata> {
        self.generate_with_existing(bp_path, bp_root, None).await
    }

    /// Generate the metadata of the blueprint at `bp_path`, merged with a
    /// previously generated document.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`MetadataGenerator::generate`].
    pub async fn generate_with_existing(
        &self,
        bp_path: &Path,
        bp_root: &Path,
        existing: Option<&BlueprintMetadata>,
    ) -> Result<BlueprintMetadata> {
        tracing::info!(path = %bp_path.display(), root = %bp_root.display(), "Generating metadata");

        let parser = HclParser::new(&self.config);
        let files = parser.parse_directory(bp_path).await?.ensure_complete()?;

        let mut interfaces = extractor::interfaces_from_files(&files)?;
        let module_body: hcl::Body = files.into_iter().flat_map(|f| f.body.into_inner()).collect();
        let version = extractor::extract_version(&module_body).unwrap_or_default();
        let provider_versions = extractor::extract_provider_versions(&module_body);

        if let Some(resolver) = &self.resolver {
            resolver.resolve(bp_path, &mut interfaces.outputs).await?;
        }

        let module_name = extractor::module_name_from_path(bp_path, bp_root);
        let mut requirements = self.requirements(&parser, bp_root, &module_name).await?;
        requirements.provider_versions = provider_versions;

        let mut metadata = BlueprintMetadata::default();
        metadata.metadata.name = blueprint_name(bp_path).await;
        metadata.spec.interfaces = interfaces;
        metadata.spec.requirements = requirements;
        metadata.spec.info.version = version.module_version.unwrap_or_default();
        metadata.spec.info.actuation_tool.version = version.required_tf_version.unwrap_or_default();

        if let Some(existing) = existing {
            merger::merge_existing(&mut metadata, existing);
        }

        Ok(metadata)
    }

    /// Roles and services declared in the setup configuration.
    async fn requirements(
        &self,
        parser: &HclParser,
        bp_root: &Path,
        module_name: &str,
    ) -> Result<BlueprintRequirements> {
        let options = &self.config.requirements;
        let setup_dir = bp_root.join(&options.setup_path);

        if !setup_dir.is_dir() {
            tracing::info!(path = %setup_dir.display(), "No setup configuration, skipping roles and services");
            return Ok(BlueprintRequirements::default());
        }

        let setup = parser.parse_directory(&setup_dir).await?;
        if !setup.errors.is_empty() {
            tracing::warn!(
                path = %setup_dir.display(),
                errors = setup.errors.count(),
                "Some setup files failed to parse, requirements may be incomplete"
            );
        }
        let body = setup.merged_body();

        let roles_selection = selection(&body, module_name, &options.per_module_roles_local);
        let services_selection = selection(&body, module_name, &options.per_module_services_local);
        tracing::debug!(
            module = %module_name,
            roles = ?roles_selection,
            services = ?services_selection,
            "Selected requirement sources"
        );

        Ok(BlueprintRequirements {
            roles: extractor::extract_roles(&body, &roles_selection),
            services: extractor::extract_services(&body, &services_selection),
            provider_versions: Vec::new(),
        })
    }
}

/// Per-module lookup when the setup declares the local map, global otherwise.
fn selection<'a>(body: &hcl::Body, module_name: &'a str, local_map: &'a str) -> Selection<'a> {
    if body.local(local_map).is_some() {
        Selection::Module {
            name: module_name,
            local_map,
        }
    } else {
        Selection::Root
    }
}

/// The directory name of the blueprint.
async fn blueprint_name(bp_path: &Path) -> String {
    let resolved = tokio::fs::canonicalize(bp_path)
        .await
        .unwrap_or_else(|_| bp_path.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
