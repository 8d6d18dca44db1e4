//! Output type resolution from Terraform state.
//!
//! Output blocks carry no type information, so types are read from state
//! after the blueprint has been applied. State is obtained through the
//! [`StateRetriever`] trait:
//!
//! - [`TerraformCli`] runs `terraform init` and `terraform show -json`
//! - [`StateFile`] reads a state document from disk

mod state;

pub use state::{infer_type, output_types_from_state};

use crate::config::StateOptions;
use crate::error::Result;
use crate::types::BlueprintOutput;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Source of Terraform state for a module directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateRetriever: Send + Sync {
    /// Return the raw state JSON for the module at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StateRetrieval` if the state cannot be obtained.
    async fn retrieve_state(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Retrieves state by running the Terraform binary in the module directory.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: String,
}

impl TerraformCli {
    /// Create a retriever invoking `options.terraform_binary`.
    #[must_use]
    pub fn new(options: &StateOptions) -> Self {
        Self {
            binary: options.terraform_binary.clone(),
        }
    }

    async fn run(&self, path: &Path, args: &[&str]) -> Result<Vec<u8>> {
        tracing::debug!(binary = %self.binary, ?args, path = %path.display(), "Running terraform");

        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .current_dir(path)
            .output()
            .await
            .map_err(|e| crate::err!(StateRetrieval {
                path: path.to_path_buf(),
                message: format!("failed to run {}: {e}", self.binary),
            }))?;

        if !output.status.success() {
            return Err(crate::err!(StateRetrieval {
                path: path.to_path_buf(),
                message: format!(
                    "{} {} failed: {}",
                    self.binary,
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl StateRetriever for TerraformCli {
    async fn retrieve_state(&self, path: &Path) -> Result<Vec<u8>> {
        self.run(path, &["init", "-input=false"]).await?;
        self.run(path, &["show", "-json"]).await
    }
}

/// Reads state from a fixed file, ignoring the module path.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create a retriever reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateRetriever for StateFile {
    async fn retrieve_state(&self, _path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            crate::err!(StateRetrieval {
                path: self.path.clone(),
                message: e.to_string(),
            })
        })
    }
}

/// Fills in missing output types from state.
pub struct OutputTypeResolver {
    retriever: Box<dyn StateRetriever>,
}

impl OutputTypeResolver {
    /// Create a resolver using the given state source.
    #[must_use]
    pub fn new(retriever: Box<dyn StateRetriever>) -> Self {
        Self { retriever }
    }

    /// Set `output_type` on every untyped output found in the state of `path`.
    ///
    /// Outputs that already have a type are left alone; state is not
    /// retrieved at all when every output is typed. Returns the number of
    /// outputs that received a type.
    ///
    /// # Errors
    ///
    /// Returns `StateRetrieval` or `StateParse` errors from the state source.
    pub async fn resolve(&self, path: &Path, outputs: &mut [BlueprintOutput]) -> Result<usize> {
        if outputs.iter().all(|output| output.output_type.is_some()) {
            return Ok(0);
        }

        let bytes = self.retriever.retrieve_state(path).await?;
        let types = output_types_from_state(path, &bytes)?;

        let mut resolved = 0;
        for output in outputs.iter_mut().filter(|o| o.output_type.is_none()) {
            if let Some(output_type) = types.get(&output.name) {
                output.output_type = Some(output_type.clone());
                resolved += 1;
            }
        }

        tracing::info!(path = %path.display(), resolved, "Resolved output types from state");
        Ok(resolved)
    }
}
