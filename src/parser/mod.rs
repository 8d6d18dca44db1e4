//! HCL parsing module for Terraform blueprints.
//!
//! This module loads `.tf` files into `hcl::Body` trees and exposes typed
//! accessors over them. Extraction of metadata from the trees lives in
//! [`crate::extractor`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bpmetadata::parser::HclParser;
//! use bpmetadata::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let parser = HclParser::new(&config);
//!
//!     let module = parser.parse_directory("./terraform".as_ref()).await?;
//!     println!("Parsed {} files", module.files.len());
//!     Ok(())
//! }
//! ```

mod attributes;
mod loader;

pub use attributes::{
    expression_to_value, literal_string, literal_strings, object_key_to_string, render_expression,
    BodyExt,
};
pub use loader::{HclParser, ParsedFile, ParsedModule};

/// File extensions to parse.
pub const TERRAFORM_EXTENSIONS: &[&str] = &[".tf"];

/// Files and directories to skip during scanning.
pub const SKIP_FILES: &[&str] = &[".terraform", ".terragrunt-cache", "terraform.tfstate"];

/// Trait for parsing HCL content.
///
/// This trait allows for different parsing implementations
/// (e.g., for testing with mock parsers).
pub trait Parser: Send + Sync {
    /// Parse a single file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the HCL content is invalid.
    fn parse_content(&self, content: &str, file_path: &std::path::Path) -> crate::Result<::hcl::Body>;
}
