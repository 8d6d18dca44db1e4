//! HCL file loader implementation.
//!
//! This module reads `.tf` files from a blueprint directory and parses them
//! with the `hcl-rs` crate.

use crate::config::Config;
use crate::error::{BpMetadataError, ErrorCollector, Result};
use crate::parser::{Parser, SKIP_FILES, TERRAFORM_EXTENSIONS};

use hcl::Body;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One parsed `.tf` file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Path of the file
    pub path: PathBuf,
    /// Parsed syntax tree
    pub body: Body,
}

/// All files of one blueprint directory.
#[derive(Debug, Default)]
pub struct ParsedModule {
    /// Files that parsed successfully, sorted by file name
    pub files: Vec<ParsedFile>,
    /// Parse failures that were tolerated
    pub errors: ErrorCollector,
}

impl ParsedModule {
    /// Fail if any file was skipped because it did not parse.
    ///
    /// # Errors
    ///
    /// Returns the tolerated parse error(s), if any.
    pub fn ensure_complete(self) -> Result<Vec<ParsedFile>> {
        self.errors.into_result()?;
        Ok(self.files)
    }

    /// All top-level structures of every file concatenated in file order.
    #[must_use]
    pub fn merged_body(&self) -> Body {
        self.files
            .iter()
            .flat_map(|file| file.body.clone().into_inner())
            .collect()
    }
}

/// HCL parser for Terraform files.
///
/// The parser walks a directory, reads `.tf` files, and turns each one into
/// a `hcl::Body`.
pub struct HclParser {
    /// Configuration for parsing behavior
    config: Config,
}

impl HclParser {
    /// Create a new HCL parser with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Parse all Terraform files in a directory.
    ///
    /// Files are visited in file-name order down to `scan.max_depth`.
    /// With `scan.continue_on_error`, files that fail to parse are recorded
    /// in [`ParsedModule::errors`] instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory doesn't exist or if a file fails to
    /// parse while `continue_on_error` is disabled.
    pub async fn parse_directory(&self, path: &Path) -> Result<ParsedModule> {
        if !path.is_dir() {
            return Err(crate::err!(DirectoryNotFound {
                path: path.to_path_buf(),
            }));
        }

        let mut result = ParsedModule::default();

        for entry in WalkDir::new(path)
            .max_depth(self.config.scan.max_depth)
            .sort_by_file_name()
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_skip(e.path()))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };

            let file_path = entry.path();
            if !entry.file_type().is_file() || !self.is_terraform_file(file_path) {
                continue;
            }

            tracing::debug!(file = %file_path.display(), "Parsing file");

            match self.parse_file(file_path).await {
                Ok(parsed) => result.files.push(parsed),
                Err(e) if self.config.scan.continue_on_error && e.is_recoverable() => {
                    tracing::warn!(
                        file = %file_path.display(),
                        "failed to parse file, continuing: {}",
                        e
                    );
                    result.errors.add(e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            path = %path.display(),
            files = result.files.len(),
            errors = result.errors.count(),
            "Parsing complete"
        );

        Ok(result)
    }

    /// Parse a single Terraform file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                crate::err!(FileNotFound {
                    path: path.to_path_buf(),
                })
            } else {
                BpMetadataError::io(path, e, file!(), line!())
            }
        })?;

        let body = self.parse_content(&content, path)?;
        Ok(ParsedFile {
            path: path.to_path_buf(),
            body,
        })
    }

    /// Check if a path should be skipped.
    fn should_skip(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if file_name.starts_with('.') {
            tracing::debug!(path = %path.display(), reason = "hidden file/directory", "Skipping path");
            return true;
        }

        if SKIP_FILES.iter().any(|s| file_name == *s) {
            tracing::debug!(path = %path.display(), reason = "known skip file", "Skipping path");
            return true;
        }

        if self.config.scan.exclude_patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(file_name))
                .unwrap_or(false)
        }) {
            tracing::debug!(path = %path.display(), reason = "matches exclude pattern", "Skipping path");
            return true;
        }

        false
    }

    /// Check if a file is a Terraform file.
    fn is_terraform_file(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        TERRAFORM_EXTENSIONS
            .iter()
            .any(|ext| path_str.ends_with(ext))
    }
}

impl Parser for HclParser {
    fn parse_content(&self, content: &str, file_path: &Path) -> Result<Body> {
        hcl::parse(content).map_err(|e| {
            crate::err!(HclParse {
                file: file_path.to_path_buf(),
                message: e.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BodyExt;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_parser() -> HclParser {
        HclParser::new(&Config::default())
    }

    fn strict_parser() -> HclParser {
        let mut config = Config::default();
        config.scan.continue_on_error = false;
        HclParser::new(&config)
    }

    #[test]
    fn test_parse_content() {
        let parser = create_test_parser();
        let body = parser
            .parse_content(
                r#"
variable "project_id" {
  description = "The project ID to host the cluster in"
}
"#,
                Path::new("variables.tf"),
            )
            .unwrap();

        assert_eq!(body.blocks_named("variable").count(), 1);
    }

    #[test]
    fn test_parse_invalid_hcl() {
        let parser = create_test_parser();
        let result = parser.parse_content("this is not valid { hcl", Path::new("bad.tf"));
        assert!(matches!(result, Err(BpMetadataError::HclParse { .. })));
    }

    #[test]
    fn test_is_terraform_file() {
        let parser = create_test_parser();

        assert!(parser.is_terraform_file(Path::new("main.tf")));
        assert!(parser.is_terraform_file(Path::new("variables.tf")));
        assert!(!parser.is_terraform_file(Path::new("metadata.yaml")));
        assert!(!parser.is_terraform_file(Path::new("terraform.tfstate")));
    }

    #[test]
    fn test_should_skip() {
        let parser = create_test_parser();

        assert!(parser.should_skip(Path::new(".terraform")));
        assert!(parser.should_skip(Path::new(".git")));
        assert!(parser.should_skip(Path::new("terraform.tfstate")));
        assert!(!parser.should_skip(Path::new("modules")));
        assert!(!parser.should_skip(Path::new("main.tf")));
    }

    #[test]
    fn test_should_skip_exclude_patterns() {
        let mut config = Config::default();
        config.scan.exclude_patterns = vec!["*_override.tf".to_string()];
        let parser = HclParser::new(&config);

        assert!(parser.should_skip(Path::new("main_override.tf")));
        assert!(!parser.should_skip(Path::new("main.tf")));
    }

    #[tokio::test]
    async fn test_parse_directory_sorted_and_top_level_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("variables.tf"), "variable \"b\" {}\n").unwrap();
        fs::write(dir.path().join("main.tf"), "variable \"a\" {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# readme\n").unwrap();
        fs::create_dir(dir.path().join("modules")).unwrap();
        fs::write(dir.path().join("modules/nested.tf"), "variable \"c\" {}\n").unwrap();

        let module = create_test_parser().parse_directory(dir.path()).await.unwrap();

        let names: Vec<_> = module
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["main.tf", "variables.tf"]);
    }

    #[tokio::test]
    async fn test_parse_directory_tolerates_bad_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.tf"), "variable \"a\" {}\n").unwrap();
        fs::write(dir.path().join("bad.tf"), "variable \"a\" {\n").unwrap();

        let module = create_test_parser().parse_directory(dir.path()).await.unwrap();
        assert_eq!(module.files.len(), 1);
        assert_eq!(module.errors.count(), 1);
        assert!(module.ensure_complete().is_err());
    }

    #[tokio::test]
    async fn test_parse_directory_strict_fails_fast() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.tf"), "variable \"a\" {\n").unwrap();

        let result = strict_parser().parse_directory(dir.path()).await;
        assert!(matches!(result, Err(BpMetadataError::HclParse { .. })));
    }

    #[tokio::test]
    async fn test_parse_missing_directory() {
        let result = create_test_parser()
            .parse_directory(Path::new("/definitely/not/here"))
            .await;
        assert!(matches!(result, Err(BpMetadataError::DirectoryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_merged_body_concatenates_in_file_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.tf"), "locals {\n  x = 1\n}\n").unwrap();
        fs::write(dir.path().join("b.tf"), "locals {\n  y = 2\n}\n").unwrap();

        let module = create_test_parser().parse_directory(dir.path()).await.unwrap();
        let body = module.merged_body();
        assert_eq!(body.blocks_named("locals").count(), 2);
        assert!(body.local("y").is_some());
    }
}
