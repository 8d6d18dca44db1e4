//! Error types for bpmetadata.
//!
//! This module defines the error hierarchy using `thiserror`. Every variant
//! records the source location it was raised from, which keeps reports
//! actionable when a blueprint fails to extract.
//!
//! # Error Categories
//!
//! - **Parse errors**: HCL syntax failures, malformed metadata documents
//! - **Validation errors**: well-formed HCL that is semantically incomplete
//! - **State errors**: the external state step failed or returned garbage
//! - **IO errors**: file system operations
//! - **Config errors**: invalid configuration files
//!
//! # Example
//!
//! ```rust
//! use bpmetadata::error::{BpMetadataError, Result};
//!
//! fn read_module(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .map_err(|e| BpMetadataError::io(path, e, file!(), line!()))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Usage:
/// ```ignore
/// return Err(err!(Validation { file: path.into(), message: "missing name".into() }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident: $value:expr),* $(,)? }) => {
        $crate::error::BpMetadataError::$variant {
            $($field: $value,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for bpmetadata operations.
pub type Result<T> = std::result::Result<T, BpMetadataError>;

/// The main error type for bpmetadata.
#[derive(Error, Debug)]
pub enum BpMetadataError {
    // =========================================================================
    // I/O and File System Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// File not found.
    #[error("File not found: {path} ({src_path}:{src_line})")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Directory not found.
    #[error("Directory not found: {path} ({src_path}:{src_line})")]
    DirectoryNotFound {
        /// The missing directory path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Parsing and Validation Errors
    // =========================================================================
    /// HCL parsing error.
    #[error("Failed to parse HCL in '{file}' \n\t({src_path}:{src_line}): {message}")]
    HclParse {
        /// The file being parsed
        file: PathBuf,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Well-formed HCL that is missing something extraction requires.
    #[error("Invalid block in '{file}' ({src_path}:{src_line}): {message}")]
    Validation {
        /// The file holding the offending block
        file: PathBuf,
        /// Description of what is missing
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A metadata document could not be read back.
    #[error("Failed to parse metadata document '{path}' ({src_path}:{src_line}): {message}")]
    MetadataParse {
        /// The document path (empty for in-memory documents)
        path: PathBuf,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // State Errors
    // =========================================================================
    /// The state retrieval step failed.
    #[error("Failed to retrieve state for '{path}' ({src_path}:{src_line}): {message}")]
    StateRetrieval {
        /// The module path state was requested for
        path: PathBuf,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// The retrieved bytes are not a valid Terraform state.
    #[error("Invalid state for '{path}' ({src_path}:{src_line}): {message}")]
    StateParse {
        /// The module path state was requested for
        path: PathBuf,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Version and Constraint Errors
    // =========================================================================
    /// Version parsing error.
    #[error("Failed to parse version '{version}' ({src_path}:{src_line}): {source}")]
    VersionParse {
        /// The version string that failed to parse
        version: String,
        /// The underlying semver error
        #[source]
        source: semver::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid constraint syntax.
    #[error("Invalid version constraint '{constraint}' ({src_path}:{src_line}): {message}")]
    ConstraintParse {
        /// The constraint string that failed to parse
        constraint: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}' ({src_path}:{src_line}): {message}")]
    ConfigValue {
        /// The configuration key
        key: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Internal error (should not happen in normal operation).
    #[error("Internal error ({src_path}:{src_line}): {message}")]
    Internal {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Multiple errors occurred.
    #[error("Multiple errors occurred ({count} total)")]
    Multiple {
        /// Number of errors
        count: usize,
        /// The individual errors
        errors: Vec<BpMetadataError>,
    },
}

impl BpMetadataError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::Io { path: path.into(), source, src_path, src_line }
    }

    /// Creates a `ConfigParse` error.
    #[must_use]
    pub fn config_parse(message: String, source: Option<Box<dyn std::error::Error + Send + Sync>>, src_path: &'static str, src_line: u32) -> Self {
        Self::ConfigParse { message, source, src_path, src_line }
    }

    /// Creates an `Internal` error.
    #[must_use]
    pub fn internal(message: String, src_path: &'static str, src_line: u32) -> Self {
        Self::Internal { message, src_path, src_line }
    }

    /// Determines if the error may be skipped when parsing a batch of files.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::HclParse { .. }
                | Self::Validation { .. }
                | Self::VersionParse { .. }
                | Self::ConstraintParse { .. }
        )
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => 13,
            Self::FileNotFound { .. } => 14,
            Self::DirectoryNotFound { .. } => 15,
            Self::HclParse { .. } => 16,
            Self::Validation { .. } => 17,
            Self::ConfigParse { .. } => 18,
            Self::ConfigValue { .. } => 19,
            Self::StateRetrieval { .. } | Self::StateParse { .. } => 20,
            Self::Multiple { .. } => 21,
            Self::MetadataParse { .. } => 22,
            _ => 1,
        }
    }

    /// Consolidates multiple errors into a single `BpMetadataError::Multiple` if there's more than one.
    /// Otherwise, returns the single error or `Ok(())` if no errors.
    ///
    /// # Errors
    ///
    /// Returns the collected error(s) when `errors` is not empty.
    pub fn collect(mut errors: Vec<Self>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(Self::Multiple { count, errors }),
        }
    }
}

/// Extension trait for `Result` to add context to errors.
pub trait ResultExt<T, E> {
    /// Adds a file path context to an I/O error.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error when `self` is an error.
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| BpMetadataError::Io {
            path: path.into(),
            source: e
                .into()
                .downcast::<std::io::Error>()
                .map_or_else(std::io::Error::other, |io| *io),
            src_path: file!(),
            src_line: line!(),
        })
    }
}

impl From<std::io::Error> for BpMetadataError {
    fn from(source: std::io::Error) -> Self {
        // Prefer BpMetadataError::io(path, ...) wherever the path is known
        Self::Io {
            path: PathBuf::new(),
            source,
            src_path: file!(),
            src_line: line!(),
        }
    }
}

impl From<serde_json::Error> for BpMetadataError {
    fn from(source: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization/deserialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}

/// A utility for collecting multiple errors during parsing or processing.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<BpMetadataError>,
}

impl ErrorCollector {
    /// Create a new error collector.
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn add(&mut self, error: BpMetadataError) {
        self.errors.push(error);
    }

    /// Get the number of collected errors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.errors.len()
    }

    /// Check if there are any errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert to a Result, returning Multiple error if there are any errors.
    ///
    /// # Errors
    ///
    /// Returns the collected error(s) if any were added.
    pub fn into_result(self) -> Result<()> {
        BpMetadataError::collect(self.errors)
    }
}
