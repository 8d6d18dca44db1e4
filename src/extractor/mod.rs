//! Metadata extraction from parsed Terraform configuration.
//!
//! Each submodule walks `hcl::Body` trees produced by [`crate::parser`] and
//! turns one kind of declaration into metadata:
//!
//! 1. **Interfaces**: `variable` and `output` blocks.
//! 2. **Services**: API enablement declarations, or a submodule's entry in a
//!    per-module local map.
//! 3. **Roles**: IAM member resources at project, folder, organization and
//!    billing account level.
//! 4. **Versions**: `required_version`, the module version marker and
//!    `required_providers`.
//!
//! # Example
//!
//! ```rust
//! use bpmetadata::extractor::{extract_services, Selection};
//!
//! let body = hcl::parse(r#"
//! locals {
//!   per_module_services = {
//!     run = ["run.googleapis.com"]
//!   }
//! }
//! "#).unwrap();
//!
//! let services = extract_services(
//!     &body,
//!     &Selection::Module { name: "run", local_map: "per_module_services" },
//! );
//! assert_eq!(services, vec!["run.googleapis.com".to_string()]);
//! ```

mod interfaces;
mod locals;
mod roles;
mod services;
mod versions;

pub use interfaces::{
    extract_interfaces, interfaces_from_files, variable_orders, variable_orders_from_files,
};
pub use locals::LocalResolver;
pub use roles::{extract_roles, sort_roles};
pub use services::extract_services;
pub use versions::{extract_provider_versions, extract_version};

use crate::parser::{literal_strings, object_key_to_string, BodyExt};
use hcl::{Body, Expression};
use std::path::{Component, Path};

/// Module name used for the top-level blueprint.
pub const ROOT_MODULE_NAME: &str = "root";

/// Directory holding a blueprint's submodules.
pub const SUBMODULES_DIR: &str = "modules";

/// Which declarations requirements are read for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// The blueprint's global declarations.
    Root,
    /// One submodule's entry in a local map keyed by module name.
    Module {
        /// Submodule name, the key looked up in the map
        name: &'a str,
        /// Name of the local holding the map
        local_map: &'a str,
    },
}

/// Derive the module name of `bp_path` relative to the blueprint root.
///
/// `<root>/modules/<name>/...` yields `<name>`; anything else is `root`.
#[must_use]
pub fn module_name_from_path(bp_path: &Path, bp_root: &Path) -> String {
    let Ok(relative) = bp_path.strip_prefix(bp_root) else {
        return ROOT_MODULE_NAME.to_string();
    };

    let mut components = relative.components().filter_map(|c| match c {
        Component::Normal(part) => part.to_str(),
        _ => None,
    });

    match (components.next(), components.next()) {
        (Some(SUBMODULES_DIR), Some(name)) => name.to_string(),
        _ => ROOT_MODULE_NAME.to_string(),
    }
}

/// The literal list stored under `module` in the local map `local_map`.
///
/// Returns the strings as declared. A missing map or key yields an empty list.
#[must_use]
pub fn module_local_list(body: &Body, local_map: &str, module: &str) -> Vec<String> {
    let Some(Expression::Object(map)) = body.local(local_map) else {
        tracing::debug!(local = %local_map, "Per-module local map not found");
        return Vec::new();
    };

    map.iter()
        .find(|(key, _)| object_key_to_string(key) == module)
        .map(|(_, list)| literal_strings(list))
        .unwrap_or_default()
}
