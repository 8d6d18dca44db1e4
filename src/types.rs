//! Core data types used throughout bpmetadata.
//!
//! This module defines the fundamental data structures for representing:
//! - Blueprint interfaces (variables and outputs) and their connections
//! - Requirements (IAM roles, services, provider versions)
//! - Version information and Terraform version constraints
//! - The persisted `BlueprintMetadata` document

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API version written into generated metadata documents.
pub const METADATA_API_VERSION: &str = "blueprints.cloud.google.com/v1alpha1";

/// Kind written into generated metadata documents.
pub const METADATA_KIND: &str = "BlueprintMetadata";

/// An input variable declared by a blueprint.
///
/// # Example HCL
///
/// ```hcl
/// variable "regional" {
///   description = "Whether is a regional cluster"
///   type        = bool
///   default     = true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintVariable {
    /// The variable name (block label)
    pub name: String,

    /// The `description` attribute, empty when absent
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// The declared type rendered back to HCL, empty when undeclared
    #[serde(skip_serializing_if = "String::is_empty")]
    pub var_type: String,

    /// The default value, absent when no default is declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// True iff the variable declares no default
    pub required: bool,

    /// 0-based declaration index across the module's files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,

    /// Human-curated connections to other blueprints' outputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<BlueprintConnection>,
}

/// An output declared by a blueprint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintOutput {
    /// The output name (block label)
    pub name: String,

    /// The `description` attribute, empty when absent
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// The resolved value type.
    ///
    /// Either a primitive type name (`"string"`), or a list such as
    /// `["list", "string"]` or `["object", {"host": "string"}]`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub output_type: Option<Value>,

    /// Human-curated connections to other blueprints
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<BlueprintConnection>,
}

/// A human-curated cross-blueprint reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintConnection {
    /// The blueprint this connection points at
    pub source: ConnectionSource,

    /// How the remote value flows into this element
    pub spec: ConnectionSpec,
}

/// Identifies the remote blueprint of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSource {
    /// Source address of the remote blueprint
    pub source: String,

    /// Version constraint of the remote blueprint
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Describes which remote output feeds the element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSpec {
    /// Output expression on the remote blueprint
    pub output_expr: String,

    /// Optional path inside this element's value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
}

/// A blueprint's interface: its variables and outputs in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintInterface {
    /// Input variables
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<BlueprintVariable>,

    /// Outputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<BlueprintOutput>,
}

impl BlueprintInterface {
    /// Look up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&BlueprintVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Look up an output by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&BlueprintOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// The privilege level an IAM role is granted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleLevel {
    /// Project-level grant
    Project,
    /// Folder-level grant
    Folder,
    /// Organization-level grant
    Organization,
    /// Billing account grant
    BillingAccount,
}

impl RoleLevel {
    /// All levels, in the order resources are scanned.
    pub const ALL: [Self; 4] = [
        Self::Project,
        Self::Folder,
        Self::Organization,
        Self::BillingAccount,
    ];

    /// The IAM member resource type granting roles at this level.
    #[must_use]
    pub const fn resource_type(self) -> &'static str {
        match self {
            Self::Project => "google_project_iam_member",
            Self::Folder => "google_folder_iam_member",
            Self::Organization => "google_organization_iam_member",
            Self::BillingAccount => "google_billing_account_iam_member",
        }
    }

    /// Find the level whose member resource type is `resource_type`.
    #[must_use]
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.resource_type() == resource_type)
    }

    /// The level name as written in metadata documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Folder => "Folder",
            Self::Organization => "Organization",
            Self::BillingAccount => "BillingAccount",
        }
    }
}

impl std::fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles required at one privilege level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintRoles {
    /// The level the roles are granted at
    pub level: RoleLevel,

    /// Role identifiers, e.g. `roles/storage.admin`
    pub roles: Vec<String>,
}

/// A provider requirement from `required_providers`.
///
/// # Example HCL
///
/// ```hcl
/// terraform {
///   required_providers {
///     google = {
///       source  = "hashicorp/google"
///       version = ">= 4.4.0, < 7"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersion {
    /// Provider source (e.g., "hashicorp/google")
    pub source: String,

    /// Version constraint as written
    pub version: String,
}

/// Version information of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlueprintVersion {
    /// The `required_version` constraint on Terraform itself
    pub required_tf_version: Option<String>,

    /// The blueprint's own semantic version
    pub module_version: Option<String>,
}

/// Requirements a blueprint places on the environment it is deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintRequirements {
    /// IAM roles per level
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<BlueprintRoles>,

    /// Service APIs that must be enabled
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,

    /// Providers and their version constraints
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provider_versions: Vec<ProviderVersion>,
}

/// The tool a blueprint is actuated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintActuationTool {
    /// Tool flavor, always `Terraform` for generated metadata
    pub flavor: String,

    /// Version constraint on the tool
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Default for BlueprintActuationTool {
    fn default() -> Self {
        Self {
            flavor: "Terraform".to_string(),
            version: String::new(),
        }
    }
}

/// General information about a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintInfo {
    /// Human-readable title
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Where the blueprint source lives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<BlueprintRepoDetail>,

    /// The blueprint's semantic version
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Actuation tool requirements
    pub actuation_tool: BlueprintActuationTool,
}

/// Repository details of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintRepoDetail {
    /// Repository URL
    pub repo: String,

    /// Type of repository, e.g. `git`
    pub source_type: String,

    /// Directory of the blueprint inside the repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Document metadata (`metadata:` section).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceMeta {
    /// Document name
    pub name: String,

    /// Free-form labels
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub labels: std::collections::BTreeMap<String, String>,
}

/// The `spec:` section of a metadata document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintMetadataSpec {
    /// General information
    pub info: BlueprintInfo,

    /// Variables and outputs
    pub interfaces: BlueprintInterface,

    /// Roles, services and provider versions
    pub requirements: BlueprintRequirements,
}

/// A complete blueprint metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlueprintMetadata {
    /// Document API version
    pub api_version: String,

    /// Document kind
    pub kind: String,

    /// Document metadata
    pub metadata: ResourceMeta,

    /// Document body
    pub spec: BlueprintMetadataSpec,
}

impl Default for BlueprintMetadata {
    fn default() -> Self {
        Self {
            api_version: METADATA_API_VERSION.to_string(),
            kind: METADATA_KIND.to_string(),
            metadata: ResourceMeta::default(),
            spec: BlueprintMetadataSpec::default(),
        }
    }
}

/// Output format for metadata documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// YAML format
    #[default]
    Yaml,
    /// JSON format
    Json,
}

/// A parsed Terraform version constraint such as `>= 1.3, < 2`.
///
/// Only the syntax is checked; the constraint is never evaluated against a
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// The raw constraint string as written in HCL
    pub raw: String,

    /// Comma-separated clauses, all of which must hold
    pub clauses: Vec<ConstraintClause>,
}

/// One `<operator> <version>` clause of a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintClause {
    /// The comparison, `=` when none is written
    pub operator: ConstraintOperator,
    /// The version, padded to three components
    pub version: semver::Version,
}

/// Comparison operators accepted in Terraform constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOperator {
    /// `=` or no operator
    Exact,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `~>`, allowing only the rightmost version component to increase
    Pessimistic,
}

impl ConstraintOperator {
    /// Two-character operators come before their one-character prefixes.
    const PREFIXES: [(&'static str, Self); 7] = [
        ("~>", Self::Pessimistic),
        ("!=", Self::NotEqual),
        (">=", Self::GreaterThanOrEqual),
        ("<=", Self::LessThanOrEqual),
        (">", Self::GreaterThan),
        ("<", Self::LessThan),
        ("=", Self::Exact),
    ];

    /// Split a clause into its operator and the remaining version text.
    /// A bare version means `=`.
    fn split(clause: &str) -> (Self, &str) {
        Self::PREFIXES
            .iter()
            .find_map(|(prefix, operator)| clause.strip_prefix(prefix).map(|rest| (*operator, rest.trim())))
            .unwrap_or((Self::Exact, clause))
    }
}

impl Constraint {
    /// Parse a constraint string into a `Constraint`.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintParse` for an empty constraint and `VersionParse`
    /// for a clause whose version is not a (possibly partial) semver.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let clauses = s
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| {
                let (operator, version) = ConstraintOperator::split(clause);
                Ok(ConstraintClause {
                    operator,
                    version: parse_version(version)?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        if clauses.is_empty() {
            return Err(crate::err!(ConstraintParse {
                constraint: s.to_string(),
                message: "constraint is empty".to_string(),
            }));
        }

        Ok(Self {
            raw: s.to_string(),
            clauses,
        })
    }
}

/// Parse a version string, padding partial versions like `1.0`.
fn parse_version(s: &str) -> crate::Result<semver::Version> {
    let trimmed = s.strip_prefix('v').unwrap_or(s);
    let normalized = match trimmed.matches('.').count() {
        0 => format!("{trimmed}.0.0"),
        1 => format!("{trimmed}.0"),
        _ => trimmed.to_string(),
    };

    semver::Version::parse(&normalized).map_err(|e| crate::err!(VersionParse {
        version: s.to_string(),
        source: e,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_parse_clauses() {
        let constraint = Constraint::parse(">= 0.13.0, < 2").unwrap();
        assert_eq!(
            constraint.clauses,
            vec![
                ConstraintClause {
                    operator: ConstraintOperator::GreaterThanOrEqual,
                    version: semver::Version::new(0, 13, 0),
                },
                ConstraintClause {
                    operator: ConstraintOperator::LessThan,
                    version: semver::Version::new(2, 0, 0),
                },
            ]
        );
    }

    #[test]
    fn test_constraint_operators() {
        let operator = |raw: &str| Constraint::parse(raw).unwrap().clauses[0].operator;
        assert_eq!(operator("~> 1.3"), ConstraintOperator::Pessimistic);
        assert_eq!(operator("!= 1.0.0"), ConstraintOperator::NotEqual);
        assert_eq!(operator("<= 1.0"), ConstraintOperator::LessThanOrEqual);
        assert_eq!(operator("> 1"), ConstraintOperator::GreaterThan);
        assert_eq!(operator("= 1.2.3"), ConstraintOperator::Exact);
        assert_eq!(operator("1.2.3"), ConstraintOperator::Exact);
    }

    #[test]
    fn test_constraint_rejects_garbage() {
        assert!(Constraint::parse("not a version").is_err());
        assert!(Constraint::parse("").is_err());
        assert!(Constraint::parse(">= 0.13.x").is_err());
    }

    #[test]
    fn test_role_level_resource_types() {
        for level in RoleLevel::ALL {
            assert_eq!(RoleLevel::from_resource_type(level.resource_type()), Some(level));
        }
        assert_eq!(RoleLevel::from_resource_type("google_project_iam_binding"), None);
    }

    #[test]
    fn test_variable_yaml_field_names() {
        let variable = BlueprintVariable {
            name: "description".to_string(),
            description: "The description of the cluster".to_string(),
            var_type: "string".to_string(),
            default_value: Some(Value::String("some description".to_string())),
            required: false,
            order: Some(1),
            connections: Vec::new(),
        };

        let yaml = serde_yaml::to_string(&variable).unwrap();
        assert!(yaml.contains("varType: string"));
        assert!(yaml.contains("defaultValue: some description"));
        assert!(yaml.contains("order: 1"));
        assert!(!yaml.contains("connections"));
    }

    #[test]
    fn test_output_type_field_name() {
        let output = BlueprintOutput {
            name: "cluster_id".to_string(),
            output_type: Some(Value::String("string".to_string())),
            ..BlueprintOutput::default()
        };

        let yaml = serde_yaml::to_string(&output).unwrap();
        assert!(yaml.contains("type: string"));
    }
}
