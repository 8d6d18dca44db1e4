//! Variable and output extraction.

use crate::config::Config;
use crate::error::Result;
use crate::parser::{expression_to_value, literal_string, render_expression, BodyExt, HclParser, ParsedFile};
use crate::types::{BlueprintInterface, BlueprintOutput, BlueprintVariable};

use hcl::{Block, Expression};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Extract the variables and outputs of the blueprint in `dir`.
///
/// Every `.tf` file must parse; tolerated parse failures are returned as errors.
///
/// # Errors
///
/// Returns `HclParse` for syntax errors and `Validation` for unnamed or
/// duplicate `variable`/`output` blocks.
pub async fn extract_interfaces(dir: &Path, config: &Config) -> Result<BlueprintInterface> {
    let files = HclParser::new(config).parse_directory(dir).await?.ensure_complete()?;
    interfaces_from_files(&files)
}

/// Map each variable name in `dir` to its declaration index.
///
/// # Errors
///
/// Same failure modes as [`extract_interfaces`].
pub async fn variable_orders(dir: &Path, config: &Config) -> Result<HashMap<String, usize>> {
    let files = HclParser::new(config).parse_directory(dir).await?.ensure_complete()?;
    variable_orders_from_files(&files)
}

/// Extract variables and outputs from already parsed files.
///
/// # Errors
///
/// Returns `Validation` for unnamed or duplicate blocks.
pub fn interfaces_from_files(files: &[ParsedFile]) -> Result<BlueprintInterface> {
    let mut interface = BlueprintInterface::default();
    let mut seen_variables = HashSet::new();
    let mut seen_outputs = HashSet::new();

    for file in files {
        for block in file.body.blocks_named("variable") {
            let name = block_name(block, &file.path)?;
            if !seen_variables.insert(name.clone()) {
                return Err(duplicate(block, &name, &file.path));
            }
            interface.variables.push(variable_from_block(name, block));
        }

        for block in file.body.blocks_named("output") {
            let name = block_name(block, &file.path)?;
            if !seen_outputs.insert(name.clone()) {
                return Err(duplicate(block, &name, &file.path));
            }
            interface.outputs.push(BlueprintOutput {
                name,
                description: block.body.string_attribute("description").unwrap_or_default(),
                ..Default::default()
            });
        }
    }

    let orders = variable_orders_from_files(files)?;
    for variable in &mut interface.variables {
        variable.order = orders.get(&variable.name).copied();
    }

    tracing::debug!(
        variables = interface.variables.len(),
        outputs = interface.outputs.len(),
        "Extracted interfaces"
    );

    Ok(interface)
}

/// Map each variable name to its declaration index across `files`.
///
/// # Errors
///
/// Returns `Validation` for unnamed or duplicate variable blocks.
pub fn variable_orders_from_files(files: &[ParsedFile]) -> Result<HashMap<String, usize>> {
    let mut orders = HashMap::new();

    for file in files {
        for block in file.body.blocks_named("variable") {
            let name = block_name(block, &file.path)?;
            if orders.contains_key(&name) {
                return Err(duplicate(block, &name, &file.path));
            }
            let index = orders.len();
            orders.insert(name, index);
        }
    }

    Ok(orders)
}

fn variable_from_block(name: String, block: &Block) -> BlueprintVariable {
    let default = block.body.attribute_expr("default");

    BlueprintVariable {
        name,
        description: block.body.string_attribute("description").unwrap_or_default(),
        var_type: block.body.attribute_expr("type").map(type_text).unwrap_or_default(),
        required: default.is_none(),
        default_value: default.map(expression_to_value).filter(|value| !value.is_null()),
        order: None,
        connections: Vec::new(),
    }
}

/// Type constraints are kept as written, e.g. `string` or `list(string)`.
fn type_text(expr: &Expression) -> String {
    literal_string(expr).unwrap_or_else(|| render_expression(expr))
}

fn block_name(block: &Block, file: &Path) -> Result<String> {
    match block.labels.first().map(|label| label.as_str()) {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        Some(_) => Err(crate::err!(Validation {
            file: file.to_path_buf(),
            message: format!("{} block has an empty name", block.identifier.as_str()),
        })),
        None => Err(crate::err!(Validation {
            file: file.to_path_buf(),
            message: format!("{} block has no name", block.identifier.as_str()),
        })),
    }
}

fn duplicate(block: &Block, name: &str, file: &Path) -> crate::error::BpMetadataError {
    crate::err!(Validation {
        file: file.to_path_buf(),
        message: format!("duplicate {} \"{name}\"", block.identifier.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BpMetadataError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    fn parsed(name: &str, content: &str) -> ParsedFile {
        ParsedFile {
            path: PathBuf::from(name),
            body: hcl::parse(content).unwrap(),
        }
    }

    #[test]
    fn test_variables_and_outputs() {
        let files = vec![
            parsed(
                "outputs.tf",
                r#"
output "cluster_id" {
  description = "Cluster ID"
  value       = "id"
}
"#,
            ),
            parsed(
                "variables.tf",
                r#"
variable "project_id" {
  description = "The project ID to host the cluster in"
}

variable "description" {
  description = "The description of the cluster"
  type        = string
  default     = "some description"
}

variable "regional" {
  description = "Whether is a regional cluster"
  type        = bool
  default     = true
}

variable "labels" {
  type    = map(string)
  default = {}
}
"#,
            ),
        ];

        let interface = interfaces_from_files(&files).unwrap();

        assert_eq!(interface.outputs.len(), 1);
        assert_eq!(interface.outputs[0].name, "cluster_id");
        assert_eq!(interface.outputs[0].description, "Cluster ID");
        assert_eq!(interface.outputs[0].output_type, None);

        let names: Vec<_> = interface.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["project_id", "description", "regional", "labels"]);

        let project_id = interface.variable("project_id").unwrap();
        assert!(project_id.required);
        assert_eq!(project_id.default_value, None);
        assert_eq!(project_id.var_type, "");

        let description = interface.variable("description").unwrap();
        assert!(!description.required);
        assert_eq!(description.var_type, "string");
        assert_eq!(description.default_value, Some(json!("some description")));

        let regional = interface.variable("regional").unwrap();
        assert_eq!(regional.var_type, "bool");
        assert_eq!(regional.default_value, Some(json!(true)));

        let labels = interface.variable("labels").unwrap();
        assert_eq!(labels.var_type, "map(string)");
        assert_eq!(labels.default_value, Some(json!({})));
    }

    #[test]
    fn test_null_default_is_optional_without_value() {
        let files = vec![parsed(
            "variables.tf",
            "variable \"network\" {\n  type    = string\n  default = null\n}\n",
        )];
        let interface = interfaces_from_files(&files).unwrap();
        let network = interface.variable("network").unwrap();
        assert!(!network.required);
        assert_eq!(network.default_value, None);
    }

    #[test]
    fn test_variable_orders_span_files() {
        let files = vec![
            parsed("a.tf", "variable \"zone\" {}\nvariable \"region\" {}\n"),
            parsed("b.tf", "variable \"project_id\" {}\n"),
        ];
        let orders = variable_orders_from_files(&files).unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders["zone"], 0);
        assert_eq!(orders["region"], 1);
        assert_eq!(orders["project_id"], 2);
    }

    #[test]
    fn test_empty_label_is_rejected() {
        let files = vec![parsed("variables.tf", "variable \"\" {\n  type = string\n}\n")];
        assert!(matches!(
            interfaces_from_files(&files),
            Err(BpMetadataError::Validation { .. })
        ));
        assert!(matches!(
            variable_orders_from_files(&files),
            Err(BpMetadataError::Validation { .. })
        ));
    }

    #[test]
    fn test_missing_label_is_rejected() {
        let files = vec![parsed("outputs.tf", "output {\n  value = 1\n}\n")];
        assert!(matches!(
            interfaces_from_files(&files),
            Err(BpMetadataError::Validation { .. })
        ));
    }

    #[test]
    fn test_duplicate_variable_is_rejected() {
        let files = vec![
            parsed("a.tf", "variable \"zone\" {}\n"),
            parsed("b.tf", "variable \"zone\" {}\n"),
        ];
        assert!(matches!(
            interfaces_from_files(&files),
            Err(BpMetadataError::Validation { .. })
        ));
        assert!(matches!(
            variable_orders_from_files(&files),
            Err(BpMetadataError::Validation { .. })
        ));
    }

    #[test]
    fn test_variables_carry_declaration_order() {
        let files = vec![
            parsed("a.tf", "variable \"zone\" {}\noutput \"id\" {\n  value = 1\n}\nvariable \"region\" {}\n"),
            parsed("b.tf", "variable \"project_id\" {}\n"),
        ];
        let interface = interfaces_from_files(&files).unwrap();
        let orders: Vec<_> = interface.variables.iter().map(|v| (v.name.as_str(), v.order)).collect();
        assert_eq!(
            orders,
            vec![("zone", Some(0)), ("region", Some(1)), ("project_id", Some(2))]
        );
    }

    #[tokio::test]
    async fn test_extract_interfaces_fails_on_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.tf"), "variable \"a\" {\n").unwrap();

        let result = extract_interfaces(dir.path(), &Config::default()).await;
        assert!(matches!(result, Err(BpMetadataError::HclParse { .. })));
    }
}
