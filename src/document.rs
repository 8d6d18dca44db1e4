//! Loading and saving `BlueprintMetadata` documents.

use crate::error::{BpMetadataError, Result, ResultExt};
use crate::types::{BlueprintMetadata, DocumentFormat};

use std::path::Path;

/// The default metadata file name inside a blueprint directory.
pub const METADATA_FILE_NAME: &str = "metadata.yaml";

/// Guess a document's format from its file extension.
#[must_use]
pub fn format_for_path(path: &Path) -> DocumentFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
        _ => DocumentFormat::Yaml,
    }
}

/// Parse a document from text.
///
/// `path` is only used in error messages.
///
/// # Errors
///
/// Returns `MetadataParse` if the text is not a valid document.
pub fn parse_document(content: &str, format: DocumentFormat, path: &Path) -> Result<BlueprintMetadata> {
    let parsed = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|reason| {
        crate::err!(MetadataParse {
            path: path.to_path_buf(),
            message: reason,
        })
    })
}

/// Serialize a document.
///
/// # Errors
///
/// Returns `Internal` if serialization fails.
pub fn render_document(document: &BlueprintMetadata, format: DocumentFormat, pretty: bool) -> Result<String> {
    match format {
        DocumentFormat::Yaml => serde_yaml::to_string(document).map_err(|e| {
            BpMetadataError::internal(format!("YAML serialization error: {e}"), file!(), line!())
        }),
        DocumentFormat::Json if pretty => Ok(serde_json::to_string_pretty(document)? + "\n"),
        DocumentFormat::Json => Ok(serde_json::to_string(document)?),
    }
}

/// Read a document from disk, choosing the format by extension.
///
/// # Errors
///
/// Returns `FileNotFound`, `Io` or `MetadataParse` errors.
pub async fn read_document(path: &Path) -> Result<BlueprintMetadata> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            crate::err!(FileNotFound {
                path: path.to_path_buf(),
            })
        } else {
            BpMetadataError::io(path, e, file!(), line!())
        }
    })?;

    tracing::debug!(path = %path.display(), "Loaded metadata document");
    parse_document(&content, format_for_path(path), path)
}

/// Write a document to disk.
///
/// # Errors
///
/// Returns `Io` errors, or `Internal` if serialization fails.
pub async fn write_document(
    path: &Path,
    document: &BlueprintMetadata,
    format: DocumentFormat,
    pretty: bool,
) -> Result<()> {
    let content = render_document(document, format, pretty)?;
    tokio::fs::write(path, content).await.with_path(path)?;

    tracing::info!(path = %path.display(), "Wrote metadata document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlueprintOutput, BlueprintRoles, BlueprintVariable, RoleLevel};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    const EXISTING: &str = r#"
apiVersion: blueprints.cloud.google.com/v1alpha1
kind: BlueprintMetadata
metadata:
  name: terraform-google-example
spec:
  info:
    title: Example
    version: 1.2.3
    actuationTool:
      flavor: Terraform
      version: ">= 1.3"
  interfaces:
    variables:
      - name: project_id
        description: The project ID
        varType: string
        required: true
        connections:
          - source:
              source: github.com/org/project
              version: ">= 1.0.0"
            spec:
              outputExpr: project_id
    outputs:
      - name: endpoint
        type:
          - object
          - host: string
            port: number
  requirements:
    roles:
      - level: Project
        roles:
          - roles/owner
    services:
      - iam.googleapis.com
"#;

    #[test]
    fn test_parse_existing_yaml() {
        let doc = parse_document(EXISTING, DocumentFormat::Yaml, Path::new("metadata.yaml")).unwrap();

        assert_eq!(doc.metadata.name, "terraform-google-example");
        assert_eq!(doc.spec.info.version, "1.2.3");
        assert_eq!(doc.spec.info.actuation_tool.version, ">= 1.3");

        let project_id = doc.spec.interfaces.variable("project_id").unwrap();
        assert_eq!(project_id.var_type, "string");
        assert_eq!(project_id.connections[0].spec.output_expr, "project_id");

        assert_eq!(
            doc.spec.interfaces.output("endpoint").unwrap().output_type,
            Some(json!(["object", {"host": "string", "port": "number"}]))
        );
        assert_eq!(doc.spec.requirements.roles[0].level, RoleLevel::Project);
    }

    #[test]
    fn test_invalid_document() {
        let result = parse_document("spec: [", DocumentFormat::Yaml, Path::new("bad.yaml"));
        assert!(matches!(result, Err(BpMetadataError::MetadataParse { .. })));

        let result = parse_document("{", DocumentFormat::Json, Path::new("bad.json"));
        assert!(matches!(result, Err(BpMetadataError::MetadataParse { .. })));
    }

    #[test]
    fn test_yaml_uses_camel_case_keys() {
        let mut doc = BlueprintMetadata::default();
        doc.spec.interfaces.variables.push(BlueprintVariable {
            name: "zone".to_string(),
            var_type: "string".to_string(),
            default_value: Some(json!("us-central1-a")),
            ..Default::default()
        });

        let yaml = render_document(&doc, DocumentFormat::Yaml, true).unwrap();
        assert!(yaml.contains("apiVersion: blueprints.cloud.google.com/v1alpha1"));
        assert!(yaml.contains("varType: string"));
        assert!(yaml.contains("defaultValue: us-central1-a"));
        assert!(yaml.contains("actuationTool:"));
    }

    #[tokio::test]
    async fn test_write_then_read_preserves_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut doc = BlueprintMetadata::default();
        doc.metadata.name = "example".to_string();
        doc.spec.interfaces.outputs.push(BlueprintOutput {
            name: "names".to_string(),
            output_type: Some(json!(["list", "string"])),
            ..Default::default()
        });
        doc.spec.requirements.roles.push(BlueprintRoles {
            level: RoleLevel::Folder,
            roles: vec!["roles/resourcemanager.folderViewer".to_string()],
        });

        for (file, format) in [("metadata.yaml", DocumentFormat::Yaml), ("metadata.json", DocumentFormat::Json)] {
            let path = dir.path().join(file);
            write_document(&path, &doc, format, true).await.unwrap();
            assert_eq!(read_document(&path).await.unwrap(), doc);
        }
    }

    #[tokio::test]
    async fn test_read_missing_document() {
        let result = read_document(&PathBuf::from("/definitely/not/metadata.yaml")).await;
        assert!(matches!(result, Err(BpMetadataError::FileNotFound { .. })));
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(format_for_path(Path::new("metadata.json")), DocumentFormat::Json);
        assert_eq!(format_for_path(Path::new("metadata.yaml")), DocumentFormat::Yaml);
        assert_eq!(format_for_path(Path::new("metadata")), DocumentFormat::Yaml);
    }
}
