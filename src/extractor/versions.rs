//! Terraform, module and provider version requirements.

use crate::parser::{literal_string, object_key_to_string, BodyExt};
use crate::types::{BlueprintVersion, Constraint, ProviderVersion};

use hcl::{Body, Expression};
use regex::Regex;
use std::sync::LazyLock;

/// Providers whose `provider_meta` carries the module version marker.
pub const MODULE_VERSION_PROVIDERS: &[&str] = &["google", "google-beta"];

/// Trailing `/v<version>` of a `module_name` attribute.
static MODULE_VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/v([^/\s]+)$").expect("Invalid regex"));

/// Extract Terraform's `required_version` and the blueprint's own version.
///
/// The module version comes from
///
/// ```hcl
/// terraform {
///   provider_meta "google" {
///     module_name = "blueprints/terraform/terraform-google-kubernetes-engine/v23.1.0"
///   }
/// }
/// ```
///
/// Malformed values are logged and treated as absent. Returns `None` when
/// neither value is present.
#[must_use]
pub fn extract_version(body: &Body) -> Option<BlueprintVersion> {
    let required_tf_version = body
        .blocks_named("terraform")
        .find_map(|block| block.body.string_attribute("required_version"))
        .and_then(|raw| match Constraint::parse(&raw) {
            Ok(constraint) => Some(constraint.raw),
            Err(e) => {
                tracing::warn!(constraint = %raw, error = %e, "Ignoring invalid required_version");
                None
            }
        });

    let module_version = body
        .blocks_named("terraform")
        .flat_map(|block| block.body.blocks_named("provider_meta"))
        .filter(|meta| {
            meta.labels
                .first()
                .is_some_and(|label| MODULE_VERSION_PROVIDERS.contains(&label.as_str()))
        })
        .find_map(|meta| meta.body.string_attribute("module_name"))
        .and_then(|module_name| module_version_from_name(&module_name));

    if required_tf_version.is_none() && module_version.is_none() {
        return None;
    }

    Some(BlueprintVersion {
        required_tf_version,
        module_version,
    })
}

fn module_version_from_name(module_name: &str) -> Option<String> {
    let Some(captures) = MODULE_VERSION_SUFFIX.captures(module_name) else {
        tracing::warn!(module_name = %module_name, "module_name carries no version suffix");
        return None;
    };
    let version = &captures[1];

    match semver::Version::parse(version) {
        Ok(_) => Some(version.to_string()),
        Err(e) => {
            tracing::warn!(version = %version, error = %e, "Ignoring invalid module version");
            None
        }
    }
}

/// Extract provider requirements from `required_providers` blocks.
///
/// Entries without a `version` are skipped. A missing `source` defaults to
/// the `hashicorp` namespace, as Terraform does.
#[must_use]
pub fn extract_provider_versions(body: &Body) -> Vec<ProviderVersion> {
    body.blocks_named("terraform")
        .flat_map(|block| block.body.blocks_named("required_providers"))
        .flat_map(|block| block.body.attributes())
        .filter_map(|attr| provider_version(attr.key.as_str(), &attr.expr))
        .collect()
}

fn provider_version(name: &str, expr: &Expression) -> Option<ProviderVersion> {
    let (source, version) = match expr {
        Expression::Object(object) => {
            let field = |key: &str| {
                object
                    .iter()
                    .find(|(k, _)| object_key_to_string(k) == key)
                    .and_then(|(_, value)| literal_string(value))
            };
            (field("source"), field("version"))
        }
        // Pre-0.13 shorthand: `google = "~> 4.0"`
        other => (None, literal_string(other)),
    };

    let Some(version) = version else {
        tracing::debug!(provider = %name, "Skipping provider without version constraint");
        return None;
    };

    Some(ProviderVersion {
        source: source.unwrap_or_else(|| format!("hashicorp/{name}")),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn parse(content: &str) -> Body {
        hcl::parse(content).unwrap()
    }

    #[test]
    fn test_version_with_both_values() {
        let body = parse(
            r#"
terraform {
  required_version = ">= 0.13"
  provider_meta "google" {
    module_name = "blueprints/terraform/terraform-google-kubernetes-engine/v23.1.0"
  }
}
"#,
        );

        assert_eq!(
            extract_version(&body),
            Some(BlueprintVersion {
                required_tf_version: Some(">= 0.13".to_string()),
                module_version: Some("23.1.0".to_string()),
            })
        );
    }

    #[test]
    fn test_version_from_google_beta_meta() {
        let body = parse(
            r#"
terraform {
  provider_meta "google-beta" {
    module_name = "blueprints/terraform/terraform-google-sql-db:mysql/v12.0.0"
  }
}
"#,
        );
        let version = extract_version(&body).unwrap();
        assert_eq!(version.required_tf_version, None);
        assert_eq!(version.module_version.as_deref(), Some("12.0.0"));
    }

    #[test]
    fn test_version_ignores_other_provider_meta() {
        let body = parse(
            r#"
terraform {
  required_version = ">= 1.3"
  provider_meta "aws" {
    module_name = "something/v1.0.0"
  }
}
"#,
        );
        let version = extract_version(&body).unwrap();
        assert_eq!(version.required_tf_version.as_deref(), Some(">= 1.3"));
        assert_eq!(version.module_version, None);
    }

    #[test_case("blueprints/terraform/terraform-google-kubernetes-engine/v23.1" ; "incomplete semver")]
    #[test_case("blueprints/terraform/terraform-google-kubernetes-engine" ; "no version suffix")]
    #[test_case("blueprints/terraform/terraform-google-kubernetes-engine/vlatest" ; "not a version")]
    fn test_bad_module_version_is_absent(module_name: &str) {
        let body = parse(&format!(
            "terraform {{\n  provider_meta \"google\" {{\n    module_name = \"{module_name}\"\n  }}\n}}\n"
        ));
        assert_eq!(extract_version(&body), None);
    }

    #[test]
    fn test_bad_required_version_is_absent() {
        let body = parse(
            r#"
terraform {
  required_version = "not a version"
  provider_meta "google" {
    module_name = "blueprints/terraform/terraform-google-kubernetes-engine/v23.1.0"
  }
}
"#,
        );
        let version = extract_version(&body).unwrap();
        assert_eq!(version.required_tf_version, None);
        assert_eq!(version.module_version.as_deref(), Some("23.1.0"));
    }

    #[test]
    fn test_no_version_information() {
        assert_eq!(extract_version(&parse("variable \"a\" {}\n")), None);
        assert_eq!(extract_version(&parse("terraform {}\n")), None);
    }

    #[test]
    fn test_provider_versions() {
        let body = parse(
            r#"
terraform {
  required_providers {
    google = {
      source  = "hashicorp/google"
      version = ">= 4.4.0, < 7"
    }
    google-beta = {
      source  = "hashicorp/google-beta"
      version = ">= 4.4.0, < 7"
    }
    random = {
      source = "hashicorp/random"
    }
    kubernetes = "~> 2.10"
  }
}
"#,
        );

        assert_eq!(
            extract_provider_versions(&body),
            vec![
                ProviderVersion {
                    source: "hashicorp/google".to_string(),
                    version: ">= 4.4.0, < 7".to_string(),
                },
                ProviderVersion {
                    source: "hashicorp/google-beta".to_string(),
                    version: ">= 4.4.0, < 7".to_string(),
                },
                ProviderVersion {
                    source: "hashicorp/kubernetes".to_string(),
                    version: "~> 2.10".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_provider_versions_empty() {
        assert!(extract_provider_versions(&parse("terraform {\n  required_version = \">= 1.0\"\n}\n")).is_empty());
        assert!(extract_provider_versions(&parse("terraform {\n  required_providers {}\n}\n")).is_empty());
    }
}
