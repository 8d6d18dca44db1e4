//! Service API requirements.

use super::{module_local_list, LocalResolver, Selection};
use crate::parser::BodyExt;

use hcl::Body;
use std::collections::HashSet;

/// Resource type enabling a single service API.
pub const PROJECT_SERVICE_RESOURCE: &str = "google_project_service";

/// Module argument listing service APIs to enable.
pub const ACTIVATE_APIS_ATTRIBUTE: &str = "activate_apis";

/// Extract the service APIs a blueprint needs.
///
/// For [`Selection::Root`] the `activate_apis` arguments of `module` blocks
/// and the `service` of `google_project_service` resources are collected,
/// deduplicated in first-seen order. For [`Selection::Module`] the module's
/// entry in the local map is returned as declared.
#[must_use]
pub fn extract_services(body: &Body, selection: &Selection<'_>) -> Vec<String> {
    match *selection {
        Selection::Root => root_services(body),
        Selection::Module { name, local_map } => module_local_list(body, local_map, name),
    }
}

fn root_services(body: &Body) -> Vec<String> {
    let resolver = LocalResolver::new(body);
    let mut seen = HashSet::new();
    let mut services = Vec::new();

    for block in body.blocks() {
        let found = match block.identifier.as_str() {
            "module" => resolver.attribute_strings(&block.body, ACTIVATE_APIS_ATTRIBUTE),
            "resource" if block.labels.first().map(|l| l.as_str()) == Some(PROJECT_SERVICE_RESOURCE) => {
                resolver.attribute_strings(&block.body, "service")
            }
            _ => continue,
        };

        services.extend(found.into_iter().filter(|service| seen.insert(service.clone())));
    }

    tracing::debug!(count = services.len(), "Extracted root services");
    services
}
