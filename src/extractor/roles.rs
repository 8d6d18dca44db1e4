//! IAM role requirements.

use super::{module_local_list, LocalResolver, Selection};
use crate::parser::BodyExt;
use crate::types::{BlueprintRoles, RoleLevel};

use hcl::Body;

/// Extract the IAM roles a blueprint needs.
///
/// For [`Selection::Root`] every IAM member resource yields one entry at its
/// level, with roles deduplicated and sorted; the entries are then ordered by
/// [`sort_roles`]. For [`Selection::Module`] the module's entry in the local
/// map becomes a single project-level entry, kept as declared.
#[must_use]
pub fn extract_roles(body: &Body, selection: &Selection<'_>) -> Vec<BlueprintRoles> {
    match *selection {
        Selection::Root => root_roles(body),
        Selection::Module { name, local_map } => {
            let roles = module_local_list(body, local_map, name);
            if roles.is_empty() {
                return Vec::new();
            }
            vec![BlueprintRoles {
                level: RoleLevel::Project,
                roles,
            }]
        }
    }
}

fn root_roles(body: &Body) -> Vec<BlueprintRoles> {
    let resolver = LocalResolver::new(body);

    let mut entries: Vec<BlueprintRoles> = body
        .blocks_named("resource")
        .filter_map(|block| {
            let level = block
                .labels
                .first()
                .and_then(|label| RoleLevel::from_resource_type(label.as_str()))?;

            let mut roles = resolver.attribute_strings(&block.body, "role");
            roles.sort();
            roles.dedup();

            if roles.is_empty() {
                tracing::debug!(
                    resource = ?block.labels.get(1).map(|l| l.as_str()),
                    "IAM member role could not be resolved statically"
                );
                return None;
            }

            Some(BlueprintRoles { level, roles })
        })
        .collect();

    sort_roles(&mut entries);
    entries
}

/// Order role entries by level name, then role count, then first role.
///
/// The sort is stable, so applying it twice changes nothing.
pub fn sort_roles(roles: &mut [BlueprintRoles]) {
    roles.sort_by(|a, b| {
        a.level
            .as_str()
            .cmp(b.level.as_str())
            .then_with(|| a.roles.len().cmp(&b.roles.len()))
            .then_with(|| a.roles.first().cmp(&b.roles.first()))
    });
}
