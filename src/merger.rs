//! Merging freshly extracted metadata with a previously generated document.
//!
//! Extraction never produces connections, and output types only come from
//! state. Both are therefore carried over from the existing document:
//!
//! - connections: the existing value wins whenever it is non-empty
//! - output types: the fresh value wins whenever it is set
//!
//! Document fields nobody extracts (title, source, labels) are kept as well.

use crate::types::{BlueprintInterface, BlueprintMetadata};

/// Copy non-empty connections from `existing` onto same-named variables and
/// outputs of `new`.
pub fn merge_existing_connections(new: &mut BlueprintInterface, existing: &BlueprintInterface) {
    for variable in &mut new.variables {
        if let Some(previous) = existing.variable(&variable.name) {
            if !previous.connections.is_empty() {
                variable.connections.clone_from(&previous.connections);
            }
        }
    }

    for output in &mut new.outputs {
        if let Some(previous) = existing.output(&output.name) {
            if !previous.connections.is_empty() {
                output.connections.clone_from(&previous.connections);
            }
        }
    }
}

/// Copy output types from `existing` onto same-named untyped outputs of `new`.
pub fn merge_existing_output_types(new: &mut BlueprintInterface, existing: &BlueprintInterface) {
    for output in new.outputs.iter_mut().filter(|o| o.output_type.is_none()) {
        output.output_type = existing
            .output(&output.name)
            .and_then(|previous| previous.output_type.clone());
    }
}

/// Keep curated document fields of `existing`.
///
/// The name, title, source and labels of `existing` win when set. Versions
/// are extracted, so the existing ones only fill in when `new` has none.
pub fn merge_existing_info(new: &mut BlueprintMetadata, existing: &BlueprintMetadata) {
    if !existing.metadata.name.is_empty() {
        new.metadata.name.clone_from(&existing.metadata.name);
    }
    if new.metadata.labels.is_empty() {
        new.metadata.labels.clone_from(&existing.metadata.labels);
    }

    let (info, previous) = (&mut new.spec.info, &existing.spec.info);
    if !previous.title.is_empty() {
        info.title.clone_from(&previous.title);
    }
    if info.source.is_none() {
        info.source.clone_from(&previous.source);
    }
    if info.version.is_empty() {
        info.version.clone_from(&previous.version);
    }
    if info.actuation_tool.version.is_empty() {
        info.actuation_tool.version.clone_from(&previous.actuation_tool.version);
    }
}

/// Run every merge of `existing` into `new`.
pub fn merge_existing(new: &mut BlueprintMetadata, existing: &BlueprintMetadata) {
    let existing_interfaces = &existing.spec.interfaces;
    merge_existing_connections(&mut new.spec.interfaces, existing_interfaces);
    merge_existing_output_types(&mut new.spec.interfaces, existing_interfaces);
    merge_existing_info(new, existing);

    tracing::debug!(
        variables = new.spec.interfaces.variables.len(),
        outputs = new.spec.interfaces.outputs.len(),
        "Merged existing metadata"
    );
}
