//! Terraform state parsing and output type inference.

use crate::error::Result;

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Read the type of every output recorded in a state document.
///
/// Accepts a raw state file (`outputs` at the top level) as well as the
/// output of `terraform show -json` (`values.outputs`). An output's declared
/// `type` wins; otherwise the type is inferred from its `value`.
///
/// # Errors
///
/// Returns `StateParse` when `bytes` is not a JSON object.
pub fn output_types_from_state(path: &Path, bytes: &[u8]) -> Result<BTreeMap<String, Value>> {
    let document: Value = serde_json::from_slice(bytes).map_err(|e| {
        crate::err!(StateParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    })?;

    let Value::Object(root) = &document else {
        return Err(crate::err!(StateParse {
            path: path.to_path_buf(),
            message: "state is not a JSON object".to_string(),
        }));
    };

    let Some(outputs) = state_outputs(root) else {
        tracing::debug!(path = %path.display(), "State has no outputs");
        return Ok(BTreeMap::new());
    };

    let types = outputs
        .iter()
        .filter_map(|(name, entry)| {
            let output_type = entry
                .get("type")
                .filter(|t| !t.is_null())
                .cloned()
                .or_else(|| entry.get("value").and_then(infer_type));
            if output_type.is_none() {
                tracing::debug!(output = %name, "No type recorded for output");
            }
            output_type.map(|t| (name.clone(), t))
        })
        .collect();

    Ok(types)
}

fn state_outputs(root: &Map<String, Value>) -> Option<&Map<String, Value>> {
    root.get("outputs")
        .or_else(|| root.get("values").and_then(|values| values.get("outputs")))
        .and_then(Value::as_object)
}

/// Infer a Terraform type expression (cty JSON form) from a value.
///
/// Returns `None` for `null`, whose type cannot be known.
#[must_use]
pub fn infer_type(value: &Value) -> Option<Value> {
    let inferred = match value {
        Value::Null => return None,
        Value::Bool(_) => Value::from("bool"),
        Value::Number(_) => Value::from("number"),
        Value::String(_) => Value::from("string"),
        Value::Array(items) => Value::Array(vec![
            Value::from("tuple"),
            Value::Array(items.iter().map(element_type).collect()),
        ]),
        Value::Object(fields) => Value::Array(vec![
            Value::from("object"),
            Value::Object(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), element_type(field)))
                    .collect(),
            ),
        ]),
    };
    Some(inferred)
}

fn element_type(value: &Value) -> Value {
    infer_type(value).unwrap_or_else(|| Value::from("dynamic"))
}
