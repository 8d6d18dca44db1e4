//! Static resolution of string lists through `locals`.
//!
//! Requirements are frequently written as
//!
//! ```hcl
//! resource "google_project_iam_member" "int_test" {
//!   count = length(local.int_required_roles)
//!   role  = local.int_required_roles[count.index]
//! }
//! ```
//!
//! so the role strings live in a local value, sometimes wrapped in
//! `concat`, `sort` or `flatten` calls. The resolver follows those
//! references without evaluating anything. Functions outside the
//! list-building set below resolve to nothing.

use crate::parser::{literal_string, object_key_to_string, BodyExt};
use hcl::expr::{FuncCall, Traversal, TraversalOperator};
use hcl::{Body, Expression};

/// References to other locals are followed at most this deep.
const MAX_DEPTH: usize = 8;

/// Functions whose result is the concatenation of their arguments' elements.
const LIST_FUNCTIONS: &[&str] = &["concat", "sort", "flatten", "values", "toset", "distinct"];

/// Resolves expressions to the string literals they are built from.
pub struct LocalResolver<'a> {
    body: &'a Body,
}

impl<'a> LocalResolver<'a> {
    /// Create a resolver looking up locals in `body`.
    #[must_use]
    pub const fn new(body: &'a Body) -> Self {
        Self { body }
    }

    /// Every string literal reachable from `expr`, in source order.
    #[must_use]
    pub fn strings(&self, expr: &Expression) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(expr, 0, &mut out);
        out
    }

    /// Resolve attribute `key` of a resource body.
    ///
    /// `each.key` and `each.value` are resolved through the block's
    /// `for_each` expression. Over a map they yield its keys and values
    /// respectively; over a list or set both yield the elements.
    #[must_use]
    pub fn attribute_strings(&self, block_body: &Body, key: &str) -> Vec<String> {
        let Some(expr) = block_body.attribute_expr(key) else {
            return Vec::new();
        };

        let Some(each) = each_reference(expr) else {
            return self.strings(expr);
        };
        let Some(for_each) = block_body.attribute_expr("for_each") else {
            tracing::debug!(attribute = key, "each reference without for_each");
            return Vec::new();
        };

        match self.deref(for_each, 0) {
            Some((Expression::Object(object), depth)) => {
                let mut out = Vec::new();
                for (object_key, value) in object.iter() {
                    match each {
                        Each::Key => out.push(object_key_to_string(object_key)),
                        Each::Value => self.collect(value, depth, &mut out),
                    }
                }
                out
            }
            Some(_) => self.strings(for_each),
            None => Vec::new(),
        }
    }

    fn collect(&self, expr: &Expression, depth: usize, out: &mut Vec<String>) {
        let Some((expr, depth)) = self.deref(expr, depth) else {
            return;
        };

        match expr {
            Expression::Array(items) => {
                for item in items {
                    self.collect(item, depth, out);
                }
            }
            Expression::Object(object) => {
                for (_, value) in object.iter() {
                    self.collect(value, depth, out);
                }
            }
            Expression::FuncCall(call) => self.collect_call(call, depth, out),
            other => out.extend(literal_string(other)),
        }
    }

    fn collect_call(&self, call: &FuncCall, depth: usize, out: &mut Vec<String>) {
        let name = call.name.name.as_str();
        if !call.name.namespace.is_empty() {
            tracing::debug!(function = name, "Provider function not resolved statically");
            return;
        }

        if LIST_FUNCTIONS.contains(&name) {
            for arg in &call.args {
                self.collect(arg, depth, out);
            }
            return;
        }

        if name == "lookup" {
            if let Some((entry, depth)) = self.lookup(&call.args, depth) {
                self.collect(entry, depth, out);
            }
            return;
        }

        tracing::debug!(function = name, "Function not resolved statically");
    }

    /// `lookup(map, key, default)`: the entry for `key`, else `default`.
    fn lookup<'e>(&'e self, args: &'e [Expression], depth: usize) -> Option<(&'e Expression, usize)> {
        let [map, key, rest @ ..] = args else {
            return None;
        };

        let entry = literal_string(key).and_then(|key| {
            let (map, depth) = self.deref(map, depth)?;
            object_entry(map, &key).map(|entry| (entry, depth))
        });
        entry.or_else(|| rest.first().map(|default| (default, depth)))
    }

    /// Follow local references and static selections to the expression
    /// they denote.
    ///
    /// Returns `None` for references that cannot be resolved statically,
    /// such as `var.x` or a missing local. A dynamic index like
    /// `[count.index]` stops the selection and keeps the whole collection.
    fn deref<'e>(&'e self, expr: &'e Expression, depth: usize) -> Option<(&'e Expression, usize)> {
        if depth > MAX_DEPTH {
            tracing::warn!(depth, "Local references nested too deeply, ignoring the rest");
            return None;
        }

        match expr {
            Expression::Parenthesis(inner) => self.deref(inner, depth),
            // Bare identifiers naming a local, e.g. `values(per_module_roles)`
            Expression::Variable(var) => self.body.local(var.as_str()).map_or(Some((expr, depth)), |value| {
                self.deref(value, depth + 1)
            }),
            Expression::Traversal(traversal) => {
                let value = local_name(traversal).and_then(|name| self.body.local(name))?;
                let (mut current, mut depth) = self.deref(value, depth + 1)?;

                for operator in traversal.operators.iter().skip(1) {
                    let entry = match operator {
                        TraversalOperator::GetAttr(attr) => object_entry(current, attr.as_str()),
                        TraversalOperator::LegacyIndex(index) => array_entry(current, *index),
                        TraversalOperator::Index(Expression::Number(index)) => {
                            index.as_u64().and_then(|index| array_entry(current, index))
                        }
                        TraversalOperator::Index(index) => match literal_string(index) {
                            Some(key) => object_entry(current, &key),
                            None => break,
                        },
                        TraversalOperator::AttrSplat | TraversalOperator::FullSplat => break,
                    };
                    (current, depth) = self.deref(entry?, depth)?;
                }

                Some((current, depth))
            }
            other => Some((other, depth)),
        }
    }
}

/// Which part of a `for_each` element an `each.*` reference denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Each {
    Key,
    Value,
}

/// The local name of a `local.<name>...` traversal.
fn local_name(traversal: &Traversal) -> Option<&str> {
    match (&traversal.expr, traversal.operators.first()) {
        (Expression::Variable(root), Some(TraversalOperator::GetAttr(attr))) if root.as_str() == "local" => {
            Some(attr.as_str())
        }
        _ => None,
    }
}

/// `each.key` or `each.value`.
fn each_reference(expr: &Expression) -> Option<Each> {
    let Expression::Traversal(traversal) = expr else {
        return None;
    };
    match (&traversal.expr, traversal.operators.as_slice()) {
        (Expression::Variable(root), [TraversalOperator::GetAttr(attr)]) if root.as_str() == "each" => {
            match attr.as_str() {
                "key" => Some(Each::Key),
                "value" => Some(Each::Value),
                _ => None,
            }
        }
        _ => None,
    }
}

fn object_entry<'e>(expr: &'e Expression, key: &str) -> Option<&'e Expression> {
    let Expression::Object(object) = expr else {
        return None;
    };
    object
        .iter()
        .find(|(object_key, _)| object_key_to_string(object_key) == key)
        .map(|(_, value)| value)
}

fn array_entry(expr: &Expression, index: u64) -> Option<&Expression> {
    let Expression::Array(items) = expr else {
        return None;
    };
    items.get(usize::try_from(index).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Body {
        hcl::parse(content).unwrap()
    }

    #[test]
    fn test_resolves_indexed_local() {
        let body = parse(
            r#"
locals {
  roles = ["roles/owner", "roles/storage.admin"]
}

resource "google_project_iam_member" "member" {
  count = length(local.roles)
  role  = local.roles[count.index]
}
"#,
        );
        let block = body.blocks_named("resource").next().unwrap();
        let resolver = LocalResolver::new(&body);
        assert_eq!(
            resolver.attribute_strings(&block.body, "role"),
            vec!["roles/owner", "roles/storage.admin"]
        );
    }

    #[test]
    fn test_resolves_function_wrapped_locals() {
        let body = parse(
            r#"
locals {
  per_module_roles = {
    run = ["roles/run.invoker"]
  }
  required = sort(concat(["roles/a", "roles/b"], flatten(values(per_module_roles))))
}
"#,
        );
        let resolver = LocalResolver::new(&body);
        assert_eq!(
            resolver.strings(body.local("required").unwrap()),
            vec!["roles/a", "roles/b", "roles/run.invoker"]
        );
    }

    #[test]
    fn test_resolves_for_each() {
        let body = parse(
            r#"
locals {
  apis = ["a.googleapis.com", "b.googleapis.com"]
}

resource "google_project_service" "apis" {
  for_each = toset(local.apis)
  service  = each.value
}
"#,
        );
        let block = body.blocks_named("resource").next().unwrap();
        let resolver = LocalResolver::new(&body);
        assert_eq!(
            resolver.attribute_strings(&block.body, "service"),
            vec!["a.googleapis.com", "b.googleapis.com"]
        );
    }

    #[test]
    fn test_only_list_functions_are_flattened() {
        let body = parse(
            r#"
locals {
  apis = distinct(["a.googleapis.com", "a.googleapis.com"])
}

joined   = split(",", "a.googleapis.com,b.googleapis.com")
picked   = element(local.apis, 0)
named    = format("%s.googleapis.com", "run")
distinct = local.apis
"#,
        );
        let resolver = LocalResolver::new(&body);
        assert!(resolver.attribute_strings(&body, "joined").is_empty());
        assert!(resolver.attribute_strings(&body, "picked").is_empty());
        assert!(resolver.attribute_strings(&body, "named").is_empty());
        assert_eq!(
            resolver.attribute_strings(&body, "distinct"),
            vec!["a.googleapis.com", "a.googleapis.com"]
        );
    }

    #[test]
    fn test_follows_static_selections() {
        let body = parse(
            r#"
locals {
  per_module = {
    run = ["roles/run.invoker"]
    sql = ["roles/cloudsql.client"]
  }
  ordered = ["roles/first", "roles/second"]
}

by_attr  = local.per_module.run
by_key   = local.per_module["sql"]
by_index = local.ordered[1]
missing  = local.per_module.gke
"#,
        );
        let resolver = LocalResolver::new(&body);
        assert_eq!(resolver.attribute_strings(&body, "by_attr"), vec!["roles/run.invoker"]);
        assert_eq!(resolver.attribute_strings(&body, "by_key"), vec!["roles/cloudsql.client"]);
        assert_eq!(resolver.attribute_strings(&body, "by_index"), vec!["roles/second"]);
        assert!(resolver.attribute_strings(&body, "missing").is_empty());
    }

    #[test]
    fn test_each_key_over_map() {
        let body = parse(
            r#"
locals {
  services = {
    "iam.googleapis.com" = "identity"
    "run.googleapis.com" = "serving"
  }
}

resource "google_project_service" "apis" {
  for_each = local.services
  service  = each.key
  label    = each.value
}
"#,
        );
        let block = body.blocks_named("resource").next().unwrap();
        let resolver = LocalResolver::new(&body);
        assert_eq!(
            resolver.attribute_strings(&block.body, "service"),
            vec!["iam.googleapis.com", "run.googleapis.com"]
        );
        assert_eq!(resolver.attribute_strings(&block.body, "label"), vec!["identity", "serving"]);
    }

    #[test]
    fn test_unknown_references_resolve_to_nothing() {
        let body = parse("role = var.role\nother = local.missing\n");
        let resolver = LocalResolver::new(&body);
        assert!(resolver.attribute_strings(&body, "role").is_empty());
        assert!(resolver.attribute_strings(&body, "other").is_empty());
        assert!(resolver.attribute_strings(&body, "absent").is_empty());
    }

    #[test]
    fn test_self_referencing_locals_terminate() {
        let body = parse(
            r#"
locals {
  a = concat(["x"], local.b)
  b = concat(["y"], local.a)
}
"#,
        );
        let resolver = LocalResolver::new(&body);
        let strings = resolver.strings(body.local("a").unwrap());
        assert_eq!(strings.first().map(String::as_str), Some("x"));
        assert!(strings.contains(&"y".to_string()));
    }
}
