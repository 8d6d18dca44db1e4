//! Typed accessors over parsed HCL bodies and expressions.
//!
//! Every accessor returns `Option` so that callers decide explicitly what an
//! absent attribute means.

use hcl::expr::TemplateExpr;
use hcl::{Block, Body, Expression, ObjectKey};
use serde_json::Value;

/// Attribute-bag style lookups on a `hcl::Body`.
pub trait BodyExt {
    /// The expression assigned to `key`, if the attribute is present.
    fn attribute_expr(&self, key: &str) -> Option<&Expression>;

    /// The attribute value when it is a literal string (or number/bool).
    fn string_attribute(&self, key: &str) -> Option<String>;

    /// Blocks with the given identifier, e.g. `variable` or `resource`.
    fn blocks_named<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a Block> + 'a;

    /// The expression of local value `name` across all `locals` blocks.
    fn local(&self, name: &str) -> Option<&Expression>;
}

impl BodyExt for Body {
    fn attribute_expr(&self, key: &str) -> Option<&Expression> {
        self.attributes()
            .find(|attr| attr.key.as_str() == key)
            .map(|attr| &attr.expr)
    }

    fn string_attribute(&self, key: &str) -> Option<String> {
        self.attribute_expr(key).and_then(expression_to_string)
    }

    fn blocks_named<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks()
            .filter(move |block| block.identifier.as_str() == identifier)
    }

    fn local(&self, name: &str) -> Option<&Expression> {
        self.blocks_named("locals")
            .find_map(|block| block.body.attribute_expr(name))
    }
}

/// Convert a scalar expression to a string if possible.
fn expression_to_string(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Number(n) => Some(n.to_string()),
        Expression::Bool(b) => Some(b.to_string()),
        other => literal_string(other),
    }
}

/// The value of a string literal, including templates without interpolation.
#[must_use]
pub fn literal_string(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(s) => Some(s.clone()),
        Expression::Parenthesis(inner) => literal_string(inner),
        Expression::TemplateExpr(template) => {
            let text = match template.as_ref() {
                TemplateExpr::QuotedString(s) => s.clone(),
                TemplateExpr::Heredoc(heredoc) => heredoc.template.trim_end_matches('\n').to_string(),
                #[allow(unreachable_patterns)]
                _ => return None,
            };
            // Interpolations and directives cannot be evaluated statically
            (!text.contains("${") && !text.contains("%{")).then_some(text)
        }
        _ => None,
    }
}

/// String literal elements of a list expression, in declaration order.
///
/// Non-literal elements are skipped; a non-list expression yields nothing.
#[must_use]
pub fn literal_strings(expr: &Expression) -> Vec<String> {
    match expr {
        Expression::Array(items) => items.iter().filter_map(literal_string).collect(),
        Expression::Parenthesis(inner) => literal_strings(inner),
        _ => Vec::new(),
    }
}

/// Render an expression back to HCL source text.
#[must_use]
pub fn render_expression(expr: &Expression) -> String {
    if let Expression::Variable(var) = expr {
        return var.as_str().to_string();
    }
    hcl::format::to_string(expr).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Failed to format expression, using debug form");
        format!("{expr:?}")
    })
}

/// Convert an expression into a dynamic value.
///
/// Literals map to their JSON counterparts; anything that needs evaluation
/// (references, function calls, templates with interpolation) is kept as
/// its HCL source text.
#[must_use]
pub fn expression_to_value(expr: &Expression) -> Value {
    match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(*b),
        Expression::Number(n) => number_to_value(n),
        Expression::String(s) => Value::String(s.clone()),
        Expression::Array(items) => Value::Array(items.iter().map(expression_to_value).collect()),
        Expression::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (object_key_to_string(key), expression_to_value(value)))
                .collect(),
        ),
        Expression::Parenthesis(inner) => expression_to_value(inner),
        other => literal_string(other).map_or_else(|| Value::String(render_expression(other)), Value::String),
    }
}

fn number_to_value(n: &hcl::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

/// Convert an object key to a string.
#[must_use]
pub fn object_key_to_string(key: &ObjectKey) -> String {
    match key {
        ObjectKey::Identifier(id) => id.as_str().to_string(),
        ObjectKey::Expression(expr) => expression_to_string(expr).unwrap_or_else(|| render_expression(expr)),
        _ => String::new(),
    }
}
