//! Rendering of identifiers, operators and values into SQL text.
//!
//! Statements are sent as one multi-statement batch (the role and user
//! prefixes need it), which rules out bind parameters. Everything that ends
//! up in the text passes through here instead.

use serde_json::Value;

use super::error::CompileError;
use super::types::Relation;

const OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "ILIKE", "NOT LIKE", "NOT ILIKE", "IS", "IS NOT", "@>", "<@",
    "&&",
];

/// `^[a-zA-Z_][a-zA-Z0-9_]*$`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn identifier(name: &str) -> Result<&str, CompileError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(CompileError::InvalidIdentifier(name.to_string()))
    }
}

pub fn relation(relation: &Relation) -> Result<String, CompileError> {
    let table = identifier(&relation.table)?;
    match &relation.schema {
        Some(schema) => Ok(format!("{}.{}", identifier(schema)?, table)),
        None => Ok(table.to_string()),
    }
}

/// Normalise an operator against the allow-list. Empty means equality.
pub fn operator(op: &str) -> Result<String, CompileError> {
    let normalised = op.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
    if normalised.is_empty() {
        return Ok("=".to_string());
    }
    if OPERATORS.contains(&normalised.as_str()) {
        Ok(normalised)
    } else {
        Err(CompileError::UnsupportedOperator(op.to_string()))
    }
}

/// Single-quoted string literal with embedded quotes doubled
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Predicate value: strings quoted, numbers and booleans bare
pub fn scalar(key: &str, value: &Value) -> Result<String, CompileError> {
    match value {
        Value::String(s) => Ok(quote(s)),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("NULL".to_string()),
        Value::Array(_) | Value::Object(_) => Err(CompileError::UnsupportedValue {
            key: key.to_string(),
            reason: "arrays and objects cannot be compared directly".to_string(),
        }),
    }
}

/// Column value for INSERT/UPDATE. Arrays and objects go in as JSON text.
pub fn column_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        Value::Array(_) | Value::Object(_) => quote(&value.to_string()),
    }
}

/// `[v1, v2, ...]` for `ANY(ARRAY...)`. String elements quoted one by one,
/// everything else in its plain textual form.
pub fn array(key: &str, values: &[Value]) -> Result<String, CompileError> {
    let items = values
        .iter()
        .map(|v| scalar(key, v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("[{}]", items.join(", ")))
}
