//! Value utility functions shared across modules
//!
//! Nested field access with dot notation, value comparison with the
//! cross-type coercions the predicate DSL needs, and list coercion for
//! the set-intersection operators.

use serde_json::Value;
use std::cmp::Ordering;

/// Get nested value from JSON with dot notation support
///
/// Supports:
/// - Simple fields: "name"
/// - Nested objects: "address.city"
/// - Array indexing: "items.0.name"
///
/// Returns `None` (never panics) when any segment is absent.
pub fn get_nested_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    // Fast path: no dots means simple field access
    if !path.contains('.') {
        return doc.get(path);
    }

    let mut value = doc;
    for part in path.split('.') {
        match value {
            Value::Object(map) => value = map.get(part)?,
            Value::Array(arr) => {
                if let Ok(index) = part.parse::<usize>() {
                    value = arr.get(index)?;
                } else {
                    return None;
                }
            }
            _ => return None,
        }
    }
    Some(value)
}

/// JSON type name for error messages
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numeric view of a value after loose coercion:
/// numbers as-is, numeric strings parsed, booleans as 0/1.
fn coerced_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Compare two JSON values for the ordering operators
///
/// Returns `Some(Ordering)` when the pair is comparable:
/// - Number vs Number (f64 comparison)
/// - String vs String (lexicographic)
/// - Bool vs Bool (false < true)
/// - String/Bool vs Number (loose numeric coercion)
///
/// Incompatible pairs return `None`; the caller treats that as "no match"
/// rather than an error.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n1), Value::Number(n2)) => {
            n1.as_f64()?.partial_cmp(&n2.as_f64()?)
        }
        (Value::String(s1), Value::String(s2)) => Some(s1.cmp(s2)),
        (Value::Bool(b1), Value::Bool(b2)) => Some(b1.cmp(b2)),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            let f1 = coerced_number(a)?;
            let f2 = coerced_number(b)?;
            f1.partial_cmp(&f2)
        }
        _ => None,
    }
}

/// Strict equality: field must exist, values must be the same JSON type.
/// Numbers still compare numerically (1 and 1.0 are one number).
pub fn strict_eq(record_value: Option<&Value>, predicate: &Value) -> bool {
    match record_value {
        None => false,
        Some(Value::Number(a)) => match predicate {
            Value::Number(b) => match (a.as_f64(), b.as_f64()) {
                (Some(fa), Some(fb)) => fa == fb,
                _ => a == b,
            },
            _ => false,
        },
        Some(v) => v == predicate,
    }
}

/// Loose equality: strict equality plus cross-type numeric coercion
/// (numeric strings and booleans against numbers) and missing-equals-null.
pub fn loose_eq(record_value: Option<&Value>, predicate: &Value) -> bool {
    match record_value {
        None => predicate.is_null(),
        Some(v) => {
            if strict_eq(Some(v), predicate) {
                return true;
            }
            let number_involved = v.is_number() || predicate.is_number();
            if number_involved {
                if let (Some(a), Some(b)) = (coerced_number(v), coerced_number(predicate)) {
                    return a == b;
                }
            }
            false
        }
    }
}

/// View a value as a list for the set-intersection operators:
/// arrays yield their elements, a missing value is empty, any scalar is a
/// one-element list.
pub fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v) => vec![v],
    }
}

/// Membership by strict equality
pub fn list_contains(list: &[&Value], needle: &Value) -> bool {
    list.iter().any(|v| strict_eq(Some(v), needle))
}
