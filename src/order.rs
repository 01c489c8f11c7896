// src/order.rs
// Multi-key ordering and pagination: orderBy normalization, the
// case-folding tie-break comparator, stable sort application, and the
// skip/limit slice.

use crate::error::{QuarryError, Result};
use crate::value_utils::get_nested_value;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Parse a direction string, case-insensitively. Anything that is not
    /// "DESC" sorts ascending, matching the default of the query surface.
    pub fn parse(s: &str) -> Direction {
        if s.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

/// One sort key: field path plus direction
pub type OrderSpec = (String, Direction);

/// Normalize an `orderBy`/`sort` value into an ordered list of
/// (field, direction) pairs.
///
/// Accepted shapes:
/// - `"name"` - one ascending key
/// - `["age", "name"]` - several ascending keys
/// - `[["age", "DESC"], "name"]` - explicit directions, bare fields
///   default to ascending
pub fn normalize_order_by(value: &Value) -> Result<Vec<OrderSpec>> {
    match value {
        Value::String(field) => Ok(vec![(field.clone(), Direction::Asc)]),
        Value::Array(items) => {
            let mut specs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(field) => specs.push((field.clone(), Direction::Asc)),
                    Value::Array(pair) => {
                        let field = pair.first().and_then(Value::as_str).ok_or_else(|| {
                            QuarryError::InvalidQuery(
                                "orderBy entry must start with a field name".to_string(),
                            )
                        })?;
                        let direction = pair
                            .get(1)
                            .and_then(Value::as_str)
                            .map(Direction::parse)
                            .unwrap_or(Direction::Asc);
                        specs.push((field.to_string(), direction));
                    }
                    other => {
                        return Err(QuarryError::InvalidQuery(format!(
                            "orderBy entry must be a string or [field, direction] pair, got {}",
                            other
                        )))
                    }
                }
            }
            Ok(specs)
        }
        other => Err(QuarryError::InvalidQuery(format!(
            "orderBy must be a string or array, got {}",
            other
        ))),
    }
}

/// Compare two records over an ordered list of sort keys.
///
/// Field values come from dotted paths; textual values case-fold to
/// uppercase before comparison; missing fields and JSON null sort first.
/// Exact ties fall through to the next key.
pub fn compare_records(a: &Value, b: &Value, specs: &[OrderSpec]) -> Ordering {
    for (field, direction) in specs {
        let va = get_nested_value(a, field).filter(|v| !v.is_null());
        let vb = get_nested_value(b, field).filter(|v| !v.is_null());

        let cmp = sort_cmp(va, vb);
        if cmp != Ordering::Equal {
            return match direction {
                Direction::Asc => cmp,
                Direction::Desc => cmp.reverse(),
            };
        }
    }
    Ordering::Equal
}

fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,

        (Some(Value::Number(n1)), Some(Value::Number(n2))) => {
            let f1 = n1.as_f64().unwrap_or(0.0);
            let f2 = n2.as_f64().unwrap_or(0.0);
            f1.partial_cmp(&f2).unwrap_or(Ordering::Equal)
        }

        // Case-insensitive text ordering
        (Some(Value::String(s1)), Some(Value::String(s2))) => {
            s1.to_uppercase().cmp(&s2.to_uppercase())
        }

        (Some(Value::Bool(b1)), Some(Value::Bool(b2))) => b1.cmp(b2),

        // Mixed types order by a fixed priority
        (Some(a_val), Some(b_val)) => type_priority(a_val).cmp(&type_priority(b_val)),
    }
}

fn type_priority(val: &Value) -> u8 {
    match val {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Bool(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
    }
}

/// Stable multi-key sort in place
pub fn apply_sort(records: &mut [Value], specs: &[OrderSpec]) {
    if specs.is_empty() {
        return;
    }
    records.sort_by(|a, b| compare_records(a, b, specs));
}

/// Drop the first `skip` records, then keep at most `limit`.
/// Both sides clamp instead of erroring on over-large values.
pub fn apply_skip_limit(
    records: Vec<Value>,
    skip: Option<usize>,
    limit: Option<usize>,
) -> Vec<Value> {
    let skip_count = skip.unwrap_or(0);
    if skip_count >= records.len() {
        return Vec::new();
    }

    let start = skip_count;
    let end = match limit {
        Some(limit_count) => start.saturating_add(limit_count).min(records.len()),
        None => records.len(),
    };
    records[start..end].to_vec()
}
