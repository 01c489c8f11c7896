// src/query/operators.rs
//! Predicate DSL for structured filters
//!
//! A `where` map is normalized once into a flat clause list: the OR
//! prefix is stripped, operator names resolve to a closed enum, and
//! LIKE patterns compile to anchored regexes up front. Per-record
//! evaluation then walks the clause list without re-parsing anything.

use crate::error::{QuarryError, Result};
use crate::log_debug;
use crate::value_utils::{
    as_list, compare_values, get_nested_value, list_contains, loose_eq, strict_eq,
};
use lazy_static::lazy_static;
use lru::LruCache;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Top-level query keys that are not field shorthands
pub const RESERVED: [&str; 6] = ["skip", "offset", "where", "limit", "orderBy", "sort"];

lazy_static! {
    /// Compiled LIKE patterns, keyed "pattern:flags".
    /// LRU-bounded so pathological query streams cannot grow it forever.
    static ref PATTERN_CACHE: Mutex<LruCache<String, Regex>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(100).unwrap()));
}

/// The closed set of comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==` - loose equality
    Eq,
    /// `===` - strict equality
    StrictEq,
    /// `!=`
    Ne,
    /// `!==`
    StrictNe,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Record and predicate, as lists, share no elements
    IsectEmpty,
    IsectNotEmpty,
    /// Record value appears in the predicate list
    In,
    NotIn,
    /// Predicate appears within the record value
    Contains,
    NotContains,
}

/// A resolved test: plain comparison or a pre-compiled LIKE pattern
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare { op: Operator, value: Value },
    Pattern { regex: Regex, negated: bool },
}

/// One normalized (field, operator, value) triple
#[derive(Debug, Clone)]
pub struct Clause {
    pub field: String,
    /// OR-combine with the running result instead of AND
    pub or: bool,
    pub predicate: Predicate,
}

/// Translate a SQL-LIKE pattern into an anchored regex:
/// `%` matches any run of characters, `_` exactly one, everything else
/// is literal.
fn like_to_regex_source(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 8);
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c if "\\.+*?()|[]{}^$#&-~".contains(c) => {
                source.push('\\');
                source.push(c);
            }
            c => source.push(c),
        }
    }
    source
}

/// Compile a LIKE pattern with a regex flag suffix (`i`, `m`, `s`, `x`),
/// going through the LRU cache.
fn compile_like(pattern: &str, flags: &str) -> Result<Regex> {
    let valid_flags: String = flags
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();

    let cache_key = format!("{}:{}", pattern, valid_flags);
    {
        let mut cache = PATTERN_CACHE.lock().unwrap();
        if let Some(regex) = cache.get(&cache_key) {
            return Ok(regex.clone());
        }
    }

    let mut source = String::new();
    if !valid_flags.is_empty() {
        source.push_str("(?");
        source.push_str(&valid_flags);
        source.push(')');
    }
    source.push('^');
    source.push_str(&like_to_regex_source(pattern));
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| {
        QuarryError::InvalidQuery(format!("invalid like pattern '{}': {}", pattern, e))
    })?;

    {
        let mut cache = PATTERN_CACHE.lock().unwrap();
        cache.put(cache_key, regex.clone());
    }
    Ok(regex)
}

/// Resolve one operator name plus predicate value into a `Predicate`.
///
/// `Ok(None)` means the name is not a recognized operator; the caller
/// drops the clause. An unknown operator is "no constraint", not an
/// error.
fn resolve_operator(name: &str, value: &Value) -> Result<Option<Predicate>> {
    let op = match name {
        "==" => Some(Operator::Eq),
        "===" => Some(Operator::StrictEq),
        "!=" => Some(Operator::Ne),
        "!==" => Some(Operator::StrictNe),
        ">" => Some(Operator::Gt),
        ">=" => Some(Operator::Gte),
        "<" => Some(Operator::Lt),
        "<=" => Some(Operator::Lte),
        "isectEmpty" => Some(Operator::IsectEmpty),
        "isectNotEmpty" => Some(Operator::IsectNotEmpty),
        "in" => Some(Operator::In),
        "notIn" => Some(Operator::NotIn),
        "contains" => Some(Operator::Contains),
        "notContains" => Some(Operator::NotContains),
        _ => None,
    };
    if let Some(op) = op {
        return Ok(Some(Predicate::Compare {
            op,
            value: value.clone(),
        }));
    }

    let (negated, flags) = if let Some(flags) = name.strip_prefix("notLike") {
        (true, flags)
    } else if let Some(flags) = name.strip_prefix("like") {
        (false, flags)
    } else {
        return Ok(None);
    };

    let pattern = value.as_str().ok_or_else(|| {
        QuarryError::InvalidQuery(format!("like pattern must be a string, got {}", value))
    })?;
    let regex = compile_like(pattern, flags)?;
    Ok(Some(Predicate::Pattern { regex, negated }))
}

/// Build the normalized clause list for a structured query object.
///
/// Explicit `where` clauses come first, in declaration order; every
/// other non-reserved top-level key follows as either a clause map or an
/// implicit `==` on that field. Unrecognized operator names are dropped.
pub fn normalize_where(query: &Map<String, Value>) -> Result<Vec<Clause>> {
    let mut fields: Vec<(&String, &Value)> = Vec::new();

    if let Some(where_value) = query.get("where") {
        let where_obj = where_value.as_object().ok_or_else(|| {
            QuarryError::InvalidQuery(format!("where must be an object, got {}", where_value))
        })?;
        fields.extend(where_obj.iter());
    }

    for (key, value) in query {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        if fields.iter().any(|(field, _)| *field == key) {
            continue;
        }
        fields.push((key, value));
    }

    let mut clauses = Vec::new();
    for (field, clause_value) in fields {
        match clause_value {
            Value::Object(operator_map) => {
                for (op_name, predicate_value) in operator_map {
                    let (or, op_name) = match op_name.strip_prefix('|') {
                        Some(rest) => (true, rest),
                        None => (false, op_name.as_str()),
                    };
                    match resolve_operator(op_name, predicate_value)? {
                        Some(predicate) => clauses.push(Clause {
                            field: field.clone(),
                            or,
                            predicate,
                        }),
                        None => {
                            log_debug!("ignoring unrecognized operator '{}' on {}", op_name, field)
                        }
                    }
                }
            }
            // Bare value: implicit equality
            value => clauses.push(Clause {
                field: field.clone(),
                or: false,
                predicate: Predicate::Compare {
                    op: Operator::Eq,
                    value: value.clone(),
                },
            }),
        }
    }
    Ok(clauses)
}

impl Clause {
    /// Evaluate this clause against one record
    pub fn evaluate(&self, record: &Value) -> bool {
        let record_value = get_nested_value(record, &self.field);
        match &self.predicate {
            Predicate::Pattern { regex, negated } => {
                let matched = match record_value {
                    Some(Value::String(s)) => regex.is_match(s),
                    Some(Value::Number(n)) => regex.is_match(&n.to_string()),
                    Some(Value::Bool(b)) => regex.is_match(if *b { "true" } else { "false" }),
                    _ => false,
                };
                matched != *negated
            }
            Predicate::Compare { op, value } => evaluate_compare(*op, record_value, value),
        }
    }
}

fn evaluate_compare(op: Operator, record_value: Option<&Value>, predicate: &Value) -> bool {
    match op {
        Operator::Eq => loose_eq(record_value, predicate),
        Operator::Ne => !loose_eq(record_value, predicate),
        Operator::StrictEq => strict_eq(record_value, predicate),
        Operator::StrictNe => !strict_eq(record_value, predicate),
        Operator::Gt => ordering_matches(record_value, predicate, |ord| ord == Ordering::Greater),
        Operator::Gte => ordering_matches(record_value, predicate, |ord| {
            matches!(ord, Ordering::Greater | Ordering::Equal)
        }),
        Operator::Lt => ordering_matches(record_value, predicate, |ord| ord == Ordering::Less),
        Operator::Lte => ordering_matches(record_value, predicate, |ord| {
            matches!(ord, Ordering::Less | Ordering::Equal)
        }),
        Operator::IsectEmpty => intersection_is_empty(record_value, predicate),
        Operator::IsectNotEmpty => !intersection_is_empty(record_value, predicate),
        Operator::In => in_list(record_value, predicate),
        Operator::NotIn => !in_list(record_value, predicate),
        Operator::Contains => contains(record_value, predicate),
        Operator::NotContains => !contains(record_value, predicate),
    }
}

fn ordering_matches<F>(record_value: Option<&Value>, predicate: &Value, accept: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    record_value
        .and_then(|v| compare_values(v, predicate))
        .map(accept)
        .unwrap_or(false)
}

fn intersection_is_empty(record_value: Option<&Value>, predicate: &Value) -> bool {
    let record_list = as_list(record_value);
    let predicate_list = as_list(Some(predicate));
    !record_list
        .iter()
        .any(|item| list_contains(&predicate_list, item))
}

/// Record value found in the predicate list; a string predicate against a
/// string value means substring.
fn in_list(record_value: Option<&Value>, predicate: &Value) -> bool {
    let value = match record_value {
        Some(v) => v,
        None => return false,
    };
    match predicate {
        Value::Array(items) => items.iter().any(|item| strict_eq(Some(value), item)),
        Value::String(haystack) => value
            .as_str()
            .map(|needle| haystack.contains(needle))
            .unwrap_or(false),
        _ => false,
    }
}

/// Mirror of `in_list`: the predicate found within the record value
fn contains(record_value: Option<&Value>, predicate: &Value) -> bool {
    match record_value {
        Some(Value::Array(items)) => items.iter().any(|item| strict_eq(Some(item), predicate)),
        Some(Value::String(haystack)) => predicate
            .as_str()
            .map(|needle| haystack.contains(needle))
            .unwrap_or(false),
        _ => false,
    }
}

/// Fold the clause list over one record: the first clause initializes the
/// result, later clauses AND in (or OR in when `|`-prefixed), strictly in
/// declaration order with no grouping.
pub fn matches_where(record: &Value, clauses: &[Clause]) -> bool {
    let mut keep = true;
    let mut first = true;
    for clause in clauses {
        let expr = clause.evaluate(record);
        keep = if first {
            expr
        } else if clause.or {
            keep || expr
        } else {
            keep && expr
        };
        first = false;
    }
    keep
}
