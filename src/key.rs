// src/key.rs
// Ordered index keys: scalar key type with a total order, plus the
// conversions from records and retrieval arguments to composite keys.

use crate::value_utils::get_nested_value;
use serde_json::Value;

/// Index key - supported scalar types for indexing
#[derive(Debug, Clone)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat),
    String(String),
}

/// OrderedFloat wrapper for f64 to enable Ord (NaN sorts last)
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => self
                .0
                .partial_cmp(&other.0)
                .unwrap_or(std::cmp::Ordering::Equal),
        }
    }
}

// Equality must agree with the numeric interleaving below, so it goes
// through cmp instead of a derive (Int(2) equals Float(2.0)).
impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order across key types: Null < Bool < numbers < String.
/// Int and Float interleave numerically so an index over mixed numeric
/// fields stays in value order.
impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use IndexKey::*;
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Null, _) => std::cmp::Ordering::Less,
            (_, Null) => std::cmp::Ordering::Greater,

            (Bool(a), Bool(b)) => a.cmp(b),
            (Bool(_), _) => std::cmp::Ordering::Less,
            (_, Bool(_)) => std::cmp::Ordering::Greater,

            (Int(a), Int(b)) => a.cmp(b),
            (Int(a), Float(b)) => OrderedFloat(*a as f64).cmp(b),
            (Float(a), Int(b)) => a.cmp(&OrderedFloat(*b as f64)),
            (Float(a), Float(b)) => a.cmp(b),
            (Int(_), String(_)) | (Float(_), String(_)) => std::cmp::Ordering::Less,
            (String(_), Int(_)) | (String(_), Float(_)) => std::cmp::Ordering::Greater,

            (String(a), String(b)) => a.cmp(b),
        }
    }
}

/// Convert serde_json::Value to IndexKey
/// Arrays and objects are not indexable and map to Null.
impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(f) = n.as_f64() {
                    IndexKey::Float(OrderedFloat(f))
                } else {
                    IndexKey::Null
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            _ => IndexKey::Null,
        }
    }
}

/// Coerce a retrieval argument into a composite key list:
/// an array maps element-wise, any other value becomes a one-element list.
pub fn key_list(value: &Value) -> Vec<IndexKey> {
    match value {
        Value::Array(items) => items.iter().map(IndexKey::from).collect(),
        other => vec![IndexKey::from(other)],
    }
}

/// Extract the composite key of a record for an index's field list.
/// Missing fields key as Null so sparse records still land in the index.
pub fn extract_key(record: &Value, fields: &[String]) -> Vec<IndexKey> {
    fields
        .iter()
        .map(|field| {
            get_nested_value(record, field)
                .map(IndexKey::from)
                .unwrap_or(IndexKey::Null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_keys_interleave() {
        assert!(IndexKey::Int(1) < IndexKey::Float(OrderedFloat(1.5)));
        assert!(IndexKey::Float(OrderedFloat(1.5)) < IndexKey::Int(2));
        assert_eq!(
            IndexKey::Int(2).cmp(&IndexKey::Float(OrderedFloat(2.0))),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn test_type_order() {
        assert!(IndexKey::Null < IndexKey::Bool(false));
        assert!(IndexKey::Bool(true) < IndexKey::Int(0));
        assert!(IndexKey::Int(999) < IndexKey::String("a".to_string()));
    }

    #[test]
    fn test_nan_sorts_last() {
        assert!(OrderedFloat(f64::NAN) > OrderedFloat(f64::INFINITY));
        assert_eq!(
            OrderedFloat(f64::NAN).cmp(&OrderedFloat(f64::NAN)),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn test_key_list_coercion() {
        assert_eq!(key_list(&json!(5)), vec![IndexKey::Int(5)]);
        assert_eq!(
            key_list(&json!(["us", "nyc"])),
            vec![
                IndexKey::String("us".to_string()),
                IndexKey::String("nyc".to_string())
            ]
        );
        assert_eq!(key_list(&json!([])), Vec::<IndexKey>::new());
    }

    #[test]
    fn test_extract_key_nested_and_missing() {
        let record = json!({"name": "Alice", "address": {"city": "NYC"}});
        let fields = vec!["address.city".to_string(), "age".to_string()];
        assert_eq!(
            extract_key(&record, &fields),
            vec![IndexKey::String("NYC".to_string()), IndexKey::Null]
        );
    }
}
