// src/index.rs
// In-memory ordered composite-key index
//
// The query engine consumes exactly three read operations from an index:
// full enumeration, exact lookup, and boundary-inclusive range scan.
// All three return records in index order; records sharing a composite
// key keep their insertion order.

use crate::key::{extract_key, IndexKey};
use crate::log_trace;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Boundary inclusivity for range scans.
/// Defaults mirror the query surface: left-closed, right-open.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub left_inclusive: bool,
    pub right_inclusive: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            left_inclusive: true,
            right_inclusive: false,
        }
    }
}

/// Ordered index over one or more record fields
#[derive(Debug, Clone)]
pub struct Index {
    name: String,
    fields: Vec<String>,
    entries: BTreeMap<Vec<IndexKey>, Vec<Value>>,
    num_records: u64,
}

/// Compare a stored composite key against a (possibly shorter) boundary
/// key list. Only the boundary's components participate, so a boundary
/// addresses the whole prefix group it names.
fn cmp_prefix(key: &[IndexKey], bound: &[IndexKey]) -> std::cmp::Ordering {
    for (k, b) in key.iter().zip(bound.iter()) {
        match k.cmp(b) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    if key.len() < bound.len() {
        std::cmp::Ordering::Less
    } else {
        std::cmp::Ordering::Equal
    }
}

impl Index {
    /// Create an index over the given field paths (dot notation allowed)
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        let fields = if fields.is_empty() {
            vec!["id".to_string()]
        } else {
            fields
        };
        Index {
            name: name.into(),
            fields,
            entries: BTreeMap::new(),
            num_records: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.num_records as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_records == 0
    }

    /// Add a record under its extracted composite key.
    /// Equal keys accumulate in insertion order.
    pub fn insert(&mut self, record: Value) {
        let key = extract_key(&record, &self.fields);
        log_trace!("index {}: insert key {:?}", self.name, key);
        self.entries.entry(key).or_default().push(record);
        self.num_records += 1;
    }

    /// All records in index order
    pub fn get_all(&self) -> Vec<Value> {
        self.entries
            .values()
            .flat_map(|records| records.iter().cloned())
            .collect()
    }

    /// Records whose composite key equals the given key list, in index
    /// order. A key list shorter than the index's field list matches the
    /// whole prefix group.
    pub fn get(&self, keys: &[IndexKey]) -> Vec<Value> {
        if keys.is_empty() {
            return self.get_all();
        }
        let start: Vec<IndexKey> = keys.to_vec();
        self.entries
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(key, _)| cmp_prefix(key, keys) == std::cmp::Ordering::Equal)
            .flat_map(|(_, records)| records.iter().cloned())
            .collect()
    }

    /// Records between two composite-key boundaries, honoring each side's
    /// inclusivity independently, in index order.
    pub fn between(&self, left: &[IndexKey], right: &[IndexKey], bounds: Bounds) -> Vec<Value> {
        let mut out = Vec::new();
        let start: Vec<IndexKey> = left.to_vec();
        for (key, records) in self
            .entries
            .range((Bound::Included(start), Bound::Unbounded))
        {
            if !bounds.left_inclusive && cmp_prefix(key, left) == std::cmp::Ordering::Equal {
                continue;
            }
            match cmp_prefix(key, right) {
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Equal if !bounds.right_inclusive => break,
                _ => {}
            }
            out.extend(records.iter().cloned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_list;
    use serde_json::json;

    fn age_index() -> Index {
        let mut index = Index::new("age", vec!["age".to_string()]);
        for record in [
            json!({"id": 1, "age": 30, "name": "Alice"}),
            json!({"id": 2, "age": 25, "name": "Bob"}),
            json!({"id": 3, "age": 30, "name": "Carol"}),
            json!({"id": 4, "age": 40, "name": "Dave"}),
        ] {
            index.insert(record);
        }
        index
    }

    fn location_index() -> Index {
        let mut index = Index::new(
            "location",
            vec!["country".to_string(), "city".to_string()],
        );
        for record in [
            json!({"id": 1, "country": "hu", "city": "pecs"}),
            json!({"id": 2, "country": "hu", "city": "budapest"}),
            json!({"id": 3, "country": "us", "city": "nyc"}),
            json!({"id": 4, "country": "hu", "city": "budapest"}),
        ] {
            index.insert(record);
        }
        index
    }

    fn ids(records: &[Value]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_get_all_is_in_key_order() {
        let index = age_index();
        assert_eq!(ids(&index.get_all()), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_get_exact_preserves_insertion_order_within_key() {
        let index = age_index();
        assert_eq!(ids(&index.get(&key_list(&json!(30)))), vec![1, 3]);
        assert!(index.get(&key_list(&json!(99))).is_empty());
    }

    #[test]
    fn test_get_prefix_group() {
        let index = location_index();
        // "hu" addresses every hungarian record, cities in key order
        assert_eq!(ids(&index.get(&key_list(&json!("hu")))), vec![2, 4, 1]);
        assert_eq!(
            ids(&index.get(&key_list(&json!(["hu", "budapest"])))),
            vec![2, 4]
        );
    }

    #[test]
    fn test_between_default_bounds() {
        let index = age_index();
        // left-closed, right-open
        let result = index.between(
            &key_list(&json!(25)),
            &key_list(&json!(40)),
            Bounds::default(),
        );
        assert_eq!(ids(&result), vec![2, 1, 3]);
    }

    #[test]
    fn test_between_inclusivity_combinations() {
        let index = age_index();
        let left = key_list(&json!(25));
        let right = key_list(&json!(40));

        let both = index.between(
            &left,
            &right,
            Bounds {
                left_inclusive: true,
                right_inclusive: true,
            },
        );
        assert_eq!(ids(&both), vec![2, 1, 3, 4]);

        let neither = index.between(
            &left,
            &right,
            Bounds {
                left_inclusive: false,
                right_inclusive: false,
            },
        );
        assert_eq!(ids(&neither), vec![1, 3]);
    }

    #[test]
    fn test_between_equals_get_when_boundaries_match() {
        let index = age_index();
        let key = key_list(&json!(30));
        let both_inclusive = index.between(
            &key,
            &key,
            Bounds {
                left_inclusive: true,
                right_inclusive: true,
            },
        );
        assert_eq!(ids(&both_inclusive), ids(&index.get(&key)));
    }

    #[test]
    fn test_between_prefix_boundaries() {
        let index = location_index();
        // right boundary "us" exclusive: whole "us" prefix group excluded
        let result = index.between(
            &key_list(&json!("hu")),
            &key_list(&json!("us")),
            Bounds::default(),
        );
        assert_eq!(ids(&result), vec![2, 4, 1]);
    }

    #[test]
    fn test_missing_field_keys_as_null() {
        let mut index = Index::new("age", vec!["age".to_string()]);
        index.insert(json!({"id": 1}));
        index.insert(json!({"id": 2, "age": 10}));
        // Null keys sort first
        assert_eq!(ids(&index.get_all()), vec![1, 2]);
        assert_eq!(ids(&index.get(&key_list(&json!(null)))), vec![1]);
    }
}
