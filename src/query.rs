// src/query.rs
//! Chainable query builder over a collection's indexes
//!
//! A `Query` is a two-state machine: unresolved until exactly one
//! retrieval operation (`get_data`, `get`, `get_all`, `between`, or the
//! implicit full scan a transformation triggers) materializes its data,
//! then resolved until `run()` drains it back to unresolved. A second
//! retrieval on a resolved builder is a state error; transformations
//! never touch the indexes again, they reshape the materialized
//! sequence in place.

pub mod operators;

use crate::collection::Collection;
use crate::error::{QuarryError, Result};
use crate::index::Bounds;
use crate::key::key_list;
use crate::log_trace;
use crate::order::{apply_skip_limit, apply_sort, normalize_order_by};
use crate::value_utils::value_type_name;
use serde_json::Value;

/// Builder state: unresolved until a retrieval populates it
#[derive(Debug, Clone)]
enum QueryData {
    Unresolved,
    Resolved(Vec<Value>),
}

/// Options for `get`/`get_all`
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    /// Secondary index name; `None` means the primary index
    pub index: Option<String>,
}

impl LookupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }
}

/// Options for `between`
#[derive(Debug, Clone)]
pub struct BetweenOptions {
    pub index: Option<String>,
    pub left_inclusive: bool,
    pub right_inclusive: bool,
}

impl Default for BetweenOptions {
    fn default() -> Self {
        BetweenOptions {
            index: None,
            left_inclusive: true,
            right_inclusive: false,
        }
    }
}

impl BetweenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn with_left_inclusive(mut self, inclusive: bool) -> Self {
        self.left_inclusive = inclusive;
        self
    }

    pub fn with_right_inclusive(mut self, inclusive: bool) -> Self {
        self.right_inclusive = inclusive;
        self
    }
}

/// A reusable query bound to one collection
#[derive(Debug)]
pub struct Query<'a> {
    collection: &'a Collection,
    data: QueryData,
}

impl<'a> Query<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Query {
            collection,
            data: QueryData::Unresolved,
        }
    }

    fn ensure_unresolved(&self, op: &'static str) -> Result<()> {
        match self.data {
            QueryData::Unresolved => Ok(()),
            QueryData::Resolved(_) => Err(QuarryError::DataAlreadySet(op)),
        }
    }

    fn materialize(&mut self) -> &mut Vec<Value> {
        if matches!(self.data, QueryData::Unresolved) {
            log_trace!("materializing full scan of {}", self.collection.name());
            self.data = QueryData::Resolved(self.collection.primary_index().get_all());
        }
        match &mut self.data {
            QueryData::Resolved(records) => records,
            QueryData::Unresolved => unreachable!(),
        }
    }

    /// Populate from the full primary index. Idempotent once resolved.
    pub fn get_data(&mut self) -> &mut Self {
        self.materialize();
        self
    }

    /// Point lookup on a composite key. A non-array key is coerced to a
    /// one-element key list; an empty key list degenerates to `get_data`.
    pub fn get(&mut self, keys: impl Into<Value>, opts: &LookupOptions) -> Result<&mut Self> {
        self.ensure_unresolved("get")?;
        let keys = key_list(&keys.into());
        if keys.is_empty() {
            return Ok(self.get_data());
        }
        let index = self.collection.index_for(opts.index.as_deref())?;
        self.data = QueryData::Resolved(index.get(&keys));
        Ok(self)
    }

    /// Concatenated point lookups for several key lists, in argument
    /// order, duplicates preserved. No key lists degenerates to
    /// `get_data`.
    pub fn get_all(&mut self, key_lists: &[Value], opts: &LookupOptions) -> Result<&mut Self> {
        self.ensure_unresolved("getAll")?;
        if key_lists.is_empty() {
            return Ok(self.get_data());
        }
        let index = self.collection.index_for(opts.index.as_deref())?;
        let mut records = Vec::new();
        for keys_value in key_lists {
            records.extend(index.get(&key_list(keys_value)));
        }
        self.data = QueryData::Resolved(records);
        Ok(self)
    }

    /// Range scan between two composite-key boundaries
    pub fn between(
        &mut self,
        left: impl Into<Value>,
        right: impl Into<Value>,
        opts: &BetweenOptions,
    ) -> Result<&mut Self> {
        self.ensure_unresolved("between")?;
        let index = self.collection.index_for(opts.index.as_deref())?;
        let records = index.between(
            &key_list(&left.into()),
            &key_list(&right.into()),
            Bounds {
                left_inclusive: opts.left_inclusive,
                right_inclusive: opts.right_inclusive,
            },
        );
        self.data = QueryData::Resolved(records);
        Ok(self)
    }

    /// Structured filter: a `where` clause map (plus non-reserved
    /// field shorthands), then `orderBy`/`sort`, then `skip`/`offset`
    /// and `limit`, applied in that order. Runs an implicit full scan
    /// if no retrieval happened yet.
    pub fn filter(&mut self, query: &Value) -> Result<&mut Self> {
        let query_obj = query.as_object().ok_or_else(|| {
            QuarryError::InvalidQuery(format!("filter query must be an object, got {}", query))
        })?;

        self.get_data();

        let clauses = operators::normalize_where(query_obj)?;
        if !clauses.is_empty() {
            let records = self.materialize();
            records.retain(|record| operators::matches_where(record, &clauses));
        }

        if let Some(order_value) = query_obj.get("orderBy").or_else(|| query_obj.get("sort")) {
            let specs = normalize_order_by(order_value)?;
            apply_sort(self.materialize(), &specs);
        }

        // `skip` wins over its `offset` alias, but a non-numeric `skip`
        // falls through to a numeric `offset` instead of erroring out.
        let skip = match (query_obj.get("skip"), query_obj.get("offset")) {
            (Some(skip), Some(offset)) if !skip.is_number() && offset.is_number() => Some(offset),
            (Some(skip), _) => Some(skip),
            (None, offset) => offset,
        }
        .map(|v| page_arg("skip", v))
        .transpose()?;
        let limit = query_obj
            .get("limit")
            .map(|v| page_arg("limit", v))
            .transpose()?;
        if skip.is_some() || limit.is_some() {
            let records = std::mem::take(self.materialize());
            self.data = QueryData::Resolved(apply_skip_limit(records, skip, limit));
        }

        Ok(self)
    }

    /// Filter with a plain predicate, standard retain semantics
    pub fn filter_with<F>(&mut self, mut predicate: F) -> &mut Self
    where
        F: FnMut(&Value) -> bool,
    {
        self.materialize().retain(|record| predicate(record));
        self
    }

    /// Drop the first `n` records (clamped). `n` must be numeric.
    pub fn skip(&mut self, n: impl Into<Value>) -> Result<&mut Self> {
        let count = page_arg("skip", &n.into())?;
        let records = std::mem::take(self.materialize());
        self.data = QueryData::Resolved(apply_skip_limit(records, Some(count), None));
        Ok(self)
    }

    /// Keep at most the first `n` records (clamped). `n` must be numeric.
    pub fn limit(&mut self, n: impl Into<Value>) -> Result<&mut Self> {
        let count = page_arg("limit", &n.into())?;
        let records = std::mem::take(self.materialize());
        self.data = QueryData::Resolved(apply_skip_limit(records, None, Some(count)));
        Ok(self)
    }

    /// Visit every record for side effects; data is untouched
    pub fn for_each<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(&Value),
    {
        for record in self.materialize().iter() {
            f(record);
        }
        self
    }

    /// Replace data with its element-wise transformation
    pub fn map<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(&Value) -> Value,
    {
        let records = self.materialize();
        let transformed: Vec<Value> = records.iter().map(|record| f(record)).collect();
        *records = transformed;
        self
    }

    /// Terminal operation: hand back the materialized result and reset
    /// the builder to unresolved so it can start a new retrieval cycle.
    pub fn run(&mut self) -> Vec<Value> {
        match std::mem::replace(&mut self.data, QueryData::Unresolved) {
            QueryData::Resolved(records) => records,
            QueryData::Unresolved => Vec::new(),
        }
    }
}

fn page_arg(op: &'static str, value: &Value) -> Result<usize> {
    match value {
        Value::Number(n) => {
            if let Some(count) = n.as_u64() {
                Ok(count as usize)
            } else {
                // negative or fractional: clamp to zero / truncate
                Ok(n.as_f64().map(|f| f.max(0.0) as usize).unwrap_or(0))
            }
        }
        other => Err(QuarryError::InvalidType {
            op,
            actual: value_type_name(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use serde_json::json;

    fn users() -> Collection {
        let mut users = Collection::new("users", "id");
        users.create_index("age", vec!["age".to_string()]);
        users
            .insert(json!({"id": 1, "name": "Alice", "age": 30}))
            .insert(json!({"id": 2, "name": "Bob", "age": 25}))
            .insert(json!({"id": 3, "name": "Carol", "age": 30}))
            .insert(json!({"id": 4, "name": "Dave", "age": 40}))
            .insert(json!({"id": 5, "name": "Eve", "age": 25}));
        users
    }

    fn ids(records: &[Value]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_get_data_full_scan_in_primary_order() {
        let users = users();
        let mut query = users.query();
        let result = query.get_data().run();
        assert_eq!(ids(&result), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_get_on_primary_and_secondary_index() {
        let users = users();

        let mut query = users.query();
        let result = query.get(3, &LookupOptions::new()).unwrap().run();
        assert_eq!(ids(&result), vec![3]);

        let mut query = users.query();
        let result = query
            .get(30, &LookupOptions::new().with_index("age"))
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![1, 3]);
    }

    #[test]
    fn test_get_empty_key_list_degenerates_to_full_scan() {
        let users = users();
        let mut query = users.query();
        let result = query.get(json!([]), &LookupOptions::new()).unwrap().run();
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn test_get_all_concatenates_in_argument_order() {
        let users = users();
        let mut query = users.query();
        let result = query
            .get_all(
                &[json!(40), json!(25), json!(40)],
                &LookupOptions::new().with_index("age"),
            )
            .unwrap()
            .run();
        // duplicates preserved, argument order preserved
        assert_eq!(ids(&result), vec![4, 2, 5, 4]);
    }

    #[test]
    fn test_get_all_no_keys_is_get_data() {
        let users = users();
        let mut query = users.query();
        let via_get_all = query.get_all(&[], &LookupOptions::new()).unwrap().run();
        let via_get_data = users.query().get_data().run();
        assert_eq!(via_get_all, via_get_data);
    }

    #[test]
    fn test_between_inclusivity_defaults() {
        let users = users();
        let mut query = users.query();
        let result = query
            .between(25, 40, &BetweenOptions::new().with_index("age"))
            .unwrap()
            .run();
        // left in, right out
        assert_eq!(ids(&result), vec![2, 5, 1, 3]);

        let mut query = users.query();
        let result = query
            .between(
                25,
                40,
                &BetweenOptions::new()
                    .with_index("age")
                    .with_left_inclusive(false)
                    .with_right_inclusive(true),
            )
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![1, 3, 4]);
    }

    #[test]
    fn test_second_retrieval_is_a_state_error() {
        let users = users();
        let mut query = users.query();
        query.get(1, &LookupOptions::new()).unwrap();

        let err = query.get(2, &LookupOptions::new()).unwrap_err();
        assert!(matches!(err, QuarryError::DataAlreadySet("get")));

        let err = query
            .between(1, 2, &BetweenOptions::new())
            .unwrap_err();
        assert!(matches!(err, QuarryError::DataAlreadySet("between")));

        // the first retrieval's data survives the failed calls
        assert_eq!(ids(&query.run()), vec![1]);
    }

    #[test]
    fn test_failed_retrieval_leaves_builder_unresolved() {
        let users = users();
        let mut query = users.query();
        let err = query
            .get(1, &LookupOptions::new().with_index("nope"))
            .unwrap_err();
        assert!(matches!(err, QuarryError::UnknownIndex(_)));
        // corrected retry works on the same builder
        let result = query.get(1, &LookupOptions::new()).unwrap().run();
        assert_eq!(ids(&result), vec![1]);
    }

    #[test]
    fn test_filter_runs_implicit_full_scan() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter(&json!({"where": {"age": {"==": 25}}}))
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![2, 5]);
    }

    #[test]
    fn test_filter_then_retrieval_is_a_state_error() {
        let users = users();
        let mut query = users.query();
        query.filter(&json!({})).unwrap();
        assert!(query.get(1, &LookupOptions::new()).is_err());
    }

    #[test]
    fn test_filter_applies_sort_skip_limit_in_order() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter(&json!({
                "orderBy": [["age", "ASC"], ["name", "ASC"]],
                "skip": 1,
                "limit": 2
            }))
            .unwrap()
            .run();
        // sorted: Bob(25), Eve(25), Alice(30), Carol(30), Dave(40)
        assert_eq!(ids(&result), vec![5, 1]);
    }

    #[test]
    fn test_filter_prefers_skip_over_offset() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter(&json!({"orderBy": "id", "skip": 4, "offset": 1}))
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![5]);
    }

    #[test]
    fn test_filter_skip_with_maximal_limit_clamps() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter(&json!({"skip": 1, "limit": u64::MAX}))
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_filter_non_numeric_skip_falls_back_to_numeric_offset() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter(&json!({"orderBy": "id", "skip": "x", "offset": 3}))
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![4, 5]);

        // with no numeric offset to fall back on, the type error stands
        let mut query = users.query();
        let err = query.filter(&json!({"skip": "x"})).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::InvalidType { op: "skip", actual: "string" }
        ));
    }

    #[test]
    fn test_filter_offset_alias() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter(&json!({"orderBy": "id", "offset": 3}))
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![4, 5]);
    }

    #[test]
    fn test_filter_rejects_non_object_query() {
        let users = users();
        let mut query = users.query();
        assert!(matches!(
            query.filter(&json!("age > 5")),
            Err(QuarryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_filter_with_predicate() {
        let users = users();
        let mut query = users.query();
        let result = query
            .filter_with(|record| record["age"].as_i64().unwrap_or(0) > 28)
            .run();
        assert_eq!(ids(&result), vec![1, 3, 4]);
    }

    #[test]
    fn test_skip_limit_chaining() {
        let users = users();
        let mut query = users.query();
        let result = query
            .get_data()
            .skip(2)
            .unwrap()
            .limit(2)
            .unwrap()
            .run();
        assert_eq!(ids(&result), vec![3, 4]);
    }

    #[test]
    fn test_skip_limit_type_errors_name_op_and_type() {
        let users = users();
        let mut query = users.query();

        let err = query.skip("two").unwrap_err();
        assert!(matches!(
            err,
            QuarryError::InvalidType { op: "skip", actual: "string" }
        ));

        let err = query.limit(json!(null)).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::InvalidType { op: "limit", actual: "null" }
        ));
    }

    #[test]
    fn test_skip_past_end_and_oversized_limit() {
        let users = users();
        let mut query = users.query();
        assert!(query.get_data().skip(10).unwrap().run().is_empty());

        let mut query = users.query();
        assert_eq!(query.get_data().limit(100).unwrap().run().len(), 5);
    }

    #[test]
    fn test_for_each_does_not_consume_data() {
        let users = users();
        let mut query = users.query();
        let mut seen = 0;
        let result = query.get_data().for_each(|_| seen += 1).run();
        assert_eq!(seen, 5);
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn test_map_replaces_data() {
        let users = users();
        let mut query = users.query();
        let result = query
            .get(1, &LookupOptions::new())
            .unwrap()
            .map(|record| json!({"label": record["name"]}))
            .run();
        assert_eq!(result, vec![json!({"label": "Alice"})]);
    }

    #[test]
    fn test_run_resets_and_builder_is_reusable() {
        let users = users();
        let mut query = users.query();

        query.get(1, &LookupOptions::new()).unwrap();
        assert_eq!(ids(&query.run()), vec![1]);

        // consecutive run on an unresolved builder: empty, not an error
        assert!(query.run().is_empty());

        // fresh retrieval cycle on the same instance
        let result = query.get(2, &LookupOptions::new()).unwrap().run();
        assert_eq!(ids(&result), vec![2]);
    }
}
