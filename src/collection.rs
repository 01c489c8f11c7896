// src/collection.rs
// A named record set with one primary index and any number of named
// secondary indexes. The query engine reads it through `query()`; the
// only write surface is population (`insert`), which feeds every index
// so queries always run against a consistent snapshot.

use crate::error::{QuarryError, Result};
use crate::index::Index;
use crate::log_debug;
use crate::query::Query;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    primary: Index,
    indexes: HashMap<String, Index>,
}

impl Collection {
    /// Create a collection keyed by the given primary field path
    pub fn new(name: impl Into<String>, primary_field: impl Into<String>) -> Self {
        let name = name.into();
        let primary = Index::new(format!("{}_primary", name), vec![primary_field.into()]);
        Collection {
            name,
            primary,
            indexes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Register a secondary index over the given field paths.
    /// Records already inserted are indexed retroactively.
    pub fn create_index(&mut self, name: impl Into<String>, fields: Vec<String>) -> &mut Self {
        let name = name.into();
        let mut index = Index::new(name.clone(), fields);
        for record in self.primary.get_all() {
            index.insert(record);
        }
        log_debug!(
            "collection {}: created index {} over {:?}",
            self.name,
            name,
            index.fields()
        );
        self.indexes.insert(name, index);
        self
    }

    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    /// Add a record to the primary index and every secondary index
    pub fn insert(&mut self, record: Value) -> &mut Self {
        for index in self.indexes.values_mut() {
            index.insert(record.clone());
        }
        self.primary.insert(record);
        self
    }

    /// The primary index
    pub fn primary_index(&self) -> &Index {
        &self.primary
    }

    /// Index selection for retrieval operations: `None` means the primary
    /// index, a name selects a secondary index or errors if absent.
    pub(crate) fn index_for(&self, name: Option<&str>) -> Result<&Index> {
        match name {
            None => Ok(&self.primary),
            Some(name) => self
                .indexes
                .get(name)
                .ok_or_else(|| QuarryError::UnknownIndex(name.to_string())),
        }
    }

    /// Start a query against this collection's snapshot
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }
}
