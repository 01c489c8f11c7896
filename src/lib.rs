// src/lib.rs
// quarry - in-memory indexed record store, query-evaluation core
//
// Records are serde_json objects. A Collection owns a primary index and
// any number of named secondary indexes; a Query borrows the collection
// and evaluates range scans, composite-key lookups, predicate filters,
// multi-key sorts and pagination over the indexed snapshot. Read-only:
// the only write surface is index population.

pub mod collection;
pub mod error;
pub mod index;
pub mod key;
pub mod logging;
pub mod order;
pub mod query;
pub mod value_utils;

// Public exports
pub use collection::Collection;
pub use error::{QuarryError, Result};
pub use index::{Bounds, Index};
pub use key::{IndexKey, OrderedFloat};
pub use logging::{get_log_level, set_log_level, LogLevel};
pub use order::Direction;
pub use query::{BetweenOptions, LookupOptions, Query};
