// src/error.rs
// Crate-wide error type and Result alias

use thiserror::Error;

/// Errors raised by the query-evaluation core
#[derive(Error, Debug)]
pub enum QuarryError {
    /// A retrieval operation ran on a builder whose data is already set.
    /// The builder state is left untouched; call `run()` or start a new
    /// `Query` before retrieving again.
    #[error("Cannot call {0}() after a retrieval operation: data is already set")]
    DataAlreadySet(&'static str),

    /// skip/limit received a non-numeric argument
    #[error("{op}() requires a numeric argument, got {actual}")]
    InvalidType {
        op: &'static str,
        actual: &'static str,
    },

    /// A retrieval named a secondary index the collection does not have
    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    /// Malformed structured query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

pub type Result<T> = std::result::Result<T, QuarryError>;
