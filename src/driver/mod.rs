//! The driver abstraction: one trait every search backend implements.
//!
//! A [`Driver`] instance is bound to a single named index on a single
//! backend. Queries are built incrementally: [`Driver::new_query`] yields
//! an empty driver-native query value, conditions are folded in through
//! [`Driver::add_condition_to_query`], and the final value is executed
//! with [`Driver::run_query`] or [`Driver::run_count`].
//!
//! Native queries are carried uniformly as [`serde_json::Value`]; each
//! driver defines its own internal shape. Values are deep-copiable and
//! comparable, and (because `serde_json` maps keep sorted key order)
//! serialize deterministically, which the count cache relies on.

pub mod algolia;
pub mod elasticsearch;
pub mod tantivy;
pub mod total_cache;

use std::fmt::Debug;

use crate::condition::Condition;
use crate::document::{Document, Record};
use crate::error::Result;

pub use self::algolia::AlgoliaDriver;
pub use self::elasticsearch::ElasticsearchDriver;
pub use self::tantivy::TantivyDriver;
pub use self::total_cache::{QueryTotalCache, fingerprint};

/// Driver-native query representation, built incrementally from conditions.
pub type NativeQuery = serde_json::Value;

/// Number of records returned when a caller requests no explicit page.
pub const DEFAULT_LIMIT: usize = 10;

/// Pagination and projection options for a query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Number of records to skip.
    pub offset: Option<usize>,
    /// Fields to return; `None` or a `"*"` entry means all fields.
    pub columns: Option<Vec<String>>,
}

impl QueryOptions {
    /// Effective limit, falling back to [`DEFAULT_LIMIT`].
    pub fn limit_or_default(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Effective offset, defaulting to the start.
    pub fn offset_or_default(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// The explicit column projection, if one applies.
    pub fn projection(&self) -> Option<&[String]> {
        match &self.columns {
            Some(columns) if !columns.iter().any(|c| c == "*") => Some(columns.as_slice()),
            _ => None,
        }
    }
}

/// The capability set every search backend adapter implements.
///
/// Read-path operations (`run_query`, `run_count`) are best-effort and
/// never fail: missing indexes and transport errors degrade to an empty
/// result or zero, with a warning logged. Write-path operations return
/// `Result` and propagate transport failures; their `bool` payload is a
/// best-effort signal, not a guarantee.
pub trait Driver: Send + Sync + Debug {
    /// The index name this driver instance is bound to.
    fn name(&self) -> &str;

    /// Provision backend-side schema for the index.
    ///
    /// Idempotent; a no-op on backends that need no explicit schema.
    fn create_index(&self, fields: &[String]) -> Result<bool>;

    /// Return an empty driver-native query skeleton.
    fn new_query(&self) -> NativeQuery;

    /// Fold one condition into the query, returning the updated query.
    ///
    /// Pure: never touches the backend client, and the same condition
    /// sequence always produces the same final query.
    fn add_condition_to_query(&self, query: NativeQuery, condition: &Condition) -> NativeQuery;

    /// Execute the query and return normalized records.
    fn run_query(&self, query: &NativeQuery, options: &QueryOptions) -> Vec<Record>;

    /// Total number of matching records.
    ///
    /// Reuses a total cached by an earlier `run_query`/`run_count` on an
    /// equivalent query instead of re-querying the backend.
    fn run_count(&self, query: &NativeQuery) -> u64;

    /// Add a document to the index, replacing any existing document with
    /// the same id.
    fn insert(&self, document: &Document) -> Result<bool>;

    /// Delete the document with the given id.
    ///
    /// Returns `Ok(false)` when no such document exists.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Delete the entire index.
    ///
    /// Returns `Ok(false)` when the index does not exist.
    fn delete_index(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_options_defaults() {
        let options = QueryOptions::default();
        assert_eq!(options.limit_or_default(), DEFAULT_LIMIT);
        assert_eq!(options.offset_or_default(), 0);
        assert_eq!(options.projection(), None);
    }

    #[test]
    fn test_projection_star_means_everything() {
        let options = QueryOptions {
            columns: Some(vec!["*".to_string()]),
            ..QueryOptions::default()
        };
        assert_eq!(options.projection(), None);

        let options = QueryOptions {
            columns: Some(vec!["title".to_string(), "body".to_string()]),
            ..QueryOptions::default()
        };
        assert_eq!(
            options.projection(),
            Some(&["title".to_string(), "body".to_string()][..])
        );
    }
}
