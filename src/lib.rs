//! # Sagitta
//!
//! A backend-agnostic search abstraction layer for Rust.
//!
//! Application code issues generic structured conditions against a named
//! index; Sagitta translates them into the native query dialect of one of
//! several interchangeable backends, executes the query, and returns a
//! normalized result set plus an efficient count.
//!
//! ## Features
//!
//! - One condition model for every backend
//! - Interchangeable drivers: Elasticsearch, Algolia, local tantivy index
//! - Lazy query building with preserved condition order
//! - Per-query count caching (no second round-trip for totals)
//! - Opaque stored parameters carried alongside indexed fields
//!
//! ## Quickstart
//!
//! ```no_run
//! use sagitta::config::SearchConfig;
//! use sagitta::document::Document;
//! use sagitta::search::Search;
//!
//! # fn example() -> sagitta::error::Result<()> {
//! let search = Search::new(SearchConfig::default());
//!
//! search.insert(
//!     &Document::builder()
//!         .id("42")
//!         .field("title", "red shoes")
//!         .parameter("sku", "A1")
//!         .build(),
//! )?;
//!
//! let records = search.query()?.query_field("title", "shoes").get();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod condition;
pub mod config;
pub mod document;
pub mod driver;
pub mod error;
pub mod query;
pub mod search;

// Re-exports for the public API
pub use condition::{Condition, FieldSelector, Fuzziness, GeoRadius, Occur};
pub use config::{Connection, SearchConfig};
pub use document::{Document, Record};
pub use driver::{
    AlgoliaDriver, Driver, ElasticsearchDriver, NativeQuery, QueryOptions, TantivyDriver,
};
pub use error::{Result, SagittaError};
pub use query::QueryBuilder;
pub use search::Search;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
