//! Error types for the Sagitta library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`SagittaError`] enum. Read-path search operations deliberately do not
//! surface errors at all (see the driver contract); everything else maps
//! into one of the variants below.
//!
//! # Examples
//!
//! ```
//! use sagitta::error::{Result, SagittaError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SagittaError::config("missing connection"))
//! }
//!
//! assert!(example_operation().is_err());
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Sagitta operations.
#[derive(Error, Debug)]
pub enum SagittaError {
    /// I/O errors (index directories, config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors (unknown connection, bad config file).
    #[error("Config error: {0}")]
    Config(String),

    /// Index-related errors (missing index, schema problems).
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors (malformed conditions, bad pagination).
    #[error("Query error: {0}")]
    Query(String),

    /// Backend errors reported by a remote search service.
    #[error("Backend error: {0}")]
    Backend(String),

    /// HTTP transport errors from the backend client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Errors from the embedded full-text engine.
    #[error("Engine error: {0}")]
    Engine(#[from] tantivy::TantivyError),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SagittaError.
pub type Result<T> = std::result::Result<T, SagittaError>;

impl SagittaError {
    /// Create a new config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SagittaError::Config(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SagittaError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SagittaError::Query(msg.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        SagittaError::Backend(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SagittaError::Other(msg.into())
    }
}
