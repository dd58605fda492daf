//! Search configuration: which driver is active and how to reach it.
//!
//! Configuration is read once; the [`Search`](crate::search::Search)
//! façade resolves drivers from it at most once per index name.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named, configured backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum Connection {
    /// Local on-disk tantivy indexes rooted at `path`.
    Tantivy {
        /// Directory holding one index per subdirectory.
        path: PathBuf,
    },
    /// An Elasticsearch cluster.
    Elasticsearch {
        /// Host URLs, e.g. `http://localhost:9200`.
        hosts: Vec<String>,
    },
    /// An Algolia application.
    Algolia {
        /// Application id.
        application_id: String,
        /// Admin API key.
        admin_api_key: String,
    },
}

/// Top-level search configuration.
///
/// # Examples
///
/// ```
/// use sagitta::config::SearchConfig;
///
/// let config = SearchConfig::from_json(r#"{
///     "default": "elasticsearch",
///     "default_index": "products",
///     "connections": {
///         "elasticsearch": {"driver": "elasticsearch", "hosts": ["http://localhost:9200"]}
///     }
/// }"#).unwrap();
/// assert_eq!(config.default, "elasticsearch");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Name of the connection used when none is specified.
    pub default: String,
    /// Index used when an index is not specified.
    pub default_index: String,
    /// Connection parameters by name.
    pub connections: HashMap<String, Connection>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let mut connections = HashMap::new();
        connections.insert(
            "tantivy".to_string(),
            Connection::Tantivy {
                path: PathBuf::from("./search"),
            },
        );
        connections.insert(
            "elasticsearch".to_string(),
            Connection::Elasticsearch {
                hosts: vec!["http://localhost:9200".to_string()],
            },
        );
        connections.insert(
            "algolia".to_string(),
            Connection::Algolia {
                application_id: String::new(),
                admin_api_key: String::new(),
            },
        );

        SearchConfig {
            default: "tantivy".to_string(),
            default_index: "default".to_string(),
            connections,
        }
    }
}

impl SearchConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a connection by name.
    pub fn connection(&self, name: &str) -> Option<&Connection> {
        self.connections.get(name)
    }

    /// The connection selected by `default`.
    pub fn default_connection(&self) -> Option<&Connection> {
        self.connection(&self.default)
    }
}
