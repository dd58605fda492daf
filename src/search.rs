//! The search façade: configured driver resolution plus the day-to-day
//! insert / delete / query operations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Connection, SearchConfig};
use crate::document::Document;
use crate::driver::{AlgoliaDriver, Driver, ElasticsearchDriver, TantivyDriver};
use crate::error::{Result, SagittaError};
use crate::query::QueryBuilder;

/// Entry point over the configured backend.
///
/// Holds the configuration and resolves one driver per index name,
/// lazily, caching the instance so repeated calls never re-resolve
/// configuration or rebuild backend clients.
///
/// # Examples
///
/// ```no_run
/// use sagitta::config::SearchConfig;
/// use sagitta::document::Document;
/// use sagitta::search::Search;
///
/// # fn example() -> sagitta::error::Result<()> {
/// let search = Search::new(SearchConfig::default());
/// search.insert(&Document::builder().id("42").field("title", "red shoes").build())?;
/// let records = search.query()?.query_field("title", "shoes").get();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Search {
    config: SearchConfig,
    drivers: Mutex<HashMap<String, Arc<dyn Driver>>>,
}

impl Search {
    /// Create a façade over the given configuration.
    pub fn new(config: SearchConfig) -> Self {
        Search {
            config,
            drivers: Mutex::new(HashMap::new()),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The driver bound to the given index, resolved at most once.
    pub fn index(&self, name: &str) -> Result<Arc<dyn Driver>> {
        if let Some(driver) = self.drivers.lock().get(name) {
            return Ok(driver.clone());
        }

        let driver = self.connect(name)?;
        self.drivers
            .lock()
            .insert(name.to_string(), driver.clone());
        Ok(driver)
    }

    /// The driver bound to the configured default index.
    pub fn default_index(&self) -> Result<Arc<dyn Driver>> {
        self.index(self.config.default_index.as_str())
    }

    fn connect(&self, index: &str) -> Result<Arc<dyn Driver>> {
        let connection = self.config.default_connection().ok_or_else(|| {
            SagittaError::config(format!("unknown connection {}", self.config.default))
        })?;

        Ok(match connection {
            Connection::Tantivy { path } => Arc::new(TantivyDriver::new(index, path.clone())),
            Connection::Elasticsearch { hosts } => {
                Arc::new(ElasticsearchDriver::new(index, hosts.clone()))
            }
            Connection::Algolia {
                application_id,
                admin_api_key,
            } => Arc::new(AlgoliaDriver::new(
                index,
                application_id.clone(),
                admin_api_key.clone(),
            )),
        })
    }

    /// Insert a document into the default index.
    pub fn insert(&self, document: &Document) -> Result<bool> {
        self.default_index()?.insert(document)
    }

    /// Insert a document into a specific index.
    pub fn insert_into(&self, index: &str, document: &Document) -> Result<bool> {
        self.index(index)?.insert(document)
    }

    /// Delete a document from the default index.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.default_index()?.delete(id)
    }

    /// Delete a document from a specific index.
    pub fn delete_from(&self, index: &str, id: &str) -> Result<bool> {
        self.index(index)?.delete(id)
    }

    /// Start a query against the default index.
    pub fn query(&self) -> Result<QueryBuilder> {
        Ok(QueryBuilder::new(self.default_index()?))
    }

    /// Start a query against a specific index.
    pub fn query_index(&self, index: &str) -> Result<QueryBuilder> {
        Ok(QueryBuilder::new(self.index(index)?))
    }

    /// Provision backend-side schema for an index.
    pub fn create_index(&self, index: &str, fields: &[String]) -> Result<bool> {
        self.index(index)?.create_index(fields)
    }

    /// Delete an entire index.
    pub fn delete_index(&self, index: &str) -> Result<bool> {
        self.index(index)?.delete_index()
    }
}
