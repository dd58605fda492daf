//! Elasticsearch driver.
//!
//! Talks to the Elasticsearch HTTP API and translates conditions into the
//! bool-query DSL: relevance matches become `multi_match` clauses under a
//! `must`/`should`/`must_not` occurrence, filter conditions become `term`
//! clauses in the filter context, and geo conditions become a
//! `geo_distance` filter against the reserved `_geoloc` mapping. A
//! condition on the id alias short-circuits into a document GET.

use std::sync::OnceLock;

use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::condition::{Condition, Occur};
use crate::document::{Document, PARAMETERS_FIELD, Record};
use crate::driver::total_cache::QueryTotalCache;
use crate::driver::{Driver, NativeQuery, QueryOptions};
use crate::error::{Result, SagittaError};

/// Mapped geo-point field used by geo-radius filters.
const GEO_FIELD: &str = "_geoloc";

/// Exact-prefix length required before fuzzy expansion kicks in.
const FUZZY_PREFIX_LENGTH: u64 = 2;

/// Driver for an Elasticsearch index.
#[derive(Debug)]
pub struct ElasticsearchDriver {
    name: String,
    hosts: Vec<String>,
    client: OnceLock<Client>,
    totals: QueryTotalCache,
}

impl ElasticsearchDriver {
    /// Create a driver bound to `name`, reachable through `hosts`.
    pub fn new<S: Into<String>>(name: S, hosts: Vec<String>) -> Self {
        ElasticsearchDriver {
            name: name.into(),
            hosts,
            client: OnceLock::new(),
            totals: QueryTotalCache::new(),
        }
    }

    fn client(&self) -> &Client {
        self.client.get_or_init(Client::new)
    }

    fn url(&self, path: &str) -> String {
        let host = self
            .hosts
            .first()
            .map(|h| h.trim_end_matches('/'))
            .unwrap_or("http://localhost:9200");
        format!("{host}/{path}")
    }

    fn get_document(&self, id: &str) -> Result<Option<Value>> {
        let response = self
            .client()
            .get(self.url(&format!("{}/_doc/{id}", self.name)))
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "document get returned {}",
                response.status()
            )));
        }

        Ok(Some(response.json()?))
    }

    fn search(&self, body: &Value) -> Result<Value> {
        let response = self
            .client()
            .post(self.url(&format!("{}/_search", self.name)))
            .json(body)
            .send()?;

        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "search returned {}",
                response.status()
            )));
        }

        Ok(response.json()?)
    }
}

/// Append a clause to one section of the bool query.
fn push_bool_clause(query: &mut NativeQuery, section: &str, clause: Value) {
    let bool_query = &mut query["query"]["bool"];
    if !bool_query[section].is_array() {
        bool_query[section] = json!([]);
    }
    if let Some(clauses) = bool_query[section].as_array_mut() {
        clauses.push(clause);
    }
}

/// Exact filter clause: numeric or term match, per field.
fn filter_clause(condition: &Condition) -> Value {
    let value: Value = match condition.value.parse::<f64>() {
        Ok(number) => json!(number),
        Err(_) => json!(condition.value),
    };

    match condition.field.names() {
        None => json!({
            "multi_match": {
                "query": condition.value,
                "fields": ["*"],
                "type": "phrase",
            }
        }),
        Some(names) if names.len() == 1 => json!({"term": {(names[0]): value}}),
        Some(names) => {
            let terms: Vec<Value> = names
                .iter()
                .map(|name| json!({"term": {(*name): value.clone()}}))
                .collect();
            json!({"bool": {"should": terms}})
        }
    }
}

/// Build the final request body from a threaded query plus options.
fn build_search_body(query: &NativeQuery, options: &QueryOptions) -> Value {
    let mut body = json!({"query": query["query"].clone()});
    body["from"] = json!(options.offset_or_default());
    body["size"] = json!(options.limit_or_default());

    if let Some(columns) = options.projection() {
        body["_source"] = json!(columns);
    }

    body
}

/// Total hit count from a search response; handles both the bare-integer
/// and `{"value": n}` forms of `hits.total`.
fn extract_total(response: &Value) -> u64 {
    let total = &response["hits"]["total"];
    total
        .as_u64()
        .or_else(|| total["value"].as_u64())
        .unwrap_or(0)
}

/// Normalize a search response into records plus the reported total.
fn normalize_search_response(response: &Value) -> (u64, Vec<Record>) {
    let total = extract_total(response);

    let records = response["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let id = hit["_id"].as_str()?;
                    let source = hit["_source"].as_object().cloned().unwrap_or_default();
                    Some(Record::from_source(id, hit["_score"].as_f64(), source))
                })
                .collect()
        })
        .unwrap_or_default();

    (total, records)
}

/// Normalize a document GET response into a record.
fn normalize_get_response(response: &Value) -> Option<Record> {
    let id = response["_id"].as_str()?;
    let source = response["_source"].as_object().cloned().unwrap_or_default();
    Some(Record::from_source(id, None, source))
}

impl Driver for ElasticsearchDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_index(&self, fields: &[String]) -> Result<bool> {
        let mut properties = json!({(GEO_FIELD): {"type": "geo_point"}});
        for field in fields {
            properties[field.as_str()] = json!({"type": "text"});
        }

        let response = self
            .client()
            .put(self.url(&self.name))
            .json(&json!({"mappings": {"properties": properties}}))
            .send()?;

        if response.status().is_success() {
            return Ok(true);
        }

        // Recreating an existing index is a no-op, not a failure.
        let body = response.text().unwrap_or_default();
        if body.contains("resource_already_exists_exception") {
            return Ok(true);
        }

        Err(SagittaError::backend(format!(
            "index creation failed: {body}"
        )))
    }

    fn new_query(&self) -> NativeQuery {
        json!({"query": {"bool": {}}})
    }

    fn add_condition_to_query(&self, mut query: NativeQuery, condition: &Condition) -> NativeQuery {
        if let Some(id) = condition.id_lookup() {
            query["id"] = json!(id);
            return query;
        }

        if let Some(geo) = &condition.geo {
            push_bool_clause(
                &mut query,
                "filter",
                json!({
                    "geo_distance": {
                        "distance": format!("{}m", geo.distance),
                        (GEO_FIELD): {"lat": geo.lat, "lon": geo.lon},
                    }
                }),
            );
            return query;
        }

        if condition.filter {
            push_bool_clause(&mut query, "filter", filter_clause(condition));
            return query;
        }

        let fields: Vec<&str> = condition
            .field
            .names()
            .unwrap_or_else(|| vec!["*"]);

        let definition = if let Some(fuzziness) = condition.fuzziness_factor() {
            json!({
                "query": condition.value,
                "fields": fields,
                "prefix_length": FUZZY_PREFIX_LENGTH,
                "fuzziness": fuzziness,
            })
        } else {
            json!({
                "query": condition.value,
                "fields": fields,
                "type": if condition.phrase { "phrase" } else { "best_fields" },
            })
        };

        let section = match condition.occur() {
            Occur::Must => "must",
            Occur::MustNot => "must_not",
            Occur::Should => "should",
        };
        push_bool_clause(&mut query, section, json!({"multi_match": definition}));

        query
    }

    fn run_query(&self, query: &NativeQuery, options: &QueryOptions) -> Vec<Record> {
        // Totals are keyed by the pre-pagination query so a later count
        // of the same logical query hits the cache.
        if let Some(id) = query["id"].as_str() {
            return match self.get_document(id) {
                Ok(Some(response)) => match normalize_get_response(&response) {
                    Some(record) => {
                        self.totals.store(query, 1);
                        vec![record]
                    }
                    None => {
                        self.totals.store(query, 0);
                        Vec::new()
                    }
                },
                Ok(None) => {
                    self.totals.store(query, 0);
                    Vec::new()
                }
                Err(e) => {
                    warn!("elasticsearch get failed on index {}: {e}", self.name);
                    Vec::new()
                }
            };
        }

        let body = build_search_body(query, options);
        match self.search(&body) {
            Ok(response) => {
                let (total, records) = normalize_search_response(&response);
                self.totals.store(query, total);
                records
            }
            Err(e) => {
                warn!("elasticsearch query failed on index {}: {e}", self.name);
                Vec::new()
            }
        }
    }

    fn run_count(&self, query: &NativeQuery) -> u64 {
        if let Some(total) = self.totals.get(query) {
            return total;
        }

        if let Some(id) = query["id"].as_str() {
            let total = match self.get_document(id) {
                Ok(Some(_)) => 1,
                Ok(None) => 0,
                Err(e) => {
                    warn!("elasticsearch count failed on index {}: {e}", self.name);
                    return 0;
                }
            };
            self.totals.store(query, total);
            return total;
        }

        let mut body = json!({"query": query["query"].clone()});
        body["size"] = json!(0);

        match self.search(&body) {
            Ok(response) => {
                let total = extract_total(&response);
                self.totals.store(query, total);
                total
            }
            Err(e) => {
                warn!("elasticsearch count failed on index {}: {e}", self.name);
                0
            }
        }
    }

    fn insert(&self, document: &Document) -> Result<bool> {
        let mut fields = document.fields.clone();
        if let Some(blob) = document.encoded_parameters() {
            fields.insert(PARAMETERS_FIELD.to_string(), json!(blob));
        }

        // PUT on _doc replaces any existing document with this id.
        let response = self
            .client()
            .put(self.url(&format!("{}/_doc/{}", self.name, document.id)))
            .json(&Value::Object(fields))
            .send()?;

        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "insert returned {}",
                response.status()
            )));
        }

        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let response = self
            .client()
            .delete(self.url(&format!("{}/_doc/{id}", self.name)))
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "delete returned {}",
                response.status()
            )));
        }

        Ok(true)
    }

    fn delete_index(&self) -> Result<bool> {
        let response = self.client().delete(self.url(&self.name)).send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "index deletion returned {}",
                response.status()
            )));
        }

        Ok(true)
    }
}
