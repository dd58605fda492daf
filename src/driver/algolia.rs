//! Algolia driver.
//!
//! Talks to the Algolia REST API. Algolia does its own relevance and typo
//! tolerance, so text conditions fold their values into the search terms
//! (with `restrictSearchableAttributes` honoring field restrictions),
//! filter conditions become `numericFilters`/`facetFilters`, and geo
//! conditions become `aroundLatLng` + `aroundRadius`. The id alias is
//! rewritten to Algolia's native `objectID` attribute.

use std::sync::OnceLock;

use log::warn;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Value, json};

use crate::condition::Condition;
use crate::document::{Document, PARAMETERS_FIELD, Record};
use crate::driver::total_cache::QueryTotalCache;
use crate::driver::{Driver, NativeQuery, QueryOptions};
use crate::error::{Result, SagittaError};

/// Algolia's native identifier attribute.
const OBJECT_ID: &str = "objectID";

/// Driver for an Algolia index.
#[derive(Debug)]
pub struct AlgoliaDriver {
    name: String,
    application_id: String,
    api_key: String,
    client: OnceLock<Client>,
    totals: QueryTotalCache,
}

impl AlgoliaDriver {
    /// Create a driver bound to `name` under the given application.
    pub fn new<S: Into<String>>(name: S, application_id: String, api_key: String) -> Self {
        AlgoliaDriver {
            name: name.into(),
            application_id,
            api_key,
            client: OnceLock::new(),
            totals: QueryTotalCache::new(),
        }
    }

    fn client(&self) -> &Client {
        self.client.get_or_init(Client::new)
    }

    /// Query host; reads go through the DSN endpoint.
    fn read_url(&self, path: &str) -> String {
        format!(
            "https://{}-dsn.algolia.net/1/indexes/{}{path}",
            self.application_id, self.name
        )
    }

    fn write_url(&self, path: &str) -> String {
        format!(
            "https://{}.algolia.net/1/indexes/{}{path}",
            self.application_id, self.name
        )
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Algolia-Application-Id", &self.application_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }

    fn search(&self, body: &Value) -> Result<Value> {
        let request = self.client().post(self.read_url("/query")).json(body);
        let response = self.authenticated(request).send()?;

        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "search returned {}",
                response.status()
            )));
        }

        Ok(response.json()?)
    }
}

/// Rewrite the id alias to Algolia's native identifier attribute.
fn rewrite_field(name: &str) -> &str {
    if name == crate::condition::ID_ALIAS {
        OBJECT_ID
    } else {
        name
    }
}

fn push_param(query: &mut NativeQuery, param: &str, value: Value) {
    let list = &mut query["params"][param];
    if !list.is_array() {
        *list = json!([]);
    }
    if let Some(entries) = list.as_array_mut() {
        entries.push(value);
    }
}

/// Fold pagination into the request body.
///
/// Algolia paginates by page number, not raw offset; the page is computed
/// from the requested offset and page size.
fn apply_pagination(body: &mut Value, options: &QueryOptions) {
    let limit = options.limit_or_default().max(1);
    body["page"] = json!(options.offset_or_default() / limit);
    body["hitsPerPage"] = json!(options.limit_or_default());
}

/// Collapse a threaded query into the final request body.
fn build_request_body(query: &NativeQuery) -> Value {
    let mut body = query["params"].clone();
    if !body.is_object() {
        body = json!({});
    }

    body["query"] = json!(query["terms"].as_str().unwrap_or("").trim());

    // Numeric filters are sent as one comma-joined conjunction.
    if let Some(filters) = body["numericFilters"].as_array() {
        let joined = filters
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(",");
        body["numericFilters"] = json!(joined);
    }

    body
}

/// Normalize a search response into records plus the reported total.
///
/// Algolia does not expose a relevance score; hits are normalized with a
/// constant score of 1.
fn normalize_search_response(response: &Value) -> (u64, Vec<Record>) {
    let total = response["nbHits"].as_u64().unwrap_or(0);

    let records = response["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let mut fields = hit.as_object().cloned()?;
                    let id = match fields.remove(OBJECT_ID)? {
                        Value::String(id) => id,
                        other => other.to_string(),
                    };
                    Some(Record::from_source(id, Some(1.0), fields))
                })
                .collect()
        })
        .unwrap_or_default();

    (total, records)
}

impl Driver for AlgoliaDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_index(&self, _fields: &[String]) -> Result<bool> {
        // Algolia is schemaless; indexes materialize on first write.
        Ok(true)
    }

    fn new_query(&self) -> NativeQuery {
        json!({
            "terms": "",
            "params": {"facets": "*"},
        })
    }

    fn add_condition_to_query(&self, mut query: NativeQuery, condition: &Condition) -> NativeQuery {
        if let Some(geo) = &condition.geo {
            query["params"]["aroundLatLng"] = json!(format!("{},{}", geo.lat, geo.lon));
            query["params"]["aroundRadius"] = json!(geo.distance);
            return query;
        }

        let names: Vec<&str> = condition
            .field
            .names()
            .map(|names| names.into_iter().map(rewrite_field).collect())
            .unwrap_or_default();

        if condition.filter {
            let field = names.first().copied().unwrap_or("*");
            if condition.value.parse::<f64>().is_ok() {
                push_param(
                    &mut query,
                    "numericFilters",
                    json!(format!("{field}={}", condition.value)),
                );
            } else {
                push_param(
                    &mut query,
                    "facetFilters",
                    json!(format!("{field}:{}", condition.value)),
                );
            }
            return query;
        }

        // Relevance match: Algolia applies its own ranking and typo
        // tolerance, so occurrence and fuzziness flags are not forwarded.
        let terms = query["terms"].as_str().unwrap_or("").to_string();
        query["terms"] = json!(format!("{terms} {}", condition.value));

        if !names.is_empty() {
            query["params"]["restrictSearchableAttributes"] = json!(names.join(","));
        }

        query
    }

    fn run_query(&self, query: &NativeQuery, options: &QueryOptions) -> Vec<Record> {
        let mut body = build_request_body(query);
        apply_pagination(&mut body, options);

        match self.search(&body) {
            Ok(response) => {
                let (total, records) = normalize_search_response(&response);
                // Keyed by the pre-pagination query.
                self.totals.store(query, total);
                records
            }
            Err(e) => {
                warn!("algolia query failed on index {}: {e}", self.name);
                Vec::new()
            }
        }
    }

    fn run_count(&self, query: &NativeQuery) -> u64 {
        if let Some(total) = self.totals.get(query) {
            return total;
        }

        let mut body = build_request_body(query);
        // Only the total is needed.
        body["hitsPerPage"] = json!(0);

        match self.search(&body) {
            Ok(response) => {
                let total = response["nbHits"].as_u64().unwrap_or(0);
                self.totals.store(query, total);
                total
            }
            Err(e) => {
                warn!("algolia count failed on index {}: {e}", self.name);
                0
            }
        }
    }

    fn insert(&self, document: &Document) -> Result<bool> {
        let mut fields = document.fields.clone();
        if let Some(blob) = document.encoded_parameters() {
            fields.insert(PARAMETERS_FIELD.to_string(), json!(blob));
        }
        fields.insert(OBJECT_ID.to_string(), json!(document.id));

        // PUT on the object id replaces any existing object.
        let request = self
            .client()
            .put(self.write_url(&format!("/{}", document.id)))
            .json(&Value::Object(fields));
        let response = self.authenticated(request).send()?;

        if !response.status().is_success() {
            return Err(SagittaError::backend(format!(
                "insert returned {}",
                response.status()
            )));
        }

        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let request = self.client().delete(self.write_url(&format!("/{id}")));

        match self.authenticated(request).send() {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                warn!(
                    "algolia delete of {id} on index {} returned {}",
                    self.name,
                    response.status()
                );
                Ok(false)
            }
            Err(e) => {
                warn!("algolia delete of {id} on index {} failed: {e}", self.name);
                Ok(false)
            }
        }
    }

    fn delete_index(&self) -> Result<bool> {
        let request = self.client().post(self.write_url("/clear"));

        match self.authenticated(request).send() {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                warn!(
                    "algolia clear of index {} returned {}",
                    self.name,
                    response.status()
                );
                Ok(false)
            }
            Err(e) => {
                warn!("algolia clear of index {} failed: {e}", self.name);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ID_ALIAS;

    fn driver() -> AlgoliaDriver {
        AlgoliaDriver::new("products", "APP123".to_string(), "secret".to_string())
    }

    fn add(driver: &AlgoliaDriver, condition: Condition) -> NativeQuery {
        driver.add_condition_to_query(driver.new_query(), &condition)
    }

    #[test]
    fn test_terms_accumulate_in_order() {
        let driver = driver();
        let query = driver.new_query();
        let query = driver.add_condition_to_query(query, &Condition::all("red"));
        let query = driver.add_condition_to_query(query, &Condition::all("shoes"));

        assert_eq!(query["terms"], " red shoes");

        let body = build_request_body(&query);
        assert_eq!(body["query"], "red shoes");
    }

    #[test]
    fn test_field_restriction() {
        let query = add(&driver(), Condition::new("title", "shoes"));
        assert_eq!(query["params"]["restrictSearchableAttributes"], "title");

        let query = add(&driver(), Condition::all("shoes"));
        assert!(query["params"]["restrictSearchableAttributes"].is_null());
    }

    #[test]
    fn test_id_alias_rewritten_to_object_id() {
        let query = add(&driver(), Condition::new(ID_ALIAS, "42").filter());
        assert_eq!(query["params"]["numericFilters"][0], "objectID=42");
    }

    #[test]
    fn test_filter_numeric_vs_facet() {
        let query = add(&driver(), Condition::new("price", "42").filter());
        assert_eq!(query["params"]["numericFilters"][0], "price=42");

        let query = add(&driver(), Condition::new("color", "red").filter());
        assert_eq!(query["params"]["facetFilters"][0], "color:red");
    }

    #[test]
    fn test_numeric_filters_join_into_conjunction() {
        let driver = driver();
        let query = driver.new_query();
        let query = driver.add_condition_to_query(query, &Condition::new("price", "42").filter());
        let query = driver.add_condition_to_query(query, &Condition::new("stock", "1").filter());

        let body = build_request_body(&query);
        assert_eq!(body["numericFilters"], "price=42,stock=1");
    }

    #[test]
    fn test_geo_condition() {
        let query = add(&driver(), Condition::near(51.5, -0.12, 500.0));
        assert_eq!(query["params"]["aroundLatLng"], "51.5,-0.12");
        assert_eq!(query["params"]["aroundRadius"], 500.0);
        assert_eq!(query["terms"], "");
    }

    #[test]
    fn test_pagination_is_page_based() {
        let mut body = json!({});
        apply_pagination(
            &mut body,
            &QueryOptions {
                limit: Some(20),
                offset: Some(40),
                columns: None,
            },
        );

        assert_eq!(body["page"], 2);
        assert_eq!(body["hitsPerPage"], 20);
    }

    #[test]
    fn test_normalize_search_response() {
        let response = json!({
            "nbHits": 2,
            "hits": [
                {"objectID": "42", "title": "red shoes"},
                {"objectID": 7, "title": "boots"},
            ],
        });

        let (total, records) = normalize_search_response(&response);
        assert_eq!(total, 2);
        assert_eq!(records[0].id, "42");
        assert_eq!(records[0].score, Some(1.0));
        assert_eq!(records[0].get("title"), Some(&json!("red shoes")));
        assert_eq!(records[1].id, "7");
    }
}
