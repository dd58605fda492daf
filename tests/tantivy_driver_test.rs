//! End-to-end tests for the local tantivy driver.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use sagitta::condition::{Condition, ID_ALIAS};
use sagitta::document::Document;
use sagitta::driver::{Driver, QueryOptions, TantivyDriver};
use sagitta::query::QueryBuilder;

fn driver(dir: &TempDir) -> Arc<TantivyDriver> {
    Arc::new(TantivyDriver::new("products", dir.path()))
}

fn shoe_document() -> Document {
    Document::builder()
        .id("42")
        .field("title", "red shoes")
        .parameter("sku", "A1")
        .build()
}

#[test]
fn test_insert_then_query_by_id() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();

    let records = QueryBuilder::new(driver.clone())
        .condition(Condition::new(ID_ALIAS, "42"))
        .get();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "42");
    // Stored parameters come back decoded.
    assert_eq!(records[0].get("sku"), Some(&json!("A1")));
}

#[test]
fn test_search_matches_and_misses() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();

    let builder = QueryBuilder::new(driver.clone()).query_field("title", "shoes");
    let records = builder.get();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "42");
    assert_eq!(records[0].get("title"), Some(&json!("red shoes")));
    assert_eq!(records[0].get("sku"), Some(&json!("A1")));
    assert!(records[0].score.unwrap() > 0.0);

    let misses = QueryBuilder::new(driver.clone()).query_field("title", "boots");
    assert!(misses.get().is_empty());
    assert_eq!(misses.count(), 0);
}

#[test]
fn test_insert_replaces_existing_document() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();
    driver
        .insert(
            &Document::builder()
                .id("42")
                .field("title", "green boots")
                .build(),
        )
        .unwrap();

    let by_id = QueryBuilder::new(driver.clone()).condition(Condition::new(ID_ALIAS, "42"));
    let records = by_id.get();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("title"), Some(&json!("green boots")));

    // The old content is gone, not shadowed.
    let old = QueryBuilder::new(driver.clone()).query_field("title", "shoes");
    assert!(old.get().is_empty());
}

#[test]
fn test_delete_missing_id_returns_false_and_leaves_index() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();

    assert!(!driver.delete("no-such-id").unwrap());

    // The existing document is untouched.
    let records = QueryBuilder::new(driver.clone())
        .query_field("title", "shoes")
        .get();
    assert_eq!(records.len(), 1);

    // Deleting the real document works and reports it.
    assert!(driver.delete("42").unwrap());
    assert!(!driver.delete("42").unwrap());
}

#[test]
fn test_count_reuses_total_from_query() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();
    driver
        .insert(
            &Document::builder()
                .id("43")
                .field("title", "blue shoes")
                .build(),
        )
        .unwrap();

    let builder = QueryBuilder::new(driver.clone()).query_field("title", "shoes");

    let records = builder.get();
    assert_eq!(records.len(), 2);
    let searches_after_query = driver.search_executions();

    // The count is answered from the cache: no second engine search.
    assert_eq!(builder.count(), 2);
    assert_eq!(driver.search_executions(), searches_after_query);

    // An unseen query still goes to the engine.
    let other = QueryBuilder::new(driver.clone()).query_field("title", "boots");
    assert_eq!(other.count(), 0);
    assert_eq!(driver.search_executions(), searches_after_query + 1);
}

#[test]
fn test_required_and_prohibited_occurrences() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();
    driver
        .insert(
            &Document::builder()
                .id("43")
                .field("title", "blue shoes")
                .build(),
        )
        .unwrap();

    let records = QueryBuilder::new(driver.clone())
        .condition(Condition::new("title", "shoes").required())
        .condition(Condition::new("title", "red").prohibited())
        .get();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "43");

    // required + prohibited on the same condition resolves to NOT.
    let records = QueryBuilder::new(driver.clone())
        .condition(Condition::new("title", "shoes").required())
        .condition(Condition::new("title", "red").required().prohibited())
        .get();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "43");
}

#[test]
fn test_phrase_condition_requires_order() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();

    let in_order = QueryBuilder::new(driver.clone())
        .condition(Condition::new("title", "red shoes").phrase())
        .get();
    assert_eq!(in_order.len(), 1);

    let reversed = QueryBuilder::new(driver.clone())
        .condition(Condition::new("title", "shoes red").phrase())
        .get();
    assert!(reversed.is_empty());
}

#[test]
fn test_fuzzy_condition_tolerates_typos() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();

    // "shose" is one transposition away from "shoes".
    let records = QueryBuilder::new(driver.clone())
        .condition(Condition::new("title", "shose").fuzzy())
        .get();
    assert_eq!(records.len(), 1);

    // Without fuzziness the typo misses.
    let records = QueryBuilder::new(driver.clone())
        .query_field("title", "shose")
        .get();
    assert!(records.is_empty());
}

#[test]
fn test_all_fields_condition() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver
        .insert(
            &Document::builder()
                .id("1")
                .field("title", "red shoes")
                .field("body", "comfortable walking boots")
                .build(),
        )
        .unwrap();

    let records = QueryBuilder::new(driver.clone()).query("boots").get();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_pagination() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    for i in 0..5 {
        driver
            .insert(
                &Document::builder()
                    .id(format!("doc-{i}"))
                    .field("title", "striped shoes")
                    .build(),
            )
            .unwrap();
    }

    let builder = QueryBuilder::new(driver.clone()).query_field("title", "shoes");

    let (page, total) = builder.paginate(2, 2);
    assert_eq!(page.len(), 2);
    assert_eq!(total, 5);

    let (last_page, total) = builder.paginate(3, 2);
    assert_eq!(last_page.len(), 1);
    assert_eq!(total, 5);
}

#[test]
fn test_column_projection() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver
        .insert(
            &Document::builder()
                .id("1")
                .field("title", "red shoes")
                .field("body", "a body")
                .parameter("sku", "A1")
                .build(),
        )
        .unwrap();

    let records = QueryBuilder::new(driver.clone())
        .query_field("title", "shoes")
        .select(["title"])
        .get();

    assert_eq!(records[0].get("title"), Some(&json!("red shoes")));
    assert_eq!(records[0].get("body"), None);
    // Stored parameters survive projection.
    assert_eq!(records[0].get("sku"), Some(&json!("A1")));
}

#[test]
fn test_delete_index() {
    let dir = TempDir::new().unwrap();
    let driver = driver(&dir);

    driver.insert(&shoe_document()).unwrap();
    assert!(driver.delete_index().unwrap());

    // Gone means queries degrade to empty.
    let records = driver.run_query(&driver.new_query(), &QueryOptions::default());
    assert!(records.is_empty());
    assert!(!driver.delete_index().unwrap());
}
