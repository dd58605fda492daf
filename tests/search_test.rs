//! End-to-end tests for the search façade over the local driver.

use serde_json::json;
use tempfile::TempDir;

use sagitta::config::{Connection, SearchConfig};
use sagitta::document::Document;
use sagitta::search::Search;

fn local_search(dir: &TempDir) -> Search {
    let mut config = SearchConfig::default();
    config.default_index = "products".to_string();
    config.connections.insert(
        "tantivy".to_string(),
        Connection::Tantivy {
            path: dir.path().to_path_buf(),
        },
    );
    Search::new(config)
}

#[test]
fn test_insert_query_delete_roundtrip() {
    let dir = TempDir::new().unwrap();
    let search = local_search(&dir);

    search
        .insert(
            &Document::builder()
                .id("42")
                .field("title", "red shoes")
                .parameter("sku", "A1")
                .build(),
        )
        .unwrap();

    // A hit carries the indexed fields with decoded parameters merged in...
    let records = search.query().unwrap().query_field("title", "shoes").get();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "42");
    assert_eq!(records[0].get("title"), Some(&json!("red shoes")));
    assert_eq!(records[0].get("sku"), Some(&json!("A1")));
    assert!(records[0].score.unwrap() > 0.0);

    // ...and a miss with count zero.
    let misses = search.query().unwrap().query_field("title", "boots");
    assert!(misses.get().is_empty());
    assert_eq!(misses.count(), 0);

    assert!(search.delete("42").unwrap());
    assert!(!search.delete("42").unwrap());
}

#[test]
fn test_indexes_are_isolated() {
    let dir = TempDir::new().unwrap();
    let search = local_search(&dir);

    search
        .insert_into(
            "catalog",
            &Document::builder().id("1").field("title", "shoes").build(),
        )
        .unwrap();
    search
        .insert_into(
            "archive",
            &Document::builder().id("2").field("title", "boots").build(),
        )
        .unwrap();

    let catalog = search
        .query_index("catalog")
        .unwrap()
        .query_field("title", "shoes")
        .get();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].id, "1");

    let archive = search
        .query_index("archive")
        .unwrap()
        .query_field("title", "shoes")
        .get();
    assert!(archive.is_empty());
}

#[test]
fn test_paginate_reports_cached_total() {
    let dir = TempDir::new().unwrap();
    let search = local_search(&dir);

    for i in 0..3 {
        search
            .insert(
                &Document::builder()
                    .id(format!("doc-{i}"))
                    .field("title", "striped shoes")
                    .build(),
            )
            .unwrap();
    }

    let (records, total) = search
        .query()
        .unwrap()
        .query_field("title", "shoes")
        .paginate(1, 2);

    assert_eq!(records.len(), 2);
    assert_eq!(total, 3);
}

#[test]
fn test_create_and_clear_index() {
    let dir = TempDir::new().unwrap();
    let search = local_search(&dir);

    assert!(
        search
            .create_index("catalog", &["title".to_string()])
            .unwrap()
    );
    assert!(search.delete_index("catalog").unwrap());
    assert!(!search.delete_index("catalog").unwrap());
}
