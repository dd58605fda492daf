//! Local full-text driver backed by the embedded tantivy engine.
//!
//! Fills the local-store role: no server, just an index directory under
//! the configured path. Conditions are translated into a small clause
//! list carried in the native query value and interpreted into tantivy
//! queries at execution time, which keeps `add_condition_to_query` pure
//! and the query value fingerprintable like every other driver's.
//!
//! The record identifier is indexed raw (untokenized) under the
//! [`ID_ALIAS`] field name, so an id condition is a direct term lookup.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serde_json::{Map, Value, json};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, FuzzyTermQuery, Occur as TantivyOccur, PhraseQuery,
    Query as TantivyQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption, STORED, STRING, Schema, TEXT, Value as _};
use tantivy::tokenizer::TokenStream as _;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::condition::{Condition, ID_ALIAS, Occur};
use crate::document::{Document, PARAMETERS_FIELD, Record};
use crate::driver::total_cache::QueryTotalCache;
use crate::driver::{Driver, NativeQuery, QueryOptions};
use crate::error::{Result, SagittaError};

/// Heap budget for the tantivy index writer.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Lazily opened engine handles, shared across calls on one driver.
struct IndexState {
    index: Index,
    reader: IndexReader,
    writer: IndexWriter,
}

/// Driver for a local on-disk tantivy index.
pub struct TantivyDriver {
    name: String,
    path: PathBuf,
    state: Mutex<Option<IndexState>>,
    totals: QueryTotalCache,
    searches: AtomicU64,
}

impl fmt::Debug for TantivyDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TantivyDriver")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl TantivyDriver {
    /// Create a driver for index `name` stored under `path`.
    pub fn new<S: Into<String>, P: Into<PathBuf>>(name: S, path: P) -> Self {
        TantivyDriver {
            name: name.into(),
            path: path.into(),
            state: Mutex::new(None),
            totals: QueryTotalCache::new(),
            searches: AtomicU64::new(0),
        }
    }

    /// Number of searches actually executed against the engine.
    ///
    /// Incremented by `run_query` and by uncached `run_count` calls; a
    /// count answered from the total cache does not touch the engine.
    pub fn search_executions(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    fn index_dir(&self) -> PathBuf {
        self.path.join(&self.name)
    }

    fn build_schema(field_names: &[String]) -> Schema {
        let mut builder = Schema::builder();
        builder.add_text_field(ID_ALIAS, STRING | STORED);
        builder.add_text_field(PARAMETERS_FIELD, STORED);
        for name in field_names {
            if name != ID_ALIAS && name != PARAMETERS_FIELD {
                builder.add_text_field(name, TEXT | STORED);
            }
        }
        builder.build()
    }

    /// Open the engine handles, creating the index when permitted.
    ///
    /// `create_with` carries the searchable field names used to build the
    /// schema if the index does not exist yet; `None` means opening a
    /// missing index is an error (the read path degrades on it).
    fn state(&self, create_with: Option<&[String]>) -> Result<MappedMutexGuard<'_, IndexState>> {
        let mut guard = self.state.lock();

        if guard.is_none() {
            let dir = self.index_dir();
            let index = if dir.join("meta.json").exists() {
                Index::open_in_dir(&dir)?
            } else if let Some(fields) = create_with {
                fs::create_dir_all(&dir)?;
                Index::create_in_dir(&dir, Self::build_schema(fields))?
            } else {
                return Err(SagittaError::index(format!(
                    "index {} does not exist",
                    self.name
                )));
            };

            let reader = index
                .reader_builder()
                .reload_policy(ReloadPolicy::OnCommitWithDelay)
                .try_into()?;
            let writer = index.writer(WRITER_HEAP_BYTES)?;

            *guard = Some(IndexState {
                index,
                reader,
                writer,
            });
        }

        Ok(MutexGuard::map(guard, |state| state.as_mut().unwrap()))
    }

    /// Resolve a clause's field spec to schema fields.
    ///
    /// `"*"` (or an empty spec) expands to every searchable field; the id
    /// and parameters fields are never part of the expansion.
    fn resolve_fields(&self, schema: &Schema, spec: &Value) -> Vec<Field> {
        let names: Vec<&str> = spec
            .as_array()
            .map(|entries| entries.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if names.is_empty() || names.contains(&"*") {
            return schema
                .fields()
                .filter(|(_, entry)| entry.name() != ID_ALIAS && entry.name() != PARAMETERS_FIELD)
                .map(|(field, _)| field)
                .collect();
        }

        names
            .iter()
            .filter_map(|name| match schema.get_field(name) {
                Ok(field) => Some(field),
                Err(_) => {
                    warn!("field {name} is not in the schema of index {}", self.name);
                    None
                }
            })
            .collect()
    }

    /// Tokenize a value the way the field is indexed.
    fn tokenize(&self, state: &IndexState, field: Field, text: &str) -> Vec<String> {
        match state.index.tokenizer_for_field(field) {
            Ok(mut analyzer) => {
                let mut tokens = Vec::new();
                let mut stream = analyzer.token_stream(text);
                while stream.advance() {
                    tokens.push(stream.token().text.clone());
                }
                tokens
            }
            Err(_) => text
                .split_whitespace()
                .map(|token| token.to_lowercase())
                .collect(),
        }
    }

    /// Interpret the clause-list query into an executable tantivy query.
    fn interpret(&self, state: &IndexState, query: &NativeQuery) -> Result<Box<dyn TantivyQuery>> {
        let schema = state.index.schema();

        if let Some(id) = query["id"].as_str() {
            let id_field = schema.get_field(ID_ALIAS)?;
            return Ok(Box::new(TermQuery::new(
                Term::from_field_text(id_field, id),
                IndexRecordOption::Basic,
            )));
        }

        let empty = Vec::new();
        let clauses = query["clauses"].as_array().unwrap_or(&empty);

        let mut translated: Vec<(TantivyOccur, Box<dyn TantivyQuery>)> = Vec::new();
        for clause in clauses {
            let value = clause["value"].as_str().unwrap_or("");
            let kind = clause["kind"].as_str().unwrap_or("match");
            let occur = match clause["occur"].as_str() {
                Some("must") => TantivyOccur::Must,
                Some("must_not") => TantivyOccur::MustNot,
                _ => TantivyOccur::Should,
            };

            let mut per_field: Vec<Box<dyn TantivyQuery>> = Vec::new();
            for field in self.resolve_fields(&schema, &clause["fields"]) {
                let tokens = self.tokenize(state, field, value);
                match kind {
                    "fuzzy" => {
                        let distance =
                            fuzzy_distance(clause["fuzziness"].as_f64().unwrap_or(0.5));
                        for token in &tokens {
                            per_field.push(Box::new(FuzzyTermQuery::new(
                                Term::from_field_text(field, token),
                                distance,
                                true,
                            )));
                        }
                    }
                    // Filters are exact matches of the whole value.
                    "phrase" | "filter" => match tokens.len() {
                        0 => {}
                        1 => per_field.push(Box::new(TermQuery::new(
                            Term::from_field_text(field, &tokens[0]),
                            IndexRecordOption::WithFreqs,
                        ))),
                        _ => per_field.push(Box::new(PhraseQuery::new(
                            tokens
                                .iter()
                                .map(|token| Term::from_field_text(field, token))
                                .collect(),
                        ))),
                    },
                    _ => {
                        for token in &tokens {
                            per_field.push(Box::new(TermQuery::new(
                                Term::from_field_text(field, token),
                                IndexRecordOption::WithFreqs,
                            )));
                        }
                    }
                }
            }

            match per_field.len() {
                0 => {}
                1 => translated.push((occur, per_field.pop().unwrap())),
                _ => translated.push((occur, Box::new(BooleanQuery::union(per_field)))),
            }
        }

        if translated.is_empty() {
            return Ok(Box::new(AllQuery));
        }

        // A purely negative query still needs a positive clause to
        // subtract from.
        if translated
            .iter()
            .all(|(occur, _)| *occur == TantivyOccur::MustNot)
        {
            translated.push((TantivyOccur::Must, Box::new(AllQuery)));
        }

        Ok(Box::new(BooleanQuery::new(translated)))
    }

    fn record_from_doc(
        &self,
        schema: &Schema,
        doc: &TantivyDocument,
        score: f32,
        options: &QueryOptions,
    ) -> Record {
        let mut id = String::new();
        let mut fields = Map::new();

        for (field, entry) in schema.fields() {
            let Some(value) = doc.get_first(field) else {
                continue;
            };
            let Some(text) = value.as_str() else {
                continue;
            };
            if entry.name() == ID_ALIAS {
                id = text.to_string();
            } else {
                fields.insert(entry.name().to_string(), json!(text));
            }
        }

        if let Some(columns) = options.projection() {
            fields.retain(|name, _| {
                name == PARAMETERS_FIELD || columns.iter().any(|column| column == name)
            });
        }

        Record::from_source(id, Some(f64::from(score)), fields)
    }
}

/// Map a `[0, 1]` fuzziness factor to a Levenshtein edit distance.
fn fuzzy_distance(factor: f64) -> u8 {
    (factor * 2.0).round().clamp(0.0, 2.0) as u8
}

impl Driver for TantivyDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_index(&self, fields: &[String]) -> Result<bool> {
        // Opening an existing index is a no-op, so creation is idempotent.
        self.state(Some(fields))?;
        Ok(true)
    }

    fn new_query(&self) -> NativeQuery {
        json!({"clauses": []})
    }

    fn add_condition_to_query(&self, mut query: NativeQuery, condition: &Condition) -> NativeQuery {
        if let Some(id) = condition.id_lookup() {
            query["id"] = json!(id);
            return query;
        }

        if condition.geo.is_some() {
            warn!(
                "geo conditions are not supported by the tantivy driver; skipping on index {}",
                self.name
            );
            return query;
        }

        let kind = if condition.filter {
            "filter"
        } else if condition.fuzziness_factor().is_some() {
            "fuzzy"
        } else if condition.phrase {
            "phrase"
        } else {
            "match"
        };

        let occur = match condition.occur() {
            Occur::Must => "must",
            Occur::MustNot => "must_not",
            Occur::Should => "should",
        };

        let fields = match condition.field.names() {
            Some(names) => json!(names),
            None => json!(["*"]),
        };

        let mut clause = json!({
            "occur": occur,
            "kind": kind,
            "fields": fields,
            "value": condition.value,
        });
        if let Some(factor) = condition.fuzziness_factor() {
            clause["fuzziness"] = json!(factor);
        }

        if !query["clauses"].is_array() {
            query["clauses"] = json!([]);
        }
        if let Some(clauses) = query["clauses"].as_array_mut() {
            clauses.push(clause);
        }

        query
    }

    fn run_query(&self, query: &NativeQuery, options: &QueryOptions) -> Vec<Record> {
        let result = (|| -> Result<Vec<Record>> {
            let state = self.state(None)?;
            let engine_query = self.interpret(&state, query)?;
            let searcher = state.reader.searcher();

            self.searches.fetch_add(1, Ordering::Relaxed);
            let (top_docs, count) = searcher.search(
                &*engine_query,
                &(
                    TopDocs::with_limit(options.limit_or_default().max(1))
                        .and_offset(options.offset_or_default()),
                    Count,
                ),
            )?;

            // Keyed by the pre-pagination query value.
            self.totals.store(query, count as u64);

            let schema = state.index.schema();
            let mut records = Vec::with_capacity(top_docs.len());
            for (score, address) in top_docs {
                let doc: TantivyDocument = searcher.doc(address)?;
                records.push(self.record_from_doc(&schema, &doc, score, options));
            }
            Ok(records)
        })();

        match result {
            Ok(records) => records,
            Err(e) => {
                warn!("tantivy query failed on index {}: {e}", self.name);
                Vec::new()
            }
        }
    }

    fn run_count(&self, query: &NativeQuery) -> u64 {
        if let Some(total) = self.totals.get(query) {
            return total;
        }

        let result = (|| -> Result<u64> {
            let state = self.state(None)?;
            let engine_query = self.interpret(&state, query)?;
            let searcher = state.reader.searcher();

            self.searches.fetch_add(1, Ordering::Relaxed);
            let count = searcher.search(&*engine_query, &Count)?;
            Ok(count as u64)
        })();

        match result {
            Ok(total) => {
                self.totals.store(query, total);
                total
            }
            Err(e) => {
                warn!("tantivy count failed on index {}: {e}", self.name);
                0
            }
        }
    }

    fn insert(&self, document: &Document) -> Result<bool> {
        let field_names: Vec<String> = document.fields.keys().cloned().collect();
        let mut state = self.state(Some(&field_names))?;
        let schema = state.index.schema();
        let id_field = schema.get_field(ID_ALIAS)?;

        // Replace semantics: stage a delete of any previous document.
        state
            .writer
            .delete_term(Term::from_field_text(id_field, &document.id));

        let mut doc = TantivyDocument::new();
        doc.add_text(id_field, &document.id);

        for (name, value) in &document.fields {
            match schema.get_field(name) {
                Ok(field) => {
                    let text = match value.as_str() {
                        Some(text) => text.to_string(),
                        None => value.to_string(),
                    };
                    doc.add_text(field, &text);
                }
                Err(_) => {
                    warn!(
                        "field {name} is not in the schema of index {}; skipping",
                        self.name
                    );
                }
            }
        }

        if let Some(blob) = document.encoded_parameters() {
            doc.add_text(schema.get_field(PARAMETERS_FIELD)?, &blob);
        }

        state.writer.add_document(doc)?;
        state.writer.commit()?;
        state.reader.reload()?;

        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let Ok(mut state) = self.state(None) else {
            return Ok(false);
        };
        let schema = state.index.schema();
        let id_field = schema.get_field(ID_ALIAS)?;
        let term = Term::from_field_text(id_field, id);

        let searcher = state.reader.searcher();
        let present = searcher.search(
            &TermQuery::new(term.clone(), IndexRecordOption::Basic),
            &Count,
        )?;
        if present == 0 {
            return Ok(false);
        }

        state.writer.delete_term(term);
        state.writer.commit()?;
        state.reader.reload()?;

        Ok(true)
    }

    fn delete_index(&self) -> Result<bool> {
        // Drop the open handles before removing files.
        *self.state.lock() = None;

        let dir = self.index_dir();
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;

        Ok(true)
    }
}
