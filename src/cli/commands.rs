//! Command implementations for the Sagitta CLI.

use std::fs;
use std::time::Instant;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::condition::Condition;
use crate::config::SearchConfig;
use crate::document::Document;
use crate::error::Result;
use crate::search::Search;

/// Execute a CLI command.
pub fn execute_command(args: SagittaArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => SearchConfig::from_file(path)?,
        None => SearchConfig::default(),
    };
    let search = Search::new(config);
    let index = args
        .index
        .clone()
        .unwrap_or_else(|| search.config().default_index.clone());

    match &args.command {
        Command::CreateIndex(create_args) => {
            create_index(&search, &index, create_args.clone(), &args)
        }
        Command::Insert(insert_args) => insert_documents(&search, &index, insert_args.clone(), &args),
        Command::Search(search_args) => search_index(&search, &index, search_args.clone(), &args),
        Command::Count(count_args) => count_index(&search, &index, count_args.clone(), &args),
        Command::Delete(delete_args) => delete_document(&search, &index, delete_args.clone(), &args),
        Command::Clear(clear_args) => clear_index(&search, &index, clear_args.clone(), &args),
    }
}

/// Provision backend-side schema for an index.
fn create_index(
    search: &Search,
    index: &str,
    args: CreateIndexArgs,
    cli_args: &SagittaArgs,
) -> Result<()> {
    let created = search.create_index(index, &args.fields)?;

    output_result(
        "Index created",
        &IndexCreationResult {
            index: index.to_string(),
            created,
        },
        cli_args,
    )
}

/// Load documents into an index from a JSON file.
fn insert_documents(
    search: &Search,
    index: &str,
    args: InsertArgs,
    cli_args: &SagittaArgs,
) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!("Loading documents from: {}", args.document_file.display());
    }

    let documents: Vec<Document> = serde_json::from_str(&fs::read_to_string(&args.document_file)?)?;

    let start_time = Instant::now();
    let mut inserted = 0;
    for document in &documents {
        if search.insert_into(index, document)? {
            inserted += 1;
        }
    }

    output_result(
        "Documents inserted",
        &DocumentInsertionResult {
            index: index.to_string(),
            documents_inserted: inserted,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Build the condition shared by the search and count commands.
fn build_condition(query: &str, field: Option<&str>, phrase: bool, fuzzy: bool) -> Condition {
    let mut condition = match field {
        Some(field) => Condition::new(field, query),
        None => Condition::all(query),
    };
    if phrase {
        condition = condition.phrase();
    }
    if fuzzy {
        condition = condition.fuzzy();
    }
    condition
}

/// Search an index.
fn search_index(
    search: &Search,
    index: &str,
    args: SearchArgs,
    cli_args: &SagittaArgs,
) -> Result<()> {
    let condition = build_condition(&args.query, args.field.as_deref(), args.phrase, args.fuzzy);

    let mut builder = search
        .query_index(index)?
        .condition(condition)
        .limit(args.limit)
        .offset(args.offset);
    if !args.columns.is_empty() {
        builder = builder.select(args.columns.clone());
    }

    let start_time = Instant::now();
    let records = builder.get();
    // Answered from the count cache populated by the query above.
    let total = builder.count();
    let duration_ms = start_time.elapsed().as_millis() as u64;

    if cli_args.output_format == OutputFormat::Human {
        print_records(&records);
        if cli_args.verbosity() > 0 {
            println!("{} of {total} record(s) in {duration_ms}ms", records.len());
        }
        return Ok(());
    }

    output_result(
        "Search finished",
        &SearchOutput {
            records,
            total,
            duration_ms,
        },
        cli_args,
    )
}

/// Count the documents matching a query.
fn count_index(search: &Search, index: &str, args: CountArgs, cli_args: &SagittaArgs) -> Result<()> {
    let condition = build_condition(&args.query, args.field.as_deref(), false, false);
    let total = search.query_index(index)?.condition(condition).count();

    if cli_args.output_format == OutputFormat::Human {
        println!("{total}");
        return Ok(());
    }

    output_result("Count finished", &CountOutput { total }, cli_args)
}

/// Delete one document by id.
fn delete_document(
    search: &Search,
    index: &str,
    args: DeleteArgs,
    cli_args: &SagittaArgs,
) -> Result<()> {
    let deleted = search.delete_from(index, &args.id)?;

    output_result(
        if deleted {
            "Document deleted"
        } else {
            "Document not found"
        },
        &DeletionResult {
            index: index.to_string(),
            id: Some(args.id),
            deleted,
        },
        cli_args,
    )
}

/// Delete an entire index.
fn clear_index(
    search: &Search,
    index: &str,
    _args: ClearArgs,
    cli_args: &SagittaArgs,
) -> Result<()> {
    let deleted = search.delete_index(index)?;

    output_result(
        if deleted {
            "Index deleted"
        } else {
            "Index not found"
        },
        &DeletionResult {
            index: index.to_string(),
            id: None,
            deleted,
        },
        cli_args,
    )
}
