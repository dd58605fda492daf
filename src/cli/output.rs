//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SagittaArgs};
use crate::document::Record;
use crate::error::Result;

/// Result structure for index provisioning.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexCreationResult {
    pub index: String,
    pub created: bool,
}

/// Result structure for document loading.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentInsertionResult {
    pub index: String,
    pub documents_inserted: usize,
    pub duration_ms: u64,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub records: Vec<Record>,
    pub total: u64,
    pub duration_ms: u64,
}

/// Result structure for count operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountOutput {
    pub total: u64,
}

/// Result structure for deletions (documents and whole indexes).
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletionResult {
    pub index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub deleted: bool,
}

/// Emit a command result in the selected output format.
///
/// Human mode prints the summary line (and the payload too at higher
/// verbosity); JSON mode prints only the serialized payload.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &SagittaArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            println!("{json}");
        }
        OutputFormat::Human => {
            if args.verbosity() > 0 {
                println!("{message}");
            }
            if args.verbosity() > 1 {
                println!("{}", serde_json::to_string_pretty(result)?);
            }
        }
    }

    Ok(())
}

/// Print search hits as human-readable lines.
pub fn print_records(records: &[Record]) {
    for record in records {
        let score = record
            .score
            .map(|score| format!("{score:.3}"))
            .unwrap_or_else(|| "-".to_string());
        let fields = serde_json::to_string(&record.fields).unwrap_or_default();
        println!("{}\t{score}\t{fields}", record.id);
    }
}
