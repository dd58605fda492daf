//! Command line argument parsing for the Sagitta CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sagitta - a backend-agnostic search layer
#[derive(Parser, Debug, Clone)]
#[command(name = "sagitta")]
#[command(about = "A backend-agnostic search layer for Rust")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sagitta Contributors")]
#[command(long_about = None)]
pub struct SagittaArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file (JSON); built-in defaults when omitted
    #[arg(short, long, value_name = "CONFIG_FILE", env = "SAGITTA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Index to operate on; the configured default index when omitted
    #[arg(short, long, value_name = "INDEX")]
    pub index: Option<String>,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SagittaArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Output formats available in the CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Provision backend-side schema for an index
    #[command(name = "create-index")]
    CreateIndex(CreateIndexArgs),

    /// Load documents into an index from a JSON file
    Insert(InsertArgs),

    /// Search an index
    Search(SearchArgs),

    /// Count the documents matching a query
    Count(CountArgs),

    /// Delete one document by id
    Delete(DeleteArgs),

    /// Delete an entire index
    Clear(ClearArgs),
}

/// Arguments for provisioning an index
#[derive(Parser, Debug, Clone)]
pub struct CreateIndexArgs {
    /// Field names to declare searchable
    #[arg(value_name = "FIELD", required = true)]
    pub fields: Vec<String>,
}

/// Arguments for loading documents
#[derive(Parser, Debug, Clone)]
pub struct InsertArgs {
    /// Document file: a JSON array of {id, fields, parameters} objects
    #[arg(value_name = "DOCUMENT_FILE")]
    pub document_file: PathBuf,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Field to search in (default: all fields)
    #[arg(long)]
    pub field: Option<String>,

    /// Match the query as an exact phrase
    #[arg(long)]
    pub phrase: bool,

    /// Enable fuzzy matching
    #[arg(long, conflicts_with = "phrase")]
    pub fuzzy: bool,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Offset for pagination
    #[arg(short, long, default_value = "0")]
    pub offset: usize,

    /// Fields to return (comma-separated; default: all)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
}

/// Arguments for counting
#[derive(Parser, Debug, Clone)]
pub struct CountArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Field to search in (default: all fields)
    #[arg(long)]
    pub field: Option<String>,
}

/// Arguments for deleting a document
#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// Document id
    #[arg(value_name = "ID")]
    pub id: String,
}

/// Arguments for clearing an index
#[derive(Parser, Debug, Clone)]
pub struct ClearArgs {}
