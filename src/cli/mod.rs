//! CLI command definitions for task-tree
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::error::{TreeError, TreeResult};
use crate::format::OutputFormat;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::PathBuf;

/// Hierarchical task tree with cascading soft delete and task advice
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List visible nodes in order
    Tree,

    /// List soft-deleted nodes, most recently deleted first
    Deleted,

    /// Create a node from a JSON payload
    Create {
        /// Node JSON, e.g. '{"title":"Write report"}'
        #[arg(long)]
        json: String,
    },

    /// Apply a partial JSON patch to a node
    Update {
        id: String,
        /// Patch JSON; absent fields are left unchanged
        #[arg(long)]
        json: String,
    },

    /// Upsert every node in a JSON array
    Sync {
        /// File holding the array, or '-' for stdin
        #[arg(long, value_name = "FILE")]
        file: String,
    },

    /// Soft-delete a node and its descendants
    Delete { id: String },

    /// Restore a node, its descendants and its deleted ancestors
    Restore { id: String },

    /// Permanently delete a node and its descendants
    Purge { id: String },

    /// Ask the advice provider about a task
    Advice {
        #[arg(long)]
        title: String,

        /// Task notes; long notes are truncated
        #[arg(long)]
        content: Option<String>,

        /// breakdown, encouragement or review
        #[arg(long)]
        kind: String,
    },

    /// Show or change stored advice settings
    Settings {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,
    },
}

/// Decode a JSON argument, reporting which argument was malformed.
pub fn parse_json_arg<T: DeserializeOwned>(field: &str, raw: &str) -> TreeResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| TreeError::invalid_value(field, format!("Invalid JSON: {}", e)))
}

/// Read a file, or stdin when `source` is `-`.
pub fn read_source(source: &str) -> TreeResult<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| TreeError::invalid_value("file", format!("Failed to read stdin: {}", e)))?;
        return Ok(buf);
    }
    std::fs::read_to_string(source)
        .map_err(|e| TreeError::invalid_value("file", format!("Failed to read {}: {}", source, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TaskNodeDto;
    use crate::error::ErrorCode;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_update_with_globals() {
        let cli = Cli::parse_from([
            "task-tree",
            "update",
            "abc",
            "--json",
            r#"{"status":"DONE"}"#,
            "--format",
            "text",
            "-d",
            "/tmp/t.db",
        ]);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/t.db")));
        assert!(matches!(cli.command, Command::Update { ref id, .. } if id == "abc"));
    }

    #[test]
    fn log_defaults_to_stderr() {
        let cli = Cli::parse_from(["task-tree", "tree"]);
        assert_eq!(cli.log, "2");
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn json_arg_errors_name_the_argument() {
        let dto: TaskNodeDto = parse_json_arg("json", r#"{"title":"x"}"#).unwrap();
        assert_eq!(dto.title.as_deref(), Some("x"));

        let err = parse_json_arg::<TaskNodeDto>("json", "{nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.field.as_deref(), Some("json"));
    }

    #[test]
    fn read_source_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        std::fs::write(&path, "[]").unwrap();

        assert_eq!(read_source(path.to_str().unwrap()).unwrap(), "[]");
        assert!(read_source(dir.path().join("missing").to_str().unwrap()).is_err());
    }
}
