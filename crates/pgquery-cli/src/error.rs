use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// CLI-specific error type that provides rich diagnostics
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("I/O error while {operation} ({path})")]
    #[diagnostic(code(pgquery::cli::io_error))]
    IoError {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}")]
    #[diagnostic(
        code(pgquery::cli::config_error),
        help("see `pgquery --help` for the supported [parse], [split] and [deparse] keys")
    )]
    ConfigError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(pgquery::cli::query_error))]
    QueryError {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
        #[help]
        context: Option<String>,
    },

    #[error("Failed to encode output")]
    #[diagnostic(code(pgquery::cli::output_error))]
    OutputError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pgquery(#[from] pgquery::Error),
}

/// Helper struct to provide context for error conversion
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub name: &'a str,
    pub source: &'a str,
}

/// Attaches the SQL text to engine errors so the cursor position is rendered
/// as a label. Other errors pass through unchanged.
pub fn convert_query_error(error: pgquery::Error, ctx: ErrorContext) -> CliError {
    let pgquery::Error::Engine(engine) = error else {
        return CliError::Pgquery(error);
    };
    CliError::QueryError {
        src: NamedSource::new(ctx.name, ctx.source.to_string()),
        span: cursor_span(engine.cursor_position, ctx.source),
        message: engine.message,
        context: engine.context,
    }
}

/// The engine's cursor is a 1-based byte offset; 0 means unknown.
fn cursor_span(cursor: u32, source: &str) -> Option<SourceSpan> {
    if cursor == 0 {
        return None;
    }
    let offset = (cursor as usize - 1).min(source.len());
    let len = usize::from(offset < source.len());
    Some(SourceSpan::from((offset, len)))
}

/// Convert IO errors with context
pub fn convert_io_error(error: std::io::Error, path: PathBuf, operation: &str) -> CliError {
    CliError::IoError {
        path,
        operation: operation.to_string(),
        source: error,
    }
}
