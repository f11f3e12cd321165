//! Safe bindings to [libpg_query], PostgreSQL's parser packaged as a library.
//!
//! Every operation encodes its input into a NUL-terminated buffer, makes one
//! native call and copies the result out before handing the engine's memory
//! back, so nothing returned from this crate borrows engine memory and every
//! native result is released exactly once.
//!
//! The crate-level functions use the process-wide [`LibPgQuery`], loaded on
//! first use from `$PGQUERY_LIBRARY` or the platform's `libpg_query`. Use
//! [`Parser`] directly to pick the library explicitly.
//!
//! ```no_run
//! let tree = pgquery::parse("select 1", Default::default())?;
//! assert_eq!(tree.stmts.len(), 1);
//! let sql = pgquery::deparse(&tree)?;
//! # Ok::<(), pgquery::Error>(())
//! ```
//!
//! [libpg_query]: https://github.com/pganalyze/libpg_query

mod buffer;
mod engine;
mod error;
mod library;
mod lifecycle;
pub mod nodes;
mod options;
mod parser;
pub mod protobuf;
#[cfg(test)]
mod testing;

pub use buffer::EncodedBuffer;
pub use engine::Engine;
pub use error::{EngineError, Error, PreconditionError, Result};
pub use library::{LibPgQuery, LIBRARY_ENV};
pub use nodes::{Node, NodeEnum};
pub use options::{DeparseOptions, ParseMode, ParseOptions, ParserFlags, SplitAlgorithm};
pub use parser::{DeparseComment, Parser, QueryFingerprint, StatementSpan};
pub use protobuf::{ParseResult, RawStmt, ScanResult, ScanToken};

pub use pgquery_sys as sys;

/// A [`Parser`] over the process-wide library.
pub fn default_parser() -> Result<Parser<&'static LibPgQuery>> {
    LibPgQuery::global().map(Parser::new)
}

pub fn parse(sql: &str, options: ParseOptions) -> Result<ParseResult> {
    default_parser()?.parse(sql, options)
}

pub fn parse_bytes(sql: &[u8], options: ParseOptions) -> Result<ParseResult> {
    default_parser()?.parse_bytes(sql, options)
}

pub fn parse_json(sql: &str, options: ParseOptions) -> Result<serde_json::Value> {
    default_parser()?.parse_json(sql, options)
}

pub fn parse_plpgsql(sql: &str) -> Result<serde_json::Value> {
    default_parser()?.parse_plpgsql(sql)
}

pub fn normalize(sql: &str) -> Result<String> {
    default_parser()?.normalize(sql)
}

pub fn normalize_utility(sql: &str) -> Result<String> {
    default_parser()?.normalize_utility(sql)
}

pub fn fingerprint(sql: &str, options: ParseOptions) -> Result<QueryFingerprint> {
    default_parser()?.fingerprint(sql, options)
}

pub fn fingerprint_bytes(sql: &[u8], options: ParseOptions) -> Result<QueryFingerprint> {
    default_parser()?.fingerprint_bytes(sql, options)
}

pub fn split(sql: &str, algorithm: SplitAlgorithm) -> Result<Vec<&str>> {
    default_parser()?.split(sql, algorithm)
}

pub fn split_spans(sql: &str, algorithm: SplitAlgorithm) -> Result<Vec<StatementSpan>> {
    default_parser()?.split_spans(sql, algorithm)
}

pub fn split_bytes(sql: &[u8], algorithm: SplitAlgorithm) -> Result<Vec<StatementSpan>> {
    default_parser()?.split_bytes(sql, algorithm)
}

pub fn scan(sql: &str) -> Result<ScanResult> {
    default_parser()?.scan(sql)
}

pub fn scan_bytes(sql: &[u8]) -> Result<ScanResult> {
    default_parser()?.scan_bytes(sql)
}

pub fn deparse(tree: &ParseResult) -> Result<String> {
    default_parser()?.deparse(tree)
}

pub fn deparse_bytes(tree: &[u8]) -> Result<String> {
    default_parser()?.deparse_bytes(tree)
}

pub fn deparse_with_options(tree: &ParseResult, options: &DeparseOptions) -> Result<String> {
    default_parser()?.deparse_with_options(tree, options)
}

pub fn deparse_with_comments(
    tree: &ParseResult,
    options: &DeparseOptions,
    comments: &[DeparseComment],
) -> Result<String> {
    default_parser()?.deparse_with_comments(tree, options, comments)
}

pub fn extract_comments(sql: &str) -> Result<Vec<DeparseComment>> {
    default_parser()?.extract_comments(sql)
}

pub fn summary(sql: &str, options: ParseOptions, truncate_limit: i32) -> Result<Vec<u8>> {
    default_parser()?.summary(sql, options, truncate_limit)
}

/// Runs the library's process-wide initialisation.
///
/// # Safety
/// No other libpg_query call may be in flight on any thread. None of the
/// operations call this implicitly.
pub unsafe fn init() -> Result<()> {
    LibPgQuery::global()?.init();
    Ok(())
}

/// Tears down the calling thread's engine state (memory contexts).
///
/// # Safety
/// No other libpg_query call may be in flight on any thread, and no result
/// of this thread may still be unreleased.
pub unsafe fn exit() -> Result<()> {
    LibPgQuery::global()?.exit();
    Ok(())
}
