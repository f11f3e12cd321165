//! Safe operations over an [`Engine`].
//!
//! Each operation follows the same path: encode the input, encode options,
//! dispatch one native call, then hand the result to a [`Scoped`] guard that
//! either translates the engine error or copies the payload out before the
//! result is released.

use std::ffi::CString;
use std::ops::Range;
use std::os::raw::{c_char, c_int};
use std::ptr;

use pgquery_sys as sys;
use prost::Message;
use serde::{Deserialize, Serialize};

use crate::buffer::EncodedBuffer;
use crate::engine::Engine;
use crate::error::{Error, PreconditionError, Result};
use crate::lifecycle::{non_negative, pointer_array, protobuf_bytes, utf8_string, NativeResult, Scoped};
use crate::options::{DeparseOptions, ParseOptions, SplitAlgorithm};
use crate::protobuf::{ParseResult, ScanResult};

/// Half-open byte range `[location, location + length)` of one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementSpan {
    pub location: usize,
    pub length: usize,
}

impl StatementSpan {
    pub fn range(&self) -> Range<usize> {
        self.location..self.location + self.length
    }

    /// The statement's text, if the span lies inside `sql` on char boundaries.
    pub fn slice<'s>(&self, sql: &'s str) -> Result<&'s str> {
        sql.get(self.range()).ok_or(Error::SpanOutOfBounds {
            location: self.location,
            length: self.length,
            input_len: sql.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFingerprint {
    pub value: u64,
    /// Hex form as printed by libpg_query.
    pub text: String,
}

impl std::fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A comment found in, or to be re-inserted into, a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeparseComment {
    /// Byte offset the comment is attached to.
    pub match_location: u32,
    pub newlines_before: u32,
    pub newlines_after: u32,
    /// The comment including its delimiters, e.g. `-- hi` or `/* hi */`.
    pub text: String,
}

/// The binding layer's entry point, generic over the engine it dispatches to.
///
/// `Parser<&LibPgQuery>` (see [`crate::default_parser`]) is what the crate-level
/// functions use; tests plug in their own engine.
#[derive(Debug, Clone)]
pub struct Parser<E> {
    engine: E,
}

impl<E: Engine> Parser<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Dispatches one call and drives its result through the lifecycle.
    ///
    /// # Safety
    /// `invoke` must make exactly one engine call whose arguments stay valid
    /// for the duration of the call, and return its result untouched.
    unsafe fn run<R: NativeResult, T>(
        &self,
        invoke: impl FnOnce(&E) -> R,
        materialize: impl FnOnce(&R) -> Result<T>,
    ) -> Result<T> {
        log::debug!("dispatching {}", R::KIND);
        let raw = invoke(&self.engine);
        Scoped::new(&self.engine, raw).extract(materialize)
    }

    /// Like [`Parser::run`] for entry points the engine may not provide.
    unsafe fn run_optional<R: NativeResult, T>(
        &self,
        symbol: &'static str,
        invoke: impl FnOnce(&E) -> Option<R>,
        materialize: impl FnOnce(&R) -> Result<T>,
    ) -> Result<T> {
        log::debug!("dispatching {}", R::KIND);
        let raw = invoke(&self.engine).ok_or(Error::Unsupported { symbol })?;
        Scoped::new(&self.engine, raw).extract(materialize)
    }

    // --- Parse ---

    /// Parses `sql` into its protobuf parse tree.
    pub fn parse(&self, sql: &str, options: ParseOptions) -> Result<ParseResult> {
        self.parse_buffer(&EncodedBuffer::from_text(sql)?, options)
    }

    /// Parses a NUL-terminated UTF-8 buffer without copying it.
    pub fn parse_bytes(&self, sql: &[u8], options: ParseOptions) -> Result<ParseResult> {
        self.parse_buffer(&EncodedBuffer::from_bytes(sql)?, options)
    }

    fn parse_buffer(&self, sql: &EncodedBuffer<'_>, options: ParseOptions) -> Result<ParseResult> {
        let bits = options.bits();
        unsafe {
            self.run(
                |engine| engine.parse_protobuf(sql.as_ptr(), bits),
                |res| ParseResult::decode_payload(protobuf_bytes(&res.parse_tree, "parse tree")?),
            )
        }
    }

    /// Parses `sql` into libpg_query's JSON representation of the tree.
    pub fn parse_json(&self, sql: &str, options: ParseOptions) -> Result<serde_json::Value> {
        let sql = EncodedBuffer::from_text(sql)?;
        let bits = options.bits();
        unsafe {
            self.run(
                |engine| engine.parse_json(sql.as_ptr(), bits),
                |res| json_payload(res.parse_tree, "parse tree"),
            )
        }
    }

    /// Parses the body of a PL/pgSQL function definition.
    pub fn parse_plpgsql(&self, sql: &str) -> Result<serde_json::Value> {
        let sql = EncodedBuffer::from_text(sql)?;
        unsafe {
            self.run(
                |engine| engine.parse_plpgsql(sql.as_ptr()),
                |res| json_payload(res.plpgsql_funcs, "PL/pgSQL functions"),
            )
        }
    }

    // --- Normalize ---

    /// Replaces constants with `$n` parameter references.
    pub fn normalize(&self, sql: &str) -> Result<String> {
        let sql = EncodedBuffer::from_text(sql)?;
        unsafe {
            self.run(
                |engine| engine.normalize(sql.as_ptr()),
                |res| utf8_string(res.normalized_query, "normalized query"),
            )
        }
    }

    /// Normalizes utility statements (`SET`, `CREATE ...`), which
    /// [`Parser::normalize`] leaves alone.
    pub fn normalize_utility(&self, sql: &str) -> Result<String> {
        let sql = EncodedBuffer::from_text(sql)?;
        unsafe {
            self.run(
                |engine| engine.normalize_utility(sql.as_ptr()),
                |res| utf8_string(res.normalized_query, "normalized query"),
            )
        }
    }

    // --- Fingerprint ---

    pub fn fingerprint(&self, sql: &str, options: ParseOptions) -> Result<QueryFingerprint> {
        self.fingerprint_buffer(&EncodedBuffer::from_text(sql)?, options)
    }

    pub fn fingerprint_bytes(&self, sql: &[u8], options: ParseOptions) -> Result<QueryFingerprint> {
        self.fingerprint_buffer(&EncodedBuffer::from_bytes(sql)?, options)
    }

    fn fingerprint_buffer(&self, sql: &EncodedBuffer<'_>, options: ParseOptions) -> Result<QueryFingerprint> {
        let bits = options.bits();
        unsafe {
            self.run(
                |engine| engine.fingerprint(sql.as_ptr(), bits),
                |res| {
                    Ok(QueryFingerprint {
                        value: res.fingerprint,
                        text: utf8_string(res.fingerprint_str, "fingerprint")?,
                    })
                },
            )
        }
    }

    // --- Split ---

    /// Splits a batch into statement texts, borrowed from `sql`.
    pub fn split<'s>(&self, sql: &'s str, algorithm: SplitAlgorithm) -> Result<Vec<&'s str>> {
        self.split_spans(sql, algorithm)?
            .iter()
            .map(|span| span.slice(sql))
            .collect()
    }

    /// Splits a batch into byte spans of `sql`.
    pub fn split_spans(&self, sql: &str, algorithm: SplitAlgorithm) -> Result<Vec<StatementSpan>> {
        self.split_buffer(&EncodedBuffer::from_text(sql)?, algorithm)
    }

    /// Splits a NUL-terminated UTF-8 buffer without copying it.
    pub fn split_bytes(&self, sql: &[u8], algorithm: SplitAlgorithm) -> Result<Vec<StatementSpan>> {
        self.split_buffer(&EncodedBuffer::from_bytes(sql)?, algorithm)
    }

    fn split_buffer(&self, sql: &EncodedBuffer<'_>, algorithm: SplitAlgorithm) -> Result<Vec<StatementSpan>> {
        unsafe {
            self.run(
                |engine| match algorithm {
                    SplitAlgorithm::Scanner => engine.split_with_scanner(sql.as_ptr()),
                    SplitAlgorithm::Parser => engine.split_with_parser(sql.as_ptr()),
                },
                |res| {
                    let count = non_negative(res.n_stmts, "statement count")?;
                    pointer_array(res.stmts, count, "statement list")?
                        .iter()
                        .map(|&stmt| split_span(stmt))
                        .collect()
                },
            )
        }
    }

    // --- Scan ---

    pub fn scan(&self, sql: &str) -> Result<ScanResult> {
        self.scan_buffer(&EncodedBuffer::from_text(sql)?)
    }

    pub fn scan_bytes(&self, sql: &[u8]) -> Result<ScanResult> {
        self.scan_buffer(&EncodedBuffer::from_bytes(sql)?)
    }

    fn scan_buffer(&self, sql: &EncodedBuffer<'_>) -> Result<ScanResult> {
        unsafe {
            self.run(
                |engine| engine.scan(sql.as_ptr()),
                |res| ScanResult::decode_payload(protobuf_bytes(&res.pbuf, "scan result")?),
            )
        }
    }

    // --- Deparse ---

    /// Turns a parse tree back into SQL.
    pub fn deparse(&self, tree: &ParseResult) -> Result<String> {
        self.deparse_bytes(&tree.encode_to_vec())
    }

    /// Deparses an already encoded `ParseResult` message.
    pub fn deparse_bytes(&self, tree: &[u8]) -> Result<String> {
        let tree = borrowed_protobuf(tree);
        unsafe {
            self.run(
                |engine| engine.deparse_protobuf(tree),
                |res| utf8_string(res.query, "deparsed query"),
            )
        }
    }

    pub fn deparse_with_options(&self, tree: &ParseResult, options: &DeparseOptions) -> Result<String> {
        self.deparse_with_comments(tree, options, &[])
    }

    /// Deparses with presentation options, re-inserting `comments` at their
    /// recorded locations.
    pub fn deparse_with_comments(
        &self,
        tree: &ParseResult,
        options: &DeparseOptions,
        comments: &[DeparseComment],
    ) -> Result<String> {
        let encoded = tree.encode_to_vec();
        let tree = borrowed_protobuf(&encoded);

        // Records and the pointer array only have to outlive the call.
        let texts = comments
            .iter()
            .map(|comment| {
                CString::new(comment.text.as_str()).map_err(|err| PreconditionError::InteriorNul {
                    position: err.nul_position(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut records = comments
            .iter()
            .zip(&texts)
            .map(|(comment, text)| -> Result<_, PreconditionError> {
                Ok(sys::PostgresDeparseComment {
                    match_location: c_int_field("match_location", comment.match_location)?,
                    newlines_before_comment: c_int_field("newlines_before", comment.newlines_before)?,
                    newlines_after_comment: c_int_field("newlines_after", comment.newlines_after)?,
                    str_: text.as_ptr() as *mut c_char,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut pointers: Vec<*mut sys::PostgresDeparseComment> =
            records.iter_mut().map(|record| record as *mut _).collect();

        let mut opts = native_deparse_opts(options)?;
        if !pointers.is_empty() {
            opts.comments = pointers.as_mut_ptr();
            opts.comment_count = pointers.len();
        }

        let deparsed = unsafe {
            self.run(
                |engine| engine.deparse_protobuf_opts(tree, opts),
                |res| utf8_string(res.query, "deparsed query"),
            )
        };
        drop(pointers);
        drop(records);
        deparsed
    }

    /// Finds the comments in `sql`, positioned for [`Parser::deparse_with_comments`].
    pub fn extract_comments(&self, sql: &str) -> Result<Vec<DeparseComment>> {
        let sql = EncodedBuffer::from_text(sql)?;
        unsafe {
            self.run_optional(
                sys::symbols::DEPARSE_COMMENTS_FOR_QUERY,
                |engine| engine.deparse_comments_for_query(sql.as_ptr()),
                |res| {
                    pointer_array(res.comments, res.comment_count, "comment list")?
                        .iter()
                        .filter(|record| !record.is_null())
                        .map(|&record| copy_comment(&*record))
                        .collect()
                },
            )
        }
    }

    /// Summary of the statements in `sql` as libpg_query's encoded
    /// `SummaryResult`. A `truncate_limit` of -1 disables truncation.
    pub fn summary(&self, sql: &str, options: ParseOptions, truncate_limit: i32) -> Result<Vec<u8>> {
        let sql = EncodedBuffer::from_text(sql)?;
        let bits = options.bits();
        unsafe {
            self.run_optional(
                sys::symbols::SUMMARY,
                |engine| engine.summary(sql.as_ptr(), bits, truncate_limit),
                |res| Ok(protobuf_bytes(&res.summary, "summary")?.to_vec()),
            )
        }
    }
}

/// Views caller memory as a protobuf argument. The engine only reads it.
fn borrowed_protobuf(bytes: &[u8]) -> sys::PgQueryProtobuf {
    sys::PgQueryProtobuf {
        len: bytes.len(),
        data: if bytes.is_empty() {
            ptr::null_mut()
        } else {
            bytes.as_ptr() as *mut c_char
        },
    }
}

fn c_int_field(field: &'static str, value: u32) -> Result<c_int, PreconditionError> {
    c_int::try_from(value).map_err(|_| PreconditionError::ValueTooLarge {
        field,
        value: value.into(),
    })
}

fn native_deparse_opts(options: &DeparseOptions) -> Result<sys::PostgresDeparseOpts, PreconditionError> {
    Ok(sys::PostgresDeparseOpts {
        comments: ptr::null_mut(),
        comment_count: 0,
        pretty_print: options.pretty_print,
        indent_size: c_int_field("indent_size", options.indent_size)?,
        max_line_length: c_int_field("max_line_length", options.max_line_length)?,
        trailing_newline: options.trailing_newline,
        commas_start_of_line: options.commas_start_of_line,
    })
}

unsafe fn json_payload(text: *const c_char, what: &'static str) -> Result<serde_json::Value> {
    let text = utf8_string(text, what)?;
    if text.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&text).map_err(|source| Error::Json { what, source })
}

unsafe fn split_span(stmt: *const sys::PgQuerySplitStmt) -> Result<StatementSpan> {
    if stmt.is_null() {
        return Ok(StatementSpan::default());
    }
    let stmt = &*stmt;
    Ok(StatementSpan {
        location: non_negative(stmt.stmt_location, "statement location")?,
        length: non_negative(stmt.stmt_len, "statement length")?,
    })
}

unsafe fn copy_comment(record: &sys::PostgresDeparseComment) -> Result<DeparseComment> {
    let field = |value: c_int, what| {
        u32::try_from(value).map_err(|_| Error::OutOfRange {
            what,
            value: value.into(),
        })
    };
    Ok(DeparseComment {
        match_location: field(record.match_location, "comment location")?,
        newlines_before: field(record.newlines_before_comment, "comment newlines")?,
        newlines_after: field(record.newlines_after_comment, "comment newlines")?,
        text: utf8_string(record.str_, "comment text")?,
    })
}
