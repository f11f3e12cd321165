//! An in-process stand-in for libpg_query used by the unit tests.
//!
//! It speaks the same C ABI (results are built from the `pgquery-sys`
//! structs and freed through the `free_*` calls) and keeps a ledger of every
//! allocation it hands out, so tests can assert that each result was released
//! exactly once and nothing leaked. The "grammar" is deliberately tiny:
//! statements are `;`-separated, and a statement ending in `FROM` is a syntax
//! error.

use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

use parking_lot::Mutex;
use pgquery_sys as sys;
use prost::Message;

use crate::engine::Engine;
use crate::nodes::{Node, NodeEnum, StringValue};
use crate::protobuf::{KeywordKind, ParseResult, RawStmt, ScanResult, ScanToken};

/// The fake grammar's statement node: the statement text in a `String` node.
pub(crate) fn statement_node(sql: &str) -> Node {
    Node::new(NodeEnum::String(StringValue {
        sval: sql.to_string(),
    }))
}

/// Deparse options as the engine received them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapturedDeparseOpts {
    pub pretty_print: bool,
    pub indent_size: c_int,
    pub max_line_length: c_int,
    pub trailing_newline: bool,
    pub commas_start_of_line: bool,
    /// (match_location, newlines_before, newlines_after, text)
    pub comments: Vec<(c_int, c_int, c_int, String)>,
}

#[derive(Default)]
struct Ledger {
    live: HashSet<usize>,
    dispatched: usize,
    released: usize,
    last_options: Option<c_int>,
    last_deparse_opts: Option<CapturedDeparseOpts>,
}

#[derive(Default)]
pub(crate) struct FakeEngine {
    ledger: Mutex<Ledger>,
    corrupt_payloads: bool,
    invalid_utf8: bool,
    oversized_span: bool,
    without_optional: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protobuf payloads are garbage.
    pub fn with_corrupt_payloads(mut self) -> Self {
        self.corrupt_payloads = true;
        self
    }

    /// Text payloads are not UTF-8.
    pub fn with_invalid_utf8(mut self) -> Self {
        self.invalid_utf8 = true;
        self
    }

    /// The last split span runs past the end of the input.
    pub fn with_oversized_span(mut self) -> Self {
        self.oversized_span = true;
        self
    }

    /// Behaves like an older library without comments/summary support.
    pub fn without_optional_entry_points(mut self) -> Self {
        self.without_optional = true;
        self
    }

    pub fn dispatched(&self) -> usize {
        self.ledger.lock().dispatched
    }

    pub fn released(&self) -> usize {
        self.ledger.lock().released
    }

    pub fn last_options(&self) -> Option<c_int> {
        self.ledger.lock().last_options
    }

    pub fn last_deparse_opts(&self) -> Option<CapturedDeparseOpts> {
        self.ledger.lock().last_deparse_opts.clone()
    }

    /// Every dispatched result was released once and nothing is still live.
    pub fn assert_balanced(&self) {
        let ledger = self.ledger.lock();
        assert_eq!(
            ledger.dispatched, ledger.released,
            "dispatched {} results but released {}",
            ledger.dispatched, ledger.released
        );
        assert!(ledger.live.is_empty(), "{} allocations leaked", ledger.live.len());
    }

    // --- ledger ---

    fn dispatch(&self, options: Option<c_int>) {
        let mut ledger = self.ledger.lock();
        ledger.dispatched += 1;
        if options.is_some() {
            ledger.last_options = options;
        }
    }

    fn release(&self) {
        self.ledger.lock().released += 1;
    }

    fn track<T>(&self, ptr: *mut T) -> *mut T {
        let fresh = self.ledger.lock().live.insert(ptr as usize);
        assert!(fresh, "allocation {:p} tracked twice", ptr);
        ptr
    }

    fn untrack<T>(&self, ptr: *mut T) {
        let known = self.ledger.lock().live.remove(&(ptr as usize));
        assert!(known, "double free or foreign pointer {:p}", ptr);
    }

    // --- allocation ---

    fn alloc_cstring(&self, bytes: impl Into<Vec<u8>>) -> *mut c_char {
        let owned = CString::new(bytes).expect("fake engine strings have no NUL");
        self.track(owned.into_raw())
    }

    fn alloc_text(&self, text: &str) -> *mut c_char {
        if self.invalid_utf8 {
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0xff);
            return self.alloc_cstring(bytes);
        }
        self.alloc_cstring(text)
    }

    unsafe fn free_cstring(&self, ptr: *mut c_char) {
        if !ptr.is_null() {
            self.untrack(ptr);
            drop(CString::from_raw(ptr));
        }
    }

    fn alloc_protobuf(&self, bytes: Vec<u8>) -> sys::PgQueryProtobuf {
        let bytes = if self.corrupt_payloads {
            vec![0xff, 0xff, 0xff]
        } else {
            bytes
        };
        if bytes.is_empty() {
            return sys::PgQueryProtobuf {
                len: 0,
                data: ptr::null_mut(),
            };
        }
        let len = bytes.len();
        let data = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
        sys::PgQueryProtobuf {
            len,
            data: self.track(data) as *mut c_char,
        }
    }

    unsafe fn free_protobuf(&self, pbuf: sys::PgQueryProtobuf) {
        if !pbuf.data.is_null() {
            self.untrack(pbuf.data);
            let slice = ptr::slice_from_raw_parts_mut(pbuf.data as *mut u8, pbuf.len);
            drop(Box::from_raw(slice));
        }
    }

    fn alloc_error(&self, message: &str, cursorpos: c_int) -> *mut sys::PgQueryError {
        let record = sys::PgQueryError {
            message: self.alloc_cstring(message),
            funcname: self.alloc_cstring("scanner_yyerror"),
            filename: self.alloc_cstring("scan.l"),
            lineno: 1242,
            cursorpos,
            context: ptr::null_mut(),
        };
        self.track(Box::into_raw(Box::new(record)))
    }

    unsafe fn free_error(&self, error: *mut sys::PgQueryError) {
        if error.is_null() {
            return;
        }
        self.untrack(error);
        let record = Box::from_raw(error);
        self.free_cstring(record.message);
        self.free_cstring(record.funcname);
        self.free_cstring(record.filename);
        self.free_cstring(record.context);
    }

    fn syntax_error(&self, sql: &str) -> *mut sys::PgQueryError {
        match find_syntax_error(sql) {
            Some(cursor) => self.alloc_error("syntax error at end of input", cursor),
            None => ptr::null_mut(),
        }
    }

    fn split_result(&self, sql: &str, check_syntax: bool) -> sys::PgQuerySplitResult {
        let error = if check_syntax {
            self.syntax_error(sql)
        } else {
            ptr::null_mut()
        };
        if !error.is_null() {
            return sys::PgQuerySplitResult {
                stmts: ptr::null_mut(),
                n_stmts: 0,
                stderr_buffer: ptr::null_mut(),
                error,
            };
        }

        let mut spans = statement_spans(sql);
        if self.oversized_span {
            if let Some(last) = spans.last_mut() {
                last.1 += 1000;
            }
        }
        let stmts: Vec<*mut sys::PgQuerySplitStmt> = spans
            .iter()
            .map(|&(location, len)| {
                self.track(Box::into_raw(Box::new(sys::PgQuerySplitStmt {
                    stmt_location: location as c_int,
                    stmt_len: len as c_int,
                })))
            })
            .collect();
        let n_stmts = stmts.len() as c_int;
        let stmts = if stmts.is_empty() {
            ptr::null_mut()
        } else {
            self.track(Box::into_raw(stmts.into_boxed_slice()) as *mut *mut sys::PgQuerySplitStmt)
        };
        sys::PgQuerySplitResult {
            stmts,
            n_stmts,
            stderr_buffer: ptr::null_mut(),
            error: ptr::null_mut(),
        }
    }
}

unsafe fn input<'a>(ptr: *const c_char) -> &'a str {
    CStr::from_ptr(ptr).to_str().expect("fake engine expects UTF-8 input")
}

/// `(location, length)` of every non-blank `;`-separated segment, the
/// terminating `;` excluded.
fn statement_spans(sql: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut push = |start: usize, end: usize| {
        if !sql[start..end].trim().is_empty() {
            spans.push((start, end - start));
        }
    };
    for (i, byte) in sql.bytes().enumerate() {
        if byte == b';' {
            push(start, i);
            start = i + 1;
        }
    }
    push(start, sql.len());
    spans
}

/// 1-based cursor just past the statement that ends in a dangling `FROM`.
fn find_syntax_error(sql: &str) -> Option<c_int> {
    statement_spans(sql).into_iter().find_map(|(location, len)| {
        let stmt = sql[location..location + len].trim_end().to_ascii_lowercase();
        let dangling = stmt == "from" || stmt.ends_with(" from");
        dangling.then(|| (location + len + 1) as c_int)
    })
}

/// Strips comments and collapses whitespace.
fn fake_normalize(sql: &str) -> String {
    let mut out = String::new();
    let mut rest = sql;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |end| &after[end + 2..]);
            out.push(' ');
        } else if let Some(after) = rest.strip_prefix("--") {
            rest = after.find('\n').map_or("", |end| &after[end..]);
        } else {
            let ch = rest.chars().next().unwrap_or(' ');
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

fn fake_tokens(sql: &str) -> Vec<ScanToken> {
    let mut tokens = Vec::new();
    let mut chars = sql.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        let mut end = start + ch.len_utf8();
        if ch.is_alphanumeric() || ch == '_' {
            while let Some(&(i, next)) = chars.peek() {
                if !(next.is_alphanumeric() || next == '_') {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
        }
        let word = sql[start..end].to_ascii_lowercase();
        let keyword_kind = match word.as_str() {
            "select" | "from" | "where" => KeywordKind::ReservedKeyword,
            _ => KeywordKind::NoKeyword,
        };
        tokens.push(ScanToken {
            start: start as i32,
            end: end as i32,
            token: 0,
            keyword_kind: keyword_kind as i32,
        });
    }
    tokens
}

/// (location, newlines before, newlines after, text) of each comment.
fn fake_comments(sql: &str) -> Vec<(usize, usize, usize, String)> {
    let mut found = Vec::new();
    let mut offset = 0;
    while offset < sql.len() {
        let rest = &sql[offset..];
        let end = if rest.starts_with("/*") {
            rest.find("*/").map_or(sql.len(), |i| offset + i + 2)
        } else if rest.starts_with("--") {
            rest.find('\n').map_or(sql.len(), |i| offset + i)
        } else {
            offset += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        };
        let before = sql[..offset].bytes().rev().take_while(|&b| b == b'\n').count();
        let after = sql[end..].bytes().take_while(|&b| b == b'\n').count();
        found.push((offset, before, after, sql[offset..end].to_string()));
        offset = end;
    }
    found
}

unsafe fn decode_tree(tree: &sys::PgQueryProtobuf) -> Option<Vec<String>> {
    let bytes = if tree.data.is_null() || tree.len == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(tree.data as *const u8, tree.len)
    };
    let parsed = ParseResult::decode(bytes).ok()?;
    parsed
        .stmts
        .iter()
        .map(|stmt| match stmt.node() {
            Some(NodeEnum::String(text)) => Some(text.sval.clone()),
            _ => None,
        })
        .collect()
}

unsafe impl Engine for FakeEngine {
    unsafe fn normalize(&self, input_ptr: *const c_char) -> sys::PgQueryNormalizeResult {
        self.dispatch(None);
        let sql = input(input_ptr);
        let error = self.syntax_error(sql);
        let normalized_query = if error.is_null() {
            self.alloc_text(&fake_normalize(sql))
        } else {
            ptr::null_mut()
        };
        sys::PgQueryNormalizeResult {
            normalized_query,
            error,
        }
    }

    unsafe fn normalize_utility(&self, input_ptr: *const c_char) -> sys::PgQueryNormalizeResult {
        self.dispatch(None);
        let sql = input(input_ptr);
        sys::PgQueryNormalizeResult {
            normalized_query: self.alloc_text(&fake_normalize(sql).to_lowercase()),
            error: ptr::null_mut(),
        }
    }

    unsafe fn scan(&self, input_ptr: *const c_char) -> sys::PgQueryScanResult {
        self.dispatch(None);
        let sql = input(input_ptr);
        let result = ScanResult {
            version: sys::PG_VERSION_NUM,
            tokens: fake_tokens(sql),
        };
        sys::PgQueryScanResult {
            pbuf: self.alloc_protobuf(result.encode_to_vec()),
            stderr_buffer: ptr::null_mut(),
            error: ptr::null_mut(),
        }
    }

    unsafe fn parse_json(&self, input_ptr: *const c_char, options: c_int) -> sys::PgQueryParseResult {
        self.dispatch(Some(options));
        let sql = input(input_ptr);
        let error = self.syntax_error(sql);
        let parse_tree = if error.is_null() {
            let stmts: Vec<_> = statement_spans(sql)
                .into_iter()
                .map(|(location, len)| serde_json::json!({"stmt_location": location, "stmt_len": len}))
                .collect();
            let tree = serde_json::json!({"version": sys::PG_VERSION_NUM, "stmts": stmts});
            self.alloc_text(&tree.to_string())
        } else {
            ptr::null_mut()
        };
        sys::PgQueryParseResult {
            parse_tree,
            stderr_buffer: ptr::null_mut(),
            error,
        }
    }

    unsafe fn parse_protobuf(&self, input_ptr: *const c_char, options: c_int) -> sys::PgQueryProtobufParseResult {
        self.dispatch(Some(options));
        let sql = input(input_ptr);
        let error = self.syntax_error(sql);
        if !error.is_null() {
            return sys::PgQueryProtobufParseResult {
                parse_tree: sys::PgQueryProtobuf {
                    len: 0,
                    data: ptr::null_mut(),
                },
                stderr_buffer: ptr::null_mut(),
                error,
            };
        }
        let stmts: Vec<RawStmt> = statement_spans(sql)
            .into_iter()
            .map(|(location, len)| RawStmt {
                stmt: Some(statement_node(sql[location..location + len].trim())),
                stmt_location: location as i32,
                stmt_len: len as i32,
            })
            .collect();
        // An empty input encodes to an empty message, like the real engine.
        let tree = if stmts.is_empty() {
            Vec::new()
        } else {
            ParseResult {
                version: sys::PG_VERSION_NUM,
                stmts,
            }
            .encode_to_vec()
        };
        sys::PgQueryProtobufParseResult {
            parse_tree: self.alloc_protobuf(tree),
            stderr_buffer: ptr::null_mut(),
            error: ptr::null_mut(),
        }
    }

    unsafe fn parse_plpgsql(&self, input_ptr: *const c_char) -> sys::PgQueryPlpgsqlParseResult {
        self.dispatch(None);
        let sql = input(input_ptr);
        let error = self.syntax_error(sql);
        let plpgsql_funcs = if error.is_null() {
            self.alloc_text(r#"[{"PLpgSQL_function":{"datums":[]}}]"#)
        } else {
            ptr::null_mut()
        };
        sys::PgQueryPlpgsqlParseResult { plpgsql_funcs, error }
    }

    unsafe fn fingerprint(&self, input_ptr: *const c_char, options: c_int) -> sys::PgQueryFingerprintResult {
        self.dispatch(Some(options));
        let sql = input(input_ptr);
        let error = self.syntax_error(sql);
        if !error.is_null() {
            return sys::PgQueryFingerprintResult {
                fingerprint: 0,
                fingerprint_str: ptr::null_mut(),
                stderr_buffer: ptr::null_mut(),
                error,
            };
        }
        let value = fnv1a(&fake_normalize(sql).to_lowercase());
        sys::PgQueryFingerprintResult {
            fingerprint: value,
            fingerprint_str: self.alloc_text(&format!("{value:016x}")),
            stderr_buffer: ptr::null_mut(),
            error: ptr::null_mut(),
        }
    }

    unsafe fn split_with_scanner(&self, input_ptr: *const c_char) -> sys::PgQuerySplitResult {
        self.dispatch(None);
        self.split_result(input(input_ptr), false)
    }

    unsafe fn split_with_parser(&self, input_ptr: *const c_char) -> sys::PgQuerySplitResult {
        self.dispatch(None);
        self.split_result(input(input_ptr), true)
    }

    unsafe fn deparse_protobuf(&self, tree: sys::PgQueryProtobuf) -> sys::PgQueryDeparseResult {
        self.dispatch(None);
        match decode_tree(&tree) {
            Some(stmts) => sys::PgQueryDeparseResult {
                query: self.alloc_text(&stmts.join("; ")),
                error: ptr::null_mut(),
            },
            None => sys::PgQueryDeparseResult {
                query: ptr::null_mut(),
                error: self.alloc_error("failed to unpack protobuf parse tree", 0),
            },
        }
    }

    unsafe fn deparse_protobuf_opts(
        &self,
        tree: sys::PgQueryProtobuf,
        opts: sys::PostgresDeparseOpts,
    ) -> sys::PgQueryDeparseResult {
        let records: &[*mut sys::PostgresDeparseComment] = if opts.comment_count == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(opts.comments, opts.comment_count)
        };
        let comments = records
            .iter()
            .map(|&record| {
                let record = &*record;
                (
                    record.match_location,
                    record.newlines_before_comment,
                    record.newlines_after_comment,
                    CStr::from_ptr(record.str_).to_string_lossy().into_owned(),
                )
            })
            .collect();
        self.ledger.lock().last_deparse_opts = Some(CapturedDeparseOpts {
            pretty_print: opts.pretty_print,
            indent_size: opts.indent_size,
            max_line_length: opts.max_line_length,
            trailing_newline: opts.trailing_newline,
            commas_start_of_line: opts.commas_start_of_line,
            comments,
        });

        let mut result = self.deparse_protobuf(tree);
        if result.error.is_null() && opts.pretty_print && opts.trailing_newline {
            let text = CStr::from_ptr(result.query).to_bytes().to_vec();
            self.free_cstring(result.query);
            let mut text = text;
            text.push(b'\n');
            result.query = self.alloc_cstring(text);
        }
        result
    }

    unsafe fn deparse_comments_for_query(
        &self,
        input_ptr: *const c_char,
    ) -> Option<sys::PgQueryDeparseCommentsResult> {
        if self.without_optional {
            return None;
        }
        self.dispatch(None);
        let sql = input(input_ptr);
        let records: Vec<*mut sys::PostgresDeparseComment> = fake_comments(sql)
            .into_iter()
            .map(|(location, before, after, text)| {
                let record = sys::PostgresDeparseComment {
                    match_location: location as c_int,
                    newlines_before_comment: before as c_int,
                    newlines_after_comment: after as c_int,
                    str_: self.alloc_text(&text),
                };
                self.track(Box::into_raw(Box::new(record)))
            })
            .collect();
        let comment_count = records.len();
        let comments = if records.is_empty() {
            ptr::null_mut()
        } else {
            self.track(Box::into_raw(records.into_boxed_slice()) as *mut *mut sys::PostgresDeparseComment)
        };
        Some(sys::PgQueryDeparseCommentsResult {
            comments,
            comment_count,
            error: ptr::null_mut(),
        })
    }

    unsafe fn summary(
        &self,
        input_ptr: *const c_char,
        options: c_int,
        _truncate_limit: c_int,
    ) -> Option<sys::PgQuerySummaryParseResult> {
        if self.without_optional {
            return None;
        }
        self.dispatch(Some(options));
        let sql = input(input_ptr);
        let error = self.syntax_error(sql);
        let summary = if error.is_null() {
            self.alloc_protobuf(
                ParseResult {
                    version: sys::PG_VERSION_NUM,
                    stmts: Vec::new(),
                }
                .encode_to_vec(),
            )
        } else {
            sys::PgQueryProtobuf {
                len: 0,
                data: ptr::null_mut(),
            }
        };
        Some(sys::PgQuerySummaryParseResult {
            summary,
            stderr_buffer: ptr::null_mut(),
            error,
        })
    }

    unsafe fn free_normalize_result(&self, result: sys::PgQueryNormalizeResult) {
        self.release();
        self.free_cstring(result.normalized_query);
        self.free_error(result.error);
    }

    unsafe fn free_scan_result(&self, result: sys::PgQueryScanResult) {
        self.release();
        self.free_protobuf(result.pbuf);
        self.free_cstring(result.stderr_buffer);
        self.free_error(result.error);
    }

    unsafe fn free_parse_result(&self, result: sys::PgQueryParseResult) {
        self.release();
        self.free_cstring(result.parse_tree);
        self.free_cstring(result.stderr_buffer);
        self.free_error(result.error);
    }

    unsafe fn free_protobuf_parse_result(&self, result: sys::PgQueryProtobufParseResult) {
        self.release();
        self.free_protobuf(result.parse_tree);
        self.free_cstring(result.stderr_buffer);
        self.free_error(result.error);
    }

    unsafe fn free_plpgsql_parse_result(&self, result: sys::PgQueryPlpgsqlParseResult) {
        self.release();
        self.free_cstring(result.plpgsql_funcs);
        self.free_error(result.error);
    }

    unsafe fn free_fingerprint_result(&self, result: sys::PgQueryFingerprintResult) {
        self.release();
        self.free_cstring(result.fingerprint_str);
        self.free_cstring(result.stderr_buffer);
        self.free_error(result.error);
    }

    unsafe fn free_split_result(&self, result: sys::PgQuerySplitResult) {
        self.release();
        if !result.stmts.is_null() {
            self.untrack(result.stmts);
            let slice = ptr::slice_from_raw_parts_mut(result.stmts, result.n_stmts as usize);
            for stmt in Box::from_raw(slice).iter() {
                self.untrack(*stmt);
                drop(Box::from_raw(*stmt));
            }
        }
        self.free_cstring(result.stderr_buffer);
        self.free_error(result.error);
    }

    unsafe fn free_deparse_result(&self, result: sys::PgQueryDeparseResult) {
        self.release();
        self.free_cstring(result.query);
        self.free_error(result.error);
    }

    unsafe fn free_deparse_comments_result(&self, result: sys::PgQueryDeparseCommentsResult) {
        self.release();
        if !result.comments.is_null() {
            self.untrack(result.comments);
            let slice = ptr::slice_from_raw_parts_mut(result.comments, result.comment_count);
            for record in Box::from_raw(slice).iter() {
                self.untrack(*record);
                let record = Box::from_raw(*record);
                self.free_cstring(record.str_);
            }
        }
        self.free_error(result.error);
    }

    unsafe fn free_summary_parse_result(&self, result: sys::PgQuerySummaryParseResult) {
        self.release();
        self.free_protobuf(result.summary);
        self.free_cstring(result.stderr_buffer);
        self.free_error(result.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_spans_skip_blank_segments() {
        assert_eq!(statement_spans("select 1; select 2;"), vec![(0, 8), (9, 9)]);
        assert!(statement_spans(" ; ;").is_empty());
    }

    #[test]
    fn test_fake_normalize_is_idempotent() {
        let once = fake_normalize(" select  1 /* comment */ ");
        assert_eq!(once, "select 1");
        assert_eq!(fake_normalize(&once), once);
    }

    #[test]
    fn test_syntax_error_cursor() {
        assert_eq!(find_syntax_error("SELECT 1 FROM"), Some(14));
        assert_eq!(find_syntax_error("select 1"), None);
    }
}
