//! Raw C ABI of `libpg_query`.
//!
//! Every struct here is reproduced field-for-field from `pg_query.h` (and the
//! deparse additions in `postgres_deparse.h`). Most of them cross the boundary
//! *by value*, so field order, integer width and padding are part of the
//! contract. A change in the upstream header is a breaking change for this
//! crate: bump [`PG_VERSION_NUM`] and re-check the layout tests at the bottom.
//!
//! Nothing in this crate links against the library. Entry points are described
//! as function-pointer types plus their exported names in [`symbols`], and the
//! safe layer resolves them at runtime.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int};

/// PostgreSQL release the layouts below were taken from.
pub const PG_MAJORVERSION: &str = "17";
pub const PG_VERSION: &str = "17.5";
pub const PG_VERSION_NUM: c_int = 170005;

// --- Structs ---

/// Error record attached to every result when the engine fails.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryError {
    /// exception message
    pub message: *mut c_char,
    /// source function of exception (e.g. SearchSysCache)
    pub funcname: *mut c_char,
    /// source of exception (e.g. parse.l)
    pub filename: *mut c_char,
    /// source of exception (e.g. 104)
    pub lineno: c_int,
    /// char in query at which exception occurred
    pub cursorpos: c_int,
    /// additional context (optional, can be NULL)
    pub context: *mut c_char,
}

/// Length-prefixed protobuf payload. `len` is a `size_t`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryProtobuf {
    pub len: usize,
    pub data: *mut c_char,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryScanResult {
    pub pbuf: PgQueryProtobuf,
    pub stderr_buffer: *mut c_char,
    pub error: *mut PgQueryError,
}

/// JSON parse tree.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryParseResult {
    pub parse_tree: *mut c_char,
    pub stderr_buffer: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryProtobufParseResult {
    pub parse_tree: PgQueryProtobuf,
    pub stderr_buffer: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQuerySplitStmt {
    pub stmt_location: c_int,
    pub stmt_len: c_int,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQuerySplitResult {
    pub stmts: *mut *mut PgQuerySplitStmt,
    pub n_stmts: c_int,
    pub stderr_buffer: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryDeparseResult {
    pub query: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PostgresDeparseComment {
    pub match_location: c_int,
    pub newlines_before_comment: c_int,
    pub newlines_after_comment: c_int,
    pub str_: *mut c_char,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryDeparseCommentsResult {
    pub comments: *mut *mut PostgresDeparseComment,
    pub comment_count: usize,
    pub error: *mut PgQueryError,
}

/// Deparse options, passed BY VALUE to `pg_query_deparse_protobuf_opts`.
///
/// The `bool` fields are C `_Bool`, one byte each.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PostgresDeparseOpts {
    pub comments: *mut *mut PostgresDeparseComment,
    pub comment_count: usize,

    // Pretty print options
    pub pretty_print: bool,
    pub indent_size: c_int,
    pub max_line_length: c_int,
    pub trailing_newline: bool,
    pub commas_start_of_line: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryPlpgsqlParseResult {
    pub plpgsql_funcs: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryFingerprintResult {
    pub fingerprint: u64,
    pub fingerprint_str: *mut c_char,
    pub stderr_buffer: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQueryNormalizeResult {
    pub normalized_query: *mut c_char,
    pub error: *mut PgQueryError,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PgQuerySummaryParseResult {
    pub summary: PgQueryProtobuf,
    pub stderr_buffer: *mut c_char,
    pub error: *mut PgQueryError,
}

// --- Parser options ---

/// `PgQueryParseMode`.
pub type PgQueryParseMode = c_int;
pub const PG_QUERY_PARSE_DEFAULT: PgQueryParseMode = 0;
pub const PG_QUERY_PARSE_TYPE_NAME: PgQueryParseMode = 1;
pub const PG_QUERY_PARSE_PLPGSQL_EXPR: PgQueryParseMode = 2;
pub const PG_QUERY_PARSE_PLPGSQL_ASSIGN1: PgQueryParseMode = 3;
pub const PG_QUERY_PARSE_PLPGSQL_ASSIGN2: PgQueryParseMode = 4;
pub const PG_QUERY_PARSE_PLPGSQL_ASSIGN3: PgQueryParseMode = 5;

// The parse mode lives in the low bits; flags start right above it.
pub const PG_QUERY_PARSE_MODE_BITS: c_int = 4;
pub const PG_QUERY_PARSE_MODE_BITMASK: c_int = (1 << PG_QUERY_PARSE_MODE_BITS) - 1;

pub const PG_QUERY_DISABLE_BACKSLASH_QUOTE: c_int = 16;
pub const PG_QUERY_DISABLE_STANDARD_CONFORMING_STRINGS: c_int = 32;
pub const PG_QUERY_DISABLE_ESCAPE_STRING_WARNING: c_int = 64;

// --- Entry points ---

pub type PgQueryNormalizeFn = unsafe extern "C" fn(input: *const c_char) -> PgQueryNormalizeResult;
pub type PgQueryScanFn = unsafe extern "C" fn(input: *const c_char) -> PgQueryScanResult;
pub type PgQueryParseOptsFn =
    unsafe extern "C" fn(input: *const c_char, parser_options: c_int) -> PgQueryParseResult;
pub type PgQueryParseProtobufOptsFn =
    unsafe extern "C" fn(input: *const c_char, parser_options: c_int) -> PgQueryProtobufParseResult;
pub type PgQueryParsePlpgsqlFn = unsafe extern "C" fn(input: *const c_char) -> PgQueryPlpgsqlParseResult;
pub type PgQueryFingerprintOptsFn =
    unsafe extern "C" fn(input: *const c_char, parser_options: c_int) -> PgQueryFingerprintResult;
pub type PgQuerySplitFn = unsafe extern "C" fn(input: *const c_char) -> PgQuerySplitResult;
pub type PgQueryDeparseProtobufFn = unsafe extern "C" fn(parse_tree: PgQueryProtobuf) -> PgQueryDeparseResult;
pub type PgQueryDeparseProtobufOptsFn =
    unsafe extern "C" fn(parse_tree: PgQueryProtobuf, opts: PostgresDeparseOpts) -> PgQueryDeparseResult;
pub type PgQueryDeparseCommentsFn = unsafe extern "C" fn(query: *const c_char) -> PgQueryDeparseCommentsResult;
pub type PgQuerySummaryFn = unsafe extern "C" fn(
    input: *const c_char,
    parser_options: c_int,
    truncate_limit: c_int,
) -> PgQuerySummaryParseResult;

pub type PgQueryFreeNormalizeResultFn = unsafe extern "C" fn(result: PgQueryNormalizeResult);
pub type PgQueryFreeScanResultFn = unsafe extern "C" fn(result: PgQueryScanResult);
pub type PgQueryFreeParseResultFn = unsafe extern "C" fn(result: PgQueryParseResult);
pub type PgQueryFreeProtobufParseResultFn = unsafe extern "C" fn(result: PgQueryProtobufParseResult);
pub type PgQueryFreePlpgsqlParseResultFn = unsafe extern "C" fn(result: PgQueryPlpgsqlParseResult);
pub type PgQueryFreeFingerprintResultFn = unsafe extern "C" fn(result: PgQueryFingerprintResult);
pub type PgQueryFreeSplitResultFn = unsafe extern "C" fn(result: PgQuerySplitResult);
pub type PgQueryFreeDeparseResultFn = unsafe extern "C" fn(result: PgQueryDeparseResult);
pub type PgQueryFreeDeparseCommentsResultFn = unsafe extern "C" fn(result: PgQueryDeparseCommentsResult);
pub type PgQueryFreeSummaryParseResultFn = unsafe extern "C" fn(result: PgQuerySummaryParseResult);

/// Optional process-wide cleanup. `pg_query_init` is deprecated upstream
/// and a no-op in recent releases, but still exported.
pub type PgQueryLifecycleFn = unsafe extern "C" fn();

/// Exported symbol names, one per entry point the bindings call.
///
/// `pg_query_parse`, `pg_query_parse_protobuf` and `pg_query_fingerprint`
/// are left out: they are the `_opts` forms with options 0.
pub mod symbols {
    pub const NORMALIZE: &str = "pg_query_normalize";
    pub const NORMALIZE_UTILITY: &str = "pg_query_normalize_utility";
    pub const SCAN: &str = "pg_query_scan";
    pub const PARSE_OPTS: &str = "pg_query_parse_opts";
    pub const PARSE_PROTOBUF_OPTS: &str = "pg_query_parse_protobuf_opts";
    pub const PARSE_PLPGSQL: &str = "pg_query_parse_plpgsql";
    pub const FINGERPRINT_OPTS: &str = "pg_query_fingerprint_opts";
    pub const SPLIT_WITH_SCANNER: &str = "pg_query_split_with_scanner";
    pub const SPLIT_WITH_PARSER: &str = "pg_query_split_with_parser";
    pub const DEPARSE_PROTOBUF: &str = "pg_query_deparse_protobuf";
    pub const DEPARSE_PROTOBUF_OPTS: &str = "pg_query_deparse_protobuf_opts";
    pub const DEPARSE_COMMENTS_FOR_QUERY: &str = "pg_query_deparse_comments_for_query";
    pub const SUMMARY: &str = "pg_query_summary";

    pub const FREE_NORMALIZE_RESULT: &str = "pg_query_free_normalize_result";
    pub const FREE_SCAN_RESULT: &str = "pg_query_free_scan_result";
    pub const FREE_PARSE_RESULT: &str = "pg_query_free_parse_result";
    pub const FREE_PROTOBUF_PARSE_RESULT: &str = "pg_query_free_protobuf_parse_result";
    pub const FREE_PLPGSQL_PARSE_RESULT: &str = "pg_query_free_plpgsql_parse_result";
    pub const FREE_FINGERPRINT_RESULT: &str = "pg_query_free_fingerprint_result";
    pub const FREE_SPLIT_RESULT: &str = "pg_query_free_split_result";
    pub const FREE_DEPARSE_RESULT: &str = "pg_query_free_deparse_result";
    pub const FREE_DEPARSE_COMMENTS_RESULT: &str = "pg_query_free_deparse_comments_result";
    pub const FREE_SUMMARY_PARSE_RESULT: &str = "pg_query_free_summary_parse_result";

    pub const INIT: &str = "pg_query_init";
    pub const EXIT: &str = "pg_query_exit";
}


#[cfg(all(test, target_pointer_width = "64"))]
mod layout_tests {
    use super::*;
    use memoffset::offset_of;
    use std::mem::size_of;

    #[test]
    fn test_error_layout() {
        assert_eq!(offset_of!(PgQueryError, message), 0);
        assert_eq!(offset_of!(PgQueryError, funcname), 8);
        assert_eq!(offset_of!(PgQueryError, filename), 16);
        assert_eq!(offset_of!(PgQueryError, lineno), 24);
        assert_eq!(offset_of!(PgQueryError, cursorpos), 28);
        assert_eq!(offset_of!(PgQueryError, context), 32);
        assert_eq!(size_of::<PgQueryError>(), 40);
    }

    #[test]
    fn test_protobuf_results_layout() {
        assert_eq!(size_of::<PgQueryProtobuf>(), 16);
        assert_eq!(offset_of!(PgQueryProtobuf, data), 8);
        assert_eq!(offset_of!(PgQueryProtobufParseResult, stderr_buffer), 16);
        assert_eq!(offset_of!(PgQueryProtobufParseResult, error), 24);
        assert_eq!(offset_of!(PgQueryScanResult, error), 24);
        assert_eq!(offset_of!(PgQuerySummaryParseResult, error), 24);
        assert_eq!(size_of::<PgQueryScanResult>(), 32);
    }

    #[test]
    fn test_split_layout() {
        assert_eq!(size_of::<PgQuerySplitStmt>(), 8);
        // n_stmts is a C int followed by 4 bytes of padding.
        assert_eq!(offset_of!(PgQuerySplitResult, n_stmts), 8);
        assert_eq!(offset_of!(PgQuerySplitResult, stderr_buffer), 16);
        assert_eq!(offset_of!(PgQuerySplitResult, error), 24);
    }

    #[test]
    fn test_fingerprint_layout() {
        assert_eq!(offset_of!(PgQueryFingerprintResult, fingerprint), 0);
        assert_eq!(offset_of!(PgQueryFingerprintResult, fingerprint_str), 8);
        assert_eq!(offset_of!(PgQueryFingerprintResult, error), 24);
        assert_eq!(size_of::<PgQueryFingerprintResult>(), 32);
    }

    #[test]
    fn test_deparse_layout() {
        assert_eq!(offset_of!(PostgresDeparseComment, newlines_after_comment), 8);
        assert_eq!(offset_of!(PostgresDeparseComment, str_), 16);
        assert_eq!(size_of::<PostgresDeparseComment>(), 24);

        assert_eq!(offset_of!(PostgresDeparseOpts, comment_count), 8);
        assert_eq!(offset_of!(PostgresDeparseOpts, pretty_print), 16);
        assert_eq!(offset_of!(PostgresDeparseOpts, indent_size), 20);
        assert_eq!(offset_of!(PostgresDeparseOpts, max_line_length), 24);
        assert_eq!(offset_of!(PostgresDeparseOpts, trailing_newline), 28);
        assert_eq!(offset_of!(PostgresDeparseOpts, commas_start_of_line), 29);
        assert_eq!(size_of::<PostgresDeparseOpts>(), 32);
        assert_eq!(size_of::<bool>(), 1);

        assert_eq!(offset_of!(PgQueryDeparseCommentsResult, error), 16);
    }

    #[test]
    fn test_option_bits_do_not_overlap_mode() {
        for flag in [
            PG_QUERY_DISABLE_BACKSLASH_QUOTE,
            PG_QUERY_DISABLE_STANDARD_CONFORMING_STRINGS,
            PG_QUERY_DISABLE_ESCAPE_STRING_WARNING,
        ] {
            assert_eq!(flag & PG_QUERY_PARSE_MODE_BITMASK, 0);
        }
        assert!(PG_QUERY_PARSE_PLPGSQL_ASSIGN3 <= PG_QUERY_PARSE_MODE_BITMASK);
    }
}
