//! The native call catalog.
//!
//! [`Engine`] has one method per libpg_query entry point and one `free_*`
//! method per result shape. [`crate::LibPgQuery`] implements it over the real
//! shared library; the safe operations in [`crate::Parser`] only ever talk to
//! this trait.

use std::os::raw::{c_char, c_int};

use pgquery_sys as sys;

/// A libpg_query-compatible engine.
///
/// # Safety
///
/// Implementors promise the C contract of `pg_query.h`:
/// * every `*const c_char` argument is only read up to its NUL terminator and
///   only for the duration of the call;
/// * every returned result is either fully valid or carries a non-null
///   `error`, and stays valid until handed back to the matching `free_*`;
/// * `free_*` releases everything reachable from the result it is given;
/// * operation calls may run concurrently from several threads.
///
/// The optional entry points return `None` when the engine does not provide
/// them; their `free_*` counterparts are only called for results that were
/// actually produced.
pub unsafe trait Engine: Sync {
    unsafe fn normalize(&self, input: *const c_char) -> sys::PgQueryNormalizeResult;
    unsafe fn normalize_utility(&self, input: *const c_char) -> sys::PgQueryNormalizeResult;
    unsafe fn scan(&self, input: *const c_char) -> sys::PgQueryScanResult;
    unsafe fn parse_json(&self, input: *const c_char, options: c_int) -> sys::PgQueryParseResult;
    unsafe fn parse_protobuf(&self, input: *const c_char, options: c_int) -> sys::PgQueryProtobufParseResult;
    unsafe fn parse_plpgsql(&self, input: *const c_char) -> sys::PgQueryPlpgsqlParseResult;
    unsafe fn fingerprint(&self, input: *const c_char, options: c_int) -> sys::PgQueryFingerprintResult;
    unsafe fn split_with_scanner(&self, input: *const c_char) -> sys::PgQuerySplitResult;
    unsafe fn split_with_parser(&self, input: *const c_char) -> sys::PgQuerySplitResult;
    unsafe fn deparse_protobuf(&self, tree: sys::PgQueryProtobuf) -> sys::PgQueryDeparseResult;
    unsafe fn deparse_protobuf_opts(
        &self,
        tree: sys::PgQueryProtobuf,
        opts: sys::PostgresDeparseOpts,
    ) -> sys::PgQueryDeparseResult;
    unsafe fn deparse_comments_for_query(
        &self,
        input: *const c_char,
    ) -> Option<sys::PgQueryDeparseCommentsResult>;
    unsafe fn summary(
        &self,
        input: *const c_char,
        options: c_int,
        truncate_limit: c_int,
    ) -> Option<sys::PgQuerySummaryParseResult>;

    unsafe fn free_normalize_result(&self, result: sys::PgQueryNormalizeResult);
    unsafe fn free_scan_result(&self, result: sys::PgQueryScanResult);
    unsafe fn free_parse_result(&self, result: sys::PgQueryParseResult);
    unsafe fn free_protobuf_parse_result(&self, result: sys::PgQueryProtobufParseResult);
    unsafe fn free_plpgsql_parse_result(&self, result: sys::PgQueryPlpgsqlParseResult);
    unsafe fn free_fingerprint_result(&self, result: sys::PgQueryFingerprintResult);
    unsafe fn free_split_result(&self, result: sys::PgQuerySplitResult);
    unsafe fn free_deparse_result(&self, result: sys::PgQueryDeparseResult);
    unsafe fn free_deparse_comments_result(&self, result: sys::PgQueryDeparseCommentsResult);
    unsafe fn free_summary_parse_result(&self, result: sys::PgQuerySummaryParseResult);

    /// Process-wide setup. Must not run concurrently with any other call.
    unsafe fn init(&self) {}

    /// Process-wide teardown of the calling thread's engine state. Must not
    /// run concurrently with any other call.
    unsafe fn exit(&self) {}
}

macro_rules! forward_engine {
    ($($name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        $(
            unsafe fn $name(&self, $($arg: $ty),*) -> $ret {
                (**self).$name($($arg),*)
            }
        )*
    };
}

unsafe impl<E: Engine + ?Sized> Engine for &E {
    forward_engine! {
        normalize(input: *const c_char) -> sys::PgQueryNormalizeResult;
        normalize_utility(input: *const c_char) -> sys::PgQueryNormalizeResult;
        scan(input: *const c_char) -> sys::PgQueryScanResult;
        parse_json(input: *const c_char, options: c_int) -> sys::PgQueryParseResult;
        parse_protobuf(input: *const c_char, options: c_int) -> sys::PgQueryProtobufParseResult;
        parse_plpgsql(input: *const c_char) -> sys::PgQueryPlpgsqlParseResult;
        fingerprint(input: *const c_char, options: c_int) -> sys::PgQueryFingerprintResult;
        split_with_scanner(input: *const c_char) -> sys::PgQuerySplitResult;
        split_with_parser(input: *const c_char) -> sys::PgQuerySplitResult;
        deparse_protobuf(tree: sys::PgQueryProtobuf) -> sys::PgQueryDeparseResult;
        deparse_protobuf_opts(tree: sys::PgQueryProtobuf, opts: sys::PostgresDeparseOpts) -> sys::PgQueryDeparseResult;
        deparse_comments_for_query(input: *const c_char) -> Option<sys::PgQueryDeparseCommentsResult>;
        summary(input: *const c_char, options: c_int, truncate_limit: c_int) -> Option<sys::PgQuerySummaryParseResult>;
        free_normalize_result(result: sys::PgQueryNormalizeResult) -> ();
        free_scan_result(result: sys::PgQueryScanResult) -> ();
        free_parse_result(result: sys::PgQueryParseResult) -> ();
        free_protobuf_parse_result(result: sys::PgQueryProtobufParseResult) -> ();
        free_plpgsql_parse_result(result: sys::PgQueryPlpgsqlParseResult) -> ();
        free_fingerprint_result(result: sys::PgQueryFingerprintResult) -> ();
        free_split_result(result: sys::PgQuerySplitResult) -> ();
        free_deparse_result(result: sys::PgQueryDeparseResult) -> ();
        free_deparse_comments_result(result: sys::PgQueryDeparseCommentsResult) -> ();
        free_summary_parse_result(result: sys::PgQuerySummaryParseResult) -> ();
        init() -> ();
        exit() -> ();
    }
}
