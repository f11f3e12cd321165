//! [`Engine`] over the real libpg_query shared library.
//!
//! The library is opened at runtime and every entry point is resolved once
//! into a typed function pointer. The `Library` handle lives next to the
//! pointers so they can never outlive the mapping.

use std::ffi::{OsStr, OsString};
use std::os::raw::{c_char, c_int};

use libloading::Library;
use once_cell::sync::OnceCell;
use pgquery_sys::{self as sys, symbols};

use crate::engine::Engine;
use crate::error::{Error, Result};

/// Environment variable overriding where the shared library is loaded from.
pub const LIBRARY_ENV: &str = "PGQUERY_LIBRARY";

struct Api {
    normalize: sys::PgQueryNormalizeFn,
    normalize_utility: sys::PgQueryNormalizeFn,
    scan: sys::PgQueryScanFn,
    parse_opts: sys::PgQueryParseOptsFn,
    parse_protobuf_opts: sys::PgQueryParseProtobufOptsFn,
    parse_plpgsql: sys::PgQueryParsePlpgsqlFn,
    fingerprint_opts: sys::PgQueryFingerprintOptsFn,
    split_with_scanner: sys::PgQuerySplitFn,
    split_with_parser: sys::PgQuerySplitFn,
    deparse_protobuf: sys::PgQueryDeparseProtobufFn,
    deparse_protobuf_opts: sys::PgQueryDeparseProtobufOptsFn,

    free_normalize_result: sys::PgQueryFreeNormalizeResultFn,
    free_scan_result: sys::PgQueryFreeScanResultFn,
    free_parse_result: sys::PgQueryFreeParseResultFn,
    free_protobuf_parse_result: sys::PgQueryFreeProtobufParseResultFn,
    free_plpgsql_parse_result: sys::PgQueryFreePlpgsqlParseResultFn,
    free_fingerprint_result: sys::PgQueryFreeFingerprintResultFn,
    free_split_result: sys::PgQueryFreeSplitResultFn,
    free_deparse_result: sys::PgQueryFreeDeparseResultFn,

    // Added in later releases; older builds of the library lack them.
    deparse_comments: Option<(sys::PgQueryDeparseCommentsFn, sys::PgQueryFreeDeparseCommentsResultFn)>,
    summary: Option<(sys::PgQuerySummaryFn, sys::PgQueryFreeSummaryParseResultFn)>,

    init: Option<sys::PgQueryLifecycleFn>,
    exit: Option<sys::PgQueryLifecycleFn>,
}

/// Resolves a required symbol.
///
/// # Safety
/// `T` must be the exact function-pointer type of `name`.
unsafe fn required<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|source| Error::MissingSymbol {
            symbol: name,
            source,
        })
}

/// Resolves a symbol that may be absent.
///
/// # Safety
/// `T` must be the exact function-pointer type of `name`.
unsafe fn optional<T: Copy>(library: &Library, name: &'static str) -> Option<T> {
    match library.get::<T>(name.as_bytes()) {
        Ok(symbol) => Some(*symbol),
        Err(_) => {
            log::debug!("libpg_query: optional symbol `{}` not found", name);
            None
        }
    }
}

impl Api {
    unsafe fn resolve(library: &Library) -> Result<Self> {
        let deparse_comments = match (
            optional(library, symbols::DEPARSE_COMMENTS_FOR_QUERY),
            optional(library, symbols::FREE_DEPARSE_COMMENTS_RESULT),
        ) {
            (Some(call), Some(free)) => Some((call, free)),
            _ => None,
        };
        let summary = match (
            optional(library, symbols::SUMMARY),
            optional(library, symbols::FREE_SUMMARY_PARSE_RESULT),
        ) {
            (Some(call), Some(free)) => Some((call, free)),
            _ => None,
        };

        Ok(Self {
            normalize: required(library, symbols::NORMALIZE)?,
            normalize_utility: required(library, symbols::NORMALIZE_UTILITY)?,
            scan: required(library, symbols::SCAN)?,
            parse_opts: required(library, symbols::PARSE_OPTS)?,
            parse_protobuf_opts: required(library, symbols::PARSE_PROTOBUF_OPTS)?,
            parse_plpgsql: required(library, symbols::PARSE_PLPGSQL)?,
            fingerprint_opts: required(library, symbols::FINGERPRINT_OPTS)?,
            split_with_scanner: required(library, symbols::SPLIT_WITH_SCANNER)?,
            split_with_parser: required(library, symbols::SPLIT_WITH_PARSER)?,
            deparse_protobuf: required(library, symbols::DEPARSE_PROTOBUF)?,
            deparse_protobuf_opts: required(library, symbols::DEPARSE_PROTOBUF_OPTS)?,
            free_normalize_result: required(library, symbols::FREE_NORMALIZE_RESULT)?,
            free_scan_result: required(library, symbols::FREE_SCAN_RESULT)?,
            free_parse_result: required(library, symbols::FREE_PARSE_RESULT)?,
            free_protobuf_parse_result: required(library, symbols::FREE_PROTOBUF_PARSE_RESULT)?,
            free_plpgsql_parse_result: required(library, symbols::FREE_PLPGSQL_PARSE_RESULT)?,
            free_fingerprint_result: required(library, symbols::FREE_FINGERPRINT_RESULT)?,
            free_split_result: required(library, symbols::FREE_SPLIT_RESULT)?,
            free_deparse_result: required(library, symbols::FREE_DEPARSE_RESULT)?,
            deparse_comments,
            summary,
            init: optional(library, symbols::INIT),
            exit: optional(library, symbols::EXIT),
        })
    }
}

/// A loaded libpg_query.
pub struct LibPgQuery {
    api: Api,
    path: OsString,
    // Must stay after `api`: the function pointers point into this mapping.
    _library: Library,
}

static GLOBAL: OnceCell<LibPgQuery> = OnceCell::new();

impl LibPgQuery {
    /// Opens the shared library at `path` and resolves the call catalog.
    pub fn open(path: impl AsRef<OsStr>) -> Result<Self> {
        let path = path.as_ref().to_os_string();
        log::debug!("Loading libpg_query from {:?}", path);

        // SAFETY: loading runs the library's initialisers; libpg_query has
        // no load-time side effects beyond static data.
        let library = unsafe { Library::new(&path) }.map_err(|source| Error::Load {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
        // SAFETY: symbol types come from the header mirror in pgquery-sys.
        let api = unsafe { Api::resolve(&library)? };

        log::info!(
            "libpg_query loaded from {:?} (deparse comments: {}, summary: {})",
            path,
            api.deparse_comments.is_some(),
            api.summary.is_some()
        );
        Ok(Self {
            api,
            path,
            _library: library,
        })
    }

    /// Where the library is looked up when no explicit path is given:
    /// `$PGQUERY_LIBRARY`, else the platform file name of `pg_query`
    /// resolved through the dynamic loader's search path.
    pub fn default_path() -> OsString {
        std::env::var_os(LIBRARY_ENV)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| libloading::library_filename("pg_query"))
    }

    /// The process-wide instance, loaded from [`LibPgQuery::default_path`]
    /// on first use. A failed load is not cached.
    pub fn global() -> Result<&'static LibPgQuery> {
        GLOBAL.get_or_try_init(|| Self::open(Self::default_path()))
    }

    /// Installs `path` as the process-wide instance. Returns the already
    /// installed instance if one exists.
    pub fn install_global(path: impl AsRef<OsStr>) -> Result<&'static LibPgQuery> {
        GLOBAL.get_or_try_init(|| Self::open(path))
    }

    pub fn path(&self) -> &OsStr {
        &self.path
    }

    pub fn supports_deparse_comments(&self) -> bool {
        self.api.deparse_comments.is_some()
    }

    pub fn supports_summary(&self) -> bool {
        self.api.summary.is_some()
    }
}

impl std::fmt::Debug for LibPgQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibPgQuery").field("path", &self.path).finish_non_exhaustive()
    }
}

unsafe impl Engine for LibPgQuery {
    unsafe fn normalize(&self, input: *const c_char) -> sys::PgQueryNormalizeResult {
        (self.api.normalize)(input)
    }

    unsafe fn normalize_utility(&self, input: *const c_char) -> sys::PgQueryNormalizeResult {
        (self.api.normalize_utility)(input)
    }

    unsafe fn scan(&self, input: *const c_char) -> sys::PgQueryScanResult {
        (self.api.scan)(input)
    }

    unsafe fn parse_json(&self, input: *const c_char, options: c_int) -> sys::PgQueryParseResult {
        (self.api.parse_opts)(input, options)
    }

    unsafe fn parse_protobuf(&self, input: *const c_char, options: c_int) -> sys::PgQueryProtobufParseResult {
        (self.api.parse_protobuf_opts)(input, options)
    }

    unsafe fn parse_plpgsql(&self, input: *const c_char) -> sys::PgQueryPlpgsqlParseResult {
        (self.api.parse_plpgsql)(input)
    }

    unsafe fn fingerprint(&self, input: *const c_char, options: c_int) -> sys::PgQueryFingerprintResult {
        (self.api.fingerprint_opts)(input, options)
    }

    unsafe fn split_with_scanner(&self, input: *const c_char) -> sys::PgQuerySplitResult {
        (self.api.split_with_scanner)(input)
    }

    unsafe fn split_with_parser(&self, input: *const c_char) -> sys::PgQuerySplitResult {
        (self.api.split_with_parser)(input)
    }

    unsafe fn deparse_protobuf(&self, tree: sys::PgQueryProtobuf) -> sys::PgQueryDeparseResult {
        (self.api.deparse_protobuf)(tree)
    }

    unsafe fn deparse_protobuf_opts(
        &self,
        tree: sys::PgQueryProtobuf,
        opts: sys::PostgresDeparseOpts,
    ) -> sys::PgQueryDeparseResult {
        (self.api.deparse_protobuf_opts)(tree, opts)
    }

    unsafe fn deparse_comments_for_query(
        &self,
        input: *const c_char,
    ) -> Option<sys::PgQueryDeparseCommentsResult> {
        self.api.deparse_comments.map(|(call, _)| call(input))
    }

    unsafe fn summary(
        &self,
        input: *const c_char,
        options: c_int,
        truncate_limit: c_int,
    ) -> Option<sys::PgQuerySummaryParseResult> {
        self.api
            .summary
            .map(|(call, _)| call(input, options, truncate_limit))
    }

    unsafe fn free_normalize_result(&self, result: sys::PgQueryNormalizeResult) {
        (self.api.free_normalize_result)(result)
    }

    unsafe fn free_scan_result(&self, result: sys::PgQueryScanResult) {
        (self.api.free_scan_result)(result)
    }

    unsafe fn free_parse_result(&self, result: sys::PgQueryParseResult) {
        (self.api.free_parse_result)(result)
    }

    unsafe fn free_protobuf_parse_result(&self, result: sys::PgQueryProtobufParseResult) {
        (self.api.free_protobuf_parse_result)(result)
    }

    unsafe fn free_plpgsql_parse_result(&self, result: sys::PgQueryPlpgsqlParseResult) {
        (self.api.free_plpgsql_parse_result)(result)
    }

    unsafe fn free_fingerprint_result(&self, result: sys::PgQueryFingerprintResult) {
        (self.api.free_fingerprint_result)(result)
    }

    unsafe fn free_split_result(&self, result: sys::PgQuerySplitResult) {
        (self.api.free_split_result)(result)
    }

    unsafe fn free_deparse_result(&self, result: sys::PgQueryDeparseResult) {
        (self.api.free_deparse_result)(result)
    }

    unsafe fn free_deparse_comments_result(&self, result: sys::PgQueryDeparseCommentsResult) {
        // Only reachable for results produced by `deparse_comments_for_query`,
        // which requires both symbols.
        if let Some((_, free)) = self.api.deparse_comments {
            free(result)
        }
    }

    unsafe fn free_summary_parse_result(&self, result: sys::PgQuerySummaryParseResult) {
        if let Some((_, free)) = self.api.summary {
            free(result)
        }
    }

    unsafe fn init(&self) {
        if let Some(init) = self.api.init {
            init()
        }
    }

    unsafe fn exit(&self) {
        if let Some(exit) = self.api.exit {
            log::debug!("libpg_query: exit");
            exit()
        }
    }
}
