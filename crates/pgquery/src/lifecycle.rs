//! Ownership of engine-allocated results.
//!
//! Every native call returns a result struct that the engine owns until it is
//! handed back to the matching `free_*` function. [`Scoped`] wraps one such
//! result: the error pointer is inspected once, the payload is copied out
//! while the result is alive, and the free call runs exactly once from `Drop`
//! on every way out (success, engine error, materializer error or panic).

use std::ffi::CStr;
use std::os::raw::c_char;

use pgquery_sys as sys;

use crate::engine::Engine;
use crate::error::{EngineError, Error, Result};

/// A result struct returned by one of the engine entry points.
pub(crate) trait NativeResult: Copy {
    /// Short name used in logs.
    const KIND: &'static str;

    fn error(&self) -> *mut sys::PgQueryError;

    /// Hands the result back to the engine.
    ///
    /// # Safety
    /// Must be called exactly once per result, with the engine that produced it.
    unsafe fn release<E: Engine + ?Sized>(self, engine: &E);
}

macro_rules! native_result {
    ($($ty:ty => $kind:literal, $free:ident;)*) => {
        $(
            impl NativeResult for $ty {
                const KIND: &'static str = $kind;

                fn error(&self) -> *mut sys::PgQueryError {
                    self.error
                }

                unsafe fn release<E: Engine + ?Sized>(self, engine: &E) {
                    engine.$free(self)
                }
            }
        )*
    };
}

native_result! {
    sys::PgQueryNormalizeResult => "normalize", free_normalize_result;
    sys::PgQueryScanResult => "scan", free_scan_result;
    sys::PgQueryParseResult => "parse", free_parse_result;
    sys::PgQueryProtobufParseResult => "parse_protobuf", free_protobuf_parse_result;
    sys::PgQueryPlpgsqlParseResult => "parse_plpgsql", free_plpgsql_parse_result;
    sys::PgQueryFingerprintResult => "fingerprint", free_fingerprint_result;
    sys::PgQuerySplitResult => "split", free_split_result;
    sys::PgQueryDeparseResult => "deparse", free_deparse_result;
    sys::PgQueryDeparseCommentsResult => "deparse_comments", free_deparse_comments_result;
    sys::PgQuerySummaryParseResult => "summary", free_summary_parse_result;
}

/// Sole owner of one native result, from the call that produced it until it
/// is released.
pub(crate) struct Scoped<'e, E: Engine + ?Sized, R: NativeResult> {
    engine: &'e E,
    raw: R,
}

impl<'e, E: Engine + ?Sized, R: NativeResult> Scoped<'e, E, R> {
    /// Takes ownership of `raw`.
    ///
    /// # Safety
    /// `raw` must have just been returned by `engine` and must not be released
    /// through any other path.
    pub(crate) unsafe fn new(engine: &'e E, raw: R) -> Self {
        log::trace!("{} result acquired", R::KIND);
        Self { engine, raw }
    }

    /// Checks the error pointer, then either translates the error record or
    /// runs `materialize` over the payload. Nothing borrowed from the result
    /// may escape `materialize`; the result is released right after.
    pub(crate) fn extract<T>(self, materialize: impl FnOnce(&R) -> Result<T>) -> Result<T> {
        let error = self.raw.error();
        if !error.is_null() {
            // SAFETY: non-null error record owned by a result that is still alive.
            let err = unsafe { EngineError::from_native(error) };
            log::debug!("{} failed: {} (cursor {})", R::KIND, err.message, err.cursor_position);
            return Err(Error::Engine(err));
        }
        materialize(&self.raw)
    }
}

impl<E: Engine + ?Sized, R: NativeResult> Drop for Scoped<'_, E, R> {
    fn drop(&mut self) {
        // SAFETY: `Scoped` is the only owner and `drop` runs once.
        unsafe { self.raw.release(self.engine) };
        log::trace!("{} result released", R::KIND);
    }
}

// --- Extraction helpers ---
//
// All of these read engine memory, so they are only sound inside
// `Scoped::extract` (or while translating an error record).

/// Copies a C string, replacing invalid UTF-8. `None` for null.
pub(crate) unsafe fn lossy_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Copies a C string that must be UTF-8. Null yields an empty string.
pub(crate) unsafe fn utf8_string(ptr: *const c_char, what: &'static str) -> Result<String> {
    if ptr.is_null() {
        return Ok(String::new());
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_owned)
        .map_err(|source| Error::InvalidUtf8 { what, source })
}

/// Views a protobuf payload. Null data or zero length yields an empty slice.
pub(crate) unsafe fn protobuf_bytes<'r>(
    pbuf: &'r sys::PgQueryProtobuf,
    what: &'static str,
) -> Result<&'r [u8]> {
    if pbuf.data.is_null() || pbuf.len == 0 {
        return Ok(&[]);
    }
    let len = checked_len(pbuf.len, what)?;
    Ok(std::slice::from_raw_parts(pbuf.data as *const u8, len))
}

/// Views an engine-owned array of `count` pointers.
pub(crate) unsafe fn pointer_array<'r, T>(
    items: *const *mut T,
    count: usize,
    what: &'static str,
) -> Result<&'r [*mut T]> {
    if count == 0 {
        return Ok(&[]);
    }
    if items.is_null() {
        return Err(Error::OutOfRange {
            what,
            value: i64::try_from(count).unwrap_or(i64::MAX),
        });
    }
    let len = checked_len(count, what)?;
    Ok(std::slice::from_raw_parts(items, len))
}

/// A length that has to be addressable on this host.
fn checked_len(len: usize, what: &'static str) -> Result<usize> {
    if len > isize::MAX as usize {
        return Err(Error::OutOfRange {
            what,
            value: i64::try_from(len).unwrap_or(i64::MAX),
        });
    }
    Ok(len)
}

/// A C `int` count or offset that must not be negative.
pub(crate) fn non_negative(value: i32, what: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::OutOfRange {
        what,
        value: value.into(),
    })
}
