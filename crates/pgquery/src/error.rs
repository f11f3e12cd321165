use miette::Diagnostic;
use pgquery_sys as sys;
use thiserror::Error;

use crate::lifecycle::lossy_string;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Caller input that was rejected before anything crossed the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PreconditionError {
    #[error("input buffer is empty; it must at least hold the NUL terminator")]
    #[diagnostic(code(pgquery::buffer::empty))]
    EmptyBuffer,

    #[error("input buffer must be NUL-terminated (last byte == 0x00)")]
    #[diagnostic(
        code(pgquery::buffer::missing_terminator),
        help("append a single 0x00 byte, or pass the SQL as text instead")
    )]
    MissingTerminator,

    #[error("input contains a NUL byte at offset {position}; only the terminator may be NUL")]
    #[diagnostic(code(pgquery::buffer::interior_nul))]
    InteriorNul { position: usize },

    #[error("{field} value {value} does not fit in a C int")]
    #[diagnostic(code(pgquery::deparse::value_too_large))]
    ValueTooLarge { field: &'static str, value: u64 },
}

/// An error reported by libpg_query itself, copied out of the native
/// `PgQueryError` record before the result holding it was released.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(pgquery::engine))]
pub struct EngineError {
    /// The PostgreSQL error message.
    pub message: String,
    /// Engine function that raised the error (e.g. `scanner_yyerror`).
    pub function: Option<String>,
    /// Engine source file that raised the error (e.g. `scan.l`).
    pub file: Option<String>,
    /// Line in `file`, 0 if unknown.
    pub line: u32,
    /// Byte offset into the SQL text, 0 if unknown.
    pub cursor_position: u32,
    /// Additional context, if the engine supplied any.
    #[help]
    pub context: Option<String>,
}

impl EngineError {
    pub(crate) const FALLBACK_MESSAGE: &'static str = "unknown error";

    /// Copies a native error record into managed memory.
    ///
    /// # Safety
    /// `record` must be non-null and point to a live `PgQueryError` whose
    /// string fields are either null or NUL-terminated. The owning result must
    /// not have been released yet.
    pub(crate) unsafe fn from_native(record: *const sys::PgQueryError) -> Self {
        let record = &*record;
        let message = lossy_string(record.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| Self::FALLBACK_MESSAGE.to_string());
        Self {
            message,
            function: lossy_string(record.funcname),
            file: lossy_string(record.filename),
            line: u32::try_from(record.lineno).unwrap_or(0),
            cursor_position: u32::try_from(record.cursorpos).unwrap_or(0),
            context: lossy_string(record.context),
        }
    }

    /// `file:line` of the engine code that raised the error, when known.
    pub fn source_location(&self) -> Option<String> {
        match (&self.file, self.line) {
            (Some(file), 0) => Some(file.clone()),
            (Some(file), line) => Some(format!("{file}:{line}")),
            (None, 0) => None,
            (None, line) => Some(format!("line {line}")),
        }
    }
}

/// Errors returned by every pgquery operation.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid parse mode {0}; expected a value between 0 and 5")]
    #[diagnostic(code(pgquery::options::parse_mode))]
    InvalidParseMode(i32),

    #[error("failed to decode {what} payload returned by the engine")]
    #[diagnostic(code(pgquery::decode))]
    Decode {
        what: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("engine returned {what} that is not valid UTF-8")]
    #[diagnostic(code(pgquery::utf8))]
    InvalidUtf8 {
        what: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("failed to decode {what} JSON returned by the engine")]
    #[diagnostic(code(pgquery::json))]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("engine returned an out-of-range {what}: {value}")]
    #[diagnostic(code(pgquery::out_of_range))]
    OutOfRange { what: &'static str, value: i64 },

    #[error("statement span [{location}..{location}+{length}) does not fit the {input_len}-byte input")]
    #[diagnostic(code(pgquery::split::span))]
    SpanOutOfBounds {
        location: usize,
        length: usize,
        input_len: usize,
    },

    #[error("failed to load libpg_query from {path}")]
    #[diagnostic(
        code(pgquery::library::load),
        help("set PGQUERY_LIBRARY to the path of the libpg_query shared library")
    )]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("libpg_query does not export `{symbol}`")]
    #[diagnostic(code(pgquery::library::symbol))]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("the loaded engine does not provide `{symbol}`")]
    #[diagnostic(code(pgquery::library::unsupported))]
    Unsupported { symbol: &'static str },
}

impl Error {
    /// The engine error, if this failure was reported by libpg_query.
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            Error::Engine(err) => Some(err),
            _ => None,
        }
    }
}
