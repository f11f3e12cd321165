//! Parser options and their wire encoding, plus deparse presentation options.

use std::os::raw::c_int;

use bitflags::bitflags;
use pgquery_sys as sys;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Which grammar entry point the input is parsed with.
#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Ordinary SQL statements.
    #[default]
    Default = sys::PG_QUERY_PARSE_DEFAULT,
    /// A single type name, e.g. `int4` or `character varying(10)`.
    TypeName = sys::PG_QUERY_PARSE_TYPE_NAME,
    /// A PL/pgSQL expression.
    PlpgsqlExpr = sys::PG_QUERY_PARSE_PLPGSQL_EXPR,
    /// PL/pgSQL assignment to a simple variable.
    PlpgsqlAssign1 = sys::PG_QUERY_PARSE_PLPGSQL_ASSIGN1,
    /// PL/pgSQL assignment to a qualified variable.
    PlpgsqlAssign2 = sys::PG_QUERY_PARSE_PLPGSQL_ASSIGN2,
    /// PL/pgSQL assignment to a doubly qualified variable.
    PlpgsqlAssign3 = sys::PG_QUERY_PARSE_PLPGSQL_ASSIGN3,
}

impl TryFrom<i32> for ParseMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            sys::PG_QUERY_PARSE_DEFAULT => ParseMode::Default,
            sys::PG_QUERY_PARSE_TYPE_NAME => ParseMode::TypeName,
            sys::PG_QUERY_PARSE_PLPGSQL_EXPR => ParseMode::PlpgsqlExpr,
            sys::PG_QUERY_PARSE_PLPGSQL_ASSIGN1 => ParseMode::PlpgsqlAssign1,
            sys::PG_QUERY_PARSE_PLPGSQL_ASSIGN2 => ParseMode::PlpgsqlAssign2,
            sys::PG_QUERY_PARSE_PLPGSQL_ASSIGN3 => ParseMode::PlpgsqlAssign3,
            other => return Err(Error::InvalidParseMode(other)),
        })
    }
}

bitflags! {
    /// String-literal handling knobs, matching the PostgreSQL GUCs of the same name.
    ///
    /// Bits not listed here are kept (see [`ParserFlags::from_bits_retain`])
    /// and forwarded to the engine untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParserFlags: c_int {
        /// `backslash_quote = off`
        const DISABLE_BACKSLASH_QUOTE = sys::PG_QUERY_DISABLE_BACKSLASH_QUOTE;
        /// `standard_conforming_strings = off`
        const DISABLE_STANDARD_CONFORMING_STRINGS = sys::PG_QUERY_DISABLE_STANDARD_CONFORMING_STRINGS;
        /// `escape_string_warning = off`
        const DISABLE_ESCAPE_STRING_WARNING = sys::PG_QUERY_DISABLE_ESCAPE_STRING_WARNING;
    }
}

impl Default for ParserFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Mode and flags, kept apart until they reach the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    pub mode: ParseMode,
    pub flags: ParserFlags,
}

impl ParseOptions {
    pub fn new(mode: ParseMode, flags: ParserFlags) -> Self {
        Self { mode, flags }
    }

    pub fn with_mode(mode: ParseMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The `parser_options` integer: mode in the low nibble, flags above it.
    pub fn bits(&self) -> c_int {
        (self.mode as c_int & sys::PG_QUERY_PARSE_MODE_BITMASK) | self.flags.bits()
    }
}

impl From<ParseMode> for ParseOptions {
    fn from(mode: ParseMode) -> Self {
        Self::with_mode(mode)
    }
}

/// How a batch is cut into statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitAlgorithm {
    /// The scanner only: fast, tolerates statements the grammar rejects.
    #[default]
    Scanner,
    /// The full parser: handles tricky constructs, fails on invalid SQL.
    Parser,
}

/// Presentation options for deparsing a parse tree back to SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeparseOptions {
    /// Line breaks and indentation.
    pub pretty_print: bool,
    /// Spaces per indentation level.
    pub indent_size: u32,
    /// Wrapping hint; 0 means no limit.
    pub max_line_length: u32,
    /// End the output with a newline.
    pub trailing_newline: bool,
    /// Put commas at the start of wrapped lines instead of the end.
    pub commas_start_of_line: bool,
}

impl Default for DeparseOptions {
    fn default() -> Self {
        Self {
            pretty_print: true,
            indent_size: 2,
            max_line_length: 0,
            trailing_newline: true,
            commas_start_of_line: false,
        }
    }
}
