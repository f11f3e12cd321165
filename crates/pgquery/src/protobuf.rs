//! Protobuf payloads exchanged with libpg_query (`pg_query.proto`).
//!
//! The statement trees themselves are in [`crate::nodes`].

use prost::Message;

use crate::error::{Error, Result};
use crate::nodes::{Node, NodeEnum};

/// Top-level parse tree.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ParseResult {
    /// `PG_VERSION_NUM` of the grammar that produced the tree.
    #[prost(int32, tag = "1")]
    pub version: i32,
    #[prost(message, repeated, tag = "2")]
    pub stmts: Vec<RawStmt>,
}

/// One statement and where it sits in the input.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawStmt {
    #[prost(message, optional, tag = "1")]
    pub stmt: Option<Node>,
    /// Byte offset of the statement in the input.
    #[prost(int32, tag = "2")]
    pub stmt_location: i32,
    /// Length in bytes; 0 means "up to the end of the input".
    #[prost(int32, tag = "3")]
    pub stmt_len: i32,
}

impl RawStmt {
    /// The statement node (`SelectStmt`, `InsertStmt`, ...).
    pub fn node(&self) -> Option<&NodeEnum> {
        self.stmt.as_ref().and_then(|stmt| stmt.node.as_ref())
    }

    /// Field number of the statement kind in the `Node` oneof.
    pub fn node_tag(&self) -> Option<u32> {
        self.node().map(NodeEnum::tag)
    }
}

impl ParseResult {
    pub(crate) fn decode_payload(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Self::decode(bytes).map_err(|source| Error::Decode {
            what: "parse tree",
            source,
        })
    }
}

/// Scanner output.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ScanResult {
    #[prost(int32, tag = "1")]
    pub version: i32,
    #[prost(message, repeated, tag = "2")]
    pub tokens: Vec<ScanToken>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ScanToken {
    /// Byte offset of the first byte of the token.
    #[prost(int32, tag = "1")]
    pub start: i32,
    /// Byte offset one past the last byte of the token.
    #[prost(int32, tag = "2")]
    pub end: i32,
    /// Raw `Token` enum value from the grammar.
    #[prost(int32, tag = "4")]
    pub token: i32,
    #[prost(enumeration = "KeywordKind", tag = "5")]
    pub keyword_kind: i32,
}

impl ScanToken {
    /// The token's text, if the offsets fall inside `sql` on char boundaries.
    pub fn text<'a>(&self, sql: &'a str) -> Option<&'a str> {
        let start = usize::try_from(self.start).ok()?;
        let end = usize::try_from(self.end).ok()?;
        sql.get(start..end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum KeywordKind {
    NoKeyword = 0,
    UnreservedKeyword = 1,
    ColNameKeyword = 2,
    TypeFuncNameKeyword = 3,
    ReservedKeyword = 4,
}

impl ScanResult {
    pub(crate) fn decode_payload(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Self::decode(bytes).map_err(|source| Error::Decode {
            what: "scan result",
            source,
        })
    }
}
