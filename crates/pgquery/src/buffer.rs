//! NUL-terminated UTF-8 input buffers handed to the engine.

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::error::PreconditionError;

/// A SQL buffer the engine can read: exactly one trailing 0x00 and no other.
///
/// Text input is copied into an owned buffer that is dropped as soon as the
/// operation returns. Byte input is borrowed as-is; the borrow keeps the
/// caller's memory alive and in place for the whole native call.
#[derive(Debug, Clone)]
pub struct EncodedBuffer<'a> {
    inner: Cow<'a, CStr>,
}

impl EncodedBuffer<'static> {
    /// Allocates a NUL-terminated copy of `text`.
    pub fn from_text(text: &str) -> Result<Self, PreconditionError> {
        let owned = CString::new(text).map_err(|err| PreconditionError::InteriorNul {
            position: err.nul_position(),
        })?;
        Ok(Self {
            inner: Cow::Owned(owned),
        })
    }
}

impl<'a> EncodedBuffer<'a> {
    /// Borrows a caller-supplied buffer without copying it.
    ///
    /// The last byte must be 0x00 and no earlier byte may be.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, PreconditionError> {
        let (&last, body) = bytes.split_last().ok_or(PreconditionError::EmptyBuffer)?;
        if last != 0 {
            return Err(PreconditionError::MissingTerminator);
        }
        if let Some(position) = body.iter().position(|&b| b == 0) {
            return Err(PreconditionError::InteriorNul { position });
        }
        let cstr = CStr::from_bytes_with_nul(bytes)
            .map_err(|_| PreconditionError::InteriorNul { position: 0 })?;
        Ok(Self {
            inner: Cow::Borrowed(cstr),
        })
    }

    /// Pointer passed to the engine. Valid while `self` is alive.
    pub(crate) fn as_ptr(&self) -> *const c_char {
        self.inner.as_ptr()
    }

    /// The SQL bytes, without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.to_bytes()
    }

    /// Length in bytes, without the terminator.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Whether the buffer is the caller's memory rather than a copy.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.inner, Cow::Borrowed(_))
    }
}
