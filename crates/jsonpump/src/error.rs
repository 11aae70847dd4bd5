use alloc::string::String;
use core::fmt;

use bstr::ByteSlice;
use thiserror::Error;

use crate::entity::EntityKind;

/// Errors produced while recognizing JSON from a [`ByteBuffer`].
///
/// Only [`ParseError::NeedMoreData`] is recoverable: it is absorbed by the
/// nearest retry boundary ([`ByteBuffer::reset_on_fail`]) and turned into a
/// "feed me more input" signal. Every other variant ends the parse session.
///
/// [`ByteBuffer`]: crate::ByteBuffer
/// [`ByteBuffer::reset_on_fail`]: crate::ByteBuffer::reset_on_fail
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The buffer ran dry before the current production was complete, and
    /// end-of-input has not been signaled.
    #[error("more input is needed")]
    NeedMoreData,
    /// End-of-input was reached in the middle of a production.
    #[error("unexpected end of input")]
    EndOfInput,
    /// The input violates the JSON grammar.
    #[error("syntax error at byte {offset}: {kind}")]
    Syntax {
        /// What went wrong.
        kind: SyntaxError,
        /// Absolute offset of the cursor in the input stream.
        offset: usize,
    },
    /// A strict buffer limit was configured and feeding would exceed it.
    #[error("buffer would hold {len} bytes, exceeding the limit of {limit}")]
    BufferSizeExceeded {
        /// Retained bytes the feed would have produced.
        len: usize,
        /// The configured `max_buffer_size`.
        limit: usize,
    },
    /// The entity's content was already read.
    #[error("JSON entity has already been consumed")]
    AlreadyConsumed,
    /// Flattening needs an object or array at the root.
    #[error("cannot flatten a document whose root is a {0}")]
    NonCompositeRoot(EntityKind),
}

impl ParseError {
    /// Returns `true` if the error only means that more bytes are needed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NeedMoreData)
    }
}

/// Grammar violations reported through [`ParseError::Syntax`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// A fixed byte (punctuation or literal letter) did not match.
    #[error("expected {} but found {}", DisplayByte(.expected), DisplayByte(.found))]
    UnexpectedByte {
        /// The byte the grammar required.
        expected: u8,
        /// The byte in the input.
        found: u8,
    },
    /// The byte cannot start a JSON value.
    #[error("unexpected token {}", DisplayByte(.0))]
    UnexpectedToken(u8),
    /// A backslash was followed by an unknown escape letter.
    #[error("invalid escape sequence {}", DisplayByte(.0))]
    InvalidEscape(u8),
    /// A `\u` escape contained a non-hexadecimal digit.
    #[error("invalid unicode escape sequence at character {}", DisplayByte(.0))]
    InvalidUnicodeEscapeChar(u8),
    /// The numeric run could not be converted to an `f64`.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    /// Non-whitespace input follows a complete root value.
    #[error("trailing character {} after the root value", DisplayByte(.0))]
    TrailingCharacters(u8),
}

/// Error returned by the source-driven readers.
///
/// Mirrors a parse failure or a failure of the byte source itself.
#[derive(Error, Debug)]
pub enum StreamError<E> {
    /// The byte source failed.
    #[error("source error: {0}")]
    Source(E),
    /// The bytes could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl<E> StreamError<E> {
    /// Returns the parse error, if this is one.
    #[must_use]
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Source(_) => None,
        }
    }
}

struct DisplayByte<'a>(&'a u8);

impl fmt::Display for DisplayByte<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", core::slice::from_ref(self.0).escape_bytes())
    }
}
