//! Append-only byte window with lookahead and rollback.
//!
//! Every recognizer in the crate reads its input through a [`ByteBuffer`].
//! The buffer holds the bytes fed so far, a cursor marking how far they have
//! been consumed, and an end-of-input flag:
//!
//! - while end-of-input has not been signaled, running past the fed bytes is
//!   the recoverable [`ParseError::NeedMoreData`];
//! - once it has, [`ByteBuffer::peek`] answers `Ok(None)` and
//!   [`ByteBuffer::next`] fails with [`ParseError::EndOfInput`].
//!
//! [`ByteBuffer::reset_on_fail`] is the single backtracking primitive: it
//! remembers the cursor, runs an attempt, and rewinds if the attempt ran out
//! of bytes. Compaction (dropping the consumed prefix) shifts offsets, so it
//! is refused while any attempt is in flight; a lock depth counter tracks
//! nested attempts.

use alloc::vec::Vec;
use core::fmt;

use bstr::ByteSlice;

use crate::{ParseError, ParserOptions, SyntaxError};

/// JSON insignificant whitespace: space, tab, line feed, carriage return.
#[inline]
pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// The byte window shared by all entities of one parse session.
pub struct ByteBuffer {
    data: Vec<u8>,
    cursor: usize,
    /// Bytes dropped by compaction, so offsets stay absolute.
    discarded: usize,
    end_of_input: bool,
    lock_depth: usize,
    options: ParserOptions,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    /// Creates an empty buffer with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// Creates an empty buffer configured by `options`.
    #[must_use]
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            data: Vec::new(),
            cursor: 0,
            discarded: 0,
            end_of_input: false,
            lock_depth: 0,
            options,
        }
    }

    /// The session options carried by this buffer.
    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Number of bytes retained, consumed or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer retains no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes at or after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Absolute offset of the cursor in the input stream.
    #[must_use]
    pub fn position(&self) -> usize {
        self.discarded + self.cursor
    }

    /// Signals that no more bytes will be fed.
    pub fn close(&mut self) {
        self.end_of_input = true;
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.end_of_input
    }

    /// Returns `true` if input has ended and every byte was consumed.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.end_of_input && self.cursor >= self.data.len()
    }

    /// Returns `true` while a speculative attempt is in flight.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_depth > 0
    }

    /// Appends `bytes` to the tail of the buffer.
    ///
    /// # Errors
    ///
    /// With [`ParserOptions::strict_buffer_limit`] set, fails with
    /// [`ParseError::BufferSizeExceeded`] when the retained bytes would
    /// exceed [`ParserOptions::max_buffer_size`] even after compaction. The
    /// buffer is left unchanged in that case.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        if self.can_compact() {
            self.compact();
        }

        let limit = self.options.max_buffer_size;
        if self.data.len() + bytes.len() > limit {
            self.compact();
            let len = self.data.len() + bytes.len();
            if len > limit {
                if self.options.strict_buffer_limit {
                    tracing::warn!(len, limit, "feed rejected by the strict buffer limit");
                    return Err(ParseError::BufferSizeExceeded { len, limit });
                }
                tracing::debug!(len, limit, "buffer grows past its soft limit");
            }
        }

        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the byte `offset` positions after the cursor without
    /// consuming it.
    ///
    /// # Errors
    ///
    /// [`ParseError::NeedMoreData`] if the byte has not been fed yet and
    /// input is still open. Once closed, a missing byte is `Ok(None)`.
    pub fn peek(&self, offset: usize) -> Result<Option<u8>, ParseError> {
        match self.data.get(self.cursor + offset) {
            Some(&byte) => Ok(Some(byte)),
            None if self.end_of_input => Ok(None),
            None => Err(ParseError::NeedMoreData),
        }
    }

    /// Consumes and returns the next byte.
    ///
    /// # Errors
    ///
    /// [`ParseError::NeedMoreData`] if input is open and exhausted,
    /// [`ParseError::EndOfInput`] if it is closed and exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<u8, ParseError> {
        match self.data.get(self.cursor) {
            Some(&byte) => {
                self.cursor += 1;
                Ok(byte)
            }
            None if self.end_of_input => Err(ParseError::EndOfInput),
            None => Err(ParseError::NeedMoreData),
        }
    }

    /// Consumes the next byte and checks that it is `expected`.
    ///
    /// # Errors
    ///
    /// A mismatch is a [`SyntaxError::UnexpectedByte`]; running out of bytes
    /// fails as [`next`](Self::next) does.
    pub fn expect(&mut self, expected: u8) -> Result<u8, ParseError> {
        let found = self.next()?;
        if found == expected {
            Ok(found)
        } else {
            Err(ParseError::Syntax {
                kind: SyntaxError::UnexpectedByte { expected, found },
                offset: self.position() - 1,
            })
        }
    }

    /// Skips JSON whitespace.
    ///
    /// # Errors
    ///
    /// [`ParseError::NeedMoreData`] if the buffer runs dry while input is
    /// open: the next non-whitespace byte may still arrive.
    pub fn skip_whitespace(&mut self) -> Result<(), ParseError> {
        while let Some(byte) = self.peek(0)? {
            if !is_whitespace(byte) {
                break;
            }
            self.cursor += 1;
        }
        Ok(())
    }

    /// Returns `true` if compaction is allowed and worthwhile.
    #[must_use]
    pub fn can_compact(&self) -> bool {
        self.lock_depth == 0 && self.cursor > self.options.max_buffer_size
    }

    /// Discards the consumed prefix and resets the cursor to zero.
    ///
    /// Refused (returns `false`) while a speculative attempt is in flight or
    /// when nothing has been consumed.
    pub fn compact(&mut self) -> bool {
        if self.lock_depth > 0 || self.cursor == 0 {
            return false;
        }
        self.data.drain(..self.cursor);
        self.discarded += self.cursor;
        tracing::debug!(
            discarded = self.cursor,
            retained = self.data.len(),
            "compacted buffer"
        );
        self.cursor = 0;
        true
    }

    /// Runs `attempt`, rewinding the cursor if it runs out of bytes.
    ///
    /// - `Ok(Some(value))`: the attempt succeeded; the buffer is compacted
    ///   opportunistically when no outer attempt is in flight.
    /// - `Ok(None)`: the attempt needed more data; the cursor is back where
    ///   it started, so the same attempt can be repeated after feeding.
    ///
    /// # Errors
    ///
    /// Any error other than [`ParseError::NeedMoreData`] is returned as is.
    pub fn reset_on_fail<T, F>(&mut self, attempt: F) -> Result<Option<T>, ParseError>
    where
        F: FnOnce(&mut Self) -> Result<T, ParseError>,
    {
        let start = self.cursor;
        self.lock_depth += 1;
        let result = attempt(self);
        self.lock_depth -= 1;

        match result {
            Ok(value) => {
                if self.can_compact() {
                    self.compact();
                }
                Ok(Some(value))
            }
            Err(ParseError::NeedMoreData) => {
                tracing::trace!(
                    rewound = self.cursor.saturating_sub(start),
                    "attempt needs more data"
                );
                self.cursor = start;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Builds a syntax error located at the cursor.
    pub(crate) fn syntax_error(&self, kind: SyntaxError) -> ParseError {
        ParseError::Syntax {
            kind,
            offset: self.position(),
        }
    }

    /// Consumes one byte previously returned by [`peek`](Self::peek).
    #[inline]
    pub(crate) fn advance(&mut self) {
        debug_assert!(self.cursor < self.data.len());
        self.cursor += 1;
    }

    /// Cursor position to come back to with [`rewind`](Self::rewind). Only
    /// valid until the next compaction.
    #[inline]
    pub(crate) fn mark(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub(crate) fn rewind(&mut self, mark: usize) {
        debug_assert!(mark <= self.data.len());
        self.cursor = mark;
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("unread", &self.data[self.cursor..].as_bstr())
            .field("cursor", &self.cursor)
            .field("position", &self.position())
            .field("end_of_input", &self.end_of_input)
            .field("lock_depth", &self.lock_depth)
            .finish()
    }
}
