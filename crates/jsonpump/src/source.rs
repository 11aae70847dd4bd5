//! Pull-based decoding from synchronous byte sources.
//!
//! A [`Source`] moves at most `limit` bytes into a [`ByteBuffer`] per pull.
//! A [`Reader`] owns a source and a buffer and alternates between trying the
//! current recognizer step speculatively and pulling more bytes, until the
//! step completes or the source is exhausted. Nothing is pulled unless a step
//! needs it.

use alloc::string::String;
use core::convert::Infallible;

use crate::{
    ByteBuffer, Entity, Flatten, JsonArray, JsonObject, JsonString, KeyValuePair, ParseError, ParserOptions,
    StreamError, Value,
    session::expect_end,
    speculative::attempt_once,
    tree::{TreeBuilder, TreeWalk, next_item_entity, next_member_entity},
};

/// Outcome of one pull from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulled {
    /// This many bytes were fed (possibly zero, e.g. for an empty chunk).
    Fed(usize),
    /// The source has no more bytes.
    Exhausted,
}

/// A synchronous byte source.
pub trait Source {
    /// Failure of the underlying source.
    type Error;

    /// Feeds at most `limit` bytes into `buf`.
    ///
    /// # Errors
    ///
    /// [`StreamError::Source`] if the source fails, or
    /// [`StreamError::Parse`] if the buffer rejects the bytes.
    fn pull(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<Pulled, StreamError<Self::Error>>;
}

/// A source over an iterator of byte chunks.
///
/// Chunks larger than the pull limit are split across pulls.
#[derive(Debug)]
pub struct IterSource<I: Iterator> {
    chunks: I,
    current: Option<I::Item>,
    offset: usize,
}

impl<I: Iterator> IterSource<I> {
    /// Wraps anything that yields byte chunks.
    pub fn new(chunks: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            chunks: chunks.into_iter(),
            current: None,
            offset: 0,
        }
    }
}

impl<I> Source for IterSource<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    type Error = Infallible;

    fn pull(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<Pulled, StreamError<Infallible>> {
        let mut fed = 0;
        while fed < limit {
            if self.current.is_none() {
                match self.chunks.next() {
                    Some(chunk) => {
                        self.current = Some(chunk);
                        self.offset = 0;
                    }
                    None if fed == 0 => return Ok(Pulled::Exhausted),
                    None => break,
                }
            }
            let Some(chunk) = &self.current else { break };
            let rest = &chunk.as_ref()[self.offset..];
            let take = rest.len().min(limit - fed);
            buf.feed(&rest[..take])?;
            fed += take;
            self.offset += take;
            if self.offset >= chunk.as_ref().len() {
                self.current = None;
            }
        }
        Ok(Pulled::Fed(fed))
    }
}

/// A source over a [`std::io::Read`].
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
    scratch: alloc::vec::Vec<u8>,
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ReadSource<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            scratch: alloc::vec::Vec::new(),
        }
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> Source for ReadSource<R> {
    type Error = std::io::Error;

    fn pull(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<Pulled, StreamError<std::io::Error>> {
        self.scratch.resize(limit, 0);
        let n = loop {
            match self.reader.read(&mut self.scratch) {
                Ok(n) => break n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(StreamError::Source(err)),
            }
        };
        if n == 0 {
            return Ok(Pulled::Exhausted);
        }
        buf.feed(&self.scratch[..n])?;
        Ok(Pulled::Fed(n))
    }
}

/// Drives recognizer steps against a synchronous [`Source`].
///
/// ```
/// use jsonpump::{IterSource, Reader};
///
/// let chunks = [&b"{\"a\": [1, 2"[..], b"], \"b\"", b": null}"];
/// let mut reader = Reader::new(IterSource::new(chunks));
/// let pairs: Vec<String> = reader
///     .key_values()
///     .map(|pair| pair.unwrap().to_string())
///     .collect();
/// assert_eq!(pairs, ["a[0] = 1", "a[1] = 2", "b = null"]);
/// ```
#[derive(Debug)]
pub struct Reader<S> {
    source: S,
    buf: ByteBuffer,
}

impl<S: Source> Reader<S> {
    /// A reader with default options.
    pub fn new(source: S) -> Self {
        Self::with_options(source, ParserOptions::default())
    }

    /// A reader configured by `options`.
    pub fn with_options(source: S, options: ParserOptions) -> Self {
        Self {
            source,
            buf: ByteBuffer::with_options(options),
        }
    }

    /// The reader's buffer.
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buf
    }

    /// Returns the source and the buffer.
    pub fn into_parts(self) -> (S, ByteBuffer) {
        (self.source, self.buf)
    }

    fn pump(&mut self) -> Result<(), StreamError<S::Error>> {
        let limit = self.buf.options().pump_size.max(1);
        match self.source.pull(limit, &mut self.buf)? {
            Pulled::Fed(n) => tracing::trace!(n, "pumped bytes"),
            Pulled::Exhausted => {
                tracing::trace!("source exhausted");
                self.buf.close();
            }
        }
        Ok(())
    }

    /// Runs `step` against `state` until it completes, pulling bytes between
    /// attempts.
    ///
    /// Once the source is exhausted, one last attempt runs against the closed
    /// buffer; running out of bytes there is [`ParseError::EndOfInput`].
    ///
    /// # Errors
    ///
    /// Source failures, and any unrecoverable error from `step`.
    pub fn attempt<St, T, F>(&mut self, state: &mut St, mut step: F) -> Result<T, StreamError<S::Error>>
    where
        St: Clone,
        F: FnMut(&mut St, &mut ByteBuffer) -> Result<T, ParseError>,
    {
        loop {
            if let Some(value) = attempt_once(state, &mut self.buf, &mut step)? {
                return Ok(value);
            }
            self.pump()?;
        }
    }

    /// Reads one complete document, which must be followed only by
    /// whitespace.
    ///
    /// The document is built one member or item per step, so the buffer
    /// only ever holds the token still open.
    ///
    /// # Errors
    ///
    /// As for [`attempt`](Self::attempt).
    pub fn read_value(&mut self) -> Result<Value, StreamError<S::Error>> {
        let value = self.materialize(TreeWalk::new())?;
        self.attempt(&mut (), |_, buf| expect_end(buf))?;
        Ok(value)
    }

    /// Drives `walk` to its end, building the value it visits.
    fn materialize(&mut self, mut walk: TreeWalk) -> Result<Value, StreamError<S::Error>> {
        let mut tree = TreeBuilder::default();
        loop {
            let event = self.attempt(&mut walk, TreeWalk::next_event)?;
            if let Some(value) = tree.apply(event) {
                return Ok(value);
            }
        }
    }

    /// Drives `walk` to its end, discarding what it reads.
    fn skip(&mut self, mut walk: TreeWalk) -> Result<(), StreamError<S::Error>> {
        while !walk.is_finished() {
            self.attempt(&mut walk, TreeWalk::next_event)?;
        }
        Ok(())
    }

    /// Visits the members of a root object one at a time.
    ///
    /// ```
    /// use jsonpump::{IterSource, Reader};
    ///
    /// let bytes = br#"{"skip": [1, 2, 3], "keep": {"n": 1}}"#;
    /// let mut reader = Reader::new(IterSource::new(bytes.chunks(4)));
    /// let mut members = reader.members();
    /// let mut kept = None;
    /// while let Some(key) = members.next_key() {
    ///     if key.unwrap() == "keep" {
    ///         kept = Some(members.read_value().unwrap());
    ///     }
    /// }
    /// assert_eq!(kept.unwrap().to_string(), r#"{"n":1}"#);
    /// ```
    pub fn members(&mut self) -> Members<'_, S> {
        Members {
            reader: self,
            object: JsonObject::new(),
            pending: None,
            done: false,
        }
    }

    /// Visits the items of a root array one at a time.
    ///
    /// ```
    /// use jsonpump::{IterSource, Reader};
    ///
    /// let bytes = br#"[{"id": 1}, {"id": 2}]"#;
    /// let mut reader = Reader::new(IterSource::new(bytes.chunks(3)));
    /// let ids: Vec<String> = reader.items().map(|item| item.unwrap().to_string()).collect();
    /// assert_eq!(ids, [r#"{"id":1}"#, r#"{"id":2}"#]);
    /// ```
    pub fn items(&mut self) -> Items<'_, S> {
        Items {
            reader: self,
            array: JsonArray::new(),
            pending: None,
            next_index: 0,
            done: false,
        }
    }

    /// Flattens the document into [`KeyValuePair`]s, pulling bytes only as
    /// each pair needs them.
    pub fn key_values(&mut self) -> KeyValues<'_, S> {
        KeyValues {
            reader: self,
            flatten: Flatten::new(),
            done: false,
        }
    }

    /// Streams the contents of a root string in chunks of
    /// [`string_chunk_size`](ParserOptions::string_chunk_size) bytes.
    pub fn string_chunks(&mut self) -> StringChunks<'_, S> {
        StringChunks {
            reader: self,
            string: JsonString::new(),
            done: false,
        }
    }
}

/// Iterator returned by [`Reader::key_values`].
///
/// Ends after the last pair or after the first error.
pub struct KeyValues<'a, S: Source> {
    reader: &'a mut Reader<S>,
    flatten: Flatten,
    done: bool,
}

impl<S: Source> Iterator for KeyValues<'_, S> {
    type Item = Result<KeyValuePair, StreamError<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match self.reader.attempt(&mut self.flatten, |flatten, buf| flatten.next_pair(buf)) {
            Ok(Some(pair)) => return Some(Ok(pair)),
            Ok(None) => self.reader.attempt(&mut (), |_, buf| expect_end(buf)),
            Err(err) => Err(err),
        };
        self.done = true;
        result.err().map(Err)
    }
}

/// Cursor returned by [`Reader::members`].
///
/// [`next_key`](Self::next_key) moves to the next member. Its value can then
/// be read with [`read_value`](Self::read_value) or skipped with
/// [`skip_value`](Self::skip_value); a value left alone is skipped when the
/// cursor moves on. Either way the value is walked one child at a time.
///
/// As an [`Iterator`], it yields every member with its value read. It ends
/// after the closing `}` or after the first error.
pub struct Members<'a, S: Source> {
    reader: &'a mut Reader<S>,
    object: JsonObject,
    /// Value of the current member, not read or skipped yet.
    pending: Option<Entity>,
    done: bool,
}

impl<S: Source> Members<'_, S> {
    /// Moves to the next member and returns its key.
    pub fn next_key(&mut self) -> Option<Result<String, StreamError<S::Error>>> {
        if self.done {
            return None;
        }
        let result = self.advance();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }

    fn advance(&mut self) -> Result<Option<String>, StreamError<S::Error>> {
        if let Some(entity) = self.pending.take() {
            self.reader.skip(TreeWalk::from_entity(entity))?;
        }
        if let Some((key, entity)) = self.reader.attempt(&mut self.object, next_member_entity)? {
            self.pending = Some(entity);
            return Ok(Some(key));
        }
        self.reader.attempt(&mut (), |_, buf| expect_end(buf))?;
        Ok(None)
    }

    /// Reads the current member's value.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] if there is no current member or its
    /// value was already read or skipped; otherwise as for
    /// [`Reader::attempt`].
    pub fn read_value(&mut self) -> Result<Value, StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.materialize(TreeWalk::from_entity(entity));
        self.done |= result.is_err();
        result
    }

    /// Skips the current member's value.
    ///
    /// # Errors
    ///
    /// As for [`read_value`](Self::read_value).
    pub fn skip_value(&mut self) -> Result<(), StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.skip(TreeWalk::from_entity(entity));
        self.done |= result.is_err();
        result
    }
}

impl<S: Source> Iterator for Members<'_, S> {
    type Item = Result<(String, Value), StreamError<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.next_key()? {
            Ok(key) => key,
            Err(err) => return Some(Err(err)),
        };
        Some(self.read_value().map(|value| (key, value)))
    }
}

/// Cursor returned by [`Reader::items`].
///
/// The array counterpart of [`Members`]: [`next_item`](Self::next_item)
/// moves to the next item and returns its index.
pub struct Items<'a, S: Source> {
    reader: &'a mut Reader<S>,
    array: JsonArray,
    pending: Option<Entity>,
    next_index: usize,
    done: bool,
}

impl<S: Source> Items<'_, S> {
    /// Moves to the next item and returns its index.
    pub fn next_item(&mut self) -> Option<Result<usize, StreamError<S::Error>>> {
        if self.done {
            return None;
        }
        let result = self.advance();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }

    fn advance(&mut self) -> Result<Option<usize>, StreamError<S::Error>> {
        if let Some(entity) = self.pending.take() {
            self.reader.skip(TreeWalk::from_entity(entity))?;
        }
        if let Some(entity) = self.reader.attempt(&mut self.array, next_item_entity)? {
            self.pending = Some(entity);
            let index = self.next_index;
            self.next_index += 1;
            return Ok(Some(index));
        }
        self.reader.attempt(&mut (), |_, buf| expect_end(buf))?;
        Ok(None)
    }

    /// Reads the current item.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] if there is no current item or it was
    /// already read or skipped; otherwise as for [`Reader::attempt`].
    pub fn read_value(&mut self) -> Result<Value, StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.materialize(TreeWalk::from_entity(entity));
        self.done |= result.is_err();
        result
    }

    /// Skips the current item.
    ///
    /// # Errors
    ///
    /// As for [`read_value`](Self::read_value).
    pub fn skip_value(&mut self) -> Result<(), StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.skip(TreeWalk::from_entity(entity));
        self.done |= result.is_err();
        result
    }
}

impl<S: Source> Iterator for Items<'_, S> {
    type Item = Result<Value, StreamError<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = self.next_item()? {
            return Some(Err(err));
        }
        Some(self.read_value())
    }
}

/// Iterator returned by [`Reader::string_chunks`].
pub struct StringChunks<'a, S: Source> {
    reader: &'a mut Reader<S>,
    string: JsonString,
    done: bool,
}

impl<S: Source> Iterator for StringChunks<'_, S> {
    type Item = Result<String, StreamError<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.attempt(&mut self.string, |string, buf| string.next_chunk(buf)) {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
