//! Pull-based decoding from asynchronous byte sources.
//!
//! The async counterpart of [`source`](crate::source): an [`AsyncReader`]
//! runs the same speculative steps as a [`Reader`](crate::Reader) and only
//! awaits its [`AsyncSource`] when a step runs out of bytes. Recognition
//! itself is synchronous, so the only suspension points are the pulls.

use alloc::{string::String, vec::Vec};
use std::io;

use futures_util::{
    io::{AsyncRead, AsyncReadExt},
    stream::{self, Stream, StreamExt},
};

use crate::{
    ByteBuffer, Entity, Flatten, JsonArray, JsonObject, JsonString, KeyValuePair, ParseError, ParserOptions,
    Pulled, StreamError, Value,
    session::expect_end,
    speculative::attempt_once,
    tree::{TreeBuilder, TreeWalk, next_item_entity, next_member_entity},
};

/// An asynchronous byte source.
pub trait AsyncSource {
    /// Failure of the underlying source.
    type Error;

    /// Feeds at most `limit` bytes into `buf`.
    ///
    /// # Errors
    ///
    /// [`StreamError::Source`] if the source fails, or
    /// [`StreamError::Parse`] if the buffer rejects the bytes.
    fn pull(
        &mut self,
        limit: usize,
        buf: &mut ByteBuffer,
    ) -> impl Future<Output = Result<Pulled, StreamError<Self::Error>>>;
}

/// A chunk taken from a stream and not fully fed yet.
#[derive(Debug)]
struct Partial<B> {
    bytes: B,
    offset: usize,
}

impl<B: AsRef<[u8]>> Partial<B> {
    fn new(bytes: B) -> Self {
        Self { bytes, offset: 0 }
    }

    fn feed_into(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<usize, ParseError> {
        let rest = &self.bytes.as_ref()[self.offset..];
        let take = rest.len().min(limit);
        buf.feed(&rest[..take])?;
        self.offset += take;
        Ok(take)
    }

    fn is_spent(&self) -> bool {
        self.offset >= self.bytes.as_ref().len()
    }
}

/// Feeds from `partial`, dropping it once it is spent.
fn feed_partial<B: AsRef<[u8]>>(
    partial: &mut Option<Partial<B>>,
    limit: usize,
    buf: &mut ByteBuffer,
) -> Result<Pulled, ParseError> {
    let Some(chunk) = partial else {
        return Ok(Pulled::Fed(0));
    };
    let fed = chunk.feed_into(limit, buf)?;
    if chunk.is_spent() {
        *partial = None;
    }
    Ok(Pulled::Fed(fed))
}

/// A source over a [`Stream`] of byte chunks.
///
/// Each pull feeds from at most one stream item; the remainder of an item
/// larger than the pull limit is kept for the next pull.
#[derive(Debug)]
pub struct StreamSource<S: Stream> {
    stream: S,
    current: Option<Partial<S::Item>>,
}

impl<S: Stream> StreamSource<S> {
    /// Wraps a stream of byte chunks.
    pub fn new(stream: S) -> Self {
        Self { stream, current: None }
    }
}

impl<S> AsyncSource for StreamSource<S>
where
    S: Stream + Unpin,
    S::Item: AsRef<[u8]>,
{
    type Error = core::convert::Infallible;

    async fn pull(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<Pulled, StreamError<Self::Error>> {
        if self.current.is_none() {
            match self.stream.next().await {
                Some(chunk) => self.current = Some(Partial::new(chunk)),
                None => return Ok(Pulled::Exhausted),
            }
        }
        Ok(feed_partial(&mut self.current, limit, buf)?)
    }
}

/// A source over a fallible [`Stream`], such as a response body.
///
/// The first `Err` item ends decoding with [`StreamError::Source`].
#[derive(Debug)]
pub struct TryStreamSource<S, B> {
    stream: S,
    current: Option<Partial<B>>,
}

impl<S, B, E> TryStreamSource<S, B>
where
    S: Stream<Item = Result<B, E>>,
{
    /// Wraps a stream of `Result`s of byte chunks.
    pub fn new(stream: S) -> Self {
        Self { stream, current: None }
    }
}

impl<S, B, E> AsyncSource for TryStreamSource<S, B>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    type Error = E;

    async fn pull(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<Pulled, StreamError<E>> {
        if self.current.is_none() {
            match self.stream.next().await {
                Some(Ok(chunk)) => self.current = Some(Partial::new(chunk)),
                Some(Err(err)) => return Err(StreamError::Source(err)),
                None => return Ok(Pulled::Exhausted),
            }
        }
        Ok(feed_partial(&mut self.current, limit, buf)?)
    }
}

/// A source over an [`AsyncRead`]: one bounded read per pull.
#[derive(Debug)]
pub struct AsyncReadSource<R> {
    reader: R,
    scratch: Vec<u8>,
}

impl<R: AsyncRead + Unpin> AsyncReadSource<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            scratch: Vec::new(),
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncSource for AsyncReadSource<R> {
    type Error = io::Error;

    async fn pull(&mut self, limit: usize, buf: &mut ByteBuffer) -> Result<Pulled, StreamError<io::Error>> {
        self.scratch.resize(limit, 0);
        let n = loop {
            match self.reader.read(&mut self.scratch).await {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
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

/// Drives recognizer steps against an [`AsyncSource`].
///
/// ```
/// use futures::{executor::block_on, stream};
/// use jsonpump::{AsyncReader, StreamSource};
///
/// let chunks = stream::iter([&b"[1, {\"a\""[..], b": \"b\"}]"]);
/// let mut reader = AsyncReader::new(StreamSource::new(chunks));
/// let value = block_on(reader.read_value()).unwrap();
/// assert_eq!(value.to_string(), r#"[1,{"a":"b"}]"#);
/// ```
#[derive(Debug)]
pub struct AsyncReader<S> {
    source: S,
    buf: ByteBuffer,
}

impl<S: AsyncSource> AsyncReader<S> {
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

    async fn pump(&mut self) -> Result<(), StreamError<S::Error>> {
        let limit = self.buf.options().pump_size.max(1);
        match self.source.pull(limit, &mut self.buf).await? {
            Pulled::Fed(n) => tracing::trace!(n, "pumped bytes"),
            Pulled::Exhausted => {
                tracing::trace!("source exhausted");
                self.buf.close();
            }
        }
        Ok(())
    }

    /// Runs `step` against `state` until it completes, awaiting the source
    /// between attempts.
    ///
    /// # Errors
    ///
    /// Source failures, and any unrecoverable error from `step`. Running out
    /// of bytes after the source is exhausted is [`ParseError::EndOfInput`].
    pub async fn attempt<St, T, F>(&mut self, state: &mut St, mut step: F) -> Result<T, StreamError<S::Error>>
    where
        St: Clone,
        F: FnMut(&mut St, &mut ByteBuffer) -> Result<T, ParseError>,
    {
        loop {
            if let Some(value) = attempt_once(state, &mut self.buf, &mut step)? {
                return Ok(value);
            }
            self.pump().await?;
        }
    }

    /// Reads one complete document, which must be followed only by
    /// whitespace.
    ///
    /// # Errors
    ///
    /// As for [`attempt`](Self::attempt).
    pub async fn read_value(&mut self) -> Result<Value, StreamError<S::Error>> {
        let value = self.materialize(TreeWalk::new()).await?;
        self.attempt(&mut (), |_, buf| expect_end(buf)).await?;
        Ok(value)
    }

    async fn materialize(&mut self, mut walk: TreeWalk) -> Result<Value, StreamError<S::Error>> {
        let mut tree = TreeBuilder::default();
        loop {
            let event = self.attempt(&mut walk, TreeWalk::next_event).await?;
            if let Some(value) = tree.apply(event) {
                return Ok(value);
            }
        }
    }

    async fn skip(&mut self, mut walk: TreeWalk) -> Result<(), StreamError<S::Error>> {
        while !walk.is_finished() {
            self.attempt(&mut walk, TreeWalk::next_event).await?;
        }
        Ok(())
    }

    /// Visits the members of a root object one at a time, awaiting the
    /// source only when a step runs out of bytes.
    ///
    /// ```
    /// use futures::{executor::block_on, stream};
    /// use jsonpump::{AsyncReader, StreamSource};
    ///
    /// let bytes = br#"{"huge": [[1], [2]], "name": "pump"}"#;
    /// let mut reader = AsyncReader::new(StreamSource::new(stream::iter(bytes.chunks(1))));
    /// let mut members = reader.members();
    /// block_on(async {
    ///     assert_eq!(members.next_key().await.unwrap().unwrap(), "huge");
    ///     members.skip_value().await.unwrap();
    ///     let (key, value) = members.next().await.unwrap().unwrap();
    ///     assert_eq!((key.as_str(), value.as_str()), ("name", Some("pump")));
    ///     assert!(members.next().await.is_none());
    /// });
    /// ```
    pub fn members(&mut self) -> AsyncMembers<'_, S> {
        AsyncMembers {
            reader: self,
            object: JsonObject::new(),
            pending: None,
            done: false,
        }
    }

    /// Visits the items of a root array one at a time.
    pub fn items(&mut self) -> AsyncItems<'_, S> {
        AsyncItems {
            reader: self,
            array: JsonArray::new(),
            pending: None,
            next_index: 0,
            done: false,
        }
    }

    /// Flattens the document into [`KeyValuePair`]s, awaiting the source
    /// only as each pair needs more bytes.
    pub fn key_values(&mut self) -> AsyncKeyValues<'_, S> {
        AsyncKeyValues {
            reader: self,
            flatten: Flatten::new(),
            done: false,
        }
    }

    /// Streams the contents of a root string in chunks of
    /// [`string_chunk_size`](ParserOptions::string_chunk_size) bytes.
    pub fn string_chunks(&mut self) -> AsyncStringChunks<'_, S> {
        AsyncStringChunks {
            reader: self,
            string: JsonString::new(),
            done: false,
        }
    }
}

/// Pairs produced by [`AsyncReader::key_values`].
///
/// ```
/// use futures::{executor::block_on, stream, StreamExt};
/// use jsonpump::{AsyncReader, StreamSource};
///
/// let bytes = br#"{"a": {"b": [true, null]}}"#;
/// let mut reader = AsyncReader::new(StreamSource::new(stream::iter(bytes.chunks(1))));
/// let lines: Vec<String> = block_on(
///     reader
///         .key_values()
///         .into_stream()
///         .map(|pair| pair.unwrap().to_string())
///         .collect(),
/// );
/// assert_eq!(lines, ["a.b[0] = true", "a.b[1] = null"]);
/// ```
pub struct AsyncKeyValues<'a, S: AsyncSource> {
    reader: &'a mut AsyncReader<S>,
    flatten: Flatten,
    done: bool,
}

impl<S: AsyncSource> AsyncKeyValues<'_, S> {
    /// The next pair, or `None` after the last pair or the first error.
    pub async fn next(&mut self) -> Option<Result<KeyValuePair, StreamError<S::Error>>> {
        if self.done {
            return None;
        }
        let result = match self
            .reader
            .attempt(&mut self.flatten, |flatten, buf| flatten.next_pair(buf))
            .await
        {
            Ok(Some(pair)) => return Some(Ok(pair)),
            Ok(None) => self.reader.attempt(&mut (), |_, buf| expect_end(buf)).await,
            Err(err) => Err(err),
        };
        self.done = true;
        result.err().map(Err)
    }

    /// Adapts the pairs into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<KeyValuePair, StreamError<S::Error>>> {
        stream::unfold(self, |mut pairs| async move {
            let item = pairs.next().await?;
            Some((item, pairs))
        })
    }
}

/// Cursor returned by [`AsyncReader::members`].
///
/// Works like [`Members`](crate::Members): a value that is neither read nor
/// skipped is skipped when the cursor moves on.
pub struct AsyncMembers<'a, S: AsyncSource> {
    reader: &'a mut AsyncReader<S>,
    object: JsonObject,
    pending: Option<Entity>,
    done: bool,
}

impl<S: AsyncSource> AsyncMembers<'_, S> {
    /// Moves to the next member and returns its key, or `None` after the
    /// closing `}` or the first error.
    pub async fn next_key(&mut self) -> Option<Result<String, StreamError<S::Error>>> {
        if self.done {
            return None;
        }
        let result = self.advance().await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }

    async fn advance(&mut self) -> Result<Option<String>, StreamError<S::Error>> {
        if let Some(entity) = self.pending.take() {
            self.reader.skip(TreeWalk::from_entity(entity)).await?;
        }
        if let Some((key, entity)) = self.reader.attempt(&mut self.object, next_member_entity).await? {
            self.pending = Some(entity);
            return Ok(Some(key));
        }
        self.reader.attempt(&mut (), |_, buf| expect_end(buf)).await?;
        Ok(None)
    }

    /// Reads the current member's value.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] if there is no current member or its
    /// value was already read or skipped; otherwise as for
    /// [`AsyncReader::attempt`].
    pub async fn read_value(&mut self) -> Result<Value, StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.materialize(TreeWalk::from_entity(entity)).await;
        self.done |= result.is_err();
        result
    }

    /// Skips the current member's value.
    ///
    /// # Errors
    ///
    /// As for [`read_value`](Self::read_value).
    pub async fn skip_value(&mut self) -> Result<(), StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.skip(TreeWalk::from_entity(entity)).await;
        self.done |= result.is_err();
        result
    }

    /// The next member with its value read.
    pub async fn next(&mut self) -> Option<Result<(String, Value), StreamError<S::Error>>> {
        let key = match self.next_key().await? {
            Ok(key) => key,
            Err(err) => return Some(Err(err)),
        };
        Some(self.read_value().await.map(|value| (key, value)))
    }

    /// Adapts the members into a [`Stream`] of `(key, value)` pairs.
    pub fn into_stream(self) -> impl Stream<Item = Result<(String, Value), StreamError<S::Error>>> {
        stream::unfold(self, |mut members| async move {
            let item = members.next().await?;
            Some((item, members))
        })
    }
}

/// Cursor returned by [`AsyncReader::items`].
pub struct AsyncItems<'a, S: AsyncSource> {
    reader: &'a mut AsyncReader<S>,
    array: JsonArray,
    pending: Option<Entity>,
    next_index: usize,
    done: bool,
}

impl<S: AsyncSource> AsyncItems<'_, S> {
    /// Moves to the next item and returns its index, or `None` after the
    /// closing `]` or the first error.
    pub async fn next_item(&mut self) -> Option<Result<usize, StreamError<S::Error>>> {
        if self.done {
            return None;
        }
        let result = self.advance().await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }

    async fn advance(&mut self) -> Result<Option<usize>, StreamError<S::Error>> {
        if let Some(entity) = self.pending.take() {
            self.reader.skip(TreeWalk::from_entity(entity)).await?;
        }
        if let Some(entity) = self.reader.attempt(&mut self.array, next_item_entity).await? {
            self.pending = Some(entity);
            let index = self.next_index;
            self.next_index += 1;
            return Ok(Some(index));
        }
        self.reader.attempt(&mut (), |_, buf| expect_end(buf)).await?;
        Ok(None)
    }

    /// Reads the current item.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] if there is no current item or it was
    /// already read or skipped; otherwise as for [`AsyncReader::attempt`].
    pub async fn read_value(&mut self) -> Result<Value, StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.materialize(TreeWalk::from_entity(entity)).await;
        self.done |= result.is_err();
        result
    }

    /// Skips the current item.
    ///
    /// # Errors
    ///
    /// As for [`read_value`](Self::read_value).
    pub async fn skip_value(&mut self) -> Result<(), StreamError<S::Error>> {
        let entity = self.pending.take().ok_or(ParseError::AlreadyConsumed)?;
        let result = self.reader.skip(TreeWalk::from_entity(entity)).await;
        self.done |= result.is_err();
        result
    }

    /// The next item, read in full.
    pub async fn next(&mut self) -> Option<Result<Value, StreamError<S::Error>>> {
        if let Err(err) = self.next_item().await? {
            return Some(Err(err));
        }
        Some(self.read_value().await)
    }

    /// Adapts the items into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<Value, StreamError<S::Error>>> {
        stream::unfold(self, |mut items| async move {
            let item = items.next().await?;
            Some((item, items))
        })
    }
}

/// Chunks produced by [`AsyncReader::string_chunks`].
pub struct AsyncStringChunks<'a, S: AsyncSource> {
    reader: &'a mut AsyncReader<S>,
    string: JsonString,
    done: bool,
}

impl<S: AsyncSource> AsyncStringChunks<'_, S> {
    /// The next chunk, or `None` once the closing quote was read.
    pub async fn next(&mut self) -> Option<Result<String, StreamError<S::Error>>> {
        if self.done {
            return None;
        }
        match self
            .reader
            .attempt(&mut self.string, |string, buf| string.next_chunk(buf))
            .await
        {
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
