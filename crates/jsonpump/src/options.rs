/// Default compaction threshold, in bytes.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1000;

/// Default number of bytes pulled from a source per pump.
pub const DEFAULT_PUMP_SIZE: usize = 1024;

/// Default size of a streamed string chunk, in bytes.
pub const DEFAULT_STRING_CHUNK_SIZE: usize = 1024;

/// Configuration for a parse session.
///
/// The options are carried by the session's [`ByteBuffer`] so every entity
/// and driver working on that buffer sees the same limits.
///
/// # Examples
///
/// ```rust
/// use jsonpump::{ByteBuffer, ParserOptions};
///
/// let options = ParserOptions {
///     max_buffer_size: 64,
///     strict_buffer_limit: true,
///     ..Default::default()
/// };
/// let mut buffer = ByteBuffer::with_options(options);
/// assert!(buffer.feed(&[b' '; 65]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Size of the consumed prefix above which the buffer is compacted.
    ///
    /// Compaction discards bytes before the cursor. It only happens when no
    /// speculative attempt is in flight, so an attempt can always rewind to
    /// its starting offset.
    ///
    /// When [`strict_buffer_limit`](Self::strict_buffer_limit) is set, this
    /// is also the maximum number of bytes the buffer may retain.
    ///
    /// # Default
    ///
    /// `1000`
    pub max_buffer_size: usize,

    /// Whether exceeding `max_buffer_size` is a hard failure.
    ///
    /// When `false`, a buffer that still holds more than `max_buffer_size`
    /// bytes after compaction keeps growing; this happens when a single token
    /// (say, one long string) is larger than the limit. When `true`, the feed
    /// that would overrun the limit fails with
    /// [`ParseError::BufferSizeExceeded`](crate::ParseError::BufferSizeExceeded).
    ///
    /// # Default
    ///
    /// `false`
    pub strict_buffer_limit: bool,

    /// Maximum number of bytes fed into the buffer per pump of a source.
    ///
    /// # Default
    ///
    /// `1024`
    pub pump_size: usize,

    /// Chunk size used when a string's contents are streamed incrementally.
    ///
    /// # Default
    ///
    /// `1024`
    pub string_chunk_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            strict_buffer_limit: false,
            pump_size: DEFAULT_PUMP_SIZE,
            string_chunk_size: DEFAULT_STRING_CHUNK_SIZE,
        }
    }
}
