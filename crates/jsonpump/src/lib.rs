//! A resumable, pull-based JSON decoder for byte sources that deliver data
//! in arbitrary increments.
//!
//! The crate is built in layers:
//!
//! - [`ByteBuffer`] holds the bytes received so far, with lookahead, a
//!   rewindable cursor, and compaction of the consumed prefix.
//! - The [entity model](entity) recognizes JSON productions lazily against
//!   the buffer: an object hands out one member at a time, a string can be
//!   streamed in chunks, and anything not read is skipped.
//! - [`try_parse`] runs a recognizer step speculatively. If the buffer runs
//!   dry the step is undone, cursor and state alike, and can be retried once
//!   more bytes arrive.
//! - Sessions ([`ValueDecoder`], [`KeyValueParser`]) are fed bytes by the
//!   caller. Readers ([`Reader`] and, with the `async` feature,
//!   [`AsyncReader`]) pull bytes from a source only when a step needs them,
//!   and can also hand out a root object's members or a root array's items
//!   one at a time.
//! - [`Flatten`] walks a document depth-first and emits `(path, primitive)`
//!   pairs without building the tree.
//!
//! ```
//! use jsonpump::KeyValueParser;
//!
//! let mut parser = KeyValueParser::new();
//! let mut lines = Vec::new();
//! for chunk in [&br#"{"name": "pu"#[..], br#"mp", "sizes": [1, 2.5]"#, b"}"] {
//!     for pair in parser.feed(chunk) {
//!         lines.push(pair.unwrap().to_string());
//!     }
//! }
//! assert_eq!(parser.finish().count(), 0);
//! assert_eq!(lines, [r#"name = "pump""#, "sizes[0] = 1", "sizes[1] = 2.5"]);
//! ```

#![no_std]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

mod byte_buffer;
pub mod entity;
mod error;
mod escape_buffer;
mod flatten;
mod literal;
mod options;
mod session;
mod source;
mod speculative;
mod tree;
mod value;

#[cfg(feature = "async")]
mod bridge;

#[cfg(test)]
mod tests;

#[cfg(feature = "async")]
pub use bridge::{
    AsyncItems, AsyncKeyValues, AsyncMembers, AsyncReadSource, AsyncReader, AsyncSource, AsyncStringChunks,
    StreamSource, TryStreamSource,
};
pub use byte_buffer::ByteBuffer;
pub use entity::{
    Chunks, Entity, EntityKind, JsonArray, JsonBoolean, JsonEntity, JsonNull, JsonNumber, JsonObject, JsonString,
    JsonValue, Member,
};
pub use error::{ParseError, StreamError, SyntaxError};
pub use flatten::{Flatten, KeyValuePair, PathFrame, Primitive};
pub use options::{DEFAULT_MAX_BUFFER_SIZE, DEFAULT_PUMP_SIZE, DEFAULT_STRING_CHUNK_SIZE, ParserOptions};
pub use session::{IntoPairs, KeyValueParser, Pairs, ValueDecoder, flatten, parse};
#[cfg(feature = "std")]
pub use source::ReadSource;
pub use source::{IterSource, Items, KeyValues, Members, Pulled, Reader, Source, StringChunks};
pub use speculative::{Speculative, try_parse};
pub use value::{Array, Map, Value};
