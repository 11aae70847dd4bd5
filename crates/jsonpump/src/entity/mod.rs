//! Lazy, compositional JSON entities.
//!
//! An entity recognizes one JSON production from a [`ByteBuffer`]. Entities
//! are plain data: they never own or borrow the buffer, and every operation
//! takes it as `&mut ByteBuffer`. Creating an entity consumes nothing; its
//! content is read at most once, through [`JsonEntity::read`], or skipped
//! with [`JsonEntity::consume`].
//!
//! Composite entities ([`JsonObject`], [`JsonArray`]) hand out their children
//! one at a time. Moving to the next child force-consumes whatever the caller
//! left unread of the previous one, so a caller can inspect a single field of
//! a large object and skip the rest without materializing it.
//!
//! While input is still arriving, any operation may fail with
//! [`ParseError::NeedMoreData`]. Entities keep no buffer offsets, so the
//! recoverable way to drive them is through a retry boundary that restores
//! both the cursor and the entity: [`JsonEntity::try_read`],
//! [`Speculative::try_parse`](crate::Speculative::try_parse), or one of the
//! readers.

use core::fmt;

use crate::{ByteBuffer, ParseError, Value, speculative::try_parse};

mod array;
mod literal;
mod number;
mod object;
mod string;
mod value;

pub use array::JsonArray;
pub use literal::{JsonBoolean, JsonNull};
pub use number::JsonNumber;
pub use object::{JsonObject, Member};
pub use string::{Chunks, JsonString};
pub use value::JsonValue;

/// Common interface of every entity.
pub trait JsonEntity: Clone {
    /// What a full read produces.
    type Output;

    /// Returns `true` once the entity's content has been read or skipped.
    fn is_consumed(&self) -> bool;

    /// Reads the entity's full content.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] on a second read; otherwise whatever
    /// the grammar or the buffer reports.
    fn read(&mut self, buf: &mut ByteBuffer) -> Result<Self::Output, ParseError>;

    /// Skips the entity's content without materializing it. Does nothing if
    /// the entity is already consumed.
    ///
    /// # Errors
    ///
    /// As for [`read`](Self::read), except [`ParseError::AlreadyConsumed`].
    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError>;

    /// Reads speculatively: `Ok(None)` means more input is needed, and both
    /// the entity and the buffer cursor are as they were before the call.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] if the entity was consumed, or any
    /// unrecoverable error from [`read`](Self::read).
    fn try_read(&mut self, buf: &mut ByteBuffer) -> Result<Option<Self::Output>, ParseError> {
        if self.is_consumed() {
            return Err(ParseError::AlreadyConsumed);
        }
        try_parse(self, buf, |entity, buf| entity.read(buf))
    }
}

/// The JSON type of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A string.
    String,
    /// A number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// An object.
    Object,
    /// An array.
    Array,
}

impl EntityKind {
    /// Returns `true` for objects and arrays.
    #[must_use]
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Object => "object",
            Self::Array => "array",
        })
    }
}

/// An entity of any kind, as produced by [`Entity::from_lead_byte`].
#[derive(Debug, Clone)]
pub enum Entity {
    /// A string.
    String(JsonString),
    /// A number.
    Number(JsonNumber),
    /// `true` or `false`.
    Boolean(JsonBoolean),
    /// `null`.
    Null(JsonNull),
    /// An object.
    Object(JsonObject),
    /// An array.
    Array(JsonArray),
}

impl Entity {
    /// Picks the entity a value starting with `byte` must be.
    ///
    /// ```
    /// use jsonpump::{Entity, EntityKind};
    ///
    /// assert_eq!(Entity::from_lead_byte(b'-').map(|e| e.kind()), Some(EntityKind::Number));
    /// assert!(Entity::from_lead_byte(b'}').is_none());
    /// ```
    #[must_use]
    pub fn from_lead_byte(byte: u8) -> Option<Self> {
        let entity = match byte {
            b'"' => Self::String(JsonString::new()),
            b'-' | b'0'..=b'9' => Self::Number(JsonNumber::new()),
            b't' | b'f' => Self::Boolean(JsonBoolean::new()),
            b'n' => Self::Null(JsonNull::new()),
            b'{' => Self::Object(JsonObject::new()),
            b'[' => Self::Array(JsonArray::new()),
            _ => return None,
        };
        Some(entity)
    }

    /// The JSON type of this entity.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::String(_) => EntityKind::String,
            Self::Number(_) => EntityKind::Number,
            Self::Boolean(_) => EntityKind::Boolean,
            Self::Null(_) => EntityKind::Null,
            Self::Object(_) => EntityKind::Object,
            Self::Array(_) => EntityKind::Array,
        }
    }
}

impl JsonEntity for Entity {
    type Output = Value;

    fn is_consumed(&self) -> bool {
        match self {
            Self::String(e) => e.is_consumed(),
            Self::Number(e) => e.is_consumed(),
            Self::Boolean(e) => e.is_consumed(),
            Self::Null(e) => e.is_consumed(),
            Self::Object(e) => e.is_consumed(),
            Self::Array(e) => e.is_consumed(),
        }
    }

    fn read(&mut self, buf: &mut ByteBuffer) -> Result<Value, ParseError> {
        Ok(match self {
            Self::String(e) => Value::String(e.read(buf)?),
            Self::Number(e) => Value::Number(e.read(buf)?),
            Self::Boolean(e) => Value::Boolean(e.read(buf)?),
            Self::Null(e) => {
                e.read(buf)?;
                Value::Null
            }
            Self::Object(e) => Value::Object(e.read(buf)?),
            Self::Array(e) => Value::Array(e.read(buf)?),
        })
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        match self {
            Self::String(e) => e.consume(buf),
            Self::Number(e) => e.consume(buf),
            Self::Boolean(e) => e.consume(buf),
            Self::Null(e) => e.consume(buf),
            Self::Object(e) => e.consume(buf),
            Self::Array(e) => e.consume(buf),
        }
    }
}
