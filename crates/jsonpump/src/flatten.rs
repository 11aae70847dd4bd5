//! Key-value flattening.
//!
//! [`Flatten`] walks a document depth-first and emits one [`KeyValuePair`]
//! per primitive, keyed by its path: object keys are joined with `.`, array
//! indices are written `[i]`. Only the open ancestors of the current value
//! are kept, as a stack of [`PathFrame`]s, so memory is proportional to the
//! nesting depth and never to the size of the document.
//!
//! ```
//! let pairs = jsonpump::flatten(br#"{"user": {"tags": ["a", "b"]}, "ok": true}"#).unwrap();
//! let lines: Vec<String> = pairs.iter().map(ToString::to_string).collect();
//! assert_eq!(lines, [r#"user.tags[0] = "a""#, r#"user.tags[1] = "b""#, "ok = true"]);
//! ```

use alloc::{format, string::String, vec::Vec};
use core::fmt::{self, Write};

use crate::{
    ByteBuffer, Entity, JsonArray, JsonEntity, JsonObject, JsonValue, ParseError,
    tree::{next_item_entity, next_member_entity},
    value::write_escaped_string,
};

/// A JSON scalar.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// `null`
    Null,
    /// `true` or `false`
    Boolean(bool),
    /// A number.
    Number(f64),
    /// A decoded string.
    String(String),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_finite() => write!(f, "{n}"),
            Self::Number(_) => f.write_str("null"),
            Self::String(s) => {
                f.write_char('"')?;
                write_escaped_string(s, f)?;
                f.write_char('"')
            }
        }
    }
}

/// A primitive and the path leading to it.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValuePair {
    /// `a.b[0].c`-style path from the root.
    pub path: String,
    /// The value found there.
    pub value: Primitive,
}

impl fmt::Display for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.path, self.value)
    }
}

/// Path of a member `key` under `prefix`.
fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        String::from(key)
    } else {
        format!("{prefix}.{key}")
    }
}

/// Path of item `index` under `prefix`.
fn join_index(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// The composite a frame iterates over.
#[derive(Debug, Clone)]
enum Container {
    Object(JsonObject),
    Array { array: JsonArray, next_index: usize },
}

impl Container {
    /// Moves to the next child, returning its path and its detached entity,
    /// or `None` once the composite is closed.
    fn next_child(&mut self, prefix: &str, buf: &mut ByteBuffer) -> Result<Option<(String, Entity)>, ParseError> {
        match self {
            Self::Object(object) => {
                Ok(next_member_entity(object, buf)?.map(|(key, entity)| (join_key(prefix, &key), entity)))
            }
            Self::Array { array, next_index } => {
                let Some(entity) = next_item_entity(array, buf)? else {
                    return Ok(None);
                };
                let path = join_index(prefix, *next_index);
                *next_index += 1;
                Ok(Some((path, entity)))
            }
        }
    }
}

/// An open composite ancestor of the value being visited.
#[derive(Debug, Clone)]
pub struct PathFrame {
    prefix: String,
    container: Container,
}

impl PathFrame {
    /// The path of the composite this frame iterates over.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

enum Step {
    Pop,
    Push(PathFrame),
    Emit(KeyValuePair),
}

/// Visits `entity` found at `path`: composites open a frame, primitives are
/// read and emitted.
fn visit(path: String, entity: Entity, buf: &mut ByteBuffer) -> Result<Step, ParseError> {
    let value = match entity {
        Entity::Object(object) => {
            return Ok(Step::Push(PathFrame {
                prefix: path,
                container: Container::Object(object),
            }));
        }
        Entity::Array(array) => {
            return Ok(Step::Push(PathFrame {
                prefix: path,
                container: Container::Array { array, next_index: 0 },
            }));
        }
        Entity::String(mut s) => Primitive::String(s.read(buf)?),
        Entity::Number(mut n) => Primitive::Number(n.read(buf)?),
        Entity::Boolean(mut b) => Primitive::Boolean(b.read(buf)?),
        Entity::Null(mut n) => {
            n.read(buf)?;
            Primitive::Null
        }
    };
    Ok(Step::Emit(KeyValuePair { path, value }))
}

/// Depth-first traversal emitting `(path, primitive)` pairs in document order.
///
/// Each call to [`next_pair`](Self::next_pair) is one step that can be
/// retried: drive it through [`Speculative::try_parse`](crate::Speculative::try_parse)
/// (or a reader) while input is still arriving.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    root: JsonValue,
    frames: Vec<PathFrame>,
    started: bool,
}

impl Flatten {
    /// A traversal of the document starting at the cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The open ancestors of the next value, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[PathFrame] {
        &self.frames
    }

    /// Returns `true` once the root composite has been closed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.started && self.frames.is_empty()
    }

    /// Emits the next pair, or `None` once the root composite is closed.
    ///
    /// Empty objects and arrays emit nothing.
    ///
    /// # Errors
    ///
    /// [`ParseError::NonCompositeRoot`] if the document is a scalar, and any
    /// grammar or input error.
    pub fn next_pair(&mut self, buf: &mut ByteBuffer) -> Result<Option<KeyValuePair>, ParseError> {
        if !self.started {
            let root = self.root.detach(buf)?;
            if !root.kind().is_composite() {
                return Err(ParseError::NonCompositeRoot(root.kind()));
            }
            if let Step::Push(frame) = visit(String::new(), root, buf)? {
                self.frames.push(frame);
            }
            self.started = true;
        }

        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };
            let step = match frame.container.next_child(&frame.prefix, buf)? {
                None => Step::Pop,
                Some((path, entity)) => visit(path, entity, buf)?,
            };

            match step {
                Step::Pop => {
                    self.frames.pop();
                }
                Step::Push(frame) => self.frames.push(frame),
                Step::Emit(pair) => return Ok(Some(pair)),
            }
        }
    }
}
