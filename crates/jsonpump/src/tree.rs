//! Step-wise materialization.
//!
//! [`TreeWalk`] visits a value one child at a time and reports each move as
//! an [`Event`]; [`TreeBuilder`] assembles the events into a [`Value`]. A
//! speculative step covers one child, so running out of input replays only
//! that child, and the buffer can compact between steps. Only the walk is
//! snapshotted; the partly built value lives in the builder.

use alloc::{string::String, vec::Vec};

use crate::{
    Array, ByteBuffer, Entity, EntityKind, JsonArray, JsonEntity, JsonObject, JsonValue, Map, ParseError, Value,
};

/// Moves `object` to its next member and detaches the member's value,
/// returning the key and the unread value entity.
pub(crate) fn next_member_entity(
    object: &mut JsonObject,
    buf: &mut ByteBuffer,
) -> Result<Option<(String, Entity)>, ParseError> {
    let Some(mut member) = object.next_member(buf)? else {
        return Ok(None);
    };
    let key = member.read_key(buf)?;
    let entity = member.value(buf)?.detach(buf)?;
    Ok(Some((key, entity)))
}

/// Moves `array` to its next item and detaches it.
pub(crate) fn next_item_entity(array: &mut JsonArray, buf: &mut ByteBuffer) -> Result<Option<Entity>, ParseError> {
    match array.next_item(buf)? {
        Some(item) => item.detach(buf).map(Some),
        None => Ok(None),
    }
}

/// One move of a [`TreeWalk`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    /// A composite was entered. `key` is set for object members.
    Open { key: Option<String>, kind: EntityKind },
    /// A scalar was read.
    Scalar { key: Option<String>, value: Value },
    /// The innermost open composite was closed.
    Close,
}

#[derive(Debug, Clone)]
enum Composite {
    Object(JsonObject),
    Array(JsonArray),
}

/// Depth-first walk over one value, one child per step.
#[derive(Debug, Clone, Default)]
pub(crate) struct TreeWalk {
    root: JsonValue,
    frames: Vec<Composite>,
    started: bool,
}

impl TreeWalk {
    /// A walk over the value starting at the cursor.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A walk over an entity already resolved by a composite cursor.
    pub(crate) fn from_entity(entity: Entity) -> Self {
        Self {
            root: JsonValue::from_entity(entity),
            ..Self::default()
        }
    }

    /// Returns `true` once the walked value has been read in full.
    pub(crate) fn is_finished(&self) -> bool {
        self.started && self.frames.is_empty()
    }

    /// Reads up to the next event.
    ///
    /// A step that fails leaves the walk in an unspecified state; drive it
    /// through a retry boundary.
    pub(crate) fn next_event(&mut self, buf: &mut ByteBuffer) -> Result<Event, ParseError> {
        if !self.started {
            let entity = self.root.detach(buf)?;
            let event = self.enter(None, entity, buf)?;
            self.started = true;
            return Ok(event);
        }

        let Some(frame) = self.frames.last_mut() else {
            return Err(ParseError::AlreadyConsumed);
        };
        let child = match frame {
            Composite::Object(object) => next_member_entity(object, buf)?.map(|(key, entity)| (Some(key), entity)),
            Composite::Array(array) => next_item_entity(array, buf)?.map(|entity| (None, entity)),
        };
        match child {
            Some((key, entity)) => self.enter(key, entity, buf),
            None => {
                self.frames.pop();
                Ok(Event::Close)
            }
        }
    }

    fn enter(&mut self, key: Option<String>, entity: Entity, buf: &mut ByteBuffer) -> Result<Event, ParseError> {
        let kind = entity.kind();
        let frame = match entity {
            Entity::Object(object) => Composite::Object(object),
            Entity::Array(array) => Composite::Array(array),
            mut scalar => {
                let value = scalar.read(buf)?;
                return Ok(Event::Scalar { key, value });
            }
        };
        self.frames.push(frame);
        Ok(Event::Open { key, kind })
    }
}

#[derive(Debug)]
enum Partial {
    Object(Map),
    Array(Array),
}

/// Assembles [`Event`]s into a [`Value`].
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    /// Open composites, each with the key it will be stored under.
    open: Vec<(Option<String>, Partial)>,
}

impl TreeBuilder {
    /// Applies `event`, returning the value once its root is complete.
    pub(crate) fn apply(&mut self, event: Event) -> Option<Value> {
        match event {
            Event::Open { key, kind } => {
                let partial = if kind == EntityKind::Object {
                    Partial::Object(Map::new())
                } else {
                    Partial::Array(Array::new())
                };
                self.open.push((key, partial));
                None
            }
            Event::Scalar { key, value } => self.attach(key, value),
            Event::Close => {
                let (key, partial) = self.open.pop()?;
                let value = match partial {
                    Partial::Object(map) => Value::Object(map),
                    Partial::Array(items) => Value::Array(items),
                };
                self.attach(key, value)
            }
        }
    }

    /// Stores a finished child in its parent, or returns it if it is the root.
    fn attach(&mut self, key: Option<String>, value: Value) -> Option<Value> {
        match self.open.last_mut() {
            None => Some(value),
            // Duplicate keys: last one wins.
            Some((_, Partial::Object(map))) => {
                map.insert(key.unwrap_or_default(), value);
                None
            }
            Some((_, Partial::Array(items))) => {
                items.push(value);
                None
            }
        }
    }
}
