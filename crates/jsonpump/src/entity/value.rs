use alloc::boxed::Box;

use super::{Entity, EntityKind, JsonEntity};
use crate::{ByteBuffer, ParseError, SyntaxError, Value};

/// A value slot whose type is not known until its first byte is seen.
///
/// Resolving the slot ([`entity`](Self::entity)) peeks one byte and builds
/// the matching [`Entity`] without consuming its body. A slot created for an
/// object member also consumes the `:` separating it from the key.
///
/// ```
/// use jsonpump::{ByteBuffer, EntityKind, JsonEntity, JsonValue};
///
/// let mut buf = ByteBuffer::new();
/// buf.feed(b"  [1, 2]").unwrap();
///
/// let mut value = JsonValue::new();
/// assert_eq!(value.kind(&mut buf).unwrap(), EntityKind::Array);
/// assert_eq!(value.read(&mut buf).unwrap().to_string(), "[1,2]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonValue {
    expect_colon: bool,
    entity: Option<Box<Entity>>,
    consumed: bool,
}

impl JsonValue {
    /// An unresolved value slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The value slot of an object member, preceded by `:`.
    pub(crate) fn member() -> Self {
        Self {
            expect_colon: true,
            ..Self::default()
        }
    }

    /// A slot already resolved to `entity`.
    pub(crate) fn from_entity(entity: Entity) -> Self {
        Self {
            entity: Some(Box::new(entity)),
            ..Self::default()
        }
    }

    /// Resolves the slot into its entity, consuming only leading whitespace
    /// (and the member separator).
    ///
    /// # Errors
    ///
    /// [`SyntaxError::UnexpectedToken`] if no value can start at the cursor,
    /// [`ParseError::EndOfInput`] if input ended, and
    /// [`ParseError::AlreadyConsumed`] if the entity was detached.
    pub fn entity(&mut self, buf: &mut ByteBuffer) -> Result<&mut Entity, ParseError> {
        if self.entity.is_none() {
            if self.consumed {
                return Err(ParseError::AlreadyConsumed);
            }
            buf.skip_whitespace()?;
            if self.expect_colon {
                buf.expect(b':')?;
                self.expect_colon = false;
                buf.skip_whitespace()?;
            }
            let lead = buf.peek(0)?.ok_or(ParseError::EndOfInput)?;
            let entity = Entity::from_lead_byte(lead)
                .ok_or_else(|| buf.syntax_error(SyntaxError::UnexpectedToken(lead)))?;
            self.entity = Some(Box::new(entity));
        }
        self.entity.as_deref_mut().ok_or(ParseError::AlreadyConsumed)
    }

    /// The JSON type of the value, resolving the slot if needed.
    ///
    /// # Errors
    ///
    /// As for [`entity`](Self::entity).
    pub fn kind(&mut self, buf: &mut ByteBuffer) -> Result<EntityKind, ParseError> {
        self.entity(buf).map(|entity| entity.kind())
    }

    /// Alias of [`JsonEntity::read`] that reads as a materialized [`Value`].
    ///
    /// # Errors
    ///
    /// As for [`JsonEntity::read`].
    pub fn read_value(&mut self, buf: &mut ByteBuffer) -> Result<Value, ParseError> {
        self.read(buf)
    }

    /// Moves the resolved entity out of the slot, which becomes consumed.
    ///
    /// The caller takes over responsibility for consuming the entity before
    /// the enclosing composite moves on.
    ///
    /// # Errors
    ///
    /// As for [`entity`](Self::entity).
    pub fn detach(&mut self, buf: &mut ByteBuffer) -> Result<Entity, ParseError> {
        self.entity(buf)?;
        let entity = self.entity.take().ok_or(ParseError::AlreadyConsumed)?;
        self.consumed = true;
        Ok(*entity)
    }
}

impl JsonEntity for JsonValue {
    type Output = Value;

    fn is_consumed(&self) -> bool {
        self.consumed || self.entity.as_ref().is_some_and(|entity| entity.is_consumed())
    }

    fn read(&mut self, buf: &mut ByteBuffer) -> Result<Value, ParseError> {
        if self.is_consumed() {
            return Err(ParseError::AlreadyConsumed);
        }
        let value = self.entity(buf)?.read(buf)?;
        self.consumed = true;
        Ok(value)
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.is_consumed() {
            return Ok(());
        }
        self.entity(buf)?.consume(buf)?;
        self.consumed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::JsonValue;
    use crate::{ByteBuffer, Entity, EntityKind, JsonEntity, ParseError, SyntaxError, Value};

    fn closed(input: &str) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        buf.feed(input.as_bytes()).unwrap();
        buf.close();
        buf
    }

    #[rstest]
    #[case(r#""s""#, EntityKind::String)]
    #[case("-1", EntityKind::Number)]
    #[case("\tfalse", EntityKind::Boolean)]
    #[case("null", EntityKind::Null)]
    #[case("{}", EntityKind::Object)]
    #[case("\n[]", EntityKind::Array)]
    fn resolves_kind_without_consuming(#[case] input: &str, #[case] kind: EntityKind) {
        let mut buf = closed(input);
        let mut value = JsonValue::new();
        assert_eq!(value.kind(&mut buf), Ok(kind));
        assert!(!value.is_consumed());
        let lead = input.trim_start().as_bytes()[0];
        assert_eq!(buf.peek(0), Ok(Some(lead)));
    }

    #[test]
    fn unknown_lead_byte() {
        let mut buf = closed("  ?");
        assert_eq!(
            JsonValue::new().kind(&mut buf),
            Err(ParseError::Syntax {
                kind: SyntaxError::UnexpectedToken(b'?'),
                offset: 2,
            })
        );
        assert_eq!(JsonValue::new().kind(&mut closed(" ")), Err(ParseError::EndOfInput));
    }

    #[test]
    fn member_slot_owns_the_colon() {
        let mut buf = closed(" : true");
        let mut value = JsonValue::member();
        assert_eq!(value.read_value(&mut buf), Ok(Value::Boolean(true)));
        assert_eq!(value.read(&mut buf), Err(ParseError::AlreadyConsumed));
    }

    #[test]
    fn detach_hands_over_the_entity() {
        let mut buf = closed(r#""abc""#);
        let mut value = JsonValue::new();
        let Entity::String(mut s) = value.detach(&mut buf).unwrap() else {
            panic!("expected a string");
        };
        assert!(value.is_consumed());
        assert_eq!(value.entity(&mut buf).map(|e| e.kind()), Err(ParseError::AlreadyConsumed));
        assert_eq!(s.read(&mut buf).unwrap(), "abc");
    }

    #[test]
    fn consumed_through_the_entity() {
        let mut buf = closed("12 ");
        let mut value = JsonValue::new();
        value.entity(&mut buf).unwrap().consume(&mut buf).unwrap();
        assert!(value.is_consumed());
    }
}
