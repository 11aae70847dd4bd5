use alloc::string::String;

use super::{JsonEntity, JsonString, JsonValue};
use crate::{ByteBuffer, Map, ParseError, SyntaxError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ObjectState {
    /// Before `{`.
    #[default]
    Start,
    /// After `{`: a first member or `}` follows.
    Open,
    /// A member is pending.
    Member,
    /// After a member: `,` or `}` follows.
    AfterMember,
    Closed,
}

#[derive(Debug, Clone)]
struct PendingMember {
    key: JsonString,
    value: JsonValue,
}

/// A lazy cursor over the members of a JSON object.
///
/// Members are visited one at a time with [`next_member`](Self::next_member).
/// Whatever the caller leaves unread of a member is consumed when the cursor
/// moves on.
///
/// ```
/// use jsonpump::{ByteBuffer, JsonEntity, JsonObject, Value};
///
/// let mut buf = ByteBuffer::new();
/// buf.feed(br#"{"skip": {"big": [1, 2, 3]}, "keep": true}"#).unwrap();
///
/// let mut object = JsonObject::new();
/// let mut kept = None;
/// while let Some(mut member) = object.next_member(&mut buf).unwrap() {
///     if member.read_key(&mut buf).unwrap() == "keep" {
///         kept = Some(member.read_value(&mut buf).unwrap());
///     }
/// }
/// assert_eq!(kept, Some(Value::Boolean(true)));
/// assert!(object.is_consumed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonObject {
    state: ObjectState,
    pending: Option<PendingMember>,
    consumed: bool,
}

/// The member an object cursor currently points at.
pub struct Member<'a> {
    key: &'a mut JsonString,
    value: &'a mut JsonValue,
}

impl Member<'_> {
    /// The key entity, unread until the caller reads it.
    pub fn key(&mut self) -> &mut JsonString {
        self.key
    }

    /// Reads the member's key.
    ///
    /// # Errors
    ///
    /// As for [`JsonString`]'s [`read`](JsonEntity::read).
    pub fn read_key(&mut self, buf: &mut ByteBuffer) -> Result<String, ParseError> {
        self.key.read(buf)
    }

    /// The member's value slot. An unread key is consumed first.
    ///
    /// # Errors
    ///
    /// Any error consuming the key.
    pub fn value(&mut self, buf: &mut ByteBuffer) -> Result<&mut JsonValue, ParseError> {
        self.key.consume(buf)?;
        Ok(&mut *self.value)
    }

    /// Reads the member's value in full.
    ///
    /// # Errors
    ///
    /// Any error consuming the key or reading the value.
    pub fn read_value(&mut self, buf: &mut ByteBuffer) -> Result<Value, ParseError> {
        self.value(buf)?.read(buf)
    }
}

impl JsonObject {
    /// An object entity whose `{` has not been read yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn begin_member(&mut self) {
        self.pending = Some(PendingMember {
            key: JsonString::new(),
            value: JsonValue::member(),
        });
        self.state = ObjectState::Member;
    }

    fn close(&mut self) {
        self.pending = None;
        self.state = ObjectState::Closed;
        self.consumed = true;
    }

    /// Moves to the next member, force-consuming the pending one.
    ///
    /// Returns `true` if a member is now pending and `false` once the closing
    /// `}` has been consumed.
    ///
    /// # Errors
    ///
    /// Grammar and input errors, including [`SyntaxError::UnexpectedByte`]
    /// for a missing `,` and for a trailing comma (the key's `"` is missing).
    pub fn advance(&mut self, buf: &mut ByteBuffer) -> Result<bool, ParseError> {
        loop {
            match self.state {
                ObjectState::Start => {
                    buf.skip_whitespace()?;
                    buf.expect(b'{')?;
                    self.state = ObjectState::Open;
                }
                ObjectState::Open => {
                    buf.skip_whitespace()?;
                    if buf.peek(0)? == Some(b'}') {
                        buf.advance();
                        self.close();
                        return Ok(false);
                    }
                    self.begin_member();
                    return Ok(true);
                }
                ObjectState::Member => {
                    if let Some(member) = &mut self.pending {
                        member.key.consume(buf)?;
                        member.value.consume(buf)?;
                    }
                    self.pending = None;
                    self.state = ObjectState::AfterMember;
                }
                ObjectState::AfterMember => {
                    buf.skip_whitespace()?;
                    match buf.next()? {
                        b',' => {
                            self.begin_member();
                            return Ok(true);
                        }
                        b'}' => {
                            self.close();
                            return Ok(false);
                        }
                        found => {
                            return Err(ParseError::Syntax {
                                kind: SyntaxError::UnexpectedByte {
                                    expected: b'}',
                                    found,
                                },
                                offset: buf.position() - 1,
                            });
                        }
                    }
                }
                ObjectState::Closed => return Ok(false),
            }
        }
    }

    /// The pending member, if any.
    pub fn member(&mut self) -> Option<Member<'_>> {
        self.pending.as_mut().map(|member| Member {
            key: &mut member.key,
            value: &mut member.value,
        })
    }

    /// [`advance`](Self::advance)s and returns the new pending member, or
    /// `None` once the object is closed.
    ///
    /// # Errors
    ///
    /// As for [`advance`](Self::advance).
    pub fn next_member(&mut self, buf: &mut ByteBuffer) -> Result<Option<Member<'_>>, ParseError> {
        if self.advance(buf)? {
            Ok(self.member())
        } else {
            Ok(None)
        }
    }
}

impl JsonEntity for JsonObject {
    type Output = Map;

    fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Reads the members not visited yet. Duplicate keys keep the last value.
    fn read(&mut self, buf: &mut ByteBuffer) -> Result<Map, ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        let mut map = Map::new();
        while let Some(mut member) = self.next_member(buf)? {
            let key = member.read_key(buf)?;
            let value = member.read_value(buf)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        while self.advance(buf)? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::{
        string::{String, ToString},
        vec::Vec,
    };

    use rstest::rstest;

    use super::JsonObject;
    use crate::{ByteBuffer, JsonEntity, ParseError, SyntaxError, Value};

    fn closed(input: &str) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        buf.feed(input.as_bytes()).unwrap();
        buf.close();
        buf
    }

    #[test]
    fn reads_members() {
        let mut buf = closed(r#" { "b" : 1 , "a" : [true, null], "b": "x" } "#);
        let map = JsonObject::new().read(&mut buf).unwrap();
        assert_eq!(Value::Object(map).to_string(), r#"{"a":[true,null],"b":"x"}"#);
        buf.skip_whitespace().unwrap();
        assert!(buf.at_end());
    }

    #[test]
    fn empty_object() {
        let mut buf = closed("{ }");
        let mut object = JsonObject::new();
        assert!(object.next_member(&mut buf).unwrap().is_none());
        assert!(object.is_consumed());
        assert_eq!(object.read(&mut buf), Err(ParseError::AlreadyConsumed));
    }

    #[test]
    fn unread_members_are_skipped() {
        let mut buf = closed(r#"{"a": {"deep": [1, {"x": "}"}]}, "b": 2, "c": 3}"#);
        let mut object = JsonObject::new();
        let mut keys = Vec::new();
        while let Some(mut member) = object.next_member(&mut buf).unwrap() {
            let key = member.read_key(&mut buf).unwrap();
            if key == "b" {
                assert_eq!(member.read_value(&mut buf), Ok(Value::Number(2.0)));
            }
            keys.push(key);
        }
        assert_eq!(keys, ["a", "b", "c"]);
        assert!(buf.at_end());
    }

    #[test]
    fn value_without_reading_the_key() {
        let mut buf = closed(r#"{"ignored": "v"}"#);
        let mut object = JsonObject::new();
        let mut member = object.next_member(&mut buf).unwrap().unwrap();
        assert_eq!(member.read_value(&mut buf), Ok(Value::String(String::from("v"))));
        assert!(member.key().is_consumed());
    }

    #[rstest]
    #[case::trailing_comma(r#"{"a": 1,}"#, b'"', b'}', 8)]
    #[case::missing_comma(r#"{"a": 1 "b": 2}"#, b'}', b'"', 8)]
    #[case::missing_colon(r#"{"a" 1}"#, b':', b'1', 5)]
    #[case::not_an_object("[]", b'{', b'[', 0)]
    fn malformed(#[case] input: &str, #[case] expected: u8, #[case] found: u8, #[case] offset: usize) {
        let mut buf = closed(input);
        assert_eq!(
            JsonObject::new().read(&mut buf),
            Err(ParseError::Syntax {
                kind: SyntaxError::UnexpectedByte { expected, found },
                offset,
            })
        );
    }

    #[test]
    fn truncated() {
        let mut buf = closed(r#"{"a": 1"#);
        assert_eq!(JsonObject::new().read(&mut buf), Err(ParseError::EndOfInput));
    }
}
