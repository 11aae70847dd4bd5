use super::{JsonEntity, JsonValue};
use crate::{Array, ByteBuffer, ParseError, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ArrayState {
    #[default]
    Start,
    Open,
    Item,
    AfterItem,
    Closed,
}

/// A lazy cursor over the items of a JSON array.
///
/// ```
/// use jsonpump::{ByteBuffer, JsonArray, JsonEntity};
///
/// let mut buf = ByteBuffer::new();
/// buf.feed(br#"["a", {"skipped": true}, 3]"#).unwrap();
///
/// let mut array = JsonArray::new();
/// let first = array.next_item(&mut buf).unwrap().unwrap();
/// assert_eq!(first.read(&mut buf).unwrap().as_str(), Some("a"));
/// array.next_item(&mut buf).unwrap();
/// let third = array.next_item(&mut buf).unwrap().unwrap();
/// assert_eq!(third.read(&mut buf).unwrap().as_f64(), Some(3.0));
/// assert!(array.next_item(&mut buf).unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonArray {
    state: ArrayState,
    pending: Option<JsonValue>,
    consumed: bool,
}

impl JsonArray {
    /// An array entity whose `[` has not been read yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn begin_item(&mut self) {
        self.pending = Some(JsonValue::new());
        self.state = ArrayState::Item;
    }

    fn close(&mut self) {
        self.pending = None;
        self.state = ArrayState::Closed;
        self.consumed = true;
    }

    /// Moves to the next item, force-consuming the pending one.
    ///
    /// Returns `true` if an item is now pending and `false` once the closing
    /// `]` has been consumed.
    ///
    /// # Errors
    ///
    /// Grammar and input errors. A trailing comma is a
    /// [`SyntaxError::UnexpectedToken`] when the missing item is resolved.
    pub fn advance(&mut self, buf: &mut ByteBuffer) -> Result<bool, ParseError> {
        loop {
            match self.state {
                ArrayState::Start => {
                    buf.skip_whitespace()?;
                    buf.expect(b'[')?;
                    self.state = ArrayState::Open;
                }
                ArrayState::Open => {
                    buf.skip_whitespace()?;
                    if buf.peek(0)? == Some(b']') {
                        buf.advance();
                        self.close();
                        return Ok(false);
                    }
                    self.begin_item();
                    return Ok(true);
                }
                ArrayState::Item => {
                    if let Some(item) = &mut self.pending {
                        item.consume(buf)?;
                    }
                    self.pending = None;
                    self.state = ArrayState::AfterItem;
                }
                ArrayState::AfterItem => {
                    buf.skip_whitespace()?;
                    match buf.next()? {
                        b',' => {
                            self.begin_item();
                            return Ok(true);
                        }
                        b']' => {
                            self.close();
                            return Ok(false);
                        }
                        found => {
                            return Err(ParseError::Syntax {
                                kind: SyntaxError::UnexpectedByte {
                                    expected: b']',
                                    found,
                                },
                                offset: buf.position() - 1,
                            });
                        }
                    }
                }
                ArrayState::Closed => return Ok(false),
            }
        }
    }

    /// The pending item, if any.
    pub fn item(&mut self) -> Option<&mut JsonValue> {
        self.pending.as_mut()
    }

    /// [`advance`](Self::advance)s and returns the new pending item, or
    /// `None` once the array is closed.
    ///
    /// # Errors
    ///
    /// As for [`advance`](Self::advance).
    pub fn next_item(&mut self, buf: &mut ByteBuffer) -> Result<Option<&mut JsonValue>, ParseError> {
        if self.advance(buf)? {
            Ok(self.item())
        } else {
            Ok(None)
        }
    }
}

impl JsonEntity for JsonArray {
    type Output = Array;

    fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Reads the items not visited yet.
    fn read(&mut self, buf: &mut ByteBuffer) -> Result<Array, ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        let mut items = Array::new();
        while let Some(item) = self.next_item(buf)? {
            items.push(item.read(buf)?);
        }
        Ok(items)
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        while self.advance(buf)? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use rstest::rstest;

    use super::JsonArray;
    use crate::{ByteBuffer, JsonEntity, ParseError, Speculative, SyntaxError, Value};

    fn closed(input: &str) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        buf.feed(input.as_bytes()).unwrap();
        buf.close();
        buf
    }

    #[test]
    fn reads_items() {
        let mut buf = closed(r#"[ 1 , "two" , [ ] , { } , [null] ]"#);
        let items = JsonArray::new().read(&mut buf).unwrap();
        assert_eq!(Value::Array(items).to_string(), r#"[1,"two",[],{},[null]]"#);
    }

    #[test]
    fn nested_skip() {
        let mut buf = closed(r#"[[1, [2, [3]]], "x"] 7"#);
        let mut array = JsonArray::new();
        array.next_item(&mut buf).unwrap();
        let second = array.next_item(&mut buf).unwrap().unwrap();
        assert_eq!(second.read_value(&mut buf), Ok(Value::from("x")));
        assert!(array.next_item(&mut buf).unwrap().is_none());
        assert!(array.is_consumed());
        buf.skip_whitespace().unwrap();
        assert_eq!(buf.peek(0), Ok(Some(b'7')));
    }

    #[rstest]
    #[case::trailing_comma("[1,]", SyntaxError::UnexpectedToken(b']'), 3)]
    #[case::leading_comma("[,1]", SyntaxError::UnexpectedToken(b','), 1)]
    #[case::missing_comma("[1 2]", SyntaxError::UnexpectedByte { expected: b']', found: b'2' }, 3)]
    fn malformed(#[case] input: &str, #[case] kind: SyntaxError, #[case] offset: usize) {
        let mut buf = closed(input);
        assert_eq!(
            JsonArray::new().read(&mut buf),
            Err(ParseError::Syntax { kind, offset })
        );
    }

    #[test]
    fn resumes_item_by_item() {
        let input = br#"[10, "b", [true]]"#;
        let mut buf = ByteBuffer::new();
        let mut array = JsonArray::new();
        let mut fed = 0;
        let mut seen = 0;
        loop {
            let step = array.try_parse(&mut buf, |array, buf| {
                Ok(match array.next_item(buf)? {
                    Some(item) => Some(item.read(buf)?),
                    None => None,
                })
            });
            match step.unwrap() {
                Some(Some(_)) => seen += 1,
                Some(None) => break,
                None => {
                    buf.feed(&input[fed..=fed]).unwrap();
                    fed += 1;
                }
            }
        }
        assert_eq!(seen, 3);
        assert_eq!(fed, input.len());
    }
}
