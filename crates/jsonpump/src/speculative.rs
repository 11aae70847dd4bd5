//! Speculative parsing: run a recognizer step that may run out of input, and
//! undo it completely if it does.
//!
//! A step mutates two things: the buffer cursor and the recognizer state
//! (entities, traversal frames). [`ByteBuffer::reset_on_fail`] restores the
//! cursor; [`try_parse`] also restores the state from a snapshot taken before
//! the step. Successful steps are committed and never replayed, so only the
//! step that was open when input ran out is repeated after the next feed.

use crate::{ByteBuffer, ParseError};

/// Runs `step` against `state`, rolling both the state and the buffer cursor
/// back if it needs more data.
///
/// # Errors
///
/// Any error other than [`ParseError::NeedMoreData`] from `step`. The state
/// is left as the failed step left it.
pub fn try_parse<S, T, F>(state: &mut S, buf: &mut ByteBuffer, step: F) -> Result<Option<T>, ParseError>
where
    S: Clone,
    F: FnOnce(&mut S, &mut ByteBuffer) -> Result<T, ParseError>,
{
    let snapshot = state.clone();
    let result = buf.reset_on_fail(|buf| step(state, buf));
    if let Ok(None) = result {
        *state = snapshot;
    }
    result
}

/// One attempt of a driver loop: speculative while input is open, final once
/// it is closed. Running out of bytes in a final attempt is
/// [`ParseError::EndOfInput`].
pub(crate) fn attempt_once<S, T, F>(state: &mut S, buf: &mut ByteBuffer, step: F) -> Result<Option<T>, ParseError>
where
    S: Clone,
    F: FnOnce(&mut S, &mut ByteBuffer) -> Result<T, ParseError>,
{
    if !buf.is_closed() {
        return try_parse(state, buf, step);
    }
    match step(state, buf) {
        Ok(value) => Ok(Some(value)),
        Err(ParseError::NeedMoreData) => Err(ParseError::EndOfInput),
        Err(err) => Err(err),
    }
}

/// Method form of [`try_parse`], available on every `Clone` type.
///
/// ```
/// use jsonpump::{ByteBuffer, JsonObject, Speculative};
///
/// let mut buf = ByteBuffer::new();
/// let mut object = JsonObject::new();
/// let read_key = |object: &mut JsonObject, buf: &mut ByteBuffer| {
///     object.try_parse(buf, |object, buf| match object.next_member(buf)? {
///         Some(mut member) => member.read_key(buf).map(Some),
///         None => Ok(None),
///     })
/// };
///
/// buf.feed(br#"{"ab"#).unwrap();
/// assert_eq!(read_key(&mut object, &mut buf).unwrap(), None);
/// buf.feed(br#"c": 1}"#).unwrap();
/// assert_eq!(read_key(&mut object, &mut buf).unwrap(), Some(Some("abc".to_string())));
/// ```
pub trait Speculative: Clone {
    /// See [`try_parse`].
    ///
    /// # Errors
    ///
    /// As for [`try_parse`].
    fn try_parse<T, F>(&mut self, buf: &mut ByteBuffer, step: F) -> Result<Option<T>, ParseError>
    where
        F: FnOnce(&mut Self, &mut ByteBuffer) -> Result<T, ParseError>,
    {
        try_parse(self, buf, step)
    }
}

impl<S: Clone> Speculative for S {}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};

    use super::try_parse;
    use crate::{ByteBuffer, JsonEntity, JsonObject, ParseError, SyntaxError};

    #[test]
    fn state_and_cursor_roll_back_together() {
        let mut buf = ByteBuffer::new();
        buf.feed(br#"{"a": 1, "b": tr"#).unwrap();

        let mut object = JsonObject::new();
        let mut values = Vec::new();
        loop {
            let step = try_parse(&mut object, &mut buf, |object, buf| {
                match object.next_member(buf)? {
                    Some(mut member) => Ok(Some((member.read_key(buf)?, member.read_value(buf)?))),
                    None => Ok(None),
                }
            });
            match step {
                Ok(Some(Some(pair))) => values.push(pair),
                Ok(Some(None)) => break,
                Ok(None) => buf.feed(b"ue}").unwrap(),
                Err(err) => panic!("{err}"),
            }
        }

        let keys: Vec<&String> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert!(object.is_consumed());
    }

    #[test]
    fn hard_errors_are_not_rolled_back() {
        let mut buf = ByteBuffer::new();
        buf.feed(b"{x").unwrap();
        let mut object = JsonObject::new();
        let result = try_parse(&mut object, &mut buf, |object, buf| object.read(buf));
        assert!(matches!(
            result,
            Err(ParseError::Syntax {
                kind: SyntaxError::UnexpectedByte { expected: b'"', found: b'x' },
                ..
            })
        ));
    }
}
