use alloc::{string::String, vec::Vec};

use super::JsonEntity;
use crate::{ByteBuffer, ParseError, escape_buffer::read_escape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StringState {
    /// Before the opening quote.
    #[default]
    Start,
    Body,
    /// The closing quote has been consumed.
    Closed,
}

/// A JSON string, decoded as a whole or streamed in chunks.
///
/// Escapes are decoded, surrogate pairs are combined, and raw bytes that are
/// not valid UTF-8 decode to U+FFFD.
///
/// ```
/// use jsonpump::{ByteBuffer, JsonEntity, JsonString};
///
/// let mut buf = ByteBuffer::new();
/// buf.feed("\"café 🍵\"".as_bytes()).unwrap();
///
/// let mut s = JsonString::new();
/// assert_eq!(s.read(&mut buf).unwrap(), "café 🍵");
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonString {
    state: StringState,
    consumed: bool,
}

/// Width of the UTF-8 sequence a lead byte announces. Stray continuation
/// bytes and invalid leads count as one byte.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

fn decode_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

impl JsonString {
    /// A string entity whose opening quote has not been read yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.state == StringState::Start {
            buf.skip_whitespace()?;
            buf.expect(b'"')?;
            self.state = StringState::Body;
        }
        Ok(())
    }

    /// Decodes one unit (a byte, an escape, or a UTF-8 sequence) into `out`.
    /// Returns `false` once the closing quote has been consumed.
    fn decode_unit(&mut self, buf: &mut ByteBuffer, out: &mut Vec<u8>) -> Result<bool, ParseError> {
        if self.state == StringState::Closed {
            return Ok(false);
        }

        match buf.next()? {
            b'"' => {
                self.state = StringState::Closed;
                return Ok(false);
            }
            b'\\' => {
                let ch = read_escape(buf)?;
                let mut utf8 = [0; 4];
                out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
            lead => {
                out.push(lead);
                for _ in 1..utf8_width(lead) {
                    match buf.peek(0)? {
                        Some(byte) if byte & 0xC0 == 0x80 => {
                            out.push(byte);
                            buf.advance();
                        }
                        _ => break,
                    }
                }
            }
        }
        Ok(true)
    }

    /// Reads the next chunk of the string's contents.
    ///
    /// A chunk holds at most `max` bytes of UTF-8 and never splits a code
    /// point; a single code point longer than `max` makes a chunk on its own.
    /// Returns `Ok(None)` once the closing quote has been consumed, at which
    /// point the string is consumed.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`] after the string has been read, or any
    /// error decoding the contents.
    pub fn read_chunk(&mut self, buf: &mut ByteBuffer, max: usize) -> Result<Option<String>, ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        self.open(buf)?;

        let mut out = Vec::new();
        loop {
            let mark = buf.mark();
            let before = out.len();
            if !self.decode_unit(buf, &mut out)? {
                break;
            }
            if out.len() > max && before > 0 {
                out.truncate(before);
                buf.rewind(mark);
                break;
            }
            if out.len() >= max {
                break;
            }
        }

        if out.is_empty() && self.state == StringState::Closed {
            self.consumed = true;
            return Ok(None);
        }
        Ok(Some(decode_lossy(out)))
    }

    /// [`read_chunk`](Self::read_chunk) with the buffer's configured
    /// [`string_chunk_size`](crate::ParserOptions::string_chunk_size).
    ///
    /// # Errors
    ///
    /// As for [`read_chunk`](Self::read_chunk).
    pub fn next_chunk(&mut self, buf: &mut ByteBuffer) -> Result<Option<String>, ParseError> {
        let max = buf.options().string_chunk_size;
        self.read_chunk(buf, max)
    }

    /// Iterates over chunks of at most `max` bytes of already buffered input.
    ///
    /// ```
    /// use jsonpump::{ByteBuffer, JsonString};
    ///
    /// let mut buf = ByteBuffer::new();
    /// buf.feed(b"\"abcde\"").unwrap();
    /// let mut s = JsonString::new();
    /// let chunks: Result<Vec<_>, _> = s.chunks(&mut buf, 2).collect();
    /// assert_eq!(chunks.unwrap(), ["ab", "cd", "e"]);
    /// ```
    pub fn chunks<'a>(&'a mut self, buf: &'a mut ByteBuffer, max: usize) -> Chunks<'a> {
        Chunks {
            string: self,
            buf,
            max,
            done: false,
        }
    }
}

impl JsonEntity for JsonString {
    type Output = String;

    fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn read(&mut self, buf: &mut ByteBuffer) -> Result<String, ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        self.open(buf)?;

        let mut out = Vec::new();
        while self.decode_unit(buf, &mut out)? {}
        self.consumed = true;
        Ok(decode_lossy(out))
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.consumed {
            return Ok(());
        }
        self.open(buf)?;

        let mut scratch = Vec::new();
        while self.decode_unit(buf, &mut scratch)? {
            scratch.clear();
        }
        self.consumed = true;
        Ok(())
    }
}

/// Iterator returned by [`JsonString::chunks`].
///
/// Yields `Err` at most once, then stops.
pub struct Chunks<'a> {
    string: &'a mut JsonString,
    buf: &'a mut ByteBuffer,
    max: usize,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Result<String, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.string.read_chunk(self.buf, self.max) {
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

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};

    use rstest::rstest;

    use super::JsonString;
    use crate::{ByteBuffer, JsonEntity, ParseError, SyntaxError};

    fn closed(input: &[u8]) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        buf.feed(input).unwrap();
        buf.close();
        buf
    }

    #[rstest]
    #[case::plain(br#""hello""#, "hello")]
    #[case::empty(br#""""#, "")]
    #[case::escapes(br#""a\"b\\c\/d\b\f\n\r\t""#, "a\"b\\c/d\u{8}\u{c}\n\r\t")]
    #[case::raw_utf8("\"žluťoučký 🐎\"".as_bytes(), "žluťoučký 🐎")]
    #[case::pair(br#""\uD834\uDD1E""#, "𝄞")]
    #[case::lone_high(br#""\uD834x""#, "\u{FFFD}x")]
    #[case::invalid_utf8(b"\"a\xFFb\"", "a\u{FFFD}b")]
    #[case::leading_whitespace(b" \n\"x\"", "x")]
    fn decodes(#[case] input: &[u8], #[case] expected: &str) {
        let mut buf = closed(input);
        let mut s = JsonString::new();
        assert_eq!(s.read(&mut buf).unwrap(), expected);
        assert!(s.is_consumed());
        assert!(buf.at_end());
    }

    #[test]
    fn second_read_fails() {
        let mut buf = closed(br#""x""#);
        let mut s = JsonString::new();
        s.read(&mut buf).unwrap();
        assert_eq!(s.read(&mut buf), Err(ParseError::AlreadyConsumed));
        assert_eq!(s.consume(&mut buf), Ok(()));
    }

    #[test]
    fn invalid_escape() {
        let mut buf = closed(br#""ab\qc""#);
        assert_eq!(
            JsonString::new().read(&mut buf),
            Err(ParseError::Syntax {
                kind: SyntaxError::InvalidEscape(b'q'),
                offset: 4,
            })
        );
    }

    #[test]
    fn unterminated() {
        let mut buf = closed(br#""abc"#);
        assert_eq!(JsonString::new().read(&mut buf), Err(ParseError::EndOfInput));
    }

    #[test]
    fn try_read_resumes_across_feeds() {
        let mut buf = ByteBuffer::new();
        let mut s = JsonString::new();
        for piece in [&br#""ab\u00"#[..], b"e", b"9", br#"!""#] {
            assert_eq!(s.try_read(&mut buf), Ok(None));
            buf.feed(piece).unwrap();
        }
        assert_eq!(s.try_read(&mut buf), Ok(Some(String::from("abé!"))));
    }

    #[test]
    fn chunks_never_split_code_points() {
        let text = "aé€😀b";
        let mut input = Vec::from(&b"\""[..]);
        input.extend_from_slice(text.as_bytes());
        input.push(b'"');

        for max in 1..=8 {
            let mut buf = closed(&input);
            let mut s = JsonString::new();
            let chunks: Vec<String> = s.chunks(&mut buf, max).map(Result::unwrap).collect();
            assert_eq!(chunks.concat(), text, "max = {max}");
            for chunk in &chunks {
                assert!(chunk.len() <= max || chunk.chars().count() == 1, "{chunk:?}");
            }
            assert!(s.is_consumed());
        }
    }

    #[test]
    fn escaped_pair_is_one_unit() {
        let mut buf = closed(br#""\uD83D\uDE00z""#);
        let mut s = JsonString::new();
        assert_eq!(s.read_chunk(&mut buf, 1), Ok(Some(String::from("😀"))));
        assert_eq!(s.read_chunk(&mut buf, 1), Ok(Some(String::from("z"))));
        assert_eq!(s.read_chunk(&mut buf, 1), Ok(None));
        assert_eq!(s.read_chunk(&mut buf, 1), Err(ParseError::AlreadyConsumed));
    }

    #[test]
    fn consume_skips_the_body() {
        let mut buf = closed(br#""skip \" me", 1"#);
        let mut s = JsonString::new();
        s.consume(&mut buf).unwrap();
        assert_eq!(buf.next(), Ok(b','));
    }
}
