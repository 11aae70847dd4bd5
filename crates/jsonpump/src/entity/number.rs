use alloc::string::String;
use core::str::FromStr;

use super::JsonEntity;
use crate::{ByteBuffer, ParseError, SyntaxError};

/// Bytes that may appear in a number's lexeme.
fn is_numeric(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
}

/// A JSON number.
///
/// The lexeme is the longest run of digits, signs, dots and exponent
/// markers; its validity is decided by `f64::from_str`. A number at the very
/// end of the input is only complete once end-of-input has been signaled.
/// A lexeme that overflows `f64` (`1e400`) is rejected rather than read as
/// infinity.
#[derive(Debug, Clone, Default)]
pub struct JsonNumber {
    consumed: bool,
}

impl JsonNumber {
    /// A number entity with nothing read yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the raw lexeme without converting it.
    ///
    /// # Errors
    ///
    /// [`ParseError::AlreadyConsumed`], a syntax error if no numeric byte is
    /// present, or an input exhaustion error.
    pub fn read_lexeme(&mut self, buf: &mut ByteBuffer) -> Result<String, ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        buf.skip_whitespace()?;

        let mut lexeme = String::new();
        while let Some(byte) = buf.peek(0)? {
            if !is_numeric(byte) {
                break;
            }
            lexeme.push(char::from(byte));
            buf.advance();
        }

        if lexeme.is_empty() {
            return Err(match buf.peek(0)? {
                Some(byte) => buf.syntax_error(SyntaxError::UnexpectedToken(byte)),
                None => ParseError::EndOfInput,
            });
        }
        self.consumed = true;
        Ok(lexeme)
    }
}

impl JsonEntity for JsonNumber {
    type Output = f64;

    fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn read(&mut self, buf: &mut ByteBuffer) -> Result<f64, ParseError> {
        buf.skip_whitespace()?;
        let offset = buf.position();
        let lexeme = self.read_lexeme(buf)?;
        // Overflow to infinity has no JSON rendering.
        match f64::from_str(&lexeme) {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(ParseError::Syntax {
                kind: SyntaxError::InvalidNumber(lexeme),
                offset,
            }),
        }
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.consumed {
            return Ok(());
        }
        self.read(buf).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use rstest::rstest;

    use super::JsonNumber;
    use crate::{ByteBuffer, JsonEntity, ParseError, SyntaxError};

    fn closed(input: &str) -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        buf.feed(input.as_bytes()).unwrap();
        buf.close();
        buf
    }

    #[rstest]
    #[case("0", 0.0)]
    #[case("-12", -12.0)]
    #[case("3.25", 3.25)]
    #[case("1e3", 1000.0)]
    #[case("-2.5E-2", -0.025)]
    #[case("12,", 12.0)]
    #[case("7]", 7.0)]
    #[allow(clippy::float_cmp)]
    fn parses(#[case] input: &str, #[case] expected: f64) {
        let mut buf = closed(input);
        assert_eq!(JsonNumber::new().read(&mut buf).unwrap(), expected);
    }

    #[rstest]
    #[case("1.2.3")]
    #[case("1e")]
    #[case("-")]
    #[case("1-2")]
    #[case("1e400")]
    #[case("-1e400")]
    fn rejects(#[case] input: &str) {
        let mut buf = closed(input);
        assert_eq!(
            JsonNumber::new().read(&mut buf),
            Err(ParseError::Syntax {
                kind: SyntaxError::InvalidNumber(input.to_string()),
                offset: 0,
            })
        );
    }

    #[test]
    fn open_input_needs_a_terminator() {
        let mut buf = ByteBuffer::new();
        buf.feed(b"42").unwrap();
        let mut n = JsonNumber::new();
        assert_eq!(n.try_read(&mut buf), Ok(None));
        buf.feed(b"5 ").unwrap();
        assert_eq!(n.try_read(&mut buf), Ok(Some(425.0)));
    }

    #[test]
    fn lexeme_is_raw() {
        let mut buf = closed("-0.10e+2}");
        assert_eq!(JsonNumber::new().read_lexeme(&mut buf).unwrap(), "-0.10e+2");
        assert_eq!(buf.next(), Ok(b'}'));
    }

    #[test]
    fn empty_run() {
        let mut buf = closed("x");
        assert_eq!(
            JsonNumber::new().read(&mut buf),
            Err(ParseError::Syntax {
                kind: SyntaxError::UnexpectedToken(b'x'),
                offset: 0,
            })
        );
        assert_eq!(JsonNumber::new().read(&mut closed("")), Err(ParseError::EndOfInput));
    }
}
