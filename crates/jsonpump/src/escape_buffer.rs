//! Decoding of backslash escapes inside JSON strings.
//!
//! [`UnicodeEscapeBuffer`] accumulates the four hexadecimal digits of a `\u`
//! escape into a UTF-16 code unit. [`read_escape`] decodes one complete escape
//! from a [`ByteBuffer`], pairing a high surrogate with an immediately
//! following `\u` low surrogate. Unpaired surrogates decode to U+FFFD.
use crate::{ByteBuffer, ParseError, SyntaxError};

/// Accumulates up to four ASCII hex digits into a UTF-16 code unit.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct UnicodeEscapeBuffer {
    unit: u16,
    len: u8,
}

impl UnicodeEscapeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.unit = 0;
        self.len = 0;
    }

    /// Feeds one digit.
    ///
    /// Returns `Ok(Some(unit))` on the fourth digit (and resets), `Ok(None)`
    /// before that.
    pub fn feed(&mut self, byte: u8) -> Result<Option<u16>, SyntaxError> {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(SyntaxError::InvalidUnicodeEscapeChar(byte)),
        };
        self.unit = (self.unit << 4) | u16::from(digit);
        self.len += 1;

        if self.len == 4 {
            let unit = self.unit;
            self.reset();
            Ok(Some(unit))
        } else {
            Ok(None)
        }
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Reads the four digits following `\u`.
fn read_code_unit(buf: &mut ByteBuffer) -> Result<u16, ParseError> {
    let mut hex = UnicodeEscapeBuffer::new();
    loop {
        let byte = buf.next()?;
        match hex.feed(byte) {
            Ok(Some(unit)) => return Ok(unit),
            Ok(None) => {}
            Err(kind) => {
                return Err(ParseError::Syntax {
                    kind,
                    offset: buf.position() - 1,
                });
            }
        }
    }
}

/// Decodes one escape sequence; the cursor must be just past the backslash.
pub(crate) fn read_escape(buf: &mut ByteBuffer) -> Result<char, ParseError> {
    let letter = buf.next()?;
    let ch = match letter {
        b'"' => '"',
        b'\\' => '\\',
        b'/' => '/',
        b'b' => '\u{8}',
        b'f' => '\u{c}',
        b'n' => '\n',
        b'r' => '\r',
        b't' => '\t',
        b'u' => {
            let unit = read_code_unit(buf)?;
            if is_high_surrogate(unit) {
                read_low_surrogate(buf, unit)?
            } else {
                char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
        }
        other => {
            return Err(ParseError::Syntax {
                kind: SyntaxError::InvalidEscape(other),
                offset: buf.position() - 1,
            });
        }
    };
    Ok(ch)
}

/// Completes a surrogate pair if a `\u` low surrogate follows. Anything else
/// is left in the buffer and the high surrogate alone becomes U+FFFD.
fn read_low_surrogate(buf: &mut ByteBuffer, high: u16) -> Result<char, ParseError> {
    if buf.peek(0)? != Some(b'\\') || buf.peek(1)? != Some(b'u') {
        return Ok(char::REPLACEMENT_CHARACTER);
    }

    let mark = buf.mark();
    buf.advance();
    buf.advance();
    let low = read_code_unit(buf)?;
    if !is_low_surrogate(low) {
        buf.rewind(mark);
        return Ok(char::REPLACEMENT_CHARACTER);
    }

    let code = 0x1_0000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
    Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
}
