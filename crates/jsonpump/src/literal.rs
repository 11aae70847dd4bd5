use crate::{ByteBuffer, ParseError};

/// The three keyword literals of JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Literal {
    Null,
    True,
    False,
}

impl Literal {
    /// The literal a lead byte starts, if any.
    pub fn from_lead_byte(byte: u8) -> Option<Self> {
        match byte {
            b'n' => Some(Self::Null),
            b't' => Some(Self::True),
            b'f' => Some(Self::False),
            _ => None,
        }
    }

    pub fn bytes(self) -> &'static [u8] {
        match self {
            Self::Null => b"null",
            Self::True => b"true",
            Self::False => b"false",
        }
    }

    /// Consumes the literal byte by byte.
    ///
    /// A truncated literal fails the way [`ByteBuffer::next`] does; a wrong
    /// letter is a syntax error at that letter.
    pub fn expect_in(self, buf: &mut ByteBuffer) -> Result<Self, ParseError> {
        for &byte in self.bytes() {
            buf.expect(byte)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::Literal;
    use crate::{ByteBuffer, ParseError, SyntaxError};

    #[test]
    fn matches_across_feeds() {
        let mut buf = ByteBuffer::new();
        buf.feed(b"fal").unwrap();
        let attempt = |buf: &mut ByteBuffer| Literal::False.expect_in(buf);
        assert_eq!(buf.reset_on_fail(attempt), Ok(None));
        buf.feed(b"se").unwrap();
        assert_eq!(buf.reset_on_fail(attempt), Ok(Some(Literal::False)));
    }

    #[test]
    fn mismatch_reports_the_letter() {
        let mut buf = ByteBuffer::new();
        buf.feed(b"nul!").unwrap();
        assert_eq!(
            Literal::Null.expect_in(&mut buf),
            Err(ParseError::Syntax {
                kind: SyntaxError::UnexpectedByte {
                    expected: b'l',
                    found: b'!'
                },
                offset: 3,
            })
        );
    }

    #[test]
    fn truncated_at_end_of_input() {
        let mut buf = ByteBuffer::new();
        buf.feed(b"tr").unwrap();
        buf.close();
        assert_eq!(Literal::True.expect_in(&mut buf), Err(ParseError::EndOfInput));
        assert_eq!(Literal::from_lead_byte(b'x'), None);
    }
}
