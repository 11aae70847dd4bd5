use super::JsonEntity;
use crate::{ByteBuffer, ParseError, SyntaxError, literal::Literal};

/// Peeks the lead byte of a literal, skipping leading whitespace.
fn lead_byte(buf: &mut ByteBuffer) -> Result<u8, ParseError> {
    buf.skip_whitespace()?;
    buf.peek(0)?.ok_or(ParseError::EndOfInput)
}

/// `true` or `false`.
#[derive(Debug, Clone, Default)]
pub struct JsonBoolean {
    consumed: bool,
}

impl JsonBoolean {
    /// A boolean entity with nothing read yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl JsonEntity for JsonBoolean {
    type Output = bool;

    fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn read(&mut self, buf: &mut ByteBuffer) -> Result<bool, ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        let lead = lead_byte(buf)?;
        let value = match Literal::from_lead_byte(lead) {
            Some(Literal::True) => Literal::True.expect_in(buf).map(|_| true)?,
            Some(Literal::False) => Literal::False.expect_in(buf).map(|_| false)?,
            _ => return Err(buf.syntax_error(SyntaxError::UnexpectedToken(lead))),
        };
        self.consumed = true;
        Ok(value)
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.consumed {
            return Ok(());
        }
        self.read(buf).map(drop)
    }
}

/// `null`.
#[derive(Debug, Clone, Default)]
pub struct JsonNull {
    consumed: bool,
}

impl JsonNull {
    /// A null entity with nothing read yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl JsonEntity for JsonNull {
    type Output = ();

    fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn read(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.consumed {
            return Err(ParseError::AlreadyConsumed);
        }
        let lead = lead_byte(buf)?;
        if lead != b'n' {
            return Err(buf.syntax_error(SyntaxError::UnexpectedToken(lead)));
        }
        Literal::Null.expect_in(buf)?;
        self.consumed = true;
        Ok(())
    }

    fn consume(&mut self, buf: &mut ByteBuffer) -> Result<(), ParseError> {
        if self.consumed {
            return Ok(());
        }
        self.read(buf)
    }
}
