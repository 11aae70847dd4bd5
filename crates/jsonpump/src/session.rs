//! Push-style sessions: the caller feeds bytes as they arrive and collects
//! whatever became complete.
//!
//! Both sessions own their [`ByteBuffer`] and drive the entity model through
//! [`try_parse`], so a feed that ends in the middle of a token simply yields
//! nothing until the next one. After the first unrecoverable error a session
//! is inert: every later call reports that error again.

use alloc::vec::Vec;

use crate::{
    ByteBuffer, Flatten, KeyValuePair, ParseError, ParserOptions, SyntaxError, Value,
    speculative::attempt_once,
    tree::{TreeBuilder, TreeWalk},
};

/// Fails with [`SyntaxError::TrailingCharacters`] unless only whitespace is
/// left before end-of-input.
pub(crate) fn expect_end(buf: &mut ByteBuffer) -> Result<(), ParseError> {
    buf.skip_whitespace()?;
    match buf.peek(0)? {
        None => Ok(()),
        Some(byte) => Err(buf.syntax_error(SyntaxError::TrailingCharacters(byte))),
    }
}

/// Decodes one document into a [`Value`] as bytes are fed.
///
/// Each feed advances the document by as many whole members and items as
/// the new bytes complete; only the member or item still open is retried on
/// the next feed, and the bytes of closed ones can be compacted away.
///
/// ```
/// use jsonpump::{ValueDecoder, Value};
///
/// let mut decoder = ValueDecoder::new();
/// decoder.feed(br#"{"a": [1, tr"#).unwrap();
/// assert!(decoder.value().is_none());
/// decoder.feed(b"ue]}").unwrap();
/// assert!(decoder.value().is_some());
/// assert_eq!(decoder.finish().unwrap().to_string(), r#"{"a":[1,true]}"#);
/// ```
#[derive(Debug)]
pub struct ValueDecoder {
    buf: ByteBuffer,
    walk: TreeWalk,
    tree: TreeBuilder,
    value: Option<Value>,
    error: Option<ParseError>,
}

impl Default for ValueDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueDecoder {
    /// A decoder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// A decoder configured by `options`.
    #[must_use]
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            buf: ByteBuffer::with_options(options),
            walk: TreeWalk::new(),
            tree: TreeBuilder::default(),
            value: None,
            error: None,
        }
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        self.error = Some(err.clone());
        err
    }

    /// Runs walk steps until the document is complete or the bytes run out.
    fn advance(&mut self) -> Result<(), ParseError> {
        while self.value.is_none() {
            match attempt_once(&mut self.walk, &mut self.buf, TreeWalk::next_event)? {
                Some(event) => self.value = self.tree.apply(event),
                None => break,
            }
        }
        Ok(())
    }

    /// Appends `bytes` and tries to complete the document.
    ///
    /// # Errors
    ///
    /// Grammar errors, buffer limit violations, and any error reported
    /// earlier by this decoder.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if let Err(err) = self.buf.feed(bytes) {
            return Err(self.fail(err));
        }
        self.advance().map_err(|err| self.fail(err))
    }

    /// The document, once it is complete.
    ///
    /// A number at the very end of the input stays incomplete until
    /// [`finish`](Self::finish): more digits could follow.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Signals end-of-input and returns the document.
    ///
    /// # Errors
    ///
    /// [`ParseError::EndOfInput`] if the document is incomplete,
    /// [`SyntaxError::TrailingCharacters`] if anything but whitespace follows
    /// it, or any error reported earlier.
    pub fn finish(mut self) -> Result<Value, ParseError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.buf.close();
        self.advance()?;
        expect_end(&mut self.buf)?;
        self.value.ok_or(ParseError::EndOfInput)
    }
}

/// Flattens one document into [`KeyValuePair`]s as bytes are fed.
///
/// ```
/// use jsonpump::KeyValueParser;
///
/// let mut parser = KeyValueParser::new();
/// let early: Vec<_> = parser
///     .feed(br#"{"id": 7, "tags": ["x", "#)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(early.len(), 2);
///
/// let late: Vec<_> = parser.feed(br#""y"]}"#).collect::<Result<_, _>>().unwrap();
/// assert_eq!(late[0].to_string(), r#"tags[1] = "y""#);
/// assert_eq!(parser.finish().count(), 0);
/// ```
#[derive(Debug)]
pub struct KeyValueParser {
    buf: ByteBuffer,
    flatten: Flatten,
    /// The root composite has been closed.
    done: bool,
    /// Nothing follows the document but whitespace.
    finished: bool,
    error: Option<ParseError>,
}

impl Default for KeyValueParser {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueParser {
    /// A parser with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// A parser configured by `options`.
    #[must_use]
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            buf: ByteBuffer::with_options(options),
            flatten: Flatten::new(),
            done: false,
            finished: false,
            error: None,
        }
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        self.error = Some(err.clone());
        err
    }

    /// Appends `bytes` and returns the pairs that became complete.
    ///
    /// A failed feed, or an error reported earlier, comes out as the first
    /// and only item.
    pub fn feed(&mut self, bytes: &[u8]) -> Pairs<'_> {
        let pending = match self.error.clone() {
            Some(err) => Some(err),
            None => self.buf.feed(bytes).err().map(|err| self.fail(err)),
        };
        Pairs { parser: self, pending }
    }

    /// Signals end-of-input and returns the remaining pairs.
    ///
    /// A truncated document ends with [`ParseError::EndOfInput`]; trailing
    /// non-whitespace with [`SyntaxError::TrailingCharacters`].
    pub fn finish(mut self) -> IntoPairs {
        self.buf.close();
        let pending = self.error.clone();
        IntoPairs { parser: self, pending }
    }

    /// Produces the next ready pair.
    fn step(&mut self) -> Option<Result<KeyValuePair, ParseError>> {
        if self.error.is_some() || self.finished {
            return None;
        }

        if !self.done {
            let result = attempt_once(&mut self.flatten, &mut self.buf, |flatten, buf| flatten.next_pair(buf));
            match result {
                Ok(Some(Some(pair))) => return Some(Ok(pair)),
                Ok(Some(None)) => self.done = true,
                Ok(None) => return None,
                Err(err) => return Some(Err(self.fail(err))),
            }
        }

        if self.buf.is_closed() {
            self.finished = true;
            if let Err(err) = expect_end(&mut self.buf) {
                return Some(Err(self.fail(err)));
            }
        }
        None
    }
}

/// Pairs completed by one [`KeyValueParser::feed`].
pub struct Pairs<'a> {
    parser: &'a mut KeyValueParser,
    pending: Option<ParseError>,
}

impl Iterator for Pairs<'_> {
    type Item = Result<KeyValuePair, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        self.parser.step()
    }
}

/// Pairs remaining after [`KeyValueParser::finish`].
pub struct IntoPairs {
    parser: KeyValueParser,
    pending: Option<ParseError>,
}

impl Iterator for IntoPairs {
    type Item = Result<KeyValuePair, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        self.parser.step()
    }
}

/// Decodes a complete document.
///
/// ```
/// let value = jsonpump::parse(br#"[1, "two", {"three": null}]"#).unwrap();
/// assert_eq!(value.to_string(), r#"[1,"two",{"three":null}]"#);
/// ```
///
/// # Errors
///
/// Any [`ParseError`]; truncated input is [`ParseError::EndOfInput`].
pub fn parse(bytes: &[u8]) -> Result<Value, ParseError> {
    let mut decoder = ValueDecoder::new();
    decoder.feed(bytes)?;
    decoder.finish()
}

/// Flattens a complete document.
///
/// # Errors
///
/// As for [`parse`], plus [`ParseError::NonCompositeRoot`] for a scalar
/// document.
pub fn flatten(bytes: &[u8]) -> Result<Vec<KeyValuePair>, ParseError> {
    let mut parser = KeyValueParser::new();
    let mut pairs = parser.feed(bytes).collect::<Result<Vec<_>, _>>()?;
    for pair in parser.finish() {
        pairs.push(pair?);
    }
    Ok(pairs)
}
