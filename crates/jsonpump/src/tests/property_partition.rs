use alloc::{string::ToString, vec::Vec};

use quickcheck::QuickCheck;

use super::{arbitrary::split_bytes, flatten::reference_pairs};
use crate::{
    IterSource, KeyValuePair, KeyValueParser, ParseError, ParserOptions, Reader, Value, ValueDecoder,
};

fn test_count() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

/// Property: feeding a document in arbitrary byte-sized pieces decodes the
/// same value as feeding it whole.
#[test]
fn value_decoder_ignores_chunk_boundaries() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>) -> bool {
        let src = value.to_string();
        let mut decoder = ValueDecoder::new();
        for chunk in split_bytes(src.as_bytes(), &splits) {
            decoder.feed(chunk).unwrap();
        }
        decoder.finish() == Ok(value)
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>) -> bool);
}

/// Property: the flattened pairs, and their order, do not depend on how the
/// input was split.
#[test]
fn key_value_parser_ignores_chunk_boundaries() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>) -> bool {
        let src = value.to_string();
        let mut parser = KeyValueParser::new();
        let mut pairs: Vec<Result<KeyValuePair, ParseError>> = Vec::new();
        for chunk in split_bytes(src.as_bytes(), &splits) {
            pairs.extend(parser.feed(chunk));
        }
        pairs.extend(parser.finish());

        if value.is_composite() {
            let pairs: Result<Vec<_>, _> = pairs.into_iter().collect();
            pairs == Ok(reference_pairs(&value))
        } else {
            matches!(pairs.as_slice(), [Err(ParseError::NonCompositeRoot(_))])
        }
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>) -> bool);
}

/// Property: a reader pulling tiny pieces from a chunked source agrees with
/// whole-buffer decoding, whatever the pump size.
#[test]
fn reader_ignores_pump_size() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>, pump_size: u8) -> bool {
        let src = value.to_string();
        let options = ParserOptions {
            pump_size: usize::from(pump_size % 8),
            max_buffer_size: 8,
            ..ParserOptions::default()
        };
        let chunks = split_bytes(src.as_bytes(), &splits);
        let mut reader = Reader::with_options(IterSource::new(chunks), options);
        reader.read_value().unwrap() == value
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>, u8) -> bool);
}
