#![no_main]
//! Decoding must not depend on how the input is split: the fragmented run has
//! to agree with the whole-buffer run, value for value and error for error.

use jsonpump::{KeyValueParser, ParseError, ParserOptions, ValueDecoder};
use libfuzzer_sys::fuzz_target;

const HEADER: usize = 5; // 1 flag + 4-byte seed

/// Split `bytes` into pieces whose sizes are derived from `split_seed`. Each
/// piece is at least one byte; code points may be cut anywhere.
fn split_into_chunks(bytes: &[u8], split_seed: u64) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut seed = split_seed;
    let mut rest = bytes;
    while !rest.is_empty() {
        let size = (seed as usize % rest.len()) + 1;
        let (chunk, tail) = rest.split_at(size);
        chunks.push(chunk);
        rest = tail;
        seed = seed.rotate_left(7) ^ 0x9E37_79B9;
    }
    chunks
}

fn decode(chunks: &[&[u8]], options: ParserOptions) -> Result<jsonpump::Value, ParseError> {
    let mut decoder = ValueDecoder::with_options(options);
    for chunk in chunks {
        decoder.feed(chunk)?;
    }
    decoder.finish()
}

fn flatten(chunks: &[&[u8]], options: ParserOptions) -> Vec<Result<jsonpump::KeyValuePair, ParseError>> {
    let mut parser = KeyValueParser::with_options(options);
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(parser.feed(chunk));
    }
    out.extend(parser.finish());
    // A failed parser repeats its error on every later call.
    if let Some(first_error) = out.iter().position(Result::is_err) {
        out.truncate(first_error + 1);
    }
    out
}

fn run(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }
    let flags = data[0];
    let split_seed = u64::from(u32::from_le_bytes([data[1], data[2], data[3], data[4]]));
    let data = &data[HEADER..];

    let options = ParserOptions {
        max_buffer_size: 1 + usize::from(flags & 0x3F),
        ..ParserOptions::default()
    };
    let chunks = split_into_chunks(data, split_seed);

    // NaN never decodes, so `==` is a valid comparison here.
    assert_eq!(decode(&chunks, options), decode(&[data], options));
    if flags & 0x40 != 0 {
        assert_eq!(flatten(&chunks, options), flatten(&[data], options));
    }
}

fuzz_target!(|data: &[u8]| run(data));
