//! Agreement with `serde_json` on well-formed documents.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use rstest::rstest;

use crate::{IterSource, Reader, Value, parse};

#[rstest]
#[case::scalars(r#"[null, true, false, 0, -0, 1.5, -2e-3, 1E+2, "s"]"#)]
#[case::nested(r#"{"a": {"b": [1, {"c": [[], {}]}]}, "d": ""}"#)]
#[case::escapes(r#"["\"\\\/\b\f\n\r\t", "é中", "😀"]"#)]
#[case::raw_utf8("[\"h\u{e9}llo \u{4e16}\u{754c} \u{1f980}\"]")]
#[case::whitespace(" \r\n\t{ \"a\" :\n[ 1 ,\t2 ] } \n")]
#[case::integers("[1e10, -123456789, 4503599627370496, 12345678901234567890]")]
#[case::duplicate_keys(r#"{"k": 1, "k": 2}"#)]
fn agrees_with_serde_json(#[case] input: &str) {
    let expected: Value = serde_json::from_str(input).unwrap();
    assert_eq!(parse(input.as_bytes()), Ok(expected.clone()));

    let chunks: Vec<&[u8]> = input.as_bytes().chunks(3).collect();
    let mut reader = Reader::new(IterSource::new(chunks));
    assert_eq!(reader.read_value().unwrap(), expected);
}

#[test]
fn rendering_is_valid_json() {
    let input = r#"{"text": "line\nbreak \u0001  ", "n": [0.1, -3, 2.5e3]}"#;
    let value = parse(input.as_bytes()).unwrap();
    let rendered: String = value.to_string();
    let reparsed: Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(reparsed, value);
}
