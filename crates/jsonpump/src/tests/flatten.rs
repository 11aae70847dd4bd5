use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use insta::assert_snapshot;
use rstest::rstest;

use crate::{
    ByteBuffer, EntityKind, Flatten, KeyValuePair, ParseError, Primitive, Speculative, Value, flatten,
};

/// Flattens a materialized value the obvious recursive way.
pub(super) fn reference_pairs(value: &Value) -> Vec<KeyValuePair> {
    fn walk(value: &Value, path: &str, root: bool, out: &mut Vec<KeyValuePair>) {
        let value = match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if root { key.clone() } else { format!("{path}.{key}") };
                    walk(child, &path, false, out);
                }
                return;
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    walk(child, &format!("{path}[{i}]"), false, out);
                }
                return;
            }
            Value::Null => Primitive::Null,
            Value::Boolean(b) => Primitive::Boolean(*b),
            Value::Number(n) => Primitive::Number(*n),
            Value::String(s) => Primitive::String(s.clone()),
        };
        out.push(KeyValuePair {
            path: path.to_string(),
            value,
        });
    }

    let mut out = Vec::new();
    walk(value, "", true, &mut out);
    out
}

fn paths(input: &str) -> Vec<String> {
    flatten(input.as_bytes())
        .unwrap()
        .into_iter()
        .map(|pair| pair.path)
        .collect()
}

#[rstest]
#[case::flat_object(r#"{"a": 1, "b": 2}"#, &["a", "b"])]
#[case::nested_object(r#"{"a": {"b": {"c": null}}}"#, &["a.b.c"])]
#[case::root_array("[1, 2, 3]", &["[0]", "[1]", "[2]"])]
#[case::array_in_object(r#"{"xs": [true, false]}"#, &["xs[0]", "xs[1]"])]
#[case::object_in_array(r#"[{"k": "v"}, {"k": "w"}]"#, &["[0].k", "[1].k"])]
#[case::nested_arrays("[[1, [2]], [[3]]]", &["[0][0]", "[0][1][0]", "[1][0][0]"])]
#[case::empty_key(r#"{"": 1}"#, &[""])]
#[case::escaped_key(r#"{"a\"b": 1}"#, &["a\"b"])]
#[case::document_order(r#"{"z": 1, "a": 2, "m": 3}"#, &["z", "a", "m"])]
fn flattened_paths(#[case] input: &str, #[case] expected: &[&str]) {
    assert_eq!(paths(input), expected);
}

#[rstest]
#[case::empty_object("{}")]
#[case::empty_array("[]")]
#[case::nested_empties(r#"{"a": {}, "b": [], "c": [{}, []]}"#)]
fn empty_composites_emit_nothing(#[case] input: &str) {
    assert_eq!(flatten(input.as_bytes()), Ok(Vec::new()));
}

#[test]
fn empty_composites_do_not_disturb_siblings() {
    assert_eq!(paths(r#"{"a": {}, "b": [[], 1], "c": 2}"#), ["b[1]", "c"]);
}

#[rstest]
#[case::string(r#""text""#, EntityKind::String)]
#[case::number("42", EntityKind::Number)]
#[case::boolean("true", EntityKind::Boolean)]
#[case::null("null", EntityKind::Null)]
fn scalar_roots_are_rejected(#[case] input: &str, #[case] kind: EntityKind) {
    assert_eq!(flatten(input.as_bytes()), Err(ParseError::NonCompositeRoot(kind)));
}

#[test]
fn snapshot_nested_document() {
    let json = r#"{
        "users": [
            {"id": 1, "name": "Ada", "langs": ["en", "fr"]},
            {"id": 2, "name": "Grace", "active": false}
        ],
        "meta": {"count": 2, "next": null, "ratio": 0.5}
    }"#;

    let lines: Vec<String> = flatten(json.as_bytes())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_snapshot!(lines.join("\n"), @r#"
    users[0].id = 1
    users[0].name = "Ada"
    users[0].langs[0] = "en"
    users[0].langs[1] = "fr"
    users[1].id = 2
    users[1].name = "Grace"
    users[1].active = false
    meta.count = 2
    meta.next = null
    meta.ratio = 0.5
    "#);
}

#[test]
fn matches_reference_flattening() {
    let json = r#"{"a": [1, {"b": "c", "d": [null, true]}], "e": {"f": -2.5e3}}"#;
    let value = crate::parse(json.as_bytes()).unwrap();
    // Keys are already sorted, so map order and document order agree.
    assert_eq!(flatten(json.as_bytes()).unwrap(), reference_pairs(&value));
}

/// Property: flattening visits primitives in document order, which for a
/// rendered `Value` is the map's key order.
#[quickcheck_macros::quickcheck]
#[allow(clippy::needless_pass_by_value)]
fn order_matches_recursive_walk(value: Value) -> bool {
    match flatten(value.to_string().as_bytes()) {
        Ok(pairs) => pairs == reference_pairs(&value),
        Err(ParseError::NonCompositeRoot(_)) => !value.is_composite(),
        Err(_) => false,
    }
}

#[test]
fn frames_track_open_ancestors() {
    let mut buf = ByteBuffer::new();
    buf.feed(br#"{"a": {"b": [1, "#).unwrap();
    let mut traversal = Flatten::new();

    let first = traversal.next_pair(&mut buf).unwrap().unwrap();
    assert_eq!(first.path, "a.b[0]");
    let prefixes: Vec<&str> = traversal.frames().iter().map(|frame| frame.prefix()).collect();
    assert_eq!(prefixes, ["", "a", "a.b"]);

    assert_eq!(traversal.try_parse(&mut buf, |t, buf| t.next_pair(buf)), Ok(None));
    assert_eq!(traversal.frames().len(), 3);

    buf.feed(b"2]}}").unwrap();
    buf.close();
    let second = traversal.next_pair(&mut buf).unwrap().unwrap();
    assert_eq!(second.path, "a.b[1]");
    assert_eq!(traversal.next_pair(&mut buf), Ok(None));
    assert!(traversal.is_finished());
}

#[test]
fn pairs_are_emitted_before_the_document_ends() {
    let mut parser = crate::KeyValueParser::new();
    let early: Vec<_> = parser.feed(br#"{"a": "x", "b": [true, 1"#).collect();
    assert_eq!(early.len(), 2);
    assert_eq!(
        early[1],
        Ok(KeyValuePair {
            path: "b[0]".into(),
            value: Primitive::Boolean(true)
        })
    );
    let late: Vec<_> = parser.feed(b"0]}").collect();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].as_ref().map(|pair| pair.value.clone()), Ok(Primitive::Number(10.0)));
}
