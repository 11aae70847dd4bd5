use alloc::{boxed::Box, string::String, vec::Vec};

use quickcheck::{Arbitrary, Gen};

use crate::{Array, Map, Value};

/// A finite `f64`: JSON has no spelling for NaN or the infinities.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct FiniteNumber(pub f64);

impl Arbitrary for FiniteNumber {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut value = f64::arbitrary(g);
        while !value.is_finite() {
            value = f64::arbitrary(g);
        }

        Self(value)
    }
}

impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        fn gen_val(g: &mut Gen, depth: usize) -> Value {
            let variants = if depth == 0 { 4 } else { 6 };
            match usize::arbitrary(g) % variants {
                0 => Value::Null,
                1 => Value::Boolean(bool::arbitrary(g)),
                2 => Value::Number(FiniteNumber::arbitrary(g).0),
                3 => Value::String(String::arbitrary(g)),
                4 => {
                    let len = usize::arbitrary(g) % 4;
                    let items: Array = (0..len).map(|_| gen_val(g, depth - 1)).collect();
                    Value::Array(items)
                }
                _ => {
                    let len = usize::arbitrary(g) % 4;
                    let mut map = Map::new();
                    for _ in 0..len {
                        map.insert(String::arbitrary(g), gen_val(g, depth - 1));
                    }
                    Value::Object(map)
                }
            }
        }

        let depth = usize::arbitrary(g) % 3;
        gen_val(g, depth)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Value::Array(items) => {
                let items = items.clone();
                Box::new((0..items.len()).map(move |skip| {
                    let mut smaller = items.clone();
                    smaller.remove(skip);
                    Value::Array(smaller)
                }))
            }
            Value::Object(map) => {
                let keys: Vec<String> = map.keys().cloned().collect();
                let map = map.clone();
                Box::new(keys.into_iter().map(move |key| {
                    let mut smaller = map.clone();
                    smaller.remove(&key);
                    Value::Object(smaller)
                }))
            }
            _ => quickcheck::empty_shrinker(),
        }
    }
}

/// Splits `bytes` at arbitrary byte offsets derived from `splits`, ignoring
/// code point boundaries.
pub(crate) fn split_bytes<'a>(bytes: &'a [u8], splits: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut rest = bytes;
    for s in splits {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at(1 + s % rest.len());
        chunks.push(chunk);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
