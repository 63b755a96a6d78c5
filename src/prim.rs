//! Leaf and container codecs for built-in types
//!
//! Derived converters look up the converter for each field's declared type
//! through the session rather than building it themselves; this module
//! supplies those ambient implementations for the standard leaves (numbers,
//! booleans, strings) and containers (options, sequences, boxes, maps).
//! Containers resolve their element converter through the knot, so cyclic
//! type graphs that pass through `Option<Box<T>>` and friends derive
//! correctly.

use crate::builder::write_seq;
use crate::conv::error::ReadError;
use crate::conv::{Converter, TreeCodec};
use crate::error::DeriveResult;
use crate::knot::Knot;
use crate::tree::Tree;
use std::collections::{BTreeMap, HashMap};

impl TreeCodec for () {
    fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
        Ok(Converter::from_fns(|_| Ok(()), |_| Tree::Null))
    }
}

impl TreeCodec for bool {
    fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
        Ok(Converter::from_fns(
            |tree| match tree {
                Tree::Bool(b) => Ok(*b),
                other => Err(ReadError::Mismatch {
                    expected: "boolean",
                    found: other.kind(),
                }),
            },
            |b| Tree::Bool(*b),
        ))
    }
}

macro_rules! impl_int_codec {
    ($($t:ty),+ $(,)?) => {
        $(
            impl TreeCodec for $t {
                fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
                    Ok(Converter::from_fns(
                        |tree| match tree {
                            #[allow(clippy::float_cmp)]
                            Tree::Num(n) => {
                                // Round-trip through the target type detects
                                // fractional and out-of-range values in one
                                // comparison; NaN and the infinities fail it
                                // as well.
                                if (*n as $t) as f64 == *n {
                                    Ok(*n as $t)
                                } else {
                                    Err(ReadError::BadNumber {
                                        expected: stringify!($t),
                                        value: *n,
                                    })
                                }
                            }
                            other => Err(ReadError::Mismatch {
                                expected: stringify!($t),
                                found: other.kind(),
                            }),
                        },
                        |value| Tree::Num(*value as f64),
                    ))
                }
            }
        )+
    };
}

// Integers travel in the tree's `f64` payload, whose exact range is
// ±2^53. Writing a 64-bit value of larger magnitude rounds it to the
// nearest representable number; reads reject any payload that is not
// exactly representable in the target type, so the rounded value still
// reads back, but not as the value originally written.
impl_int_codec!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl TreeCodec for f64 {
    fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
        Ok(Converter::from_fns(
            |tree| match tree {
                Tree::Num(n) => Ok(*n),
                other => Err(ReadError::Mismatch {
                    expected: "f64",
                    found: other.kind(),
                }),
            },
            |value| Tree::Num(*value),
        ))
    }
}

impl TreeCodec for f32 {
    fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
        Ok(Converter::from_fns(
            |tree| match tree {
                Tree::Num(n) => Ok(*n as f32),
                other => Err(ReadError::Mismatch {
                    expected: "f32",
                    found: other.kind(),
                }),
            },
            |value| Tree::Num(f64::from(*value)),
        ))
    }
}

impl TreeCodec for String {
    fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
        Ok(Converter::from_fns(
            |tree| match tree {
                Tree::String(s) => Ok(s.clone()),
                other => Err(ReadError::Mismatch {
                    expected: "string",
                    found: other.kind(),
                }),
            },
            |value| Tree::String(value.clone()),
        ))
    }
}

impl TreeCodec for char {
    fn assemble(_: &mut Knot) -> DeriveResult<Converter<Self>> {
        Ok(Converter::from_fns(
            |tree| match tree {
                Tree::String(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(c),
                        _ => Err(ReadError::Mismatch {
                            expected: "single-character string",
                            found: tree.kind(),
                        }),
                    }
                }
                other => Err(ReadError::Mismatch {
                    expected: "single-character string",
                    found: other.kind(),
                }),
            },
            |value| Tree::String(value.to_string()),
        ))
    }
}

impl<T: TreeCodec> TreeCodec for Option<T> {
    /// `None` is null; `Some(x)` is `x`'s own representation. A nested
    /// `Option<Option<T>>` therefore cannot distinguish `Some(None)` from
    /// `None`; use a dedicated wrapper type where that distinction matters.
    fn assemble(knot: &mut Knot) -> DeriveResult<Converter<Self>> {
        let inner = knot.resolve::<T>()?;
        let writer = inner.clone();
        Ok(Converter::from_fns(
            move |tree| match tree {
                Tree::Null => Ok(None),
                other => inner.read(other).map(Some),
            },
            move |value| match value {
                None => Tree::Null,
                Some(x) => writer.write(x),
            },
        ))
    }
}

impl<T: TreeCodec> TreeCodec for Vec<T> {
    fn assemble(knot: &mut Knot) -> DeriveResult<Converter<Self>> {
        let elem = knot.resolve::<T>()?;
        let writer = elem.clone();
        Ok(Converter::from_fns(
            move |tree| match tree {
                Tree::Array(items) => items.iter().map(|item| elem.read(item)).collect(),
                other => Err(ReadError::Mismatch {
                    expected: "array",
                    found: other.kind(),
                }),
            },
            move |items: &Vec<T>| write_seq(items, &writer),
        ))
    }
}

impl<T: TreeCodec> TreeCodec for Box<T> {
    fn assemble(knot: &mut Knot) -> DeriveResult<Converter<Self>> {
        let inner = knot.resolve::<T>()?;
        let writer = inner.clone();
        Ok(Converter::from_fns(
            move |tree| inner.read(tree).map(Box::new),
            move |value| writer.write(value),
        ))
    }
}

impl<T: TreeCodec> TreeCodec for BTreeMap<String, T> {
    fn assemble(knot: &mut Knot) -> DeriveResult<Converter<Self>> {
        let value_conv = knot.resolve::<T>()?;
        let writer = value_conv.clone();
        Ok(Converter::from_fns(
            move |tree| match tree {
                Tree::Object(entries) => entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), value_conv.read(v)?)))
                    .collect(),
                other => Err(ReadError::Mismatch {
                    expected: "object",
                    found: other.kind(),
                }),
            },
            move |map: &BTreeMap<String, T>| {
                Tree::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), writer.write(v)))
                        .collect(),
                )
            },
        ))
    }
}

impl<T: TreeCodec> TreeCodec for HashMap<String, T> {
    /// Entries are written in sorted key order so output is reproducible
    /// across runs regardless of hash seeding.
    fn assemble(knot: &mut Knot) -> DeriveResult<Converter<Self>> {
        let value_conv = knot.resolve::<T>()?;
        let writer = value_conv.clone();
        Ok(Converter::from_fns(
            move |tree| match tree {
                Tree::Object(entries) => entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), value_conv.read(v)?)))
                    .collect(),
                other => Err(ReadError::Mismatch {
                    expected: "object",
                    found: other.kind(),
                }),
            },
            move |map: &HashMap<String, T>| {
                let mut entries: Vec<(String, Tree)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), writer.write(v)))
                    .collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Tree::Object(entries)
            },
        ))
    }
}
