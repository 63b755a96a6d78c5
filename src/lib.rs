//! Derived tree-format converters for Rust data types
//!
//! # Overview
//!
//! This library derives, from a type's declared shape, the paired reader and
//! writer between that type and a generic tree-shaped value model — objects,
//! arrays, strings, numbers, booleans, null — without per-type conversion
//! code being written by hand. Given a record of named fields, a closed set
//! of alternatives, or a zero-field singleton, the derivation produces a
//! [`Converter`] that maps field and variant names to serialized keys
//! (honoring explicit renames), applies default values for absent fields,
//! supports one trailing variable-arity field, tags sum values with a
//! discriminant so the originating alternative can be recovered on read, and
//! handles self- and mutually-referential type graphs without unbounded
//! recursion at derivation time.
//!
//! The shape of a type reaches the engine in one of two equivalent ways:
//!
//! - `#[derive(TreeCodec)]`, provided by the `shape_derive` sub-crate, which
//!   inspects the definition at compile time and generates an
//!   [`assemble`](conv::TreeCodec::assemble) implementation built from the
//!   [`builder`] module's combinators;
//! - hand registration against those same combinators, for types the macro
//!   cannot see or cannot express.
//!
//! Either way, converters for nested field types are resolved through a
//! [`Knot`] — a derivation session holding one lazily-populated binding cell
//! per type. The cell indirection is what lets a type graph with cycles
//! derive to completion: a converter requested while it is still being
//! assembled is handed out as a forward reference that becomes usable the
//! moment its cell is populated.
//!
//! The [`tree`] module defines the value model, [`text`] the byte-level
//! codec for it, and [`prim`] the ambient converters for built-in leaf and
//! container types. Derivation-time failures (unsealed or empty sums,
//! missing constructors, malformed plans) surface as [`DeriveError`] before
//! any data flows; data-dependent failures surface per read as
//! [`ReadError`](conv::error::ReadError) with the field name, variant tag,
//! and underlying cause needed to locate the malformed input.

extern crate shape_derive;

pub mod builder;
pub mod conv;
pub mod error;
pub mod knot;
pub mod prelude;
pub mod prim;
pub mod text;
pub mod tree;

pub use crate::builder::{
    singleton, write_seq, FieldMeta, Fields, ProductBuilder, Record, SumBuilder, VariantArm,
    TAG_KEY,
};
pub use crate::conv::error::{DecodeError, DecodeResult, ReadError, ReadResult};
pub use crate::conv::{decode_str, encode_str, Converter, TreeCodec};
pub use crate::error::{DeriveError, DeriveResult};
pub use crate::knot::{converter, Knot};
pub use crate::text::{from_text, to_text, TextError, TextResult};
pub use crate::tree::{Tree, TreeKind};

pub use ::shape_derive::TreeCodec;
