//! Core of the tree-conversion API
//!
//! This module contains definitions for the converter pair type
//! [`Converter`] and the derivation trait [`TreeCodec`], which are
//! motivationally equivalent to the `Serialize`/`Deserialize` traits defined
//! in `serde`, with one structural difference: a `Converter<T>` is a
//! first-class *value* holding both directions of the conversion, rather
//! than a pair of trait impls. Converters being values is what allows the
//! knot-binding machinery in [`crate::knot`] to hand out forward references
//! to conversions that are still being assembled, which in turn is what
//! makes derivation over self-referential type graphs terminate.
//!
//! `TreeCodec` is the single seam between a type and the derivation engine:
//! its [`assemble`](TreeCodec::assemble) method describes how to build the
//! type's converter inside an active derivation session. Implementations
//! are usually generated by the `#[derive(TreeCodec)]` macro from the
//! `shape_derive` sub-crate, but the [`crate::builder`] module exposes the
//! same assembly surface for hand-written registrations.
//!
//! The free functions [`decode_str`] and [`encode_str`] bridge the converter
//! layer to the byte-level text codec in [`crate::text`].

pub mod error;

pub use error::{DecodeResult, ReadResult};

use crate::error::DeriveResult;
use crate::knot::{self, Knot};
use crate::tree::Tree;
use std::rc::Rc;

/// The derived read/write pair for a single type.
///
/// Cloning a converter is cheap (two reference-count bumps) and clones share
/// the underlying conversion logic; every derivation that needs `T` as a
/// nested dependency receives a clone of the same pair.
pub struct Converter<T> {
    read: Rc<dyn Fn(&Tree) -> ReadResult<T>>,
    write: Rc<dyn Fn(&T) -> Tree>,
}

impl<T> Clone for Converter<T> {
    fn clone(&self) -> Self {
        Converter {
            read: Rc::clone(&self.read),
            write: Rc::clone(&self.write),
        }
    }
}

impl<T> Converter<T> {
    /// Wraps a pair of closures as a converter.
    ///
    /// The write direction must be total: for well-typed values it is never
    /// allowed to fail, which is why it returns a bare [`Tree`].
    pub fn from_fns(
        read: impl Fn(&Tree) -> ReadResult<T> + 'static,
        write: impl Fn(&T) -> Tree + 'static,
    ) -> Self {
        Converter {
            read: Rc::new(read),
            write: Rc::new(write),
        }
    }

    /// Reads a value of `T` out of a tree node.
    pub fn read(&self, tree: &Tree) -> ReadResult<T> {
        (self.read)(tree)
    }

    /// Writes a value of `T` into a tree node.
    pub fn write(&self, value: &T) -> Tree {
        (self.write)(value)
    }
}

impl<T> std::fmt::Debug for Converter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Converter<{}>", std::any::type_name::<T>())
    }
}

/// Trait for types whose converter can be assembled from their declared
/// shape.
///
/// `assemble` is invoked at most once per type per derivation session, by
/// way of [`Knot::resolve`]; it must obtain converters for any nested types
/// through the session it is handed, never by calling another type's
/// `assemble` directly, so that in-flight derivations are shared and cycles
/// resolve through the session's binding cells.
pub trait TreeCodec: Sized + 'static {
    /// Builds the converter pair for `Self` inside the given session.
    fn assemble(knot: &mut Knot) -> DeriveResult<Converter<Self>>;
}

/// Decodes a value of `T` from its textual form.
///
/// Equivalent to parsing the text into a [`Tree`] and running `T`'s derived
/// reader over it; the converter itself is obtained from the ambient
/// memoized session.
pub fn decode_str<T: TreeCodec>(input: &str) -> DecodeResult<T> {
    let tree = crate::text::from_text(input)?;
    let conv = knot::converter::<T>()?;
    Ok(conv.read(&tree)?)
}

/// Encodes a value of `T` into its textual form.
///
/// The only failure mode is derivation itself (on the first use of `T` in
/// this thread); writing a well-typed value never fails.
pub fn encode_str<T: TreeCodec>(value: &T) -> DecodeResult<String> {
    let conv = knot::converter::<T>()?;
    Ok(crate::text::to_text(&conv.write(value)))
}
