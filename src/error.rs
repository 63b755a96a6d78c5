//! Derivation-time error types
//!
//! This module contains the error hierarchy for failures that occur while a
//! converter is being *assembled*, before any value has been read or written.
//! Every variant names the offending type and, where sensible, the field or
//! key involved, so the report can be acted on without re-running under a
//! debugger. Errors raised while *running* a finished converter live in
//! [`conv::error`](crate::conv::error) instead.
//!
//! Derivation failures are unrecoverable for the type in question: the
//! binding cell opened for the type is torn down and the error propagates to
//! whichever caller first requested the converter.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Enumerated error type for failures encountered while assembling a
/// converter from a type's declared shape.
///
/// The `ty` carried by each variant is the declared name of the type whose
/// derivation failed, not necessarily the type on which the original request
/// was made; a failure in a nested field's type surfaces under the nested
/// type's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeriveError {
    /// The type's set of alternatives is not exhaustively enumerable.
    NotSealed { ty: &'static str },
    /// The type is a sum with zero discoverable alternatives.
    NoVariants { ty: &'static str },
    /// No construct function was supplied for a product type.
    NoConstructor { ty: &'static str },
    /// No deconstruct function was supplied for a product type.
    NoDeconstructor { ty: &'static str },
    /// A rename or plan entry is present but unusable as written.
    MalformedAnnotation { ty: &'static str, detail: String },
    /// Two entries of one plan resolved to the same serialized key, or two
    /// variants of one sum resolved to the same tag.
    DuplicateKey { ty: &'static str, key: String },
    /// A variadic field appeared anywhere other than last position.
    MisplacedVariadic { ty: &'static str, field: String },
}

impl Display for DeriveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeriveError::NotSealed { ty } => {
                write!(
                    f,
                    "cannot derive a converter for `{ty}`: its alternatives are not exhaustively \
                     enumerable (remove `#[non_exhaustive]` or implement the codec by hand)"
                )
            }
            DeriveError::NoVariants { ty } => {
                write!(
                    f,
                    "cannot derive a converter for `{ty}`: it declares no alternatives, so no \
                     discriminant could ever be read back (add at least one variant)"
                )
            }
            DeriveError::NoConstructor { ty } => {
                write!(
                    f,
                    "cannot derive a converter for `{ty}`: no construct function was provided \
                     (call `ProductBuilder::construct` before `finish`)"
                )
            }
            DeriveError::NoDeconstructor { ty } => {
                write!(
                    f,
                    "cannot derive a converter for `{ty}`: no deconstruct function was provided \
                     (call `ProductBuilder::deconstruct` or `SumBuilder::select` before `finish`)"
                )
            }
            DeriveError::MalformedAnnotation { ty, detail } => {
                write!(f, "malformed annotation on `{ty}`: {detail}")
            }
            DeriveError::DuplicateKey { ty, key } => {
                write!(
                    f,
                    "duplicate serialized key `{key}` in the plan for `{ty}` (rename one of the \
                     colliding fields or variants)"
                )
            }
            DeriveError::MisplacedVariadic { ty, field } => {
                write!(
                    f,
                    "variadic field `{field}` of `{ty}` must be the last field of its plan"
                )
            }
        }
    }
}

impl Error for DeriveError {}

/// Type alias for `Result` with an error type of [`DeriveError`].
pub type DeriveResult<T> = std::result::Result<T, DeriveError>;
