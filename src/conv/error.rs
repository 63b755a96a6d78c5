//! Conversion-time error types
//!
//! Errors in this module are raised while *running* a finished converter
//! against actual data, as opposed to the derivation-time failures in
//! [`crate::error`]. There is no partial or best-effort decoding: the first
//! field or variant that fails aborts the whole read of the enclosing value,
//! and the error carries the field name, variant tag, or underlying cause
//! needed to locate the malformed input.
//!
//! The composite [`DecodeError`] additionally covers the end-to-end text
//! entry points, which can fail at the byte level, at the tree level, or
//! (on first use of a type) at derivation time.

use crate::error::DeriveError;
use crate::text::error::TextError;
use crate::tree::TreeKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Enumerated error type for failures raised by a derived reader.
///
/// Write-side conversion is infallible for well-typed values and has no
/// corresponding error type.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadError {
    /// A product or sum reader was handed a non-object node.
    ExpectedObject { ty: &'static str, found: TreeKind },
    /// A required field's key (or the discriminant key) was absent.
    MissingField { ty: &'static str, field: String },
    /// A field's key was present but its value failed to decode.
    FieldType {
        ty: &'static str,
        field: String,
        cause: Box<ReadError>,
    },
    /// A discriminant tag matched none of the sum's known variants.
    UnknownVariant { ty: &'static str, tag: String },
    /// A leaf reader was handed a node of the wrong kind.
    Mismatch {
        expected: &'static str,
        found: TreeKind,
    },
    /// A numeric leaf was the right kind but outside the range (or not
    /// integral) for the requested type.
    BadNumber { expected: &'static str, value: f64 },
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::ExpectedObject { ty, found } => {
                write!(f, "expected an object for `{ty}`, found {found}")
            }
            ReadError::MissingField { ty, field } => {
                write!(f, "missing field `{field}` while reading `{ty}`")
            }
            ReadError::FieldType { ty, field, cause } => {
                write!(f, "field `{field}` of `{ty}`: {cause}")
            }
            ReadError::UnknownVariant { ty, tag } => {
                write!(f, "unknown variant tag `{tag}` for `{ty}`")
            }
            ReadError::Mismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ReadError::BadNumber { expected, value } => {
                write!(f, "number {value} is not representable as {expected}")
            }
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::FieldType { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Type alias for `Result` with an error type of [`ReadError`].
///
/// Every derived reader, and every leaf reader it delegates to, has a return
/// type of `ReadResult<T>` for its target `T`.
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Composite error for the end-to-end entry points [`decode_str`] and
/// [`encode_str`], which traverse the text layer, the tree layer, and (on a
/// cold cache) derivation itself.
///
/// [`decode_str`]: crate::conv::decode_str
/// [`encode_str`]: crate::conv::encode_str
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum DecodeError {
    Text(TextError),
    Read(ReadError),
    Derive(DeriveError),
}

impl From<TextError> for DecodeError {
    fn from(err: TextError) -> Self {
        Self::Text(err)
    }
}

impl From<ReadError> for DecodeError {
    fn from(err: ReadError) -> Self {
        Self::Read(err)
    }
}

impl From<DeriveError> for DecodeError {
    fn from(err: DeriveError) -> Self {
        Self::Derive(err)
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Text(err) => write!(f, "text layer encountered error: {err}"),
            DecodeError::Read(err) => write!(f, "reader encountered error: {err}"),
            DecodeError::Derive(err) => write!(f, "derivation failed: {err}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Text(err) => Some(err),
            DecodeError::Read(err) => Some(err),
            DecodeError::Derive(err) => Some(err),
        }
    }
}

/// Type alias for `Result` with an error type of [`DecodeError`].
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
