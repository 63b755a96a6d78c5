//! Error types used to report failure in low-level text parsing
//!
//! Every variant carries the byte offset at which the failure was detected,
//! so malformed input can be located without re-parsing.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Enumeration type over all errors that may be encountered when parsing
/// the textual form of a tree value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextError {
    /// A byte that cannot begin or continue the expected construct.
    UnexpectedByte { at: usize, found: u8 },
    /// Input ended in the middle of a value.
    UnexpectedEnd,
    /// A string literal ran to end of input without a closing quote.
    UnterminatedString { at: usize },
    /// A backslash escape that names no known escape, or a `\u` escape with
    /// malformed hex digits or an unpaired surrogate.
    BadEscape { at: usize },
    /// A numeric literal that does not parse as a finite or infinite `f64`
    /// per the standard grammar.
    BadNumber { at: usize },
    /// Well-formed value followed by non-whitespace input.
    TrailingData { at: usize },
}

impl Display for TextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TextError::UnexpectedByte { at, found } => {
                write!(f, "unexpected byte 0x{found:02x} at offset {at}")
            }
            TextError::UnexpectedEnd => write!(f, "unexpected end of input"),
            TextError::UnterminatedString { at } => {
                write!(f, "unterminated string starting at offset {at}")
            }
            TextError::BadEscape { at } => write!(f, "invalid escape sequence at offset {at}"),
            TextError::BadNumber { at } => write!(f, "malformed number at offset {at}"),
            TextError::TrailingData { at } => {
                write!(f, "trailing data after value at offset {at}")
            }
        }
    }
}

impl Error for TextError {}

/// Type alias for `Result` with an error type of [`TextError`].
pub type TextResult<T> = std::result::Result<T, TextError>;
