//! Common re-exports for downstream code
//!
//! `use canopy::prelude::*;` brings in the items a typical codec-using
//! module needs: the value model, the converter pair, the derivation trait
//! and macro, the session type, and the end-to-end text entry points.

pub use crate::builder::{FieldMeta, ProductBuilder, SumBuilder, VariantArm};
pub use crate::conv::{decode_str, encode_str, Converter, TreeCodec};
pub use crate::error::{DeriveError, DeriveResult};
pub use crate::knot::{converter, Knot};
pub use crate::tree::{Tree, TreeKind};
pub use ::shape_derive::TreeCodec;
