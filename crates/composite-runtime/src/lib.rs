//! Composite Runtime: the reflective walker and serializer that sit
//! between the type registry (`composite-core`) and the parser
//! (`composite-parser`).
//!
//! - `walker`: type-directed duplicate/free/compare/field-lookup,
//!   dispatched over {atomic, fixed array, var array, record}.
//! - `serialize`: the parser's inverse, in pretty or wire mode.

pub mod serialize;
pub mod walker;

pub use serialize::{length_of_serialized, serialize};
pub use walker::{compare, duplicate, field_type, free, get_field, get_field_mut};
