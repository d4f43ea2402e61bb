//! Byte and wire-format utilities shared across the rill workspace.
//!
//! Provides [`BytesCursorExt`] for zero-copy extraction out of a
//! [`std::io::Cursor`] over [`bytes::Bytes`], and the [`wire_enum!`] macro
//! used to model wire-format discriminants as open enums over their raw
//! integer representation.
#![deny(unsafe_code)]

mod cursor;
mod wire_enum;

pub use cursor::BytesCursorExt;
