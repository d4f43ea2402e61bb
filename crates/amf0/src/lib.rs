//! A pure-rust AMF0 decoder.
//!
//! FLV script tags carry their payload encoded as AMF0 (a string name
//! followed by a value, conventionally an ECMA array). This crate decodes
//! that subset of AMF0 into an owned value model; it intentionally does not
//! encode, since a demultiplexer never writes script data.
//!
//! # Limitations
//!
//! - Does not support AMF0 references.
//! - Does not support the AVM+ Type Marker. (see AMF 0 spec, 3.1)
#![deny(unsafe_code)]

mod decoder;
mod error;
mod value;

pub use decoder::Amf0Decoder;
pub use error::{Amf0Error, Result};
pub use value::{Amf0Object, Amf0Value};

/// AMF0 marker types.
///
/// Defined by:
/// - AMF 0 spec, 2.1.
#[derive(Debug, PartialEq, Eq, Clone, Copy, num_derive::FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    /// number-marker
    Number = 0x00,
    /// boolean-marker
    Boolean = 0x01,
    /// string-marker
    String = 0x02,
    /// object-marker
    Object = 0x03,
    /// movieclip-marker
    ///
    /// reserved, not supported
    MovieClipMarker = 0x04,
    /// null-marker
    Null = 0x05,
    /// undefined-marker
    Undefined = 0x06,
    /// reference-marker
    Reference = 0x07,
    /// ecma-array-marker
    EcmaArray = 0x08,
    /// object-end-marker
    ObjectEnd = 0x09,
    /// strict-array-marker
    StrictArray = 0x0a,
    /// date-marker
    Date = 0x0b,
    /// long-string-marker
    LongString = 0x0c,
    /// unsupported-marker
    Unsupported = 0x0d,
    /// recordset-marker
    ///
    /// reserved, not supported
    Recordset = 0x0e,
    /// xml-document-marker
    XmlDocument = 0x0f,
    /// typed-object-marker
    TypedObject = 0x10,
    /// avmplus-object-marker
    ///
    /// AMF3 marker
    AVMPlusObject = 0x11,
}
