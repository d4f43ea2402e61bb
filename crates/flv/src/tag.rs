use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use rill_bytes_util::wire_enum;

use crate::error::FlvError;

/// Size of a tag header on the wire.
pub const TAG_HEADER_SIZE: u64 = 11;

/// Size of the previous-tag-size field preceding every tag.
pub const PREVIOUS_TAG_SIZE_LEN: u64 = 4;

wire_enum! {
    /// FLV tag type.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.1 (FLV Tag)
    pub enum TagType(u8) {
        /// Audio tag.
        Audio = 8,
        /// Video tag.
        Video = 9,
        /// Script data tag (AMF0).
        ScriptData = 18,
    }
}

/// FLV tag header.
///
/// Each tag in the file body is an 11-byte header followed by `data_size`
/// bytes of payload. The effective timestamp is the 24-bit timestamp with
/// the 8-bit extension as its most significant byte, interpreted as a signed
/// 32-bit millisecond count.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.1 (FLV Tag)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    /// The tag type.
    pub tag_type: TagType,
    /// Payload size in bytes.
    pub data_size: u32,
    /// Timestamp in milliseconds.
    pub timestamp_ms: i32,
    /// Stream ID. Always 0 in files.
    pub stream_id: u32,
}

impl TagHeader {
    /// Demux a tag header from exactly [`TAG_HEADER_SIZE`] bytes.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let tag_type = TagType::from(reader.read_u8()?);
        let data_size = reader.read_u24::<BigEndian>()?;

        let timestamp = reader.read_u24::<BigEndian>()?;
        let timestamp_extended = reader.read_u8()?;
        let timestamp_ms = (((timestamp_extended as u32) << 24) | timestamp) as i32;

        let stream_id = reader.read_u24::<BigEndian>()?;

        Ok(TagHeader {
            tag_type,
            data_size,
            timestamp_ms,
            stream_id,
        })
    }
}
