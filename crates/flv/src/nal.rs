//! NAL unit repackaging.
//!
//! AVC payloads inside FLV carry NAL units in AVCC form (a big-endian length
//! prefix before each unit, sized by the avcC's `nal_length_size`). Decoders
//! fed through this demuxer expect Annex-B form (a start code before each
//! unit), so every unit is re-emitted with the appropriate start code.

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use rill_bytes_util::BytesCursorExt;

use crate::avcc::START_CODE;
use crate::error::FlvError;

/// Splits an AVCC payload into start-code-prefixed NAL unit buffers.
///
/// A 4-byte length prefix maps to the 4-byte start code `00 00 00 01`;
/// shorter prefixes map to the 3-byte start code `00 00 01`.
#[derive(Debug)]
pub struct NaluReader {
    reader: io::Cursor<Bytes>,
    nal_length_size: u8,
}

impl NaluReader {
    /// Create a reader over one AVC NALU tag payload.
    pub fn new(payload: Bytes, nal_length_size: u8) -> Self {
        Self {
            reader: io::Cursor::new(payload),
            nal_length_size,
        }
    }

    /// The next NAL unit with its start code, or `None` at the end of the
    /// payload.
    pub fn next_nalu(&mut self) -> Result<Option<Bytes>, FlvError> {
        if !self.reader.has_remaining() {
            return Ok(None);
        }

        let length = match self.nal_length_size {
            1 => self.reader.read_u8()? as usize,
            2 => self.reader.read_u16::<BigEndian>()? as usize,
            4 => self.reader.read_u32::<BigEndian>()? as usize,
            size => return Err(FlvError::InvalidNalLengthSize(size)),
        };

        if length > self.reader.remaining() {
            return Err(FlvError::TruncatedNalUnit {
                length,
                remaining: self.reader.remaining(),
            });
        }

        let nal = self.reader.extract_bytes(length)?;

        let start_code = if self.nal_length_size == 4 {
            &START_CODE[..]
        } else {
            &START_CODE[1..]
        };

        let mut buffer = BytesMut::with_capacity(start_code.len() + nal.len());
        buffer.put_slice(start_code);
        buffer.put_slice(&nal);

        Ok(Some(buffer.freeze()))
    }
}
