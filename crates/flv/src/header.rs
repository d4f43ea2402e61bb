use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;

use crate::error::FlvError;

/// Size of the FLV file header on the wire.
pub const FILE_HEADER_SIZE: u64 = 9;

/// The FLV file header.
///
/// The first 9 bytes of every FLV file.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.2 (The FLV Header)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvFileHeader {
    /// The version of the FLV file.
    pub version: u8,
    /// Whether the file claims to contain audio tags.
    pub has_audio: bool,
    /// Whether the file claims to contain video tags.
    pub has_video: bool,
    /// Offset from the start of the file to the start of the file body.
    ///
    /// Always at least 9; anything beyond 9 is reserved header space the
    /// reader must skip over.
    pub data_offset: u32,
}

impl FlvFileHeader {
    /// Demux the FLV file header from exactly [`FILE_HEADER_SIZE`] bytes.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let signature = reader.read_u24::<BigEndian>()?;

        // 0 byte at the beginning because we are only reading 3 bytes not 4.
        if signature != u32::from_be_bytes([0, b'F', b'L', b'V']) {
            return Err(FlvError::InvalidSignature(signature));
        }

        let version = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let has_audio = (flags & 0b00000100) != 0;
        let has_video = (flags & 0b00000001) != 0;

        let data_offset = reader.read_u32::<BigEndian>()?;
        if (data_offset as u64) < FILE_HEADER_SIZE {
            return Err(FlvError::InvalidDataOffset(data_offset));
        }

        Ok(FlvFileHeader {
            version,
            has_audio,
            has_video,
            data_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::FlvFileHeader;
    use crate::error::FlvError;

    #[test]
    fn file_header() {
        let mut reader = io::Cursor::new(Bytes::from_static(&[b'F', b'L', b'V', 1, 0b0000_0101, 0, 0, 0, 9]));

        let header = FlvFileHeader::demux(&mut reader).unwrap();
        assert_eq!(
            header,
            FlvFileHeader {
                version: 1,
                has_audio: true,
                has_video: true,
                data_offset: 9,
            }
        );
        assert_eq!(reader.position(), 9);
    }

    #[test]
    fn audio_only_flags() {
        let mut reader = io::Cursor::new(Bytes::from_static(&[b'F', b'L', b'V', 1, 0b0000_0100, 0, 0, 0, 9]));

        let header = FlvFileHeader::demux(&mut reader).unwrap();
        assert!(header.has_audio);
        assert!(!header.has_video);
    }

    #[test]
    fn bad_signature() {
        let mut reader = io::Cursor::new(Bytes::from_static(&[b'X', b'Y', b'Z', 1, 5, 0, 0, 0, 9]));

        let err = FlvFileHeader::demux(&mut reader).unwrap_err();
        assert!(matches!(err, FlvError::InvalidSignature(0x58595a)));
    }

    #[test]
    fn bad_data_offset() {
        let mut reader = io::Cursor::new(Bytes::from_static(&[b'F', b'L', b'V', 1, 5, 0, 0, 0, 8]));

        let err = FlvFileHeader::demux(&mut reader).unwrap_err();
        assert!(matches!(err, FlvError::InvalidDataOffset(8)));
    }
}
