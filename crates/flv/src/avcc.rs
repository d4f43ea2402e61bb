//! AVCDecoderConfigurationRecord parsing.

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{BufMut, Bytes, BytesMut};
use rill_bytes_util::BytesCursorExt;

use crate::error::FlvError;

/// The Annex-B start code used when rebuilding parameter sets and NAL units.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// The parts of the AVC (H.264) Decoder Configuration Record a demuxer needs
/// to hand to a downstream decoder.
///
/// `sequence_header` is the record's parameter sets repackaged as an Annex-B
/// byte stream: every SPS, then every PPS, each prefixed with the 4-byte
/// start code. Decoders that consume start-code-delimited H.264 take this
/// blob verbatim as codec private data.
///
/// Record layout per ISO/IEC 14496-15, 5.3.2.1.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvccRecord {
    /// The AVC profile indication (`profile_idc` from the SPS).
    pub profile: u8,
    /// The AVC level indication (`level_idc` from the SPS).
    pub level: u8,
    /// Size in bytes of every NAL unit length prefix in the stream (1, 2 or 4).
    pub nal_length_size: u8,
    /// SPS and PPS units with Annex-B start codes.
    pub sequence_header: Bytes,
}

impl AvccRecord {
    /// Parse an AVCDecoderConfigurationRecord from an AVC sequence-header
    /// payload.
    pub fn parse(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        // configuration_version, always 1, carries no information we act on
        reader.read_u8()?;

        let profile = reader.read_u8()?;
        // profile_compatibility
        reader.read_u8()?;
        let level = reader.read_u8()?;

        let nal_length_size = (reader.read_u8()? & 0b00000011) + 1;
        if nal_length_size == 3 {
            return Err(FlvError::InvalidNalLengthSize(nal_length_size));
        }

        let mut sequence_header = BytesMut::new();

        let num_sps = reader.read_u8()? & 0b00011111;
        for _ in 0..num_sps {
            let sps_length = reader.read_u16::<BigEndian>()?;
            let sps = reader.extract_bytes(sps_length as usize)?;
            sequence_header.put_slice(&START_CODE);
            sequence_header.put_slice(&sps);
        }

        let num_pps = reader.read_u8()?;
        for _ in 0..num_pps {
            let pps_length = reader.read_u16::<BigEndian>()?;
            let pps = reader.extract_bytes(pps_length as usize)?;
            sequence_header.put_slice(&START_CODE);
            sequence_header.put_slice(&pps);
        }

        Ok(AvccRecord {
            profile,
            level,
            nal_length_size,
            sequence_header: sequence_header.freeze(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::AvccRecord;
    use crate::error::FlvError;

    #[test]
    fn parse_record() {
        #[rustfmt::skip]
        let data = [
            1,   // configuration_version
            66,  // profile (baseline)
            0,   // profile_compatibility
            30,  // level (3.0)
            0xff, // reserved + length_size_minus_one (3)
            0xe1, // reserved + num_sps (1)
            0x00, 0x04, // sps length
            0x67, 0x42, 0x00, 0x1e, // sps
            0x01, // num_pps
            0x00, 0x04, // pps length
            0x68, 0xce, 0x38, 0x80, // pps
        ];

        let record = AvccRecord::parse(&mut io::Cursor::new(Bytes::copy_from_slice(&data))).unwrap();

        assert_eq!(record.profile, 66);
        assert_eq!(record.level, 30);
        assert_eq!(record.nal_length_size, 4);
        assert_eq!(
            record.sequence_header,
            Bytes::from_static(&[
                0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1e, //
                0x00, 0x00, 0x00, 0x01, 0x68, 0xce, 0x38, 0x80,
            ])
        );
    }

    #[test]
    fn two_byte_nal_length() {
        #[rustfmt::skip]
        let data = [
            1, 100, 0, 51,
            0xfd, // length_size_minus_one = 1
            0xe1,
            0x00, 0x02,
            0x67, 0x64, // sps
            0x01,
            0x00, 0x01,
            0x68, // pps
        ];

        let record = AvccRecord::parse(&mut io::Cursor::new(Bytes::copy_from_slice(&data))).unwrap();

        assert_eq!(record.profile, 100);
        assert_eq!(record.level, 51);
        assert_eq!(record.nal_length_size, 2);
        assert_eq!(
            record.sequence_header,
            Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x67, 0x64, 0x00, 0x00, 0x00, 0x01, 0x68])
        );
    }

    #[test]
    fn rejects_three_byte_nal_length() {
        #[rustfmt::skip]
        let data = [
            1, 66, 0, 30,
            0xfe, // length_size_minus_one = 2
            0xe0, // no sps
            0x00, // no pps
        ];

        let err = AvccRecord::parse(&mut io::Cursor::new(Bytes::copy_from_slice(&data))).unwrap_err();
        assert!(matches!(err, FlvError::InvalidNalLengthSize(3)));
    }

    #[test]
    fn truncated_sps() {
        #[rustfmt::skip]
        let data = [
            1, 66, 0, 30,
            0xff,
            0xe1,
            0x00, 0x10, // sps length 16, but only 2 bytes follow
            0x67, 0x42,
        ];

        let err = AvccRecord::parse(&mut io::Cursor::new(Bytes::copy_from_slice(&data))).unwrap_err();
        assert!(matches!(err, FlvError::Io(_)));
    }
}
