//! Video tag header types.

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use rill_bytes_util::wire_enum;

use crate::error::FlvError;

wire_enum! {
    /// FLV Frame Type
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.3.1 (VIDEODATA)
    pub enum VideoFrameType(u8) {
        /// A complete representation of the video content.
        KeyFrame = 1,
        /// A frame predicted from previous frames.
        InterFrame = 2,
        /// An interframe that can be dropped without harming decode (H.263 only).
        DisposableInterFrame = 3,
        /// A keyframe generated server-side.
        GeneratedKeyFrame = 4,
        /// A video info or command frame.
        Command = 5,
    }
}

impl VideoFrameType {
    /// Whether a downstream decoder may start decoding at this frame.
    pub fn is_key_frame(self) -> bool {
        self == VideoFrameType::KeyFrame || self == VideoFrameType::GeneratedKeyFrame
    }
}

wire_enum! {
    /// FLV Video Codec ID
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.3.1 (VIDEODATA)
    pub enum VideoCodecId(u8) {
        /// Sorenson H.263
        SorensonH263 = 2,
        /// Screen Video
        ScreenVideo = 3,
        /// On2 VP6
        On2VP6 = 4,
        /// On2 VP6 with alpha channel
        On2VP6WithAlphaChannel = 5,
        /// Screen Video Version 2
        ScreenVideoVersion2 = 6,
        /// AVC (H.264)
        Avc = 7,
    }
}

wire_enum! {
    /// FLV AVC Packet Type
    ///
    /// Distinguishes the decoder configuration record from coded NAL units.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.3.1 (VIDEODATA)
    pub enum AvcPacketType(u8) {
        /// AVC sequence header (the AVCDecoderConfigurationRecord)
        SequenceHeader = 0,
        /// One or more NAL units
        Nalu = 1,
        /// AVC end of sequence
        EndOfSequence = 2,
    }
}

/// The FLV `VideoTagHeader`: the first payload byte of every video tag.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.3.1 (VIDEODATA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTagHeader {
    /// The frame type of the video data. (4 bits)
    pub frame_type: VideoFrameType,
    /// The codec id of the video data. (4 bits)
    pub codec_id: VideoCodecId,
}

impl VideoTagHeader {
    /// Demux the video tag header from one byte.
    #[allow(clippy::unusual_byte_groupings)]
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let byte = reader.read_u8()?;

        Ok(VideoTagHeader {
            frame_type: VideoFrameType::from(byte >> 4), // 0b1111_0000
            codec_id: VideoCodecId::from(byte & 0b0000_1111),
        })
    }
}

/// The AVC packet header that follows the video tag header when the codec is
/// AVC: one packet-type byte and a signed 24-bit composition time offset in
/// milliseconds.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.3.1 (VIDEODATA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvcPacketHeader {
    /// The AVC packet type.
    pub packet_type: AvcPacketType,
    /// Composition time offset in milliseconds (signed 24-bit).
    pub composition_time: i32,
}

impl AvcPacketHeader {
    /// Demux the AVC packet header from 4 bytes.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let packet_type = AvcPacketType::from(reader.read_u8()?);
        let composition_time = reader.read_i24::<BigEndian>()?;

        Ok(AvcPacketHeader {
            packet_type,
            composition_time,
        })
    }
}
