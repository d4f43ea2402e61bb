//! FLV parsing error type.

/// FLV parsing error.
#[derive(Debug, thiserror::Error)]
pub enum FlvError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// AMF0 error while decoding script data.
    #[error("amf0 error: {0}")]
    Amf0(#[from] rill_amf0::Amf0Error),
    /// The file header signature was not `FLV`.
    #[error("invalid signature in file header: 0x{0:06x}")]
    InvalidSignature(u32),
    /// The file header data offset points inside the header itself.
    #[error("invalid data offset: {0}")]
    InvalidDataOffset(u32),
    /// The file ended before a complete record could be read.
    #[error("unexpected end of file")]
    UnexpectedEndOfFile,
    /// The avcC declared a NAL length size other than 1, 2 or 4.
    #[error("invalid nal unit length size: {0}")]
    InvalidNalLengthSize(u8),
    /// A NAL unit length prefix overran its payload.
    #[error("nal unit of {length} bytes overruns payload ({remaining} bytes left)")]
    TruncatedNalUnit {
        /// Declared NAL unit length.
        length: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },
    /// An AVC NALU packet arrived before any sequence header.
    #[error("avc nalu before sequence header")]
    NaluBeforeSequenceHeader,
    /// The keyframe metadata arrays have different lengths.
    #[error("keyframe index arrays disagree: {times} times, {positions} positions")]
    KeyframeArrayMismatch {
        /// Number of entries in `times`.
        times: usize,
        /// Number of entries in `filepositions`.
        positions: usize,
    },
}
