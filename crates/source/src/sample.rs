use bytes::{BufMut, Bytes, BytesMut};

/// One demultiplexed media sample.
///
/// A sample owns one or more buffers; their concatenation is the payload
/// handed to the decoder. For AVC video the first buffer may be the codec
/// private data (the SPS+PPS sequence header) followed by one buffer per NAL
/// unit, each with its Annex-B start code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSample {
    /// The payload buffers, in order.
    pub buffers: Vec<Bytes>,
    /// Presentation time in 100-nanosecond units.
    pub time: i64,
    /// Whether a decoder may start decoding at this sample.
    pub key_frame: bool,
    /// The pull-request token this sample was matched to, if any.
    pub token: Option<u64>,
}

impl MediaSample {
    /// Total payload length across all buffers.
    pub fn len(&self) -> usize {
        self.buffers.iter().map(|b| b.len()).sum()
    }

    /// Whether the sample carries no payload at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload as one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.len());
        for buffer in &self.buffers {
            out.put_slice(buffer);
        }
        out.freeze()
    }
}
