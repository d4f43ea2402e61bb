//! Asynchronous tag parser.
//!
//! Wraps the byte stream and reads one wire record per call; all actual
//! decoding happens synchronously in `rill-flv` over the fetched bytes. The
//! parser assumes nothing about the absolute stream position between calls
//! and is restartable after any seek.

use std::io::{self, Cursor, SeekFrom};

use bytes::Bytes;
use rill_flv::audio::{AacPacketType, AudioTagHeader};
use rill_flv::header::{FlvFileHeader, FILE_HEADER_SIZE};
use rill_flv::script::ScriptData;
use rill_flv::tag::{TagHeader, PREVIOUS_TAG_SIZE_LEN, TAG_HEADER_SIZE};
use rill_flv::video::{AvcPacketHeader, VideoTagHeader};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::error::FlvSourceError;

/// One tag boundary read from the byte stream.
#[derive(Debug)]
pub(crate) enum NextTag {
    /// A tag header; its payload follows at `data_offset`.
    Tag(TagRecord),
    /// The byte stream is exhausted.
    Eof,
}

/// A tag header plus the absolute file offset of its payload.
#[derive(Debug, Clone)]
pub(crate) struct TagRecord {
    pub header: TagHeader,
    pub data_offset: u64,
}

impl TagRecord {
    /// Absolute offset of the tag header itself.
    pub fn tag_start(&self) -> u64 {
        self.data_offset - TAG_HEADER_SIZE
    }

    /// Payload bytes left after `consumed` bytes of per-codec headers.
    pub fn payload_size(&self, consumed: u32) -> Result<usize, FlvSourceError> {
        self.header
            .data_size
            .checked_sub(consumed)
            .map(|size| size as usize)
            .ok_or(FlvSourceError::InvalidFormat(rill_flv::FlvError::UnexpectedEndOfFile))
    }
}

/// Reads FLV records from an asynchronous, seekable byte stream.
pub(crate) struct TagParser<S> {
    io: S,
}

impl<S: AsyncRead + AsyncSeek + Unpin + Send> TagParser<S> {
    pub fn new(io: S) -> Self {
        Self { io }
    }

    /// The current absolute position of the byte stream.
    pub async fn position(&mut self) -> io::Result<u64> {
        self.io.stream_position().await
    }

    /// Repositions the byte stream.
    pub async fn set_position(&mut self, position: u64) -> io::Result<()> {
        self.io.seek(SeekFrom::Start(position)).await.map(|_| ())
    }

    /// Advances the byte stream past `amount` bytes without reading them.
    pub async fn seek_forward(&mut self, amount: u32) -> io::Result<()> {
        self.io.seek(SeekFrom::Current(amount as i64)).await.map(|_| ())
    }

    async fn read_chunk(&mut self, size: usize) -> Result<Bytes, FlvSourceError> {
        let mut buf = vec![0u8; size];
        self.io.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    // Fills `buf`, returning 0 on a clean end of stream before the first
    // byte. A stream ending mid-record is an error.
    async fn read_boundary(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let count = self.io.read(&mut buf[filled..]).await?;
            if count == 0 {
                if filled == 0 {
                    return Ok(0);
                }
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            filled += count;
        }
        Ok(filled)
    }

    /// Reads the 9-byte file header and skips any reserved space up to the
    /// body.
    pub async fn read_file_header(&mut self) -> Result<FlvFileHeader, FlvSourceError> {
        let buf = self.read_chunk(FILE_HEADER_SIZE as usize).await?;
        let header = FlvFileHeader::demux(&mut Cursor::new(buf))?;

        let extra = header.data_offset as u64 - FILE_HEADER_SIZE;
        if extra > 0 {
            self.io.seek(SeekFrom::Current(extra as i64)).await?;
        }

        Ok(header)
    }

    /// Reads the next tag boundary: the previous-tag-size field (when
    /// `skip_previous_size` is set) followed by the 11-byte tag header. A
    /// zero-byte read at the boundary yields [`NextTag::Eof`].
    pub async fn read_tag_header(&mut self, skip_previous_size: bool) -> Result<NextTag, FlvSourceError> {
        if skip_previous_size {
            let mut prev = [0u8; PREVIOUS_TAG_SIZE_LEN as usize];
            if self.read_boundary(&mut prev).await? == 0 {
                return Ok(NextTag::Eof);
            }
        }

        let mut buf = [0u8; TAG_HEADER_SIZE as usize];
        if self.read_boundary(&mut buf).await? == 0 {
            return Ok(NextTag::Eof);
        }

        let data_offset = self.io.stream_position().await?;
        let header = TagHeader::demux(&mut Cursor::new(Bytes::copy_from_slice(&buf)))?;

        Ok(NextTag::Tag(TagRecord { header, data_offset }))
    }

    /// Reads the one-byte audio tag header.
    pub async fn read_audio_header(&mut self) -> Result<AudioTagHeader, FlvSourceError> {
        let buf = self.read_chunk(1).await?;
        Ok(AudioTagHeader::demux(&mut Cursor::new(buf))?)
    }

    /// Reads the one-byte AAC packet type.
    pub async fn read_aac_packet_type(&mut self) -> Result<AacPacketType, FlvSourceError> {
        let buf = self.read_chunk(1).await?;
        Ok(AacPacketType::from(buf[0]))
    }

    /// Reads the one-byte video tag header.
    pub async fn read_video_header(&mut self) -> Result<VideoTagHeader, FlvSourceError> {
        let buf = self.read_chunk(1).await?;
        Ok(VideoTagHeader::demux(&mut Cursor::new(buf))?)
    }

    /// Reads the four-byte AVC packet header.
    pub async fn read_avc_packet_header(&mut self) -> Result<AvcPacketHeader, FlvSourceError> {
        let buf = self.read_chunk(4).await?;
        Ok(AvcPacketHeader::demux(&mut Cursor::new(buf))?)
    }

    /// Reads `size` raw payload bytes.
    pub async fn read_payload(&mut self, size: usize) -> Result<Bytes, FlvSourceError> {
        self.read_chunk(size).await
    }

    /// Reads and decodes a script tag payload.
    pub async fn read_script_data(&mut self, size: usize) -> Result<ScriptData, FlvSourceError> {
        let buf = self.read_payload(size).await?;
        Ok(ScriptData::demux(&mut Cursor::new(buf))?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rill_flv::tag::TagType;

    use super::{NextTag, TagParser};

    fn single_tag_file() -> Vec<u8> {
        let mut data = vec![b'F', b'L', b'V', 1, 0b0000_0101];
        data.extend_from_slice(&9u32.to_be_bytes());
        // previous tag size
        data.extend_from_slice(&0u32.to_be_bytes());
        // audio tag, 3 byte payload, ts 100
        data.extend_from_slice(&[8, 0, 0, 3, 0, 0, 100, 0, 0, 0, 0]);
        data.extend_from_slice(&[0x2f, 0xaa, 0xbb]);
        data
    }

    #[tokio::test]
    async fn tag_header_positions() {
        let mut parser = TagParser::new(Cursor::new(single_tag_file()));

        parser.read_file_header().await.unwrap();
        assert_eq!(parser.position().await.unwrap(), 9);

        let NextTag::Tag(record) = parser.read_tag_header(true).await.unwrap() else {
            panic!("expected a tag");
        };

        // after reading the tag header the position is the payload start
        assert_eq!(record.tag_start(), 13);
        assert_eq!(record.data_offset, 13 + 11);
        assert_eq!(parser.position().await.unwrap(), record.data_offset);
        assert_eq!(record.header.tag_type, TagType::Audio);
        assert_eq!(record.header.data_size, 3);
        assert_eq!(record.header.timestamp_ms, 100);

        // skipping the payload lands exactly on the next boundary
        parser.seek_forward(record.header.data_size).await.unwrap();
        assert_eq!(parser.position().await.unwrap(), record.data_offset + 3);

        assert!(matches!(parser.read_tag_header(true).await.unwrap(), NextTag::Eof));
    }

    #[tokio::test]
    async fn eof_after_trailing_previous_size() {
        let mut data = single_tag_file();
        // files usually close with one final previous-tag-size field
        data.extend_from_slice(&14u32.to_be_bytes());

        let mut parser = TagParser::new(Cursor::new(data));
        parser.read_file_header().await.unwrap();

        let NextTag::Tag(record) = parser.read_tag_header(true).await.unwrap() else {
            panic!("expected a tag");
        };
        parser.seek_forward(record.header.data_size).await.unwrap();

        assert!(matches!(parser.read_tag_header(true).await.unwrap(), NextTag::Eof));
    }

    #[tokio::test]
    async fn restartable_after_set_position() {
        let mut parser = TagParser::new(Cursor::new(single_tag_file()));
        parser.read_file_header().await.unwrap();

        let NextTag::Tag(first) = parser.read_tag_header(true).await.unwrap() else {
            panic!("expected a tag");
        };

        // back to the previous-tag-size field in front of the same tag
        parser.set_position(first.tag_start() - 4).await.unwrap();
        let NextTag::Tag(again) = parser.read_tag_header(true).await.unwrap() else {
            panic!("expected a tag");
        };

        assert_eq!(again.header, first.header);
        assert_eq!(again.data_offset, first.data_offset);
    }

    #[tokio::test]
    async fn seek_past_end_reads_eof() {
        let mut parser = TagParser::new(Cursor::new(single_tag_file()));
        parser.set_position(1 << 20).await.unwrap();
        assert!(matches!(parser.read_tag_header(true).await.unwrap(), NextTag::Eof));
    }
}
