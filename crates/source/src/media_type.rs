//! Media-type synthesis.
//!
//! Builds the per-stream media descriptors the presentation description
//! carries, from the parsed `onMetaData` record, the avcC, and the first
//! audio tag. Metadata values win when present; the first tag's header bits
//! fill the gaps.

use bytes::Bytes;
use rill_flv::audio::{AudioTagHeader, SoundFormat};
use rill_flv::avcc::AvccRecord;
use rill_flv::script::OnMetaData;
use rill_flv::video::VideoCodecId;
use rill_flv::FlvError;

use crate::error::FlvSourceError;

/// The media type of a stream in the presentation description.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaType {
    /// An audio elementary stream.
    Audio(AudioMediaType),
    /// A video elementary stream.
    Video(VideoMediaType),
}

/// Audio subtypes this source can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSubtype {
    /// Raw AAC frames (no ADTS framing); codec private data is the
    /// AudioSpecificConfig in [`AudioMediaType::user_data`].
    RawAac,
    /// MPEG-1 layer 3.
    Mp3,
}

/// Description of the audio elementary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMediaType {
    /// The audio subtype.
    pub subtype: AudioSubtype,
    /// Sampling rate in hertz.
    pub samples_per_second: u32,
    /// Channel count.
    pub channels: u32,
    /// Bits per sample.
    pub bits_per_sample: u32,
    /// Always 1: compressed audio is not block-aligned.
    pub block_align: u32,
    /// Average bitrate from the metadata, 0 when absent.
    pub avg_bitrate: u32,
    /// The first audio tag payload; for AAC this is the
    /// AudioSpecificConfig.
    pub user_data: Bytes,
}

/// Description of the video elementary stream. Only H.264 (AVC) video can be
/// described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMediaType {
    /// Frame width in pixels.
    pub frame_width: u32,
    /// Frame height in pixels.
    pub frame_height: u32,
    /// Frames per second.
    pub frame_rate: u32,
    /// Advertised frame rate range `(min, max)` = `(frame_rate / 2, frame_rate)`.
    pub frame_rate_range: (u32, u32),
    /// Pixel aspect ratio, always 1:1.
    pub pixel_aspect_ratio: (u32, u32),
    /// Average bitrate from the metadata, 0 when absent.
    pub avg_bitrate: u32,
    /// AVC profile indication from the avcC.
    pub profile: u8,
    /// AVC level indication from the avcC.
    pub level: u8,
    /// NAL unit length prefix size from the avcC.
    pub nal_length_size: u8,
    /// SPS and PPS with Annex-B start codes, suitable as codec private data.
    pub sequence_header: Bytes,
}

pub(crate) fn video_media_type(
    codec: VideoCodecId,
    meta: &OnMetaData,
    avcc: Option<&AvccRecord>,
) -> Result<VideoMediaType, FlvSourceError> {
    if codec != VideoCodecId::Avc {
        return Err(FlvSourceError::UnsupportedVideoCodec(codec));
    }

    let avcc = avcc.ok_or(FlvError::NaluBeforeSequenceHeader)?;
    let frame_rate = meta.framerate.unwrap_or(0.0) as u32;

    Ok(VideoMediaType {
        frame_width: meta.width.unwrap_or(0.0) as u32,
        frame_height: meta.height.unwrap_or(0.0) as u32,
        frame_rate,
        frame_rate_range: (frame_rate / 2, frame_rate),
        pixel_aspect_ratio: (1, 1),
        avg_bitrate: meta.videodatarate.unwrap_or(0.0) as u32,
        profile: avcc.profile,
        level: avcc.level,
        nal_length_size: avcc.nal_length_size,
        sequence_header: avcc.sequence_header.clone(),
    })
}

pub(crate) fn audio_media_type(
    codec: SoundFormat,
    meta: &OnMetaData,
    first_tag: Option<&AudioTagHeader>,
    user_data: Bytes,
) -> Result<AudioMediaType, FlvSourceError> {
    let subtype = match codec {
        SoundFormat::Aac => AudioSubtype::RawAac,
        SoundFormat::Mp3 | SoundFormat::Mp38Khz => AudioSubtype::Mp3,
        other => return Err(FlvSourceError::UnsupportedAudioCodec(other)),
    };

    let samples_per_second = meta
        .audiosamplerate
        .map(|rate| rate as u32)
        .or_else(|| first_tag.map(|tag| tag.sound_rate.hertz()))
        .unwrap_or(0);
    let channels = meta
        .stereo
        .map(|stereo| stereo as u32 + 1)
        .or_else(|| first_tag.map(|tag| tag.sound_type.channels()))
        .unwrap_or(2);
    let bits_per_sample = meta
        .audiosamplesize
        .map(|bits| bits as u32)
        .or_else(|| first_tag.map(|tag| tag.sound_size.bits()))
        .unwrap_or(16);

    Ok(AudioMediaType {
        subtype,
        samples_per_second,
        channels,
        bits_per_sample,
        block_align: 1,
        avg_bitrate: meta.audiodatarate.unwrap_or(0.0) as u32,
        user_data,
    })
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use rill_flv::audio::{SoundFormat, SoundRate, SoundSize, SoundType};

    use super::*;

    fn avcc() -> AvccRecord {
        #[rustfmt::skip]
        let data = [
            1, 66, 0, 30, 0xff,
            0xe1, 0x00, 0x04, 0x67, 0x42, 0x00, 0x1e,
            0x01, 0x00, 0x04, 0x68, 0xce, 0x38, 0x80,
        ];
        AvccRecord::parse(&mut io::Cursor::new(Bytes::copy_from_slice(&data))).unwrap()
    }

    #[test]
    fn video_from_meta_and_avcc() {
        let meta = OnMetaData {
            width: Some(640.0),
            height: Some(360.0),
            framerate: Some(30.0),
            videodatarate: Some(1000.0),
            ..Default::default()
        };

        let avcc = avcc();
        let media_type = video_media_type(VideoCodecId::Avc, &meta, Some(&avcc)).unwrap();

        assert_eq!(media_type.frame_width, 640);
        assert_eq!(media_type.frame_height, 360);
        assert_eq!(media_type.frame_rate, 30);
        assert_eq!(media_type.frame_rate_range, (15, 30));
        assert_eq!(media_type.pixel_aspect_ratio, (1, 1));
        assert_eq!(media_type.avg_bitrate, 1000);
        assert_eq!(media_type.profile, 66);
        assert_eq!(media_type.level, 30);
        assert_eq!(media_type.nal_length_size, 4);
        assert_eq!(media_type.sequence_header, avcc.sequence_header);
    }

    #[test]
    fn video_rejects_non_avc() {
        let err = video_media_type(VideoCodecId::On2VP6, &OnMetaData::default(), None).unwrap_err();
        assert!(matches!(err, FlvSourceError::UnsupportedVideoCodec(VideoCodecId::On2VP6)));
        assert!(err.is_unsupported_format());
    }

    #[test]
    fn audio_prefers_metadata() {
        let meta = OnMetaData {
            audiosamplerate: Some(48000.0),
            audiosamplesize: Some(16.0),
            stereo: Some(false),
            audiodatarate: Some(128.0),
            ..Default::default()
        };
        let tag = AudioTagHeader {
            sound_format: SoundFormat::Aac,
            sound_rate: SoundRate::Hz44000,
            sound_size: SoundSize::Bit8,
            sound_type: SoundType::Stereo,
        };

        let media_type =
            audio_media_type(SoundFormat::Aac, &meta, Some(&tag), Bytes::from_static(&[0x12, 0x10])).unwrap();

        assert_eq!(media_type.subtype, AudioSubtype::RawAac);
        assert_eq!(media_type.samples_per_second, 48000);
        assert_eq!(media_type.channels, 1);
        assert_eq!(media_type.bits_per_sample, 16);
        assert_eq!(media_type.block_align, 1);
        assert_eq!(media_type.avg_bitrate, 128);
        assert_eq!(media_type.user_data, Bytes::from_static(&[0x12, 0x10]));
    }

    #[test]
    fn audio_falls_back_to_first_tag() {
        let tag = AudioTagHeader {
            sound_format: SoundFormat::Mp3,
            sound_rate: SoundRate::Hz22000,
            sound_size: SoundSize::Bit16,
            sound_type: SoundType::Stereo,
        };

        let media_type = audio_media_type(SoundFormat::Mp3, &OnMetaData::default(), Some(&tag), Bytes::new()).unwrap();

        assert_eq!(media_type.subtype, AudioSubtype::Mp3);
        assert_eq!(media_type.samples_per_second, 22050);
        assert_eq!(media_type.channels, 2);
        assert_eq!(media_type.bits_per_sample, 16);
    }

    #[test]
    fn audio_rejects_unsupported_codec() {
        let err = audio_media_type(SoundFormat::Speex, &OnMetaData::default(), None, Bytes::new()).unwrap_err();
        assert!(matches!(err, FlvSourceError::UnsupportedAudioCodec(SoundFormat::Speex)));
        assert!(err.is_unsupported_format());
    }
}
