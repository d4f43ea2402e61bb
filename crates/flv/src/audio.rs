//! Audio tag header types.

use std::io;

use byteorder::ReadBytesExt;
use bytes::Bytes;
use rill_bytes_util::wire_enum;

use crate::error::FlvError;

wire_enum! {
    /// FLV Sound Format
    ///
    /// Denotes the codec of the underlying audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 (AUDIODATA)
    pub enum SoundFormat(u8) {
        /// Linear PCM, platform endian
        LinearPcmPlatformEndian = 0,
        /// ADPCM
        Adpcm = 1,
        /// MP3
        Mp3 = 2,
        /// Linear PCM, little endian
        LinearPcmLittleEndian = 3,
        /// Nellymoser 16Khz Mono
        Nellymoser16KhzMono = 4,
        /// Nellymoser 8Khz Mono
        Nellymoser8KhzMono = 5,
        /// Nellymoser
        Nellymoser = 6,
        /// G.711 A-Law logarithmic PCM
        G711ALaw = 7,
        /// G.711 Mu-Law logarithmic PCM
        G711MuLaw = 8,
        /// AAC
        Aac = 10,
        /// Speex
        Speex = 11,
        /// Mp3 8Khz
        Mp38Khz = 14,
        /// Device specific sound
        DeviceSpecificSound = 15,
    }
}

wire_enum! {
    /// FLV Sound Rate
    ///
    /// Denotes the sampling rate of the audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 (AUDIODATA)
    pub enum SoundRate(u8) {
        /// 5.5 KHz
        Hz5500 = 0,
        /// 11 KHz
        Hz11000 = 1,
        /// 22 KHz
        Hz22000 = 2,
        /// 44 KHz
        Hz44000 = 3,
    }
}

impl SoundRate {
    /// The sampling rate in hertz, or 0 for values outside the table.
    pub fn hertz(self) -> u32 {
        match self {
            SoundRate::Hz5500 => 5500,
            SoundRate::Hz11000 => 11025,
            SoundRate::Hz22000 => 22050,
            SoundRate::Hz44000 => 44100,
            _ => 0,
        }
    }
}

wire_enum! {
    /// FLV Sound Size
    ///
    /// Denotes the size of each sample in the audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 (AUDIODATA)
    pub enum SoundSize(u8) {
        /// 8 bit
        Bit8 = 0,
        /// 16 bit
        Bit16 = 1,
    }
}

impl SoundSize {
    /// Bits per sample.
    pub fn bits(self) -> u32 {
        if self == SoundSize::Bit16 { 16 } else { 8 }
    }
}

wire_enum! {
    /// FLV Sound Type
    ///
    /// Denotes the number of channels in the audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 (AUDIODATA)
    pub enum SoundType(u8) {
        /// Mono
        Mono = 0,
        /// Stereo
        Stereo = 1,
    }
}

impl SoundType {
    /// Channel count.
    pub fn channels(self) -> u32 {
        if self == SoundType::Stereo { 2 } else { 1 }
    }
}

wire_enum! {
    /// FLV `AACPacketType`
    ///
    /// Indicates whether an AAC tag carries the AudioSpecificConfig or a raw
    /// frame.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 (AUDIODATA)
    pub enum AacPacketType(u8) {
        /// Sequence Header (AudioSpecificConfig)
        SequenceHeader = 0,
        /// Raw AAC frame
        Raw = 1,
    }
}

/// The FLV `AudioTagHeader`: the first payload byte of every audio tag.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.2.1 (AUDIODATA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTagHeader {
    /// The sound format of the audio data. (4 bits)
    pub sound_format: SoundFormat,
    /// The sound rate of the audio data. (2 bits)
    pub sound_rate: SoundRate,
    /// The sound size of the audio data. (1 bit)
    pub sound_size: SoundSize,
    /// The sound type of the audio data. (1 bit)
    pub sound_type: SoundType,
}

impl AudioTagHeader {
    /// Demux the audio tag header from one byte.
    #[allow(clippy::unusual_byte_groupings)]
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let byte = reader.read_u8()?;

        let sound_format = SoundFormat::from(byte >> 4); // 0b1111_00_0_0
        let sound_rate = SoundRate::from((byte & 0b0000_11_0_0) >> 2);
        let sound_size = SoundSize::from((byte & 0b0000_00_1_0) >> 1);
        let sound_type = SoundType::from(byte & 0b0000_00_0_1);

        Ok(AudioTagHeader {
            sound_format,
            sound_rate,
            sound_size,
            sound_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn sound_format() {
        let cases = [
            (0x00, SoundFormat::LinearPcmPlatformEndian),
            (0x01, SoundFormat::Adpcm),
            (0x02, SoundFormat::Mp3),
            (0x03, SoundFormat::LinearPcmLittleEndian),
            (0x04, SoundFormat::Nellymoser16KhzMono),
            (0x05, SoundFormat::Nellymoser8KhzMono),
            (0x06, SoundFormat::Nellymoser),
            (0x07, SoundFormat::G711ALaw),
            (0x08, SoundFormat::G711MuLaw),
            (0x0A, SoundFormat::Aac),
            (0x0B, SoundFormat::Speex),
            (0x0E, SoundFormat::Mp38Khz),
            (0x0F, SoundFormat::DeviceSpecificSound),
        ];

        for (value, expected) in cases {
            assert_eq!(SoundFormat::from(value), expected);
        }
    }

    #[test]
    fn aac_stereo_header() {
        // 0xAF: AAC, 44 KHz, 16 bit, stereo
        let mut reader = io::Cursor::new(Bytes::from_static(&[0xAF]));

        let header = AudioTagHeader::demux(&mut reader).unwrap();
        assert_eq!(
            header,
            AudioTagHeader {
                sound_format: SoundFormat::Aac,
                sound_rate: SoundRate::Hz44000,
                sound_size: SoundSize::Bit16,
                sound_type: SoundType::Stereo,
            }
        );
    }

    #[test]
    fn mp3_mono_header() {
        // 0x2E: MP3, 44 KHz, 16 bit, mono
        let mut reader = io::Cursor::new(Bytes::from_static(&[0x2E]));

        let header = AudioTagHeader::demux(&mut reader).unwrap();
        assert_eq!(header.sound_format, SoundFormat::Mp3);
        assert_eq!(header.sound_rate, SoundRate::Hz44000);
        assert_eq!(header.sound_size, SoundSize::Bit16);
        assert_eq!(header.sound_type, SoundType::Mono);
    }

    #[test]
    fn derived_values() {
        assert_eq!(SoundRate::Hz5500.hertz(), 5500);
        assert_eq!(SoundRate::Hz11000.hertz(), 11025);
        assert_eq!(SoundRate::Hz22000.hertz(), 22050);
        assert_eq!(SoundRate::Hz44000.hertz(), 44100);
        assert_eq!(SoundSize::Bit8.bits(), 8);
        assert_eq!(SoundSize::Bit16.bits(), 16);
        assert_eq!(SoundType::Mono.channels(), 1);
        assert_eq!(SoundType::Stereo.channels(), 2);
    }
}
