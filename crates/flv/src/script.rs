//! Script data (`onMetaData`) structures.

use std::io;

use bytes::Bytes;
use rill_amf0::{Amf0Decoder, Amf0Object, Amf0Value};
use rill_bytes_util::BytesCursorExt;

use crate::audio::SoundFormat;
use crate::error::FlvError;
use crate::video::VideoCodecId;

/// The `keyframes` object carried by `onMetaData`: parallel arrays of file
/// positions (bytes from the start of the file, pointing at a tag header)
/// and presentation times (seconds).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnMetaDataKeyframes {
    /// File positions of seekable tags.
    pub filepositions: Vec<f64>,
    /// Presentation times in seconds.
    pub times: Vec<f64>,
}

impl OnMetaDataKeyframes {
    fn from_amf0(value: &Amf0Value) -> Result<Self, FlvError> {
        let object = value.as_object()?;

        let mut keyframes = OnMetaDataKeyframes::default();
        for (key, value) in object {
            match key.as_str() {
                "filepositions" => keyframes.filepositions = number_array(value)?,
                "times" => keyframes.times = number_array(value)?,
                _ => {}
            }
        }

        Ok(keyframes)
    }
}

fn number_array(value: &Amf0Value) -> Result<Vec<f64>, FlvError> {
    value
        .as_strict_array()?
        .iter()
        .map(|v| Ok(v.as_number()?))
        .collect()
}

/// FLV `onMetaData` script data.
///
/// Every field is optional: encoders write whatever subset they feel like.
/// Unrecognized keys are skipped.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.5 (onMetaData)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnMetaData {
    /// Audio codec ID used in the file.
    pub audiocodecid: Option<SoundFormat>,
    /// Audio bitrate, in kilobits per second.
    pub audiodatarate: Option<f64>,
    /// Delay introduced by the audio codec, in seconds.
    pub audiodelay: Option<f64>,
    /// Frequency at which the audio stream is replayed.
    pub audiosamplerate: Option<f64>,
    /// Resolution of a single audio sample.
    pub audiosamplesize: Option<f64>,
    /// Indicating the last video frame is a key frame.
    pub can_seek_to_end: Option<bool>,
    /// Creation date and time.
    pub creationdate: Option<String>,
    /// Total duration of the file, in seconds.
    pub duration: Option<f64>,
    /// Total size of the file, in bytes.
    pub filesize: Option<f64>,
    /// Number of frames per second.
    pub framerate: Option<f64>,
    /// Height of the video, in pixels.
    pub height: Option<f64>,
    /// Seek index over the file's key frames.
    pub keyframes: Option<OnMetaDataKeyframes>,
    /// Indicates stereo audio.
    pub stereo: Option<bool>,
    /// Video codec ID used in the file.
    pub videocodecid: Option<VideoCodecId>,
    /// Video bitrate, in kilobits per second.
    pub videodatarate: Option<f64>,
    /// Width of the video, in pixels.
    pub width: Option<f64>,
}

impl TryFrom<Amf0Object> for OnMetaData {
    type Error = FlvError;

    fn try_from(object: Amf0Object) -> Result<Self, Self::Error> {
        let mut meta = OnMetaData::default();

        for (key, value) in &object {
            match key.as_str() {
                "audiocodecid" => meta.audiocodecid = Some(SoundFormat::from(value.as_number()? as u8)),
                "audiodatarate" => meta.audiodatarate = Some(value.as_number()?),
                "audiodelay" => meta.audiodelay = Some(value.as_number()?),
                "audiosamplerate" => meta.audiosamplerate = Some(value.as_number()?),
                "audiosamplesize" => meta.audiosamplesize = Some(value.as_number()?),
                "canSeekToEnd" => meta.can_seek_to_end = Some(value.as_boolean()?),
                "creationdate" => meta.creationdate = Some(value.as_str()?.to_string()),
                "duration" => meta.duration = Some(value.as_number()?),
                "filesize" => meta.filesize = Some(value.as_number()?),
                "framerate" => meta.framerate = Some(value.as_number()?),
                "height" => meta.height = Some(value.as_number()?),
                "keyframes" => meta.keyframes = Some(OnMetaDataKeyframes::from_amf0(value)?),
                "stereo" => meta.stereo = Some(value.as_boolean()?),
                "videocodecid" => meta.videocodecid = Some(VideoCodecId::from(value.as_number()? as u8)),
                "videodatarate" => meta.videodatarate = Some(value.as_number()?),
                "width" => meta.width = Some(value.as_number()?),
                _ => {}
            }
        }

        Ok(meta)
    }
}

/// FLV `SCRIPTDATA` tag payload.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.4.1 (SCRIPTDATA)
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptData {
    /// `onMetaData` script data.
    OnMetaData(Box<OnMetaData>),
    /// Any other script data. The payload is consumed and discarded.
    Other {
        /// The name of the script data.
        name: String,
    },
}

impl ScriptData {
    /// Demux a script tag payload.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let buf = reader.extract_remaining();
        let mut decoder = Amf0Decoder::new(buf);

        let name = decoder.decode_string()?;

        if name == "onMetaData" {
            let object = decoder.decode_object()?;
            let meta = OnMetaData::try_from(object)?;

            Ok(Self::OnMetaData(Box::new(meta)))
        } else {
            Ok(Self::Other { name })
        }
    }
}

#[cfg(test)]
mod tests {
    use rill_amf0::Amf0Marker;

    use super::*;

    fn push_string(out: &mut Vec<u8>, s: &str) {
        out.push(Amf0Marker::String as u8);
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    fn push_key(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    fn push_number(out: &mut Vec<u8>, n: f64) {
        out.push(Amf0Marker::Number as u8);
        out.extend_from_slice(&n.to_be_bytes());
    }

    #[test]
    fn on_meta_data_object() {
        let mut data = Vec::new();
        push_string(&mut data, "onMetaData");
        data.push(Amf0Marker::Object as u8);
        push_key(&mut data, "duration");
        push_number(&mut data, 10.0);
        push_key(&mut data, "width");
        push_number(&mut data, 640.0);
        push_key(&mut data, "videocodecid");
        push_number(&mut data, 7.0);
        push_key(&mut data, "audiocodecid");
        push_number(&mut data, 10.0);
        push_key(&mut data, "stereo");
        data.push(Amf0Marker::Boolean as u8);
        data.push(1);
        push_key(&mut data, "somevendorkey");
        push_string(&mut data, "ignored");
        data.extend_from_slice(&[0, 0, Amf0Marker::ObjectEnd as u8]);

        let mut reader = io::Cursor::new(Bytes::from(data));
        let script = ScriptData::demux(&mut reader).unwrap();

        let ScriptData::OnMetaData(meta) = script else {
            panic!("expected onMetaData");
        };

        assert_eq!(meta.duration, Some(10.0));
        assert_eq!(meta.width, Some(640.0));
        assert_eq!(meta.videocodecid, Some(VideoCodecId::Avc));
        assert_eq!(meta.audiocodecid, Some(SoundFormat::Aac));
        assert_eq!(meta.stereo, Some(true));
        assert_eq!(meta.height, None);
    }

    #[test]
    fn on_meta_data_ecma_array_with_keyframes() {
        let mut data = Vec::new();
        push_string(&mut data, "onMetaData");
        data.push(Amf0Marker::EcmaArray as u8);
        data.extend_from_slice(&2u32.to_be_bytes());
        push_key(&mut data, "duration");
        push_number(&mut data, 5.5);
        push_key(&mut data, "keyframes");
        data.push(Amf0Marker::Object as u8);
        push_key(&mut data, "filepositions");
        data.push(Amf0Marker::StrictArray as u8);
        data.extend_from_slice(&2u32.to_be_bytes());
        push_number(&mut data, 200.0);
        push_number(&mut data, 50200.0);
        push_key(&mut data, "times");
        data.push(Amf0Marker::StrictArray as u8);
        data.extend_from_slice(&2u32.to_be_bytes());
        push_number(&mut data, 0.0);
        push_number(&mut data, 5.0);
        data.extend_from_slice(&[0, 0, Amf0Marker::ObjectEnd as u8]);
        data.extend_from_slice(&[0, 0, Amf0Marker::ObjectEnd as u8]);

        let mut reader = io::Cursor::new(Bytes::from(data));
        let script = ScriptData::demux(&mut reader).unwrap();

        let ScriptData::OnMetaData(meta) = script else {
            panic!("expected onMetaData");
        };

        assert_eq!(meta.duration, Some(5.5));
        let keyframes = meta.keyframes.unwrap();
        assert_eq!(keyframes.filepositions, vec![200.0, 50200.0]);
        assert_eq!(keyframes.times, vec![0.0, 5.0]);
    }

    #[test]
    fn other_script_data_is_ignored() {
        let mut data = Vec::new();
        push_string(&mut data, "onCuePoint");
        data.push(Amf0Marker::Null as u8);

        let mut reader = io::Cursor::new(Bytes::from(data));
        let script = ScriptData::demux(&mut reader).unwrap();

        assert_eq!(
            script,
            ScriptData::Other {
                name: "onCuePoint".to_string()
            }
        );
    }
}
