//! Source error type.

use std::io;

use rill_flv::FlvError;
use rill_flv::audio::SoundFormat;
use rill_flv::video::VideoCodecId;

/// Errors produced by the media source.
#[derive(Debug, thiserror::Error)]
pub enum FlvSourceError {
    /// IO error on the byte stream.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The file violates the FLV format.
    #[error("invalid file format: {0}")]
    InvalidFormat(#[from] FlvError),
    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The source has not finished opening.
    #[error("the source is not initialized")]
    NotInitialized,
    /// Another control operation is still in flight, or the target cannot
    /// accept work right now.
    #[error("not accepting the operation right now")]
    NotAccepting,
    /// The operation is not valid in the current state.
    #[error("invalid state transition")]
    InvalidStateTransition,
    /// The file carries an audio codec this source cannot describe.
    #[error("unsupported audio codec: {0:?}")]
    UnsupportedAudioCodec(SoundFormat),
    /// The file carries a video codec this source cannot describe.
    #[error("unsupported video codec: {0:?}")]
    UnsupportedVideoCodec(VideoCodecId),
    /// The byte stream does not support seeking.
    #[error("byte stream is not seekable")]
    ByteStreamNotSeekable,
    /// The start position carries a time format this source does not accept.
    ///
    /// Start positions in this crate are typed 100-nanosecond counts, so the
    /// source itself never produces this; it exists for hosts that layer a
    /// variant-typed control surface on top.
    #[error("unsupported time format")]
    UnsupportedTimeFormat,
    /// The source has been shut down.
    #[error("the source has been shut down")]
    Shutdown,
}

impl FlvSourceError {
    /// Whether this error reports a codec the source cannot describe.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(
            self,
            FlvSourceError::UnsupportedAudioCodec(_) | FlvSourceError::UnsupportedVideoCodec(_)
        )
    }

    /// Whether this error reports a malformed file.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, FlvSourceError::InvalidFormat(_))
    }
}
