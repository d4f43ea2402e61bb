use crate::media_type::MediaType;

/// The presentation description published by a successful open: the list of
/// streams with their media types and selection bits, plus file-level
/// attributes from the metadata.
///
/// The host flips selection bits and passes the description back to
/// [`SourceHandle::start`](crate::source::SourceHandle::start).
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationDescription {
    /// Total duration in 100-nanosecond units, 0 when the metadata carries
    /// none.
    pub duration: i64,
    /// Audio bitrate from the metadata, 0 when absent.
    pub audio_bitrate: u32,
    /// Video bitrate from the metadata, 0 when absent.
    pub video_bitrate: u32,
    /// Total file size in bytes from the metadata, 0 when absent.
    pub file_size: u64,
    /// The streams of the presentation, video first. All streams are
    /// selected by default.
    pub streams: Vec<StreamSelection>,
}

/// One stream of the presentation and its selection bit.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSelection {
    /// Stream identifier (video = 0, audio = 1).
    pub stream_id: u32,
    /// The stream's media type.
    pub media_type: MediaType,
    /// Whether the stream should produce samples.
    pub selected: bool,
}

impl PresentationDescription {
    /// Flip the selection bit of a stream. Unknown ids are ignored.
    pub fn select(&mut self, stream_id: u32, selected: bool) {
        for stream in &mut self.streams {
            if stream.stream_id == stream_id {
                stream.selected = selected;
            }
        }
    }

    /// The stream entry with the given id.
    pub fn stream(&self, stream_id: u32) -> Option<&StreamSelection> {
        self.streams.iter().find(|stream| stream.stream_id == stream_id)
    }
}
