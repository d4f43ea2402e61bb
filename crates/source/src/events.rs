//! Events produced on the source and stream queues.

use crate::error::FlvSourceError;
use crate::sample::MediaSample;
use crate::stream::FlvStream;

/// Events emitted on the source's event queue.
#[derive(Debug)]
pub enum SourceEvent {
    /// Playback started. Both times carry the resolved keyframe position in
    /// 100-nanosecond units.
    Started {
        /// The time playback starts at.
        time: i64,
        /// The actual start position after keyframe resolution.
        actual_start: i64,
    },
    /// The source repositioned while running.
    Seeked {
        /// The resolved keyframe time.
        time: i64,
    },
    /// The source paused.
    Paused,
    /// The source stopped.
    Stopped,
    /// A stream was selected that was not active before.
    NewStream(FlvStream),
    /// An already-active stream was selected again.
    UpdatedStream(FlvStream),
    /// Every selected stream has delivered its end-of-stream.
    EndOfPresentation,
    /// A streaming error. The source stays reachable until the host shuts it
    /// down.
    Error(FlvSourceError),
}

/// Events emitted on a stream's event queue.
#[derive(Debug)]
pub enum StreamEvent {
    /// The stream started.
    Started {
        /// The time playback starts at.
        time: i64,
    },
    /// The stream repositioned.
    Seeked {
        /// The resolved keyframe time.
        time: i64,
    },
    /// The stream paused.
    Paused,
    /// The stream stopped.
    Stopped,
    /// A sample matched to a pull request.
    Sample(MediaSample),
    /// The stream has delivered its last sample.
    EndOfStream,
}
