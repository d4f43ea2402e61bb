//! A pull-model FLV media source.
//!
//! The source demultiplexes an FLV byte stream into per-stream, timestamped,
//! codec-tagged compressed samples (H.264/AVC video, AAC or MP3 audio) for a
//! host media pipeline. The host supplies a readable and seekable byte
//! stream, opens the source to obtain a presentation description, starts (or
//! seeks) playback, and pulls samples one request at a time per stream;
//! demuxing is driven entirely by that demand.
//!
//! ```no_run
//! # async fn demo() -> Result<(), rill_flv_source::FlvSourceError> {
//! use rill_flv_source::{FlvSource, SourceEvent, StreamEvent};
//!
//! let file = std::io::Cursor::new(std::fs::read("movie.flv")?);
//! let (source, handle, mut events) = FlvSource::new(file);
//! tokio::spawn(source.run());
//!
//! let description = handle.open().await?;
//! handle.start(&description, None)?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SourceEvent::NewStream(stream) = event {
//!         stream.request_sample(None)?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod error;
pub mod events;
pub mod media_type;
mod parser;
pub mod presentation;
pub mod sample;
pub mod source;
pub mod stream;

pub use error::FlvSourceError;
pub use events::{SourceEvent, StreamEvent};
pub use media_type::{AudioMediaType, AudioSubtype, MediaType, VideoMediaType};
pub use presentation::{PresentationDescription, StreamSelection};
pub use sample::MediaSample;
pub use source::{Characteristics, FlvSource, SourceHandle, SourceState};
pub use stream::{FlvStream, AUDIO_STREAM_ID, VIDEO_STREAM_ID};
