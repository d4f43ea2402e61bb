//! FLV container wire types and synchronous parsing.
//!
//! Everything in this crate parses out of an in-memory buffer
//! ([`std::io::Cursor`] over [`bytes::Bytes`]); fetching those buffers from a
//! byte stream is the job of the demuxer built on top. Only the legacy FLV
//! format is modeled (AVC video, AAC/MP3 audio); the enhanced-RTMP FourCC
//! extensions are out of scope for this demuxer.
//!
//! ## Specifications
//!
//! | Name | Version | Link |
//! | --- | --- | --- |
//! | Video File Format Specification | `10` | <https://github.com/veovera/enhanced-rtmp/blob/main/docs/legacy/video-file-format-v10-0-spec.pdf> |
//! | Adobe Flash Video File Format Specification | `10.1` | <https://github.com/veovera/enhanced-rtmp/blob/main/docs/legacy/video-file-format-v10-1-spec.pdf> |
#![deny(unsafe_code)]

pub mod audio;
pub mod avcc;
pub mod error;
pub mod header;
pub mod keyframes;
pub mod nal;
pub mod script;
pub mod tag;
pub mod video;

pub use error::FlvError;
