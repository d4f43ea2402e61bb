//! The keyframe seek index.

use crate::error::FlvError;
use crate::script::OnMetaDataKeyframes;

/// One seekable position in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyframe {
    /// Byte offset from the start of the file, pointing at a tag header.
    pub position: u64,
    /// Presentation time in 100-nanosecond units.
    pub time: i64,
}

/// An ordered index of keyframes, built from the `keyframes` object of
/// `onMetaData`.
#[derive(Debug, Clone, Default)]
pub struct KeyframeIndex {
    entries: Vec<Keyframe>,
}

impl KeyframeIndex {
    /// Build the index from onMetaData keyframe arrays.
    ///
    /// The two arrays must have the same length. Times are seconds and are
    /// converted to 100-nanosecond units; positions are byte offsets.
    pub fn from_meta(keyframes: &OnMetaDataKeyframes) -> Result<Self, FlvError> {
        if keyframes.times.len() != keyframes.filepositions.len() {
            return Err(FlvError::KeyframeArrayMismatch {
                times: keyframes.times.len(),
                positions: keyframes.filepositions.len(),
            });
        }

        let mut entries: Vec<Keyframe> = keyframes
            .times
            .iter()
            .zip(keyframes.filepositions.iter())
            .map(|(&time, &position)| Keyframe {
                position: position as u64,
                time: (time * 10_000_000.0) as i64,
            })
            .collect();

        entries.sort_unstable_by_key(|k| k.time);

        Ok(Self { entries })
    }

    /// Whether the index holds any entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a seek target.
    ///
    /// Returns the greatest keyframe whose time is at most `time`, the first
    /// keyframe when `time` is below the indexed range, or `None` when the
    /// index is empty.
    pub fn seek(&self, time: i64) -> Option<Keyframe> {
        if self.entries.is_empty() {
            return None;
        }

        let after = self.entries.partition_point(|k| k.time <= time);
        if after == 0 {
            Some(self.entries[0])
        } else {
            Some(self.entries[after - 1])
        }
    }
}
