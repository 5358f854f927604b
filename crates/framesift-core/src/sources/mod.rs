pub mod image_dir;
pub mod raw_video;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pixels::Decoded;

/// Capture metadata attached to every raw frame. `frame_of_second`
/// restarts at zero on every new UTC second and keeps filenames unique
/// at camera frame rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameMetadata {
    pub timestamp: DateTime<Utc>,
    pub frame_of_second: u32,
}

/// An undecoded frame as emitted by a source: an opaque byte payload
/// plus capture metadata. Only the decoder bound to the same source kind
/// can interpret the bytes.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub bytes: Vec<u8>,
    pub metadata: FrameMetadata,
}

/// Source-specific byte-to-pixel-matrix converter. A decoder is bound to
/// one processing context and reused across the frames that context
/// handles.
pub trait Decoder: Send {
    fn decode(&mut self, frame: &RawFrame) -> Result<Decoded>;
}

/// Creates decoders for a source kind. The coordinator holds one factory
/// and equips each fresh context with a decoder.
pub trait DecoderFactory: Send {
    fn create_decoder(&self) -> Box<dyn Decoder>;
}

/// Outcome of polling a source for its next frame.
#[derive(Debug)]
pub enum SourceRead {
    Frame(RawFrame),
    EndOfStream,
    Error(String),
}

/// A frame producer the coordinator can be wired to.
///
/// Non-live sources answer `read_frame` immediately with the next frame
/// and are throttled by the coordinator's `ready` events. Sequential
/// sources (live cameras, pipes) cannot be re-read: `seek` always fails
/// and `frame_count` returns 0.
pub trait FrameSource: Send {
    fn is_sequential(&self) -> bool;

    /// Total frames, or 0 when the source is sequential.
    fn frame_count(&self) -> usize;

    /// Reposition so the next `read_frame` returns frame `index`.
    /// Returns false for sequential sources or out-of-range indices.
    fn seek(&mut self, index: usize) -> bool;

    fn read_frame(&mut self) -> SourceRead;

    fn decoder_factory(&self) -> Box<dyn DecoderFactory>;
}

/// Assigns capture metadata, tracking the intra-second frame counter.
#[derive(Debug)]
pub struct FrameStamper {
    previous_second: i64,
    frame_of_second: u32,
}

impl FrameStamper {
    pub fn new() -> Self {
        Self {
            previous_second: i64::MIN,
            frame_of_second: 0,
        }
    }

    pub fn stamp_now(&mut self) -> FrameMetadata {
        self.stamp_at(Utc::now())
    }

    pub fn stamp_at(&mut self, timestamp: DateTime<Utc>) -> FrameMetadata {
        let second = timestamp.timestamp();
        if second != self.previous_second {
            self.previous_second = second;
            self.frame_of_second = 0;
        }
        let metadata = FrameMetadata {
            timestamp,
            frame_of_second: self.frame_of_second,
        };
        self.frame_of_second += 1;
        metadata
    }
}

impl Default for FrameStamper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamper_counts_within_second() {
        let mut stamper = FrameStamper::new();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = stamper.stamp_at(t0);
        let b = stamper.stamp_at(t0 + chrono::Duration::milliseconds(40));
        let c = stamper.stamp_at(t0 + chrono::Duration::milliseconds(1001));
        assert_eq!(a.frame_of_second, 0);
        assert_eq!(b.frame_of_second, 1);
        assert_eq!(c.frame_of_second, 0);
    }
}
