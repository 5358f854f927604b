#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use ndarray::Array2;

use framesift_core::context::Stage;
use framesift_core::error::{Result, SiftError};
use framesift_core::foreman::{Foreman, FrameSummary, SinkEvent};
use framesift_core::pixels::Decoded;
use framesift_core::sources::{Decoder, DecoderFactory, FrameMetadata, RawFrame};

pub const FRAME_W: usize = 64;
pub const FRAME_H: usize = 48;

const EVENT_TIMEOUT: Duration = Duration::from_secs(20);

/// Decoder for test frames: the payload is a dense mono-8 matrix of
/// known geometry. An optional artificial delay makes worker occupancy
/// deterministic in backpressure tests.
pub struct MonoDecoder {
    width: usize,
    height: usize,
    delay: Duration,
}

impl MonoDecoder {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            delay: Duration::ZERO,
        }
    }
}

impl Decoder for MonoDecoder {
    fn decode(&mut self, frame: &RawFrame) -> Result<Decoded> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if frame.bytes.len() != self.width * self.height {
            return Err(SiftError::Decode(format!(
                "payload is {} bytes, expected {}",
                frame.bytes.len(),
                self.width * self.height
            )));
        }
        Ok(Decoded::Mono8(
            Array2::from_shape_vec((self.height, self.width), frame.bytes.clone()).unwrap(),
        ))
    }
}

pub struct MonoDecoderFactory {
    pub width: usize,
    pub height: usize,
    pub delay: Duration,
}

impl MonoDecoderFactory {
    pub fn standard() -> Self {
        Self {
            width: FRAME_W,
            height: FRAME_H,
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            width: FRAME_W,
            height: FRAME_H,
            delay,
        }
    }
}

impl DecoderFactory for MonoDecoderFactory {
    fn create_decoder(&self) -> Box<dyn Decoder> {
        Box::new(MonoDecoder {
            width: self.width,
            height: self.height,
            delay: self.delay,
        })
    }
}

/// Decoder factory whose decoders always fail.
pub struct FailingDecoderFactory;

impl DecoderFactory for FailingDecoderFactory {
    fn create_decoder(&self) -> Box<dyn Decoder> {
        struct Failing;
        impl Decoder for Failing {
            fn decode(&mut self, _frame: &RawFrame) -> Result<Decoded> {
                Err(SiftError::Decode("synthetic decoder failure".into()))
            }
        }
        Box::new(Failing)
    }
}

/// Frame with deterministic 25 fps capture metadata, so filenames are
/// unique and reproducible.
pub fn test_frame(bytes: Vec<u8>, index: u32) -> RawFrame {
    let base = Utc.with_ymd_and_hms(2026, 4, 1, 20, 0, 0).unwrap();
    let timestamp = base + chrono::Duration::milliseconds(i64::from(index) * 40);
    RawFrame {
        bytes,
        metadata: FrameMetadata {
            timestamp,
            frame_of_second: index % 25,
        },
    }
}

pub fn flat_frame(value: u8) -> Vec<u8> {
    vec![value; FRAME_W * FRAME_H]
}

/// A bright Gaussian blob plus a checkerboard of the given amplitude.
/// The blob dominates the signal band, the checkerboard the noise band,
/// so the two-blur quality estimate decreases monotonically with
/// `noise_level`.
pub fn detail_frame(noise_level: u8) -> Vec<u8> {
    let (cx, cy) = (FRAME_W as f64 / 2.0, FRAME_H as f64 / 2.0);
    let mut bytes = Vec::with_capacity(FRAME_W * FRAME_H);
    for row in 0..FRAME_H {
        for col in 0..FRAME_W {
            let dx = col as f64 - cx;
            let dy = row as f64 - cy;
            let blob = 180.0 * (-(dx * dx + dy * dy) / (2.0 * 100.0)).exp();
            let salt = if (row + col) % 2 == 0 {
                f64::from(noise_level) * 8.0
            } else {
                0.0
            };
            bytes.push((blob + salt).clamp(0.0, 255.0) as u8);
        }
    }
    bytes
}

/// Receive events until `stopped`, panicking on a stall.
pub fn drain_until_stopped(events: &Receiver<SinkEvent>) -> Vec<SinkEvent> {
    let mut collected = Vec::new();
    loop {
        match events.recv_timeout(EVENT_TIMEOUT) {
            Ok(event) => {
                let is_stop = matches!(event, SinkEvent::Stopped);
                collected.push(event);
                if is_stop {
                    return collected;
                }
            }
            Err(_) => panic!("timed out waiting for stopped; got {collected:?}"),
        }
    }
}

/// Push one frame and block until its completion arrives.
pub fn push_and_wait(
    foreman: &Foreman,
    events: &Receiver<SinkEvent>,
    frame: RawFrame,
) -> FrameSummary {
    foreman.take_frame(frame);
    loop {
        match events.recv_timeout(EVENT_TIMEOUT) {
            Ok(SinkEvent::FrameProcessed(summary)) => return summary,
            Ok(SinkEvent::FrameMissed) => panic!("serially pushed frame was dropped"),
            Ok(_) => {}
            Err(_) => panic!("timed out waiting for frame completion"),
        }
    }
}

pub fn processed(events: &[SinkEvent]) -> Vec<FrameSummary> {
    events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::FrameProcessed(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

pub fn missed_count(events: &[SinkEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SinkEvent::FrameMissed))
        .count()
}

pub fn stopped_count(events: &[SinkEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SinkEvent::Stopped))
        .count()
}

/// Completed stages must form an in-order subsequence of the canonical
/// stage order, and a failing stage must be the last entry.
pub fn assert_stage_sequence(summary: &FrameSummary) {
    let canonical = [
        Stage::Decode,
        Stage::Render,
        Stage::Crop,
        Stage::EstimateQuality,
        Stage::Save,
    ];
    assert!(
        !summary.completed_stages.is_empty(),
        "no stages recorded: {summary:?}"
    );
    let mut next = 0;
    for stage in &summary.completed_stages {
        let position = canonical
            .iter()
            .position(|s| s == stage)
            .expect("unknown stage");
        assert!(
            position >= next,
            "stage order violated: {:?}",
            summary.completed_stages
        );
        next = position + 1;
    }
    if let Some(failed) = summary.failed_stage {
        assert_eq!(
            summary.completed_stages.last(),
            Some(&failed),
            "failing stage must be the last recorded"
        );
    }
}

/// Frame files present in a directory, sorted.
pub fn saved_frames(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("frame-"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
