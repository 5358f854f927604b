use std::fs::File;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};
use crate::pixels::Decoded;

use super::{Decoder, DecoderFactory, FrameSource, FrameStamper, RawFrame, SourceRead};

/// Sample layout of a raw video file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawPixelFormat {
    Mono8,
    Mono16,
    Bgr8,
    Bgr16,
}

impl RawPixelFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Mono8 | Self::Bgr8 => 1,
            Self::Mono16 | Self::Bgr16 => 2,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            Self::Mono8 | Self::Mono16 => 1,
            Self::Bgr8 | Self::Bgr16 => 3,
        }
    }
}

/// Geometry of a raw video file: an optional fixed header followed by
/// densely packed frames. 16-bit samples are little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVideoFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: RawPixelFormat,
    pub header_bytes: u64,
}

impl RawVideoFormat {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.pixel_format.bytes_per_sample()
            * self.pixel_format.channels()
    }
}

/// Seekable raw video file source. The file is memory-mapped; reading a
/// frame copies its bytes out so the emitted [`RawFrame`] owns its
/// payload.
pub struct RawVideoSource {
    mmap: Mmap,
    format: RawVideoFormat,
    frame_bytes: usize,
    count: usize,
    position: usize,
    stamper: FrameStamper,
}

impl RawVideoSource {
    pub fn open(path: &Path, format: RawVideoFormat) -> Result<Self> {
        if format.width == 0 || format.height == 0 {
            return Err(SiftError::InvalidDimensions {
                width: format.width,
                height: format.height,
            });
        }
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if (mmap.len() as u64) < format.header_bytes {
            return Err(SiftError::InvalidRawVideo(
                "file smaller than its declared header".into(),
            ));
        }
        let frame_bytes = format.frame_bytes();
        let payload = mmap.len() - format.header_bytes as usize;
        let count = payload / frame_bytes;
        if count == 0 {
            return Err(SiftError::EmptySequence);
        }

        Ok(Self {
            mmap,
            format,
            frame_bytes,
            count,
            position: 0,
            stamper: FrameStamper::new(),
        })
    }

    pub fn format(&self) -> &RawVideoFormat {
        &self.format
    }
}

impl FrameSource for RawVideoSource {
    fn is_sequential(&self) -> bool {
        false
    }

    fn frame_count(&self) -> usize {
        self.count
    }

    fn seek(&mut self, index: usize) -> bool {
        if index < self.count {
            self.position = index;
            true
        } else {
            false
        }
    }

    fn read_frame(&mut self) -> SourceRead {
        if self.position >= self.count {
            return SourceRead::EndOfStream;
        }
        let offset = self.format.header_bytes as usize + self.position * self.frame_bytes;
        let bytes = self.mmap[offset..offset + self.frame_bytes].to_vec();
        self.position += 1;
        SourceRead::Frame(RawFrame {
            bytes,
            metadata: self.stamper.stamp_now(),
        })
    }

    fn decoder_factory(&self) -> Box<dyn DecoderFactory> {
        Box::new(RawVideoDecoderFactory {
            format: self.format,
        })
    }
}

pub struct RawVideoDecoderFactory {
    format: RawVideoFormat,
}

impl RawVideoDecoderFactory {
    pub fn new(format: RawVideoFormat) -> Self {
        Self { format }
    }
}

impl DecoderFactory for RawVideoDecoderFactory {
    fn create_decoder(&self) -> Box<dyn Decoder> {
        Box::new(RawVideoDecoder {
            format: self.format,
        })
    }
}

/// Interprets raw frame bytes according to the file format.
pub struct RawVideoDecoder {
    format: RawVideoFormat,
}

impl Decoder for RawVideoDecoder {
    fn decode(&mut self, frame: &RawFrame) -> Result<Decoded> {
        let expected = self.format.frame_bytes();
        if frame.bytes.len() != expected {
            return Err(SiftError::Decode(format!(
                "frame payload is {} bytes, expected {}",
                frame.bytes.len(),
                expected
            )));
        }
        let h = self.format.height as usize;
        let w = self.format.width as usize;

        let decoded = match self.format.pixel_format {
            RawPixelFormat::Mono8 => Decoded::Mono8(
                Array2::from_shape_vec((h, w), frame.bytes.clone())
                    .map_err(|e| SiftError::Decode(e.to_string()))?,
            ),
            RawPixelFormat::Mono16 => {
                let mut samples = vec![0u16; h * w];
                LittleEndian::read_u16_into(&frame.bytes, &mut samples);
                Decoded::Mono16(
                    Array2::from_shape_vec((h, w), samples)
                        .map_err(|e| SiftError::Decode(e.to_string()))?,
                )
            }
            RawPixelFormat::Bgr8 => Decoded::Bgr8(
                Array3::from_shape_vec((h, w, 3), frame.bytes.clone())
                    .map_err(|e| SiftError::Decode(e.to_string()))?,
            ),
            RawPixelFormat::Bgr16 => {
                let mut samples = vec![0u16; h * w * 3];
                LittleEndian::read_u16_into(&frame.bytes, &mut samples);
                Decoded::Bgr16(
                    Array3::from_shape_vec((h, w, 3), samples)
                        .map_err(|e| SiftError::Decode(e.to_string()))?,
                )
            }
        };
        Ok(decoded)
    }
}
