use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};

use crate::error::{Result, SiftError};
use crate::pixels::Decoded;

use super::{Decoder, DecoderFactory, FrameSource, FrameStamper, RawFrame, SourceRead};

const IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

/// Seekable source over a directory of still images, visited in
/// lexicographic filename order. Frame payloads are the undecoded file
/// contents; the decoder runs the image codec.
pub struct ImageDirectorySource {
    files: Vec<PathBuf>,
    position: usize,
    stamper: FrameStamper,
}

impl ImageDirectorySource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(SiftError::EmptySequence);
        }
        Ok(Self {
            files,
            position: 0,
            stamper: FrameStamper::new(),
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageDirectorySource {
    fn is_sequential(&self) -> bool {
        false
    }

    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn seek(&mut self, index: usize) -> bool {
        if index < self.files.len() {
            self.position = index;
            true
        } else {
            false
        }
    }

    fn read_frame(&mut self) -> SourceRead {
        let Some(path) = self.files.get(self.position) else {
            return SourceRead::EndOfStream;
        };
        match std::fs::read(path) {
            Ok(bytes) => {
                self.position += 1;
                SourceRead::Frame(RawFrame {
                    bytes,
                    metadata: self.stamper.stamp_now(),
                })
            }
            Err(e) => SourceRead::Error(format!("{}: {e}", path.display())),
        }
    }

    fn decoder_factory(&self) -> Box<dyn DecoderFactory> {
        Box::new(ImageFileDecoderFactory)
    }
}

pub struct ImageFileDecoderFactory;

impl DecoderFactory for ImageFileDecoderFactory {
    fn create_decoder(&self) -> Box<dyn Decoder> {
        Box::new(ImageFileDecoder)
    }
}

/// Decodes still image bytes via the `image` crate, mapping into the
/// native matrix kinds. RGB sources are stored in BGR plane order.
pub struct ImageFileDecoder;

impl Decoder for ImageFileDecoder {
    fn decode(&mut self, frame: &RawFrame) -> Result<Decoded> {
        let img =
            image::load_from_memory(&frame.bytes).map_err(|e| SiftError::Decode(e.to_string()))?;

        let decoded = match img {
            image::DynamicImage::ImageLuma8(gray) => {
                let (w, h) = gray.dimensions();
                Decoded::Mono8(
                    Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
                        .map_err(|e| SiftError::Decode(e.to_string()))?,
                )
            }
            image::DynamicImage::ImageLuma16(gray) => {
                let (w, h) = gray.dimensions();
                Decoded::Mono16(
                    Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
                        .map_err(|e| SiftError::Decode(e.to_string()))?,
                )
            }
            image::DynamicImage::ImageRgb16(rgb) => {
                let (w, h) = rgb.dimensions();
                let mut data = Array3::<u16>::zeros((h as usize, w as usize, 3));
                for (x, y, pixel) in rgb.enumerate_pixels() {
                    data[[y as usize, x as usize, 0]] = pixel.0[2];
                    data[[y as usize, x as usize, 1]] = pixel.0[1];
                    data[[y as usize, x as usize, 2]] = pixel.0[0];
                }
                Decoded::Bgr16(data)
            }
            other => {
                let rgb = other.to_rgb8();
                let (w, h) = rgb.dimensions();
                let mut data = Array3::<u8>::zeros((h as usize, w as usize, 3));
                for (x, y, pixel) in rgb.enumerate_pixels() {
                    data[[y as usize, x as usize, 0]] = pixel.0[2];
                    data[[y as usize, x as usize, 1]] = pixel.0[1];
                    data[[y as usize, x as usize, 2]] = pixel.0[0];
                }
                Decoded::Bgr8(data)
            }
        };
        Ok(decoded)
    }
}
