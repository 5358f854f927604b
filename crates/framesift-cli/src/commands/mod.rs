pub mod config;
pub mod filter;
pub mod info;
pub mod run;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use framesift_core::settings::ProcessingSettings;
use framesift_core::sources::image_dir::ImageDirectorySource;
use framesift_core::sources::raw_video::{RawPixelFormat, RawVideoFormat, RawVideoSource};
use framesift_core::sources::FrameSource;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PixelFormatArg {
    Mono8,
    Mono16,
    Bgr8,
    Bgr16,
}

impl From<PixelFormatArg> for RawPixelFormat {
    fn from(value: PixelFormatArg) -> Self {
        match value {
            PixelFormatArg::Mono8 => RawPixelFormat::Mono8,
            PixelFormatArg::Mono16 => RawPixelFormat::Mono16,
            PixelFormatArg::Bgr8 => RawPixelFormat::Bgr8,
            PixelFormatArg::Bgr16 => RawPixelFormat::Bgr16,
        }
    }
}

/// Geometry flags for raw video files. Image directories need none of
/// these.
#[derive(Args, Debug)]
pub struct RawFormatArgs {
    /// Frame width in pixels (raw video input)
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels (raw video input)
    #[arg(long)]
    pub height: Option<u32>,

    /// Sample layout (raw video input)
    #[arg(long, value_enum)]
    pub pixel_format: Option<PixelFormatArg>,

    /// Bytes to skip before the first frame
    #[arg(long, default_value_t = 0)]
    pub header_bytes: u64,
}

impl RawFormatArgs {
    pub fn format(&self) -> Result<RawVideoFormat> {
        let (Some(width), Some(height), Some(pixel_format)) =
            (self.width, self.height, self.pixel_format)
        else {
            bail!("raw video input requires --width, --height and --pixel-format");
        };
        Ok(RawVideoFormat {
            width,
            height,
            pixel_format: pixel_format.into(),
            header_bytes: self.header_bytes,
        })
    }
}

pub fn open_source(input: &Path, raw: &RawFormatArgs) -> Result<Box<dyn FrameSource>> {
    if input.is_dir() {
        let source = ImageDirectorySource::open(input)
            .with_context(|| format!("Failed to open image directory {}", input.display()))?;
        Ok(Box::new(source))
    } else {
        let source = RawVideoSource::open(input, raw.format()?)
            .with_context(|| format!("Failed to open raw video {}", input.display()))?;
        Ok(Box::new(source))
    }
}

pub fn load_settings(config: Option<&Path>) -> Result<ProcessingSettings> {
    match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
        }
        None => Ok(ProcessingSettings::default()),
    }
}
