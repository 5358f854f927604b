use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use framesift_core::settings::ProcessingSettings;
use framesift_core::sources::image_dir::ImageDirectorySource;
use framesift_core::sources::raw_video::RawVideoSource;
use framesift_core::sources::FrameSource;

use super::RawFormatArgs;

#[derive(Args)]
pub struct InfoArgs {
    /// Raw video file or image directory
    pub input: PathBuf,

    #[command(flatten)]
    pub raw: RawFormatArgs,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    if args.input.is_dir() {
        let source = ImageDirectorySource::open(&args.input)?;
        println!("Image directory: {}", args.input.display());
        println!("Frames:          {}", source.frame_count());
        if let (Some(first), Some(last)) = (source.files().first(), source.files().last()) {
            println!("First:           {}", first.display());
            println!("Last:            {}", last.display());
        }
    } else {
        let format = args.raw.format()?;
        let source = RawVideoSource::open(&args.input, format)?;
        let settings = ProcessingSettings::default();
        println!("Raw video:       {}", args.input.display());
        println!("Frames:          {}", source.frame_count());
        println!("Geometry:        {}x{}", format.width, format.height);
        println!("Frame bytes:     {}", format.frame_bytes());
        println!(
            "Est. peak memory: {:.1} MiB",
            settings.memory_estimate(
                format.width as usize,
                format.height as usize,
                format.pixel_format.bytes_per_sample(),
                format.pixel_format.channels(),
            ) as f64
                / (1024.0 * 1024.0)
        );
    }
    Ok(())
}
