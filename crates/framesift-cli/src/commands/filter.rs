use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use framesift_core::twopass::{filter_whole_file, TwoPassStage};

use super::{load_settings, open_source, RawFormatArgs};

#[derive(Args)]
pub struct FilterArgs {
    /// Raw video file or image directory (must be seekable)
    pub input: PathBuf,

    /// Settings TOML (defaults apply otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory receiving the kept frames
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Percentage of ranked frames to keep (overrides settings)
    #[arg(short, long)]
    pub acceptance: Option<u32>,

    #[command(flatten)]
    pub raw: RawFormatArgs,
}

pub fn run(args: &FilterArgs) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(dir) = &args.save_dir {
        settings.save_images_directory = dir.clone();
    }
    if let Some(acceptance) = args.acceptance {
        if acceptance > 100 {
            bail!("acceptance must be between 0 and 100");
        }
        settings.acceptance_percent = acceptance;
    }

    let mut source = open_source(&args.input, &args.raw)?;
    let total = source.frame_count();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Ranking");

    let outcome = filter_whole_file(source.as_mut(), &settings, |stage, done, _total| {
        if stage == TwoPassStage::Saving {
            pb.set_message("Saving");
        }
        pb.set_position(done as u64);
    })?;
    pb.finish_with_message("Done");

    println!("\nFrames ranked:   {}", outcome.total_frames);
    if outcome.minimum_quality.is_finite() {
        println!("Quality floor:   {:.6}", outcome.minimum_quality);
    }
    println!("Frames saved:    {}", outcome.saved);
    println!(
        "Destination:     {}",
        settings.save_images_directory.display()
    );
    Ok(())
}
