use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use framesift_core::foreman::{ChannelSink, Foreman};
use framesift_core::twopass::stream_source;

use super::{load_settings, open_source, RawFormatArgs};

#[derive(Args)]
pub struct RunArgs {
    /// Raw video file or image directory
    pub input: PathBuf,

    /// Settings TOML (defaults apply otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the save directory
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Enable saving regardless of the settings file
    #[arg(long)]
    pub save: bool,

    #[command(flatten)]
    pub raw: RawFormatArgs,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(dir) = &args.save_dir {
        settings.save_images_directory = dir.clone();
    }
    if args.save {
        settings.save_images = true;
    }

    let mut source = open_source(&args.input, &args.raw)?;
    let total = source.frame_count();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Processing");

    let (sink, events) = ChannelSink::new();
    let max_inflight = settings.max_workers.max(1);
    let foreman = Foreman::spawn(settings, source.decoder_factory(), Box::new(sink));
    let stats = stream_source(&foreman, source.as_mut(), &events, max_inflight, |_| pb.inc(1))?;
    pb.finish_with_message("Done");
    foreman.close();

    let failures = stats.processed.iter().filter(|s| !s.stage_success).count();
    let accepted = stats.processed.iter().filter(|s| s.accepted).count();
    println!("\nProcessed: {}", stats.processed.len());
    println!("Missed:    {}", stats.missed);
    println!("Accepted:  {accepted}");
    if failures > 0 {
        println!("Failures:  {failures}");
    }
    Ok(())
}
