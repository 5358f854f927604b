use std::cmp::Ordering;
use std::sync::mpsc;

use tracing::info;

use crate::error::{Result, SiftError};
use crate::foreman::{ChannelSink, Foreman, FrameSummary, SinkEvent};
use crate::settings::{ProcessingSettings, QualityFilterType};
use crate::sources::{FrameSource, SourceRead};

/// Outcome of one full pump of a source through a foreman.
pub struct StreamStats {
    pub processed: Vec<FrameSummary>,
    pub missed: u64,
}

/// Drive a non-live source through the foreman until the end of the
/// stream. Blocks until the foreman has drained.
///
/// Frames are pushed only in response to `ready` events, and never more
/// than `max_inflight` at a time. Keeping that bound at or below the
/// worker count guarantees admission: a `ready` credit does not reserve
/// capacity, so pushing on every credit alone can race a lagging
/// completion and lose a frame.
pub fn stream_source<F>(
    foreman: &Foreman,
    source: &mut dyn FrameSource,
    events: &mpsc::Receiver<SinkEvent>,
    max_inflight: usize,
    mut on_frame: F,
) -> Result<StreamStats>
where
    F: FnMut(&FrameSummary),
{
    let max_inflight = max_inflight.max(1);
    foreman.start();
    let mut processed = Vec::new();
    let mut missed = 0u64;
    let mut inflight = 0usize;
    let mut at_end = false;

    loop {
        let event = events
            .recv()
            .map_err(|_| SiftError::Pipeline("coordinator terminated".into()))?;
        match event {
            SinkEvent::Ready => {
                if at_end || inflight >= max_inflight {
                    continue;
                }
                match source.read_frame() {
                    SourceRead::Frame(frame) => {
                        foreman.take_frame(frame);
                        inflight += 1;
                    }
                    SourceRead::EndOfStream => {
                        at_end = true;
                        foreman.stop();
                    }
                    SourceRead::Error(message) => {
                        at_end = true;
                        foreman.stop();
                        // Let in-flight frames drain before surfacing
                        // the error.
                        while let Ok(event) = events.recv() {
                            if matches!(event, SinkEvent::Stopped) {
                                break;
                            }
                        }
                        return Err(SiftError::Source(message));
                    }
                }
            }
            SinkEvent::FrameProcessed(summary) => {
                inflight = inflight.saturating_sub(1);
                on_frame(&summary);
                processed.push(summary);
            }
            SinkEvent::FrameMissed => missed += 1,
            SinkEvent::Stopped => {
                if at_end {
                    break;
                }
            }
            SinkEvent::EndOfStream | SinkEvent::SourceError(_) => {}
        }
    }

    Ok(StreamStats { processed, missed })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TwoPassStage {
    Ranking,
    Saving,
}

pub struct TwoPassOutcome {
    pub total_frames: usize,
    pub minimum_quality: f64,
    pub saved: usize,
}

/// Whole-file acceptance-rate filtering in two passes: rank every frame
/// without saving, derive the quality floor that admits the requested
/// share, then replay the file with minimum-quality filtering and
/// saving enabled.
pub fn filter_whole_file<F>(
    source: &mut dyn FrameSource,
    settings: &ProcessingSettings,
    mut on_progress: F,
) -> Result<TwoPassOutcome>
where
    F: FnMut(TwoPassStage, usize, usize),
{
    if source.is_sequential() {
        return Err(SiftError::Source(
            "whole-file filtering requires a seekable source".into(),
        ));
    }
    let total = source.frame_count();
    if total == 0 {
        return Err(SiftError::EmptySequence);
    }

    let mut ranking = settings.clone();
    ranking.filter_type = QualityFilterType::None;
    ranking.save_images = false;
    ranking.estimate_quality = true;

    let (sink, events) = ChannelSink::new();
    let foreman = Foreman::spawn(ranking, source.decoder_factory(), Box::new(sink));

    if !source.seek(0) {
        return Err(SiftError::Source("source cannot seek to frame 0".into()));
    }
    let max_inflight = settings.max_workers.max(1);
    let mut done = 0usize;
    let stats = stream_source(&foreman, source, &events, max_inflight, |_| {
        done += 1;
        on_progress(TwoPassStage::Ranking, done, total);
    })?;

    let mut qualities: Vec<f64> = stats
        .processed
        .iter()
        .map(|s| f64::from(s.quality))
        .collect();
    qualities.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let count = qualities.len();

    let acceptance = settings.acceptance_percent.min(100) as usize;
    let index = count * (100 - acceptance) / 100;
    if index >= count {
        info!("acceptance rate keeps no frames, skipping the save pass");
        foreman.close();
        return Ok(TwoPassOutcome {
            total_frames: count,
            minimum_quality: f64::INFINITY,
            saved: 0,
        });
    }
    let minimum_quality = qualities[index];
    info!(
        frames = count,
        minimum_quality, "ranking pass complete, replaying with quality floor"
    );

    let mut saving = settings.clone();
    saving.filter_type = QualityFilterType::MinimumQuality;
    saving.minimum_quality = minimum_quality;
    saving.save_images = true;
    foreman.update_settings(saving);

    if !source.seek(0) {
        return Err(SiftError::Source("source cannot seek to frame 0".into()));
    }
    let mut done = 0usize;
    let stats = stream_source(&foreman, source, &events, max_inflight, |_| {
        done += 1;
        on_progress(TwoPassStage::Saving, done, total);
    })?;
    let saved = stats
        .processed
        .iter()
        .filter(|s| s.accepted && s.stage_success)
        .count();

    foreman.close();
    Ok(TwoPassOutcome {
        total_frames: count,
        minimum_quality,
        saved,
    })
}
