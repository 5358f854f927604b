use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::mpsc;

use tracing::{debug, warn};

use crate::io::image_io;
use crate::pixels::Decoded;

use super::messages::ForemanMsg;

/// A frame parked in the filter queue until its batch is ranked: the
/// deep-copied cropped image, its destination and its quality.
pub struct QueuedImage {
    pub image: Decoded,
    pub filename: PathBuf,
    pub quality: f32,
}

/// Write a ranked batch on a detached thread and report back to the
/// dispatcher. The coordinator allows one outstanding flush at a time.
pub(super) fn spawn_flush(
    batch: Vec<QueuedImage>,
    acceptance_percent: u32,
    tx: mpsc::Sender<ForemanMsg>,
) {
    std::thread::Builder::new()
        .name("framesift-flush".into())
        .spawn(move || {
            let (buffers, success) = flush_batch(batch, acceptance_percent);
            let _ = tx.send(ForemanMsg::FlushDone { buffers, success });
        })
        .expect("spawn flush thread");
}

/// Rank the batch by quality and write the best `acceptance_percent` of
/// it. Returns every image buffer for pool recycling plus a success
/// flag covering all writes.
pub fn flush_batch(mut batch: Vec<QueuedImage>, acceptance_percent: u32) -> (Vec<Decoded>, bool) {
    batch.sort_by(|a, b| {
        a.quality
            .partial_cmp(&b.quality)
            .unwrap_or(Ordering::Equal)
    });
    let keep = keep_count(batch.len(), acceptance_percent);
    let first_kept = batch.len() - keep;

    let mut success = true;
    for queued in &batch[first_kept..] {
        match image_io::write_image_atomic(&queued.image, &queued.filename) {
            Ok(()) => debug!(file = %queued.filename.display(), quality = queued.quality, "wrote queued frame"),
            Err(e) => {
                warn!(file = %queued.filename.display(), error = %e, "failed to write queued frame");
                success = false;
            }
        }
    }
    debug!(
        written = keep,
        dropped = first_kept,
        "filter queue flushed"
    );
    (batch.into_iter().map(|q| q.image).collect(), success)
}

/// Number of images a batch of `total` keeps at the given acceptance
/// percentage: `ceil(total * percent / 100)`.
pub(super) fn keep_count(total: usize, acceptance_percent: u32) -> usize {
    let percent = u64::from(acceptance_percent.min(100));
    ((total as u64 * percent).div_ceil(100)) as usize
}
