mod flush;
mod messages;
mod workers;

pub use flush::{flush_batch, QueuedImage};
pub use messages::{ChannelSink, FrameSink, FrameSummary, NoOpSink, SinkEvent};

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::context::Stage;
use crate::pool::{ContextPool, ImagePool};
use crate::settings::{ProcessingSettings, QualityFilterType};
use crate::sources::{DecoderFactory, RawFrame};

use messages::ForemanMsg;
use workers::WorkerPool;

/// The coordinator: admits frames from a source, dispatches them onto
/// the worker pool, recycles contexts and image buffers, batches
/// acceptance-rate saves, and drains cleanly on stop.
///
/// All mutable state lives on a dedicated dispatcher thread that
/// consumes a single message queue; handles and workers only enqueue.
/// Dropping (or [`close`](Self::close)-ing) the foreman drains in-flight
/// work, flushes the filter queue and joins every thread.
pub struct Foreman {
    tx: mpsc::Sender<ForemanMsg>,
    thread: Option<JoinHandle<()>>,
}

impl Foreman {
    pub fn spawn(
        settings: ProcessingSettings,
        decoders: Box<dyn DecoderFactory>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let dispatcher_tx = tx.clone();
        let thread = std::thread::Builder::new()
            .name("framesift-foreman".into())
            .spawn(move || {
                Dispatcher::new(settings, decoders, sink, dispatcher_tx).run(rx);
            })
            .expect("spawn foreman thread");
        Self {
            tx,
            thread: Some(thread),
        }
    }

    /// A cloneable handle for sources and controllers on other threads.
    pub fn handle(&self) -> ForemanHandle {
        ForemanHandle {
            tx: self.tx.clone(),
        }
    }

    /// Begin accepting and fully processing frames.
    pub fn start(&self) {
        let _ = self.tx.send(ForemanMsg::Start);
    }

    /// Stop admitting frames. Returns immediately; `stopped` is emitted
    /// once in-flight frames complete and the filter queue is flushed.
    pub fn stop(&self) {
        let _ = self.tx.send(ForemanMsg::Stop);
    }

    /// Render the next admitted frame. Idempotent until that frame
    /// arrives; outside of started processing the pipeline
    /// short-circuits after Render.
    pub fn render_next_frame(&self) {
        let _ = self.tx.send(ForemanMsg::RenderNextFrame);
    }

    /// Install a new settings snapshot for frames admitted from now on.
    /// In-flight frames keep the snapshot they were admitted with.
    pub fn update_settings(&self, settings: ProcessingSettings) {
        let _ = self
            .tx
            .send(ForemanMsg::UpdateSettings(Arc::new(settings)));
    }

    /// Offer a frame for admission. Dropped with a `frame_missed` event
    /// when the pipeline is saturated or processing is not active.
    pub fn take_frame(&self, frame: RawFrame) {
        let _ = self.tx.send(ForemanMsg::FrameReady(frame));
    }

    /// Drain and shut down, blocking until every thread has exited.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(ForemanMsg::Close);
            let _ = thread.join();
        }
    }
}

impl Drop for Foreman {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable front for [`Foreman`]; every method just enqueues a
/// message.
#[derive(Clone)]
pub struct ForemanHandle {
    tx: mpsc::Sender<ForemanMsg>,
}

impl ForemanHandle {
    pub fn take_frame(&self, frame: RawFrame) {
        let _ = self.tx.send(ForemanMsg::FrameReady(frame));
    }

    pub fn source_error(&self, message: String) {
        let _ = self.tx.send(ForemanMsg::SourceError(message));
    }

    pub fn end_of_stream(&self) {
        let _ = self.tx.send(ForemanMsg::EndOfStream);
    }

    pub fn render_next_frame(&self) {
        let _ = self.tx.send(ForemanMsg::RenderNextFrame);
    }
}

struct Dispatcher {
    sink: Box<dyn FrameSink>,
    settings: Arc<ProcessingSettings>,
    pool: WorkerPool,
    contexts: ContextPool,
    images: ImagePool,
    filter_queue: Vec<QueuedImage>,
    flush_in_flight: bool,
    started: bool,
    render_once: bool,
    quit: bool,
    running_jobs: usize,
    missed_frames: u64,
    tx: mpsc::Sender<ForemanMsg>,
}

impl Dispatcher {
    fn new(
        settings: ProcessingSettings,
        decoders: Box<dyn DecoderFactory>,
        sink: Box<dyn FrameSink>,
        tx: mpsc::Sender<ForemanMsg>,
    ) -> Self {
        let max_workers = settings.max_workers.max(1);
        let lease_cap = settings.overcommit_factor.max(1) * max_workers;
        let queue_cap = settings.filter_queue_length.max(1);
        Self {
            sink,
            settings: Arc::new(settings),
            pool: WorkerPool::spawn(max_workers, tx.clone()),
            contexts: ContextPool::new(lease_cap, decoders),
            images: ImagePool::new(queue_cap),
            filter_queue: Vec::new(),
            flush_in_flight: false,
            started: false,
            render_once: false,
            quit: false,
            running_jobs: 0,
            missed_frames: 0,
            tx,
        }
    }

    fn run(mut self, rx: mpsc::Receiver<ForemanMsg>) {
        while let Ok(msg) = rx.recv() {
            self.dispatch(msg);
            if self.quit && self.drained() {
                break;
            }
        }
        self.pool.shutdown();
    }

    fn dispatch(&mut self, msg: ForemanMsg) {
        match msg {
            ForemanMsg::Start => {
                self.started = true;
                self.signal_ready();
            }
            ForemanMsg::Stop => {
                self.started = false;
                self.maybe_finish_drain();
            }
            ForemanMsg::RenderNextFrame => self.render_once = true,
            ForemanMsg::UpdateSettings(settings) => self.settings = settings,
            ForemanMsg::FrameReady(frame) => self.take_frame(frame),
            ForemanMsg::Completion(ctx) => self.handle_completion(ctx),
            ForemanMsg::FlushDone { buffers, success } => {
                self.handle_flush_done(buffers, success)
            }
            ForemanMsg::SourceError(message) => {
                warn!(message = %message, "source reported an error");
                self.started = false;
                self.sink.source_error(&message);
                self.maybe_finish_drain();
            }
            ForemanMsg::EndOfStream => self.sink.end_of_stream(),
            ForemanMsg::Close => {
                self.quit = true;
                self.started = false;
                self.maybe_finish_drain();
            }
        }
    }

    /// Admission: processing (or a one-shot render) must be requested
    /// and the pool must have headroom. The two-sided capacity check
    /// guards against completions lagging behind worker availability.
    fn take_frame(&mut self, frame: RawFrame) {
        if !(self.started || self.render_once) || !self.has_idle_capacity() {
            self.missed_frames += 1;
            debug!(total_missed = self.missed_frames, "dropped frame");
            self.sink.frame_missed();
            return;
        }

        let mut ctx = self.contexts.acquire(Arc::clone(&self.settings));
        ctx.do_render = self.render_once;
        self.render_once = false;
        ctx.only_render = ctx.do_render && !self.started;
        ctx.raw_frame = Some(frame);

        self.running_jobs += 1;
        self.pool.submit(ctx);
        self.signal_ready();
    }

    fn handle_completion(&mut self, mut ctx: Box<crate::context::ProcessingContext>) {
        self.running_jobs -= 1;

        if !ctx.stage_success {
            if let Some(error) = &ctx.error {
                warn!(stage = %error.stage, message = %error.message, "processing stage failed");
                if error.stage == Stage::Save {
                    self.disable_saving();
                }
            }
        }

        // Queue insertion is judged against the snapshot the frame ran
        // with, not the current settings.
        if ctx.settings.save_images
            && ctx.settings.filter_type == QualityFilterType::AcceptanceRate
            && ctx.stage_success
        {
            if let Some(image) = ctx.cloned.take() {
                self.filter_queue.push(QueuedImage {
                    image,
                    filename: ctx.filename.clone(),
                    quality: ctx.quality,
                });
                // Swap a recycled buffer into the context for its next
                // deep copy.
                ctx.cloned = self.images.acquire();
            }
        }

        self.sink.frame_processed(&ctx);
        self.contexts.release(ctx);

        if self.filter_queue.len() >= self.settings.filter_queue_length.max(1) {
            self.try_flush();
        }

        if !self.started && self.running_jobs == 0 {
            self.maybe_finish_drain();
        } else {
            self.signal_ready();
        }
    }

    fn handle_flush_done(&mut self, buffers: Vec<crate::pixels::Decoded>, success: bool) {
        self.flush_in_flight = false;
        for buffer in buffers {
            self.images.release(buffer);
        }
        if !success {
            self.disable_saving();
        }
        if self.filter_queue.len() >= self.settings.filter_queue_length.max(1) {
            self.try_flush();
        }
        self.maybe_finish_drain();
    }

    /// Drain epilogue: once nothing is in flight, flush whatever remains
    /// in the filter queue, and declare `stopped` when the queue and the
    /// flusher are both empty.
    fn maybe_finish_drain(&mut self) {
        if self.started || self.running_jobs > 0 {
            return;
        }
        if !self.filter_queue.is_empty() && !self.flush_in_flight {
            self.try_flush();
        }
        if self.flush_in_flight || !self.filter_queue.is_empty() {
            return;
        }
        if !self.quit {
            info!(missed = self.missed_frames, "processing drained");
            self.sink.stopped();
        }
    }

    fn try_flush(&mut self) {
        if self.flush_in_flight || self.filter_queue.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.filter_queue);
        self.flush_in_flight = true;
        debug!(batch = batch.len(), "starting filter queue flush");
        flush::spawn_flush(batch, self.settings.acceptance_percent, self.tx.clone());
    }

    /// Write failures disable saving for frames admitted from now on;
    /// in-flight frames keep their snapshot.
    fn disable_saving(&mut self) {
        if !self.settings.save_images {
            return;
        }
        warn!("error writing image, saving disabled");
        let mut settings = (*self.settings).clone();
        settings.save_images = false;
        self.settings = Arc::new(settings);
    }

    fn has_idle_capacity(&self) -> bool {
        let max = self.pool.max_workers();
        self.pool.active_workers() < max
            && self.running_jobs < self.settings.overcommit_factor.max(1) * max
    }

    fn signal_ready(&mut self) {
        if self.started && self.has_idle_capacity() {
            self.sink.ready();
        }
    }

    fn drained(&self) -> bool {
        self.running_jobs == 0 && !self.flush_in_flight && self.filter_queue.is_empty()
    }
}
