use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use crate::context::{ProcessingContext, Stage};
use crate::pixels::Decoded;
use crate::settings::ProcessingSettings;
use crate::sources::RawFrame;

/// Messages processed serially by the coordinator's dispatcher thread.
/// Workers and the flusher post messages instead of touching coordinator
/// state.
pub(super) enum ForemanMsg {
    Start,
    Stop,
    RenderNextFrame,
    UpdateSettings(Arc<ProcessingSettings>),
    FrameReady(RawFrame),
    SourceError(String),
    EndOfStream,
    Completion(Box<ProcessingContext>),
    FlushDone {
        buffers: Vec<Decoded>,
        success: bool,
    },
    Close,
}

/// Events the coordinator delivers synchronously on its dispatcher
/// thread.
///
/// `frame_processed` borrows the context for the duration of the call
/// only; the coordinator returns it to the pool immediately afterwards.
/// Handlers may invoke [`ForemanHandle`](super::ForemanHandle) methods,
/// which merely enqueue messages.
pub trait FrameSink: Send {
    /// Capacity is available; a throttled source may push its next
    /// frame.
    fn ready(&mut self) {}

    fn frame_processed(&mut self, _ctx: &ProcessingContext) {}

    /// Admission refused; the frame was dropped. A metric, not an error.
    fn frame_missed(&mut self) {}

    /// Drain complete: no in-flight frames remain and the filter queue
    /// has been flushed.
    fn stopped(&mut self) {}

    fn end_of_stream(&mut self) {}

    fn source_error(&mut self, _message: &str) {}
}

/// Sink that ignores every event.
pub struct NoOpSink;
impl FrameSink for NoOpSink {}

/// Owned snapshot of a processed frame, suitable for crossing threads.
#[derive(Clone, Debug)]
pub struct FrameSummary {
    pub quality: f32,
    pub accepted: bool,
    pub stage_success: bool,
    pub failed_stage: Option<Stage>,
    pub error_message: Option<String>,
    pub completed_stages: Vec<Stage>,
    pub filename: PathBuf,
    pub rendered: bool,
}

impl FrameSummary {
    pub fn of(ctx: &ProcessingContext) -> Self {
        Self {
            quality: ctx.quality,
            accepted: ctx.accepted,
            stage_success: ctx.stage_success,
            failed_stage: ctx.failed_stage(),
            error_message: ctx.error.as_ref().map(|e| e.message.clone()),
            completed_stages: ctx.completed_stages.clone(),
            filename: ctx.filename.clone(),
            rendered: ctx.rendered.is_some(),
        }
    }
}

/// Coordinator events forwarded over a channel.
#[derive(Clone, Debug)]
pub enum SinkEvent {
    Ready,
    FrameProcessed(FrameSummary),
    FrameMissed,
    Stopped,
    EndOfStream,
    SourceError(String),
}

/// Sink that forwards every event over an mpsc channel, for controllers
/// living on another thread.
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn ready(&mut self) {
        let _ = self.tx.send(SinkEvent::Ready);
    }

    fn frame_processed(&mut self, ctx: &ProcessingContext) {
        let _ = self.tx.send(SinkEvent::FrameProcessed(FrameSummary::of(ctx)));
    }

    fn frame_missed(&mut self) {
        let _ = self.tx.send(SinkEvent::FrameMissed);
    }

    fn stopped(&mut self) {
        let _ = self.tx.send(SinkEvent::Stopped);
    }

    fn end_of_stream(&mut self) {
        let _ = self.tx.send(SinkEvent::EndOfStream);
    }

    fn source_error(&mut self, message: &str) {
        let _ = self.tx.send(SinkEvent::SourceError(message.to_string()));
    }
}
