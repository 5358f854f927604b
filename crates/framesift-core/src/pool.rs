use std::sync::Arc;

use crate::context::ProcessingContext;
use crate::pixels::Decoded;
use crate::settings::ProcessingSettings;
use crate::sources::DecoderFactory;

/// Bounded free list of processing contexts. Only the coordinator's
/// dispatcher thread touches it, so no locking is involved. Steady-state
/// size equals peak concurrency; contexts released beyond the capacity
/// are dropped.
pub struct ContextPool {
    free: Vec<Box<ProcessingContext>>,
    capacity: usize,
    decoders: Box<dyn DecoderFactory>,
}

impl ContextPool {
    pub fn new(capacity: usize, decoders: Box<dyn DecoderFactory>) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            decoders,
        }
    }

    /// Pop a reset context, or build a fresh one with its own decoder.
    pub fn acquire(&mut self, settings: Arc<ProcessingSettings>) -> Box<ProcessingContext> {
        match self.free.pop() {
            Some(mut ctx) => {
                ctx.reset(settings);
                ctx
            }
            None => {
                let mut ctx = Box::new(ProcessingContext::new(settings));
                ctx.decoder = Some(self.decoders.create_decoder());
                ctx
            }
        }
    }

    pub fn release(&mut self, ctx: Box<ProcessingContext>) {
        if self.free.len() < self.capacity {
            self.free.push(ctx);
        }
    }

    pub fn pooled(&self) -> usize {
        self.free.len()
    }
}

/// Bounded free list of image buffers recycled between the filter queue
/// and contexts doing acceptance-rate deep copies.
pub struct ImagePool {
    free: Vec<Decoded>,
    capacity: usize,
}

impl ImagePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn acquire(&mut self) -> Option<Decoded> {
        self.free.pop()
    }

    pub fn release(&mut self, image: Decoded) {
        if self.free.len() < self.capacity {
            self.free.push(image);
        }
    }
}
