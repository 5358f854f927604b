use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::context::ProcessingContext;
use crate::stages;

use super::messages::ForemanMsg;

/// Fixed-size pool of worker threads running the stage sequence.
///
/// Workers pull jobs from a shared channel and post completions back to
/// the dispatcher. `active_workers` counts workers currently inside the
/// stage sequence; it is decremented before the completion message is
/// sent, so a finished worker never blocks the admission check while its
/// completion waits in the dispatcher queue.
pub(super) struct WorkerPool {
    job_tx: Option<mpsc::Sender<Box<ProcessingContext>>>,
    active: Arc<AtomicUsize>,
    max_workers: usize,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(max_workers: usize, completions: mpsc::Sender<ForemanMsg>) -> Self {
        let max_workers = max_workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<Box<ProcessingContext>>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let active = Arc::new(AtomicUsize::new(0));

        let threads = (0..max_workers)
            .map(|index| {
                let job_rx = Arc::clone(&job_rx);
                let active = Arc::clone(&active);
                let completions = completions.clone();
                std::thread::Builder::new()
                    .name(format!("framesift-worker-{index}"))
                    .spawn(move || loop {
                        let job = {
                            let rx = job_rx.lock().expect("worker queue lock");
                            match rx.recv() {
                                Ok(job) => job,
                                Err(_) => break,
                            }
                        };
                        active.fetch_add(1, Ordering::SeqCst);
                        let done = stages::process(job);
                        active.fetch_sub(1, Ordering::SeqCst);
                        if completions.send(ForemanMsg::Completion(done)).is_err() {
                            break;
                        }
                    })
                    .expect("spawn worker thread")
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            active,
            max_workers,
            threads,
        }
    }

    pub fn submit(&self, ctx: Box<ProcessingContext>) {
        if let Some(tx) = &self.job_tx {
            let _ = tx.send(ctx);
        }
    }

    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Close the job channel and join every worker.
    pub fn shutdown(&mut self) {
        self.job_tx = None;
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
