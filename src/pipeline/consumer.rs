//! Consumer: pops work items, evaluates them, buffers one result per item.
//!
//! The buffer is private to the consumer until the orchestrator harvests it with
//! [`Consumer::get_results`], which pauses the consumer for the duration of the copy.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use super::control::ControlBlock;
use super::error_handler::{FaultSender, WorkerFault};
use super::queue::{Pop, WorkQueue};
use crate::expr::Evaluator;
use crate::utils::config::PipelineTiming;
use crate::{LineResult, Opts, Outcome, WorkItem};

type ResultBuffer = Arc<Mutex<Vec<LineResult>>>;

/// Turns one work item into its result. [`evaluate_item`] unless a test swaps it.
pub(crate) type ItemHandler = fn(&mut Evaluator, WorkItem) -> LineResult;

fn lock_buffer(buffer: &ResultBuffer) -> MutexGuard<'_, Vec<LineResult>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Evaluate one item. Parse failures become a `Failure` result, never an error.
pub fn evaluate_item(evaluator: &mut Evaluator, item: WorkItem) -> LineResult {
    let outcome = match evaluator.evaluate(&item.text) {
        Ok(evaluation) => Outcome::Success {
            infix: evaluation.infix,
            value: evaluation.value,
        },
        Err(err) => Outcome::Failure {
            text: item.text,
            message: err.to_string(),
        },
    };
    LineResult {
        line_number: item.line_number,
        outcome,
    }
}

struct ConsumerContext {
    name: String,
    ctl: Arc<ControlBlock>,
    queue: Arc<WorkQueue>,
    buffer: ResultBuffer,
    wake: Receiver<()>,
    handler: ItemHandler,
}

/// Consumer loop. Returns the number of items processed.
fn consume(ctx: &ConsumerContext, evaluator: &mut Evaluator) -> usize {
    let mut processed = 0_usize;
    loop {
        if ctx.ctl.honor_pause() {
            debug!("{}: pause released", ctx.name);
        }
        let item = match ctx
            .queue
            .pop_or_wake(&ctx.wake, PipelineTiming::QUEUE_POP_TIMEOUT)
        {
            Pop::Item(item) => item,
            Pop::Woken | Pop::TimedOut => {
                if ctx.ctl.snapshot().finished && ctx.queue.queued() == 0 {
                    debug!("{}: finish requested, queue empty", ctx.name);
                    return processed;
                }
                continue;
            }
        };

        debug!("{}: took line {} '{}'", ctx.name, item.line_number, item.text);
        let result = (ctx.handler)(evaluator, item);
        debug!("{}: line {} -> {}", ctx.name, result.line_number, result);
        // Buffer before ack: a drained queue must imply every result is harvestable.
        lock_buffer(&ctx.buffer).push(result);
        ctx.queue.ack();
        processed += 1;
    }
}

/// One member of the consumer pool.
pub struct Consumer {
    name: String,
    ctl: Arc<ControlBlock>,
    buffer: ResultBuffer,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    handler: ItemHandler,
    handle: Option<JoinHandle<()>>,
}

impl Consumer {
    pub fn new(id: usize) -> Self {
        Self::with_handler(id, evaluate_item)
    }

    pub(crate) fn with_handler(id: usize, handler: ItemHandler) -> Self {
        let (wake_tx, wake_rx) = bounded::<()>(1);
        Self {
            name: format!("consumer-{id}"),
            ctl: Arc::new(ControlBlock::new()),
            buffer: Arc::new(Mutex::new(Vec::new())),
            wake_tx,
            wake_rx,
            handler,
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the consumer thread with its own evaluator.
    pub fn start(&mut self, queue: Arc<WorkQueue>, opts: &Opts, faults: FaultSender) -> Result<()> {
        let ctx = ConsumerContext {
            name: self.name.clone(),
            ctl: Arc::clone(&self.ctl),
            queue,
            buffer: Arc::clone(&self.buffer),
            wake: self.wake_rx.clone(),
            handler: self.handler,
        };
        let mut evaluator = Evaluator::new(opts.delimiter, opts.cache_capacity());
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                debug!("{} started", ctx.name);
                match panic::catch_unwind(AssertUnwindSafe(|| consume(&ctx, &mut evaluator))) {
                    Ok(processed) => debug!("{} finished after {} items", ctx.name, processed),
                    Err(payload) => faults.report(WorkerFault::from_panic(&ctx.name, payload)),
                }
                ctx.ctl.mark_exited();
            })
            .with_context(|| format!("spawn {} thread", self.name))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn wake(&self) {
        // Full means a wake-up is already pending.
        let _ = self.wake_tx.try_send(());
    }

    /// Pause, take everything buffered so far, resume. Results are in processing order.
    pub fn get_results(&self) -> Vec<LineResult> {
        self.get_results_until(|| false).unwrap_or_default()
    }

    /// Like [`get_results`](Self::get_results), but while waiting for the pause confirmation
    /// `should_abort` is checked every wake interval. On abort the pause is released and
    /// `None` is returned; the buffer is left untouched.
    pub fn get_results_until<F: FnMut() -> bool>(
        &self,
        mut should_abort: F,
    ) -> Option<Vec<LineResult>> {
        self.ctl.request_pause();
        self.wake();
        while !self.ctl.wait_paused(PipelineTiming::WAKE_INTERVAL) {
            if should_abort() {
                debug!("{}: harvest abandoned", self.name);
                self.ctl.release();
                return None;
            }
        }
        let results = std::mem::take(&mut *lock_buffer(&self.buffer));
        self.ctl.release();
        debug!("{}: harvested {} results", self.name, results.len());
        Some(results)
    }

    /// Let the consumer exit once the queue is empty.
    pub fn set_finished(&self) {
        self.ctl.mark_finished();
        self.wake();
    }

    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("{} thread panicked", self.name))?;
        }
        Ok(())
    }
}
