//! Producer: reads the line source in order, numbers every line, queues the expressions.
//!
//! After `batch_size` lines it pauses itself (`queue_full`) until the orchestrator has
//! drained, harvested and resumed it. That bounds the queue independent of input size.

use anyhow::{Context, Result};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::control::{ControlBlock, ControlState};
use super::error_handler::{FaultSender, WorkerFault};
use super::queue::WorkQueue;
use super::source::LineSource;
use crate::{Opts, WorkItem};

const UNIT: &str = "producer";

/// What the producer thread needs; moved into the thread on `start`.
struct ProducerContext {
    ctl: Arc<ControlBlock>,
    queue: Arc<WorkQueue>,
    batch_size: usize,
    comment_identifier: String,
}

/// Line classification: only expressions reach the queue.
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Comment,
    Expression(&'a str),
}

fn classify<'a>(raw: &'a str, comment_identifier: &str) -> LineKind<'a> {
    let text = raw.trim();
    if text.is_empty() {
        LineKind::Blank
    } else if text.starts_with(comment_identifier) {
        LineKind::Comment
    } else {
        LineKind::Expression(text)
    }
}

/// Producer loop. Returns the number of lines read.
fn produce<S: LineSource>(source: &mut S, ctx: &ProducerContext) -> Result<u64> {
    let mut line_number = 0_u64;
    while let Some(raw) = source.next_line()? {
        if ctx.ctl.pause_if_batch_full(ctx.batch_size) {
            debug!("Producer: batch limit {} reached, resumed", ctx.batch_size);
        }
        if ctx.ctl.honor_pause() {
            debug!("Producer: external pause released");
        }
        if ctx.ctl.snapshot().stop_requested {
            debug!("Producer: stop requested after {} lines", line_number);
            break;
        }

        line_number += 1;
        match classify(&raw, &ctx.comment_identifier) {
            LineKind::Blank => debug!("Producer: line {} is empty, ignored", line_number),
            LineKind::Comment => debug!("Producer: line {} is a comment, ignored", line_number),
            LineKind::Expression(text) => {
                ctx.queue
                    .push(WorkItem {
                        line_number,
                        text: text.to_string(),
                    })
                    .with_context(|| format!("queue line {line_number}"))?;
                debug!("Producer: queued line {} '{}'", line_number, text);
            }
        }
        ctx.ctl.count_line();
    }
    Ok(line_number)
}

/// Single producer feeding the work queue.
pub struct Producer {
    ctl: Arc<ControlBlock>,
    queue: Arc<WorkQueue>,
    batch_size: usize,
    comment_identifier: String,
    faults: FaultSender,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    pub fn new(queue: Arc<WorkQueue>, opts: &Opts, faults: FaultSender) -> Self {
        Self {
            ctl: Arc::new(ControlBlock::new()),
            queue,
            batch_size: opts.batch_size,
            comment_identifier: opts.comment_identifier.clone(),
            faults,
            handle: None,
        }
    }

    /// Spawn the producer thread over `source`. Read errors and panics go to the fault channel.
    pub fn start<S: LineSource + 'static>(&mut self, mut source: S) -> Result<()> {
        let ctx = ProducerContext {
            ctl: Arc::clone(&self.ctl),
            queue: Arc::clone(&self.queue),
            batch_size: self.batch_size,
            comment_identifier: self.comment_identifier.clone(),
        };
        let faults = self.faults.clone();
        let handle = thread::Builder::new()
            .name(UNIT.to_string())
            .spawn(move || {
                debug!("Producer started");
                match panic::catch_unwind(AssertUnwindSafe(|| produce(&mut source, &ctx))) {
                    Ok(Ok(lines)) => {
                        debug!("Producer finished after {} lines", lines);
                        ctx.ctl.mark_finished();
                    }
                    Ok(Err(e)) => faults.report(WorkerFault::new(UNIT, format!("{e:#}"))),
                    Err(payload) => faults.report(WorkerFault::from_panic(UNIT, payload)),
                }
                ctx.ctl.mark_exited();
            })
            .context("spawn producer thread")?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the producer to pause before its next line. It confirms via `paused`.
    pub fn pause(&self) {
        debug!("Producer: pause requested");
        self.ctl.request_pause();
    }

    pub fn resume(&self) {
        debug!("Producer: resume");
        self.ctl.release();
    }

    pub fn reset_line_counter(&self) {
        self.ctl.reset_line_counter();
    }

    /// Make the producer leave any pause and stop reading. Used when aborting.
    pub fn stop(&self) {
        self.ctl.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.ctl.snapshot().finished
    }

    pub fn is_paused(&self) -> bool {
        self.ctl.snapshot().paused
    }

    pub fn hit_batch_limit(&self) -> bool {
        self.ctl.snapshot().queue_full
    }

    /// Wait up to `timeout` for a batch boundary: batch full, finished, or the thread gone.
    pub fn wait_for_boundary(&self, timeout: Duration) -> ControlState {
        self.ctl
            .wait_until_timeout(timeout, |s| s.queue_full || s.finished || s.exited)
    }

    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
        }
        Ok(())
    }
}
