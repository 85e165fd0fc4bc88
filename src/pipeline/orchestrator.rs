//! Orchestrator: runs the batch loop over one producer and a pool of consumers.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::pipeline::{
    Consumer, FaultReceiver, LineSource, Producer, WorkQueue, WorkerFault, fault_channel,
};
use crate::utils::config::PipelineTiming;
use crate::{LineResult, Opts, RunOutcome, RunSummary};

/// Counters kept while emitting batches.
#[derive(Default)]
struct Emitted {
    lines: usize,
    failures: usize,
    batches: usize,
}

/// Why the batch loop stopped before the producer finished.
fn check_abort(faults: &FaultReceiver, cancel: &AtomicBool) -> Option<RunOutcome> {
    if let Some(fault) = faults.poll() {
        error!("Detected a fault in {}. Details: {}", fault.unit, fault.message);
        return Some(RunOutcome::Faulted(fault));
    }
    if cancel.load(Ordering::Relaxed) {
        info!("Interrupt received, shutting down.");
        return Some(RunOutcome::Interrupted);
    }
    None
}

/// Owns the producer and consumer pool for one run: batch loop, ordered emission, shutdown.
pub struct Orchestrator<'a> {
    opts: &'a Opts,
    cancel: Arc<AtomicBool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(opts: &'a Opts) -> Self {
        Self {
            opts,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a caller-owned flag (e.g. set by a Ctrl+C handler) to interrupt the run.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the pipeline over `source`, writing one line per expression to `out` in input order.
    /// Configuration errors are returned before any thread starts; faults and interrupts are
    /// reported in the summary. Shutdown always runs.
    pub fn run<S, W>(&self, source: S, out: &mut W) -> Result<RunSummary>
    where
        S: LineSource + 'static,
        W: Write,
    {
        let consumers: Vec<Consumer> = (1..=self.opts.worker_threads)
            .map(Consumer::new)
            .collect();
        self.run_with(source, out, consumers)
    }

    fn run_with<S, W>(
        &self,
        source: S,
        out: &mut W,
        mut consumers: Vec<Consumer>,
    ) -> Result<RunSummary>
    where
        S: LineSource + 'static,
        W: Write,
    {
        self.opts.validate()?;
        debug!(
            "Number of worker threads is set to {}, batch size {}.",
            self.opts.worker_threads, self.opts.batch_size
        );

        let queue = Arc::new(WorkQueue::new(self.opts.batch_size));
        let (fault_tx, faults) = fault_channel();
        let mut producer = Producer::new(Arc::clone(&queue), self.opts, fault_tx.clone());

        let mut emitted = Emitted::default();
        let loop_result = self
            .start_units(&mut producer, &mut consumers, &queue, source, &fault_tx)
            .and_then(|()| self.batch_loop(&producer, &consumers, &queue, &faults, out, &mut emitted));

        let aborted = !matches!(loop_result, Ok(RunOutcome::Completed));
        shutdown(&mut producer, &mut consumers, &queue, &faults, aborted);

        Ok(RunSummary {
            emitted: emitted.lines,
            failures: emitted.failures,
            batches: emitted.batches,
            outcome: loop_result?,
        })
    }

    fn start_units<S: LineSource + 'static>(
        &self,
        producer: &mut Producer,
        consumers: &mut [Consumer],
        queue: &Arc<WorkQueue>,
        source: S,
        faults: &crate::pipeline::FaultSender,
    ) -> Result<()> {
        producer.start(source)?;
        for consumer in consumers.iter_mut() {
            consumer.start(Arc::clone(queue), self.opts, faults.clone())?;
        }
        Ok(())
    }

    /// Repeat until the producer finishes: wait for a batch boundary, wait for the drain,
    /// harvest every consumer, sort by line number, emit, then resume the producer.
    fn batch_loop<W: Write>(
        &self,
        producer: &Producer,
        consumers: &[Consumer],
        queue: &WorkQueue,
        faults: &FaultReceiver,
        out: &mut W,
        emitted: &mut Emitted,
    ) -> Result<RunOutcome> {
        loop {
            if let Some(outcome) = check_abort(faults, &self.cancel) {
                return Ok(outcome);
            }

            let state = producer.wait_for_boundary(PipelineTiming::WAKE_INTERVAL);
            if state.exited && !state.finished {
                // The producer reports before it exits; a missing report is still a fault.
                let fault = faults
                    .poll()
                    .unwrap_or_else(|| WorkerFault::new("producer", "exited before finishing"));
                error!("Detected a fault in {}. Details: {}", fault.unit, fault.message);
                return Ok(RunOutcome::Faulted(fault));
            }
            if !state.queue_full && !state.finished {
                continue;
            }
            debug!(
                "Batch {}: producer {}",
                emitted.batches + 1,
                if state.finished {
                    "finished"
                } else {
                    "hit the batch limit"
                }
            );

            if let Some(outcome) = self.wait_for_drain(queue, faults) {
                return Ok(outcome);
            }

            let mut results: Vec<LineResult> = Vec::new();
            for consumer in consumers {
                let mut abort = None;
                let harvested = consumer.get_results_until(|| {
                    abort = check_abort(faults, &self.cancel);
                    abort.is_some()
                });
                match harvested {
                    Some(batch) => results.extend(batch),
                    None => return Ok(abort.unwrap_or(RunOutcome::Interrupted)),
                }
            }
            results.sort_by_key(|r| r.line_number);
            emit(out, &results, emitted)?;
            emitted.batches += 1;

            if state.finished {
                debug!("Producer finished; that was the final batch.");
                return Ok(RunOutcome::Completed);
            }
            producer.reset_line_counter();
            producer.resume();
        }
    }

    /// Block until every queued item has been acknowledged, unless a fault or interrupt comes first.
    fn wait_for_drain(&self, queue: &WorkQueue, faults: &FaultReceiver) -> Option<RunOutcome> {
        loop {
            if queue.wait_drained(PipelineTiming::WAKE_INTERVAL) {
                return None;
            }
            debug!(
                "Waiting for {} queue item(s) to be processed.",
                queue.unacknowledged()
            );
            if let Some(outcome) = check_abort(faults, &self.cancel) {
                return Some(outcome);
            }
        }
    }
}

fn emit<W: Write>(out: &mut W, results: &[LineResult], emitted: &mut Emitted) -> Result<()> {
    for result in results {
        debug!("line {}:", result.line_number);
        writeln!(out, "{}", result).context("write result")?;
        emitted.lines += 1;
        if result.is_failure() {
            emitted.failures += 1;
        }
    }
    out.flush().context("flush results")?;
    Ok(())
}

/// Join the producer, finish and join consumers, close the queue. Runs on every exit path.
fn shutdown(
    producer: &mut Producer,
    consumers: &mut [Consumer],
    queue: &WorkQueue,
    faults: &FaultReceiver,
    aborted: bool,
) {
    debug!("Cleanup ...");
    if aborted {
        producer.stop();
    }
    debug!("Waiting for producer to join.");
    if let Err(e) = producer.join() {
        error!("{e:#}");
    }

    debug!("Sending finish signal to consumers.");
    for consumer in consumers.iter() {
        consumer.set_finished();
    }
    debug!("Waiting for consumers to join.");
    for consumer in consumers.iter_mut() {
        if let Err(e) = consumer.join() {
            error!("{e:#}");
        }
    }

    queue.close();
    let left = queue.unacknowledged();
    if left > 0 {
        warn!("{} work item(s) were never processed", left);
    } else {
        debug!("Work queue drained and closed.");
    }
    for fault in faults.drain() {
        warn!("Fault after shutdown started in {}: {}", fault.unit, fault.message);
    }
}
