//! Bounded FIFO of work items with acknowledgement-based drain tracking.
//!
//! An item counts as outstanding from `push` until a consumer calls `ack`, so
//! `wait_drained` means every dispatched item was processed, not just dequeued.

use anyhow::{Result, bail};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, select};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::WorkItem;

/// Result of [`WorkQueue::pop_or_wake`].
#[derive(Debug)]
pub enum Pop {
    Item(WorkItem),
    /// The consumer's wake channel fired (pause or finish requested).
    Woken,
    TimedOut,
}

pub struct WorkQueue {
    tx: Sender<WorkItem>,
    rx: Receiver<WorkItem>,
    outstanding: Mutex<usize>,
    drained: Condvar,
    closed: AtomicBool,
}

impl WorkQueue {
    /// `capacity` is the batch size: the producer never has more unacknowledged items than that.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded::<WorkItem>(capacity.max(1));
        Self {
            tx,
            rx,
            outstanding: Mutex::new(0),
            drained: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn outstanding_guard(&self) -> MutexGuard<'_, usize> {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: WorkItem) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            bail!("work queue is closed");
        }
        *self.outstanding_guard() += 1;
        if self.tx.send(item).is_err() {
            self.ack();
            bail!("work queue disconnected");
        }
        Ok(())
    }

    /// Dequeue one item, or `None` once `timeout` passes with the queue empty.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<WorkItem> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Dequeue one item, but return early when `wake` fires so the caller can react
    /// to a pause request without waiting out the timeout.
    pub fn pop_or_wake(&self, wake: &Receiver<()>, timeout: Duration) -> Pop {
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(item) => Pop::Item(item),
                Err(_) => Pop::TimedOut,
            },
            recv(wake) -> _ => Pop::Woken,
            default(timeout) => Pop::TimedOut,
        }
    }

    /// Mark one dequeued item as fully processed.
    pub fn ack(&self) {
        let mut outstanding = self.outstanding_guard();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.drained.notify_all();
        }
    }

    /// Items pushed but not yet acknowledged.
    pub fn unacknowledged(&self) -> usize {
        *self.outstanding_guard()
    }

    /// Items still sitting in the channel (not yet dequeued).
    pub fn queued(&self) -> usize {
        self.rx.len()
    }

    /// Block up to `timeout` for the drain. Returns whether the queue is drained.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let guard = self.outstanding_guard();
        let (guard, _) = self
            .drained
            .wait_timeout_while(guard, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }

    /// Refuse further pushes. Items already queued can still be popped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
