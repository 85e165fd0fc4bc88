//! Control block shared by one worker (producer or consumer) and the orchestrator.
//!
//! Pausing is two-phase: the requester sets `pause_requested`, the owner confirms with
//! `paused` and parks until released; the requester only releases after it has seen the
//! confirmation. Each request bumps `pause_epoch` and the owner echoes it back in
//! `confirmed_epoch`, so a request issued right after a release is confirmed again even
//! if the owner never noticed the release. Every mutation notifies the condvar.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Flags guarded by the control block's mutex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    /// Producer: source exhausted. Consumer: orchestrator asked it to finish.
    pub finished: bool,
    /// Owner confirmed a pause.
    pub paused: bool,
    pub pause_requested: bool,
    /// Owner may leave its pause.
    pub continue_signal: bool,
    /// Producer paused itself because the batch limit was reached.
    pub queue_full: bool,
    /// Lines read in the current batch (producer only).
    pub current_line_count: usize,
    /// Orchestrator is shutting down early; parked owners must leave.
    pub stop_requested: bool,
    /// Owner's thread has left its loop (normally or not).
    pub exited: bool,
    /// Bumped by every pause request.
    pub pause_epoch: u64,
    /// Last `pause_epoch` the owner confirmed.
    pub confirmed_epoch: u64,
}

impl ControlState {
    /// The latest pause request is confirmed, or the owner is gone.
    pub fn pause_confirmed(&self) -> bool {
        self.exited || (self.paused && self.confirmed_epoch == self.pause_epoch)
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            finished: false,
            paused: false,
            pause_requested: false,
            continue_signal: true,
            queue_full: false,
            current_line_count: 0,
            stop_requested: false,
            exited: false,
            pause_epoch: 0,
            confirmed_epoch: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct ControlBlock {
    state: Mutex<ControlState>,
    changed: Condvar,
}

impl ControlBlock {
    pub fn new() -> Self {
        Self::default()
    }

    // Flags stay meaningful after a panicking holder, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F: FnOnce(&mut ControlState)>(&self, f: F) {
        let mut state = self.lock();
        f(&mut state);
        self.changed.notify_all();
    }

    pub fn snapshot(&self) -> ControlState {
        *self.lock()
    }

    /// Block until `done` holds or `timeout` elapses. Returns the state seen last.
    pub fn wait_until_timeout<F>(&self, timeout: Duration, mut done: F) -> ControlState
    where
        F: FnMut(&ControlState) -> bool,
    {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| !done(s))
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    // ---- requester side (orchestrator) ----

    pub fn request_pause(&self) {
        self.update(|s| {
            s.pause_requested = true;
            s.continue_signal = false;
            s.pause_epoch += 1;
        });
    }

    /// Block up to `timeout` until the owner confirmed the latest request or has exited.
    /// Returns whether it did.
    pub fn wait_paused(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| !s.pause_confirmed())
            .unwrap_or_else(PoisonError::into_inner);
        guard.pause_confirmed()
    }

    /// Clear the request and let the owner continue.
    pub fn release(&self) {
        self.update(|s| {
            s.pause_requested = false;
            s.paused = false;
            s.continue_signal = true;
        });
    }

    pub fn reset_line_counter(&self) {
        self.update(|s| {
            s.current_line_count = 0;
            s.queue_full = false;
        });
    }

    pub fn request_stop(&self) {
        self.update(|s| s.stop_requested = true);
    }

    // ---- owner side (producer / consumer) ----

    /// If a pause was requested, confirm it and park until released or stopped.
    /// A new request arriving while parked is confirmed too. Returns whether a pause happened.
    pub fn honor_pause(&self) -> bool {
        let mut state = self.lock();
        if !state.pause_requested {
            return false;
        }
        loop {
            state.paused = true;
            state.confirmed_epoch = state.pause_epoch;
            self.changed.notify_all();
            state = self
                .changed
                .wait_while(state, |s| {
                    !s.continue_signal && !s.stop_requested && s.confirmed_epoch == s.pause_epoch
                })
                .unwrap_or_else(PoisonError::into_inner);
            if state.continue_signal || state.stop_requested {
                return true;
            }
        }
    }

    /// Producer backpressure: once `limit` lines were read this batch, mark the queue full,
    /// confirm the pause and park until the orchestrator resumes. Returns whether it paused.
    pub fn pause_if_batch_full(&self, limit: usize) -> bool {
        let mut state = self.lock();
        if state.current_line_count < limit {
            return false;
        }
        state.pause_requested = true;
        state.continue_signal = false;
        state.paused = true;
        state.confirmed_epoch = state.pause_epoch;
        state.queue_full = true;
        self.changed.notify_all();
        let _state = self
            .changed
            .wait_while(state, |s| !s.continue_signal && !s.stop_requested)
            .unwrap_or_else(PoisonError::into_inner);
        true
    }

    pub fn count_line(&self) {
        self.update(|s| s.current_line_count += 1);
    }

    /// Terminal for the producer; for consumers the orchestrator sets it via `set_finished`.
    pub fn mark_finished(&self) {
        self.update(|s| s.finished = true);
    }

    /// The owner left its loop. Also counts as a pause confirmation so nobody waits on it.
    pub fn mark_exited(&self) {
        self.update(|s| {
            s.exited = true;
            s.paused = true;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initial_state() {
        let s = ControlBlock::new().snapshot();
        assert!(s.continue_signal);
        assert!(!s.paused && !s.pause_requested && !s.finished && !s.queue_full);
        assert_eq!(s.current_line_count, 0);
    }

    #[test]
    fn test_honor_pause_without_request_returns_immediately() {
        let ctl = ControlBlock::new();
        assert!(!ctl.honor_pause());
    }

    #[test]
    fn test_request_confirm_release_round_trip() {
        let ctl = Arc::new(ControlBlock::new());
        ctl.request_pause();

        let owner = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || ctl.honor_pause())
        };

        assert!(ctl.wait_paused(Duration::from_secs(5)));
        assert!(ctl.snapshot().paused);
        ctl.release();
        assert!(owner.join().unwrap());
        let s = ctl.snapshot();
        assert!(!s.paused && !s.pause_requested && s.continue_signal);
    }

    #[test]
    fn test_batch_full_pause_sets_queue_full() {
        let ctl = Arc::new(ControlBlock::new());
        ctl.count_line();
        ctl.count_line();

        let owner = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || ctl.pause_if_batch_full(2))
        };

        let seen = ctl.wait_until_timeout(Duration::from_secs(5), |s| s.queue_full);
        assert!(seen.queue_full && seen.paused);
        ctl.reset_line_counter();
        ctl.release();
        assert!(owner.join().unwrap());
        let s = ctl.snapshot();
        assert_eq!(s.current_line_count, 0);
        assert!(!s.queue_full);
    }

    #[test]
    fn test_stop_unparks_owner() {
        let ctl = Arc::new(ControlBlock::new());
        ctl.request_pause();
        let owner = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || ctl.honor_pause())
        };
        assert!(ctl.wait_paused(Duration::from_secs(5)));
        ctl.request_stop();
        assert!(owner.join().unwrap());
    }

    #[test]
    fn test_exited_owner_counts_as_paused() {
        let ctl = ControlBlock::new();
        ctl.mark_exited();
        ctl.request_pause();
        assert!(ctl.wait_paused(Duration::from_millis(10)));
        ctl.release();
        // A second harvest round must not block on an owner that is gone.
        ctl.request_pause();
        assert!(ctl.wait_paused(Duration::from_millis(10)));
    }

    #[test]
    fn test_unconfirmed_pause_times_out() {
        let ctl = ControlBlock::new();
        ctl.request_pause();
        assert!(!ctl.wait_paused(Duration::from_millis(10)));
    }

    #[test]
    fn test_request_right_after_release_is_confirmed() {
        let ctl = Arc::new(ControlBlock::new());
        let owner = {
            let ctl = Arc::clone(&ctl);
            thread::spawn(move || {
                while !ctl.snapshot().stop_requested {
                    ctl.honor_pause();
                    thread::yield_now();
                }
            })
        };

        for round in 0..200 {
            ctl.request_pause();
            assert!(
                ctl.wait_paused(Duration::from_secs(5)),
                "first pause of round {round} not confirmed"
            );
            ctl.release();
            // No gap: the owner may still be parked from the previous request.
            ctl.request_pause();
            assert!(
                ctl.wait_paused(Duration::from_secs(5)),
                "second pause of round {round} not confirmed"
            );
            ctl.release();
        }
        ctl.request_stop();
        owner.join().unwrap();
    }
}
