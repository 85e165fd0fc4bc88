//! Exception channel: unit-level failures from producer and consumers, surfaced to the orchestrator.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::any::Any;
use std::fmt;

/// A producer or consumer failed outside per-item evaluation. Ends the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerFault {
    /// e.g. `producer`, `consumer-2`.
    pub unit: String,
    pub message: String,
}

impl fmt::Display for WorkerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.message)
    }
}

impl std::error::Error for WorkerFault {}

impl WorkerFault {
    pub fn new(unit: &str, message: impl Into<String>) -> Self {
        Self {
            unit: unit.to_string(),
            message: message.into(),
        }
    }

    /// Fault for a unit whose thread panicked.
    pub fn from_panic(unit: &str, payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::new(unit, format!("panicked: {message}"))
    }
}

/// Sending half handed to every unit.
#[derive(Clone)]
pub struct FaultSender(Sender<WorkerFault>);

impl FaultSender {
    pub fn report(&self, fault: WorkerFault) {
        log::debug!("{} reported a fault: {}", fault.unit, fault.message);
        // Receiver outlives all units; a failed send only happens after the run is over.
        let _ = self.0.send(fault);
    }
}

/// Receiving half kept by the orchestrator.
pub struct FaultReceiver(Receiver<WorkerFault>);

impl FaultReceiver {
    /// First pending fault, if any. Never blocks.
    pub fn poll(&self) -> Option<WorkerFault> {
        self.0.try_recv().ok()
    }

    /// Everything still queued (used after joining units to log late faults).
    pub fn drain(&self) -> Vec<WorkerFault> {
        self.0.try_iter().collect()
    }
}

pub fn fault_channel() -> (FaultSender, FaultReceiver) {
    let (tx, rx) = unbounded::<WorkerFault>();
    (FaultSender(tx), FaultReceiver(rx))
}
