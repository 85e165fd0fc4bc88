//! Pipeline components: control blocks, work queue, producer, consumers, orchestrator.

pub mod consumer;
pub mod control;
pub mod error_handler;
pub mod orchestrator;
pub mod producer;
pub mod queue;
pub mod source;

pub use consumer::{Consumer, evaluate_item};
pub use control::{ControlBlock, ControlState};
pub use error_handler::{FaultReceiver, FaultSender, WorkerFault, fault_channel};
pub use orchestrator::Orchestrator;
pub use producer::Producer;
pub use queue::{Pop, WorkQueue};
pub use source::{LineSource, lines_from};
