//! Public and internal types for the rpnbatch API and pipeline.

use std::fmt;
use std::num::NonZeroUsize;

use anyhow::{Result, bail};

use crate::pipeline::WorkerFault;
use crate::utils::config::{EvaluatorDefaults, ExitStatus, PipelineDefaults};

/// One input line handed from the producer to exactly one consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// 1-based position in the input, counting blank and comment lines.
    pub line_number: u64,
    /// Trimmed line text.
    pub text: String,
}

/// What evaluating a [`WorkItem`] produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success { infix: String, value: Option<i64> },
    Failure { text: String, message: String },
}

/// A consumer's answer for one line. Sorted by `line_number` before output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineResult {
    pub line_number: u64,
    pub outcome: Outcome,
}

impl LineResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failure { .. })
    }
}

/// Output line: `<infix> = <value>` or an `ERROR- ...` line naming the offending input.
impl fmt::Display for LineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Success {
                infix,
                value: Some(v),
            } => write!(f, "{} = {}", infix, v),
            Outcome::Success { infix, value: None } => write!(f, "{}", infix),
            Outcome::Failure { text, message } => write!(
                f,
                "ERROR- Could not parse the input line {} '{}'. Details: {}",
                self.line_number, text, message
            ),
        }
    }
}

/// Full options (CLI and lib).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Number of consumer threads.
    pub worker_threads: usize,
    /// Lines read per batch; also the bound on unacknowledged queued items.
    pub batch_size: usize,
    /// Lines starting with this (after trimming) are skipped.
    pub comment_identifier: String,
    /// Token delimiter inside an expression.
    pub delimiter: char,
    /// Memo capacity of each consumer's evaluator.
    pub cache_size: usize,
    /// Debug tracing.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            worker_threads: PipelineDefaults::WORKER_THREADS,
            batch_size: PipelineDefaults::BATCH_SIZE,
            comment_identifier: PipelineDefaults::COMMENT_IDENTIFIER.to_string(),
            delimiter: EvaluatorDefaults::DELIMITER,
            cache_size: EvaluatorDefaults::CACHE_CAPACITY,
            verbose: false,
        }
    }
}

impl Opts {
    /// Reject configurations the pipeline cannot run with. Called before any thread starts.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads < 1 {
            bail!("worker_threads_count must be a positive number");
        }
        if self.batch_size < 1 {
            bail!("process_limit_size must be a positive number");
        }
        if self.comment_identifier.is_empty() {
            bail!("comment_identifier must not be empty");
        }
        if self.cache_size < 1 {
            bail!("cache_size must be a positive number");
        }
        Ok(())
    }

    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_size).unwrap_or(NonZeroUsize::MIN)
    }
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every batch was drained and emitted.
    Completed,
    /// A producer or consumer failed outside per-item evaluation.
    Faulted(WorkerFault),
    /// Ctrl+C (or the caller's cancel flag) stopped the batch loop.
    Interrupted,
}

impl RunOutcome {
    pub fn exit_status(&self) -> i32 {
        match self {
            RunOutcome::Completed => ExitStatus::SUCCESS,
            RunOutcome::Faulted(_) => ExitStatus::ABORTED,
            RunOutcome::Interrupted => ExitStatus::INTERRUPTED,
        }
    }
}

/// Returned by [`evaluate_lines`](crate::evaluate_lines).
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Lines written to the output.
    pub emitted: usize,
    /// How many of those were `ERROR-` lines.
    pub failures: usize,
    /// Drain/harvest cycles completed.
    pub batches: usize,
    pub outcome: RunOutcome,
}
