//! Application configuration constants.
//! Defaults, tuning and exit codes in one place.

use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional settings file looked up next to the input file (e.g. `.rpnbatch.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Pipeline ----

/// Defaults for the batch pipeline (CLI and lib).
pub struct PipelineDefaults;

impl PipelineDefaults {
    pub const WORKER_THREADS: usize = 2;
    /// Lines read per batch before the producer pauses for a drain/harvest cycle.
    pub const BATCH_SIZE: usize = 10;
    pub const COMMENT_IDENTIFIER: &'static str = "#";
}

/// Wait intervals for the pipeline's blocking handshakes.
pub struct PipelineTiming;

impl PipelineTiming {
    /// How long a consumer blocks on an empty queue before re-checking its finished flag.
    pub const QUEUE_POP_TIMEOUT: Duration = Duration::from_millis(100);
    /// Upper bound on a single orchestrator wait before it re-checks faults and Ctrl+C.
    pub const WAKE_INTERVAL: Duration = Duration::from_millis(50);
}

// ---- Evaluator ----

pub struct EvaluatorDefaults;

impl EvaluatorDefaults {
    pub const DELIMITER: char = ',';
    /// Most-recently-used expressions kept per evaluator.
    pub const CACHE_CAPACITY: usize = 1000;

    pub fn cache_capacity() -> NonZeroUsize {
        NonZeroUsize::new(Self::CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)
    }
}

// ---- Exit status ----

pub struct ExitStatus;

impl ExitStatus {
    pub const SUCCESS: i32 = 0;
    /// Worker fault aborted the run.
    pub const ABORTED: i32 = 1;
    /// Bad arguments, bad configuration or unreadable input.
    pub const INVALID: i32 = -1;
    pub const INTERRUPTED: i32 = 130;
}
