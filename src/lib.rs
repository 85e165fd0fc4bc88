//! rpnbatch: evaluate postfix (RPN) arithmetic line by line through a bounded producer/consumer pipeline.

pub mod engine;
pub mod expr;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use expr::{Evaluation, Evaluator, ParseError};
pub use pipeline::{LineSource, Orchestrator, WorkerFault, lines_from};

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Result alias used by public rpnbatch API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: evaluate every expression line of `source` and write the results to
/// `out` in input order.
///
/// Blank lines and lines starting with `opts.comment_identifier` are skipped but still
/// advance the line number. A malformed expression produces an `ERROR- ...` line, not an
/// error; `Err` is reserved for invalid `opts` and output failures.
///
/// ```ignore
/// let mut out = Vec::new();
/// let summary = rpnbatch::evaluate_lines(&Opts::default(), lines_from(["2, 3, +"]), &mut out, None)?;
/// assert_eq!(String::from_utf8(out)?, "2 + 3 = 5\n");
/// ```
pub fn evaluate_lines<S, W>(
    opts: &Opts,
    source: S,
    out: &mut W,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<RunSummary>
where
    S: LineSource + 'static,
    W: Write,
{
    log::debug!(
        "{} CONFIG:{:#?}",
        utils::PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );
    let orchestrator = Orchestrator::new(opts);
    match cancel {
        Some(flag) => orchestrator.with_cancel(flag).run(source, out),
        None => orchestrator.run(source, out),
    }
}
