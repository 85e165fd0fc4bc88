//! CLI command handler: build options, open the input, run the pipeline, map to an exit status.

use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::utils::config::ExitStatus;
use crate::utils::rpn_toml::{apply_file_to_opts, load_rpn_toml};
use crate::utils::setup_logging;
use crate::{Opts, RunOutcome, evaluate_lines};

/// Defaults, then `.rpnbatch.toml` next to the input file, then command-line flags.
/// Returns the file problem (if any) so it can be logged once logging is up.
fn setup_opts(cli: &Cli) -> (Opts, Option<anyhow::Error>) {
    let mut opts = Opts::default();
    let dir = cli
        .input_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_problem = match load_rpn_toml(dir) {
        Ok(Some(file)) => {
            apply_file_to_opts(&file, &mut opts);
            None
        }
        Ok(None) => None,
        Err(e) => Some(e),
    };

    if let Some(n) = cli.worker_threads_count {
        opts.worker_threads = n;
    }
    if let Some(n) = cli.process_limit_size {
        opts.batch_size = n;
    }
    if let Some(ref c) = cli.comment_identifier {
        opts.comment_identifier = c.clone();
    }
    if let Some(d) = cli.delimiter {
        opts.delimiter = d;
    }
    if let Some(n) = cli.cache_size {
        opts.cache_size = n;
    }
    opts.verbose |= cli.verbose;
    (opts, file_problem)
}

/// Ctrl+C sets the returned flag; the orchestrator stops at its next check and shuts down.
fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel_requested)
}

fn open_input(path: &Path) -> Result<std::io::Lines<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file).lines())
}

/// Run the CLI and return the process exit status.
pub fn handle_run(cli: &Cli) -> i32 {
    let (opts, file_problem) = setup_opts(cli);
    setup_logging(opts.verbose);
    if let Some(e) = file_problem {
        warn!("Ignoring settings file: {e:#}");
    }

    if let Err(e) = opts.validate() {
        println!("ERROR- Invalid Argument(s) - {e}");
        return ExitStatus::INVALID;
    }

    let source = match open_input(&cli.input_file) {
        Ok(lines) => lines,
        Err(e) => {
            error!(
                "Exception caught while opening '{}'. Details: {}",
                cli.input_file.display(),
                e
            );
            return ExitStatus::INVALID;
        }
    };

    let cancel = match install_interrupt_handler() {
        Ok(flag) => Some(flag),
        Err(e) => {
            warn!("{e:#}; Ctrl+C will not shut down cleanly");
            None
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match evaluate_lines(&opts, source, &mut out, cancel) {
        Ok(summary) => {
            debug!(
                "Emitted {} line(s) ({} failed) in {} batch(es)",
                summary.emitted, summary.failures, summary.batches
            );
            if let RunOutcome::Faulted(ref fault) = summary.outcome {
                error!("Run aborted: {fault}");
            }
            summary.outcome.exit_status()
        }
        Err(e) => {
            error!("Exception caught in the main thread. Details: {e:#}");
            ExitStatus::INVALID
        }
    }
}
