use clap::Parser;
use clap::error::ErrorKind;
use std::path::PathBuf;

/// Accepts integers >= 1.
fn parse_positive(s: &str) -> Result<usize, String> {
    match s.trim().parse::<i64>() {
        Ok(n) if n >= 1 => usize::try_from(n).map_err(|e| e.to_string()),
        Ok(n) => Err(format!("must be a positive number, got {n}")),
        Err(_) => Err(format!("'{s}' is not a number")),
    }
}

/// Calculates Reverse Polish Notation (RPN) expressions for an input file.
///
/// Unset options fall back to `.rpnbatch.toml` next to the input file, then to the defaults.
#[derive(Clone, Parser)]
#[command(name = "rpnbatch")]
#[command(about = "Calculates Reverse Polish Notation (RPN) expressions for an input file.")]
pub struct Cli {
    /// Input file, one postfix expression per line.
    #[arg(value_name = "INPUT_FILE")]
    pub input_file: PathBuf,

    /// Number of worker threads (default = 2).
    #[arg(long = "worker_threads_count", value_parser = parse_positive)]
    pub worker_threads_count: Option<usize>,

    /// Sets the number of lines processed in batch (default = 10).
    #[arg(long = "process_limit_size", value_parser = parse_positive)]
    pub process_limit_size: Option<usize>,

    /// Overrides the default comment identifier (default = pound sign(#)).
    #[arg(long = "comment_identifier")]
    pub comment_identifier: Option<String>,

    /// Token delimiter inside an expression (default = comma).
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Expressions memoized per worker (default = 1000).
    #[arg(long = "cache_size", value_parser = parse_positive)]
    pub cache_size: Option<usize>,

    /// Activates debugging logs.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// One-line message for a rejected command line, or `None` for help/version requests
/// (those are printed by clap itself).
pub fn invalid_argument_message(err: &clap::Error) -> Option<String> {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => None,
        _ => {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            let detail = first.strip_prefix("error: ").unwrap_or(first);
            Some(format!("ERROR- Invalid Argument(s) - {detail}"))
        }
    }
}
