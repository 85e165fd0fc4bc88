//! Engine module: command-line surface

pub mod arg_parser;
pub mod cli;

// Re-export commonly used functions
pub use arg_parser::{Cli, invalid_argument_message};
pub use cli::handle_run;
