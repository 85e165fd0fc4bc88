//! rpnbatch CLI: evaluate a file of postfix expressions, printing results in input order.

use clap::Parser;
use rpnbatch::engine::{Cli, handle_run, invalid_argument_message};
use rpnbatch::utils::config::ExitStatus;
use std::time::Instant;

fn main() {
    let start_time = Instant::now();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match invalid_argument_message(&e) {
            Some(msg) => {
                println!("{msg}");
                std::process::exit(ExitStatus::INVALID);
            }
            None => e.exit(),
        },
    };
    let status = handle_run(&cli);
    log::debug!("Total time: {:?}", start_time.elapsed());
    std::process::exit(status);
}
