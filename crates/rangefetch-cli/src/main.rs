use std::process::ExitCode;

use clap::Parser;
use rangefetch_core::logging;

mod cli;

use crate::cli::Cli;

fn main() -> ExitCode {
    // Usage errors exit here (status 2) before anything else is set up.
    let cli = Cli::parse();

    // Initialize logging as early as possible; fall back to stderr if the log file is unavailable.
    let _log = match logging::init_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            let guard = logging::init_logging_stderr(cli.verbose);
            tracing::warn!("file logging unavailable, using stderr only: {:#}", e);
            guard
        }
    };

    match cli.run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("rangefetch error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
