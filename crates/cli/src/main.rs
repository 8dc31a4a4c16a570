//! strata - Resolve layered configuration from the command line.
//!
//! Responsibilities:
//! - Parse command-line arguments and initialize logging.
//! - Route subcommands to their handlers and map failures to structured
//!   exit codes.
//!
//! Does NOT handle:
//! - Source construction, merging, or composition (see `strata-config`).
//!
//! Invariants:
//! - Logs go to stderr so stdout stays machine-readable.
//! - Structured exit codes are stable: scripts may depend on them.

mod args;
mod commands;
mod dispatch;
mod error;

use args::Cli;
use clap::Parser;
use error::{ExitCode, ExitCodeExt};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let exit_code = match dispatch::run_command(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("{e:#}");
            e.exit_code()
        }
    };

    std::process::exit(exit_code.as_i32());
}
