//! Command dispatch logic.
//!
//! Responsibilities:
//! - Route parsed CLI arguments to the appropriate command handler.
//!
//! Does NOT handle:
//! - CLI structure definitions (see `args` module).
//! - Exit code mapping (see `main()` and the `error` module).

use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::commands;

/// Dispatch CLI commands to their respective handlers.
pub(crate) fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve {
            sources,
            set,
            context,
            output,
            exclude_runtime_info,
        } => commands::resolve::run(&sources, &set, &context, output, exclude_runtime_info),
        Commands::Check { sources, context } => commands::check::run(&sources, &context),
        Commands::Snapshot {
            sources,
            meta,
            context,
            output_file,
        } => commands::snapshot::run(&sources, &meta, &context, output_file),
    }
}
