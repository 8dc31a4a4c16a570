//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Declare the shared source/context argument shapes.
//!
//! Non-responsibilities:
//! - Does not execute commands (see `dispatch` module).
//! - Does not build backends or parse KEY=VALUE pairs (see `commands`).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Resolve layered configuration from ordered sources", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  strata resolve base.yaml site.yaml --set db.pool=32\n  strata resolve base.yaml --output json --exclude-runtime-info\n  strata resolve base.yaml '[{source: {a: 2}, enable_if: \"profile == \\\"prod\\\"\"}]' --context profile=prod\n  strata check deploy.yaml overrides.env\n  strata snapshot base.yaml --meta reason=release -o snapshot.yaml\n"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose sources and print the resolved config
    Resolve {
        /// Config sources merged in the given order (file paths or inline
        /// YAML payloads)
        #[arg(value_name = "SOURCE")]
        sources: Vec<String>,

        /// Override entry applied on top of all sources (dotted keys and
        /// list-update keys allowed; value parsed as YAML)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Context entry for enable_if predicates
        #[arg(long, value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        output: OutputFormat,

        /// Drop the runtime_info block from the output
        #[arg(long)]
        exclude_runtime_info: bool,
    },

    /// Validate that sources construct and load, with per-source status
    Check {
        /// Config sources checked in the given order (file paths or inline
        /// YAML payloads)
        #[arg(value_name = "SOURCE")]
        sources: Vec<String>,

        /// Context entry for enable_if predicates
        #[arg(long, value_name = "KEY=VALUE")]
        context: Vec<String>,
    },

    /// Write a time-tagged snapshot of the composed config
    Snapshot {
        /// Config sources merged in the given order (file paths or inline
        /// YAML payloads)
        #[arg(value_name = "SOURCE")]
        sources: Vec<String>,

        /// Metadata entry recorded alongside the snapshot
        #[arg(long, value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Context entry for enable_if predicates
        #[arg(long, value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Destination file (stdout when omitted)
        #[arg(short = 'o', long = "output-file", value_name = "FILE")]
        output_file: Option<PathBuf>,
    },
}

/// How `resolve` serializes the composed mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Nested YAML document
    Yaml,
    /// Pretty-printed JSON
    Json,
    /// One dotted key per line, YAML-valued
    Flat,
}
