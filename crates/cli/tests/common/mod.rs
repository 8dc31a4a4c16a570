//! Shared test utilities for strata integration tests.
//!
//! Responsibilities:
//! - Provide a hermetic CLI command factory.
//! - Write YAML fixtures into per-test temporary directories.
//!
//! Invariants / Assumptions:
//! - All integration tests using this helper are hermetic by default.
//! - `RUST_LOG` is cleared so host logging settings cannot reach stderr.

use std::path::PathBuf;

use assert_cmd::Command;

/// Returns a hermetic `strata` command for integration testing.
pub fn strata_cmd() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("strata");

    // Hermeticity: host logging configuration must not leak into stderr
    cmd.env_remove("RUST_LOG");

    cmd
}

/// Writes `content` to `name` inside `dir` and returns the full path.
#[allow(dead_code)]
pub fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("fixture write failed");
    path
}
