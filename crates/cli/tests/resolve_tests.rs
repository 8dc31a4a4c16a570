//! Integration tests for `strata resolve`.

mod common;

use common::{strata_cmd, write_fixture};
use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_resolve_merges_files_in_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "db:\n  host: basehost\n  port: 5432\n");
    let site = write_fixture(&dir, "site.yaml", "db:\n  host: sitehost\n");

    strata_cmd()
        .arg("resolve")
        .arg(&base)
        .arg(&site)
        .arg("--exclude-runtime-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("host: sitehost"))
        .stdout(predicate::str::contains("port: 5432"));
}

#[test]
fn test_resolve_includes_runtime_info_by_default() {
    strata_cmd()
        .arg("resolve")
        .arg("{service: api}")
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime_info:"))
        .stdout(predicate::str::contains("created_at:"))
        .stdout(predicate::str::contains("service: api"));
}

#[test]
fn test_set_overrides_every_source() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "db:\n  port: 5432\n");

    strata_cmd()
        .arg("resolve")
        .arg(&base)
        .args(["--set", "db.port=9999", "--exclude-runtime-info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("port: 9999"));
}

#[test]
fn test_set_applies_list_update_keys() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "servers:\n  - alpha\n");

    strata_cmd()
        .arg("resolve")
        .arg(&base)
        .args(["--set", "servers.+=edge", "--exclude-runtime-info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- alpha"))
        .stdout(predicate::str::contains("- edge"));
}

#[test]
fn test_json_output_parses() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "db:\n  host: filehost\n");

    let assert = strata_cmd()
        .arg("resolve")
        .arg(&base)
        .args([
            "--set",
            "db.port=6543",
            "--output",
            "json",
            "--exclude-runtime-info",
        ])
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(value["db"]["port"], json!(6543));
    assert_eq!(value["db"]["host"], json!("filehost"));
}

#[test]
fn test_flat_output_uses_dotted_keys() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "db:\n  host: filehost\n  port: 5432\n");

    strata_cmd()
        .arg("resolve")
        .arg(&base)
        .args(["--output", "flat", "--exclude-runtime-info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db.host: filehost"))
        .stdout(predicate::str::contains("db.port: 5432"));
}

#[test]
fn test_context_gates_conditional_sources() {
    let declaration = concat!(
        "[{order: 0, source: {service: common}},\n",
        " {order: 1, source: {service: prod-only}, enable_if: 'profile == \"prod\"'}]"
    );

    strata_cmd()
        .args(["resolve", declaration, "--exclude-runtime-info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("service: common"))
        .stdout(predicate::str::contains("prod-only").not());

    strata_cmd()
        .args([
            "resolve",
            declaration,
            "--context",
            "profile=prod",
            "--exclude-runtime-info",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("service: prod-only"));
}

#[test]
fn test_inline_mapping_and_file_sources_mix() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "db:\n  host: filehost\n");

    strata_cmd()
        .arg("resolve")
        .arg(&base)
        .arg("{db: {pool: 8}}")
        .arg("--exclude-runtime-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("host: filehost"))
        .stdout(predicate::str::contains("pool: 8"));
}
