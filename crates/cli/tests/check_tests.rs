//! Integration tests for `strata check`.

mod common;

use common::{strata_cmd, write_fixture};
use predicates::prelude::*;

#[test]
fn test_check_reports_each_source_and_merged_load() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_fixture(&dir, "base.yaml", "db:\n  host: basehost\n");

    strata_cmd()
        .arg("check")
        .arg(&base)
        .arg("{db: {pool: 8}}")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok    order=0 format=yaml"))
        .stdout(predicate::str::contains("ok    order=1 format=map"))
        .stdout(predicate::str::contains("ok    merged load"));
}

#[test]
fn test_check_skips_sources_gated_on_missing_context() {
    let declaration = concat!(
        "[{order: 0, source: {a: 1}},\n",
        " {order: 2, source: {b: 2}, enable_if: 'profile == \"prod\"', name: prod-extra}]"
    );

    strata_cmd()
        .args(["check", declaration])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok    order=0 format=map"))
        .stdout(predicate::str::contains("skip  order=2 format=map prod-extra"))
        .stdout(predicate::str::contains("ok    merged load"));
}

#[test]
fn test_check_reports_parse_failures() {
    let dir = tempfile::tempdir().unwrap();
    let ok = write_fixture(&dir, "ok.yaml", "a: 1\n");
    let broken = write_fixture(&dir, "broken.yaml", "a: [unclosed\n");

    strata_cmd()
        .arg("check")
        .arg(&ok)
        .arg(&broken)
        .assert()
        .code(5)
        .stdout(predicate::str::contains("ok    order=0"))
        .stdout(predicate::str::contains("fail  order=1"));
}

#[test]
fn test_check_reports_cross_source_merge_failures() {
    let dir = tempfile::tempdir().unwrap();
    let list = write_fixture(&dir, "list.yaml", "e:\n  - a\n  - b\n");
    let patch = write_fixture(&dir, "patch.yaml", "e:\n  5: x\n");

    // both members load on their own, only the merged load fails
    strata_cmd()
        .arg("check")
        .arg(&list)
        .arg(&patch)
        .assert()
        .code(4)
        .stdout(predicate::str::contains("ok    order=0"))
        .stdout(predicate::str::contains("ok    order=1"))
        .stdout(predicate::str::contains("fail  merged load"));
}
