//! Daemon binary smoke checks.

use assert_cmd::Command;

#[test]
fn version_flag_prints_and_exits_zero() {
    let output = Command::cargo_bin("afdd")
        .unwrap()
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("afdd"));
}

#[test]
fn help_flag_mentions_the_work_dir() {
    let output = Command::cargo_bin("afdd")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("AFD_WORK_DIR"));
}

#[test]
fn unexpected_argument_fails() {
    let output = Command::cargo_bin("afdd")
        .unwrap()
        .arg("--bogus")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
