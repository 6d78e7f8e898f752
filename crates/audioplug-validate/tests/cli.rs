use std::io::Write;

use assert_cmd::Command;

fn validator() -> Command {
    Command::cargo_bin("audioplug-validate").unwrap()
}

#[test]
fn missing_module_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-plugin.so");
    let output = validator().arg(&missing).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load"), "{stderr}");
}

#[test]
fn unreadable_configuration_is_an_error() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(config, "{{ \"block_size\": ").unwrap();
    let output = validator()
        .arg("plugin.so")
        .arg("--config")
        .arg(config.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load configuration"), "{stderr}");
}

#[test]
fn zero_block_size_is_rejected_before_loading() {
    let output = validator()
        .args(["plugin.so", "--block-size", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "{stderr}");
}

#[test]
fn unknown_suite_is_a_usage_error() {
    validator()
        .args(["plugin.so", "--suite", "latency"])
        .assert()
        .code(2);
}
