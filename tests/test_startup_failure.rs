//! Startup failure behavior of the binary
//!
//! Configuration errors at startup are fatal: the supervisor logs the
//! failure and exits non-zero without launching anything. A misconfigured
//! device needs operator intervention, not a retry loop.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn tls_enabled_without_certificates_is_fatal() {
    let dir = tempdir().unwrap();
    let param_file = dir.path().join("parameters.toml");
    fs::write(&param_file, "UseTLS = \"yes\"\n").unwrap();

    let mut cmd = Command::cargo_bin("dockerdmon").unwrap();
    cmd.args([
        "--install-root",
        dir.path().to_str().unwrap(),
        "--parameters",
        param_file.to_str().unwrap(),
        "--socket",
        dir.path().join("control.sock").to_str().unwrap(),
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("TLS"))
        .stderr(predicate::str::contains("ca.pem"));
}

#[test]
fn malformed_parameter_file_is_fatal() {
    let dir = tempdir().unwrap();
    let param_file = dir.path().join("parameters.toml");
    fs::write(&param_file, "UseTLS = [broken\n").unwrap();

    let mut cmd = Command::cargo_bin("dockerdmon").unwrap();
    cmd.args([
        "--parameters",
        param_file.to_str().unwrap(),
        "--socket",
        dir.path().join("control.sock").to_str().unwrap(),
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("parameter"));
}
