use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_includes_required_options() {
    let mut cmd = Command::cargo_bin("dockerdmon").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--install-root"))
        .stdout(predicate::str::contains("--parameters"))
        .stdout(predicate::str::contains("--socket"))
        .stdout(predicate::str::contains("--grace"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--help"));
}

#[test]
fn test_help_describes_the_supervisor() {
    let mut cmd = Command::cargo_bin("dockerdmon").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Supervise"))
        .stdout(predicate::str::contains("daemon"));
}
