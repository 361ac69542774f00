use assert_cmd::Command;
use predicates::prelude::*;

fn ztbridge() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("ztbridge"))
}

#[test]
fn attach_fails_cleanly_when_no_overlay_interface_exists() {
    // No real host carries an interface with this prefix, so resolution
    // fails first and nothing is mutated.
    ztbridge()
        .arg("attach")
        .args(["--bridge", "br0"])
        .args(["--prefix", "ztbridge-test-nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no interface matching prefix"));
}

#[test]
fn help_lists_both_subcommands() {
    ztbridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("attach"));
}
