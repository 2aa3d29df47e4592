//! Black-box tests for the CLI surface.
//!
//! These exercise argument parsing and help output only; nothing here
//! touches the network.

use assert_cmd::Command;
use predicates::prelude::*;

fn channel_ops() -> Command {
    Command::cargo_bin("channel-ops").expect("binary builds")
}

#[test]
fn help_lists_all_commands() {
    channel_ops()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("boost")
                .and(predicate::str::contains("leaderboard"))
                .and(predicate::str::contains("reminder"))
                .and(predicate::str::contains("posts"))
                .and(predicate::str::contains("stories"))
                .and(predicate::str::contains("ads"))
                .and(predicate::str::contains("moderation"))
                .and(predicate::str::contains("admin-log")),
        );
}

#[test]
fn subcommand_help_exits_zero() {
    for command in [
        "boost",
        "leaderboard",
        "reminder",
        "posts",
        "stories",
        "ads",
        "moderation",
        "admin-log",
    ] {
        channel_ops()
            .args([command, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--dry-run"));
    }
}

#[test]
fn admin_log_help_documents_options() {
    channel_ops()
        .args(["admin-log", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--name").and(predicate::str::contains("--write-env")),
        );
}

#[test]
fn admin_log_without_name_is_a_usage_error() {
    channel_ops()
        .arg("admin-log")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--name"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    channel_ops().arg("does-not-exist").assert().failure().code(2);
}
