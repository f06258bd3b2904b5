//! End-to-end tests of the `approvalctl` binary.
//!
//! The binary is driven the way the runner drives it: inputs and context
//! through environment variables, outputs and state through file commands,
//! and the GitHub API replaced by a mock server.

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;

/// Read a `name<<delimiter` command file written by the binary.
fn read_file_commands(path: &std::path::Path) -> HashMap<String, String> {
    let content = std::fs::read_to_string(path).unwrap();
    let mut values = HashMap::new();
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let (name, delimiter) = line.split_once("<<").unwrap();
        let value: Vec<&str> = lines.by_ref().take_while(|l| *l != delimiter).collect();
        values.insert(name.to_string(), value.join("\n"));
    }
    values
}

/// A command with a clean runner environment.
fn approvalctl() -> Command {
    let mut cmd = Command::cargo_bin("approvalctl").unwrap();
    for var in [
        "RUST_LOG",
        "RUNNER_DEBUG",
        "GITHUB_TOKEN",
        "GITHUB_OUTPUT",
        "GITHUB_STATE",
        "GITHUB_REPOSITORY",
        "GITHUB_API_URL",
        "STATE_approval_request",
        "INPUT_GITHUB-TOKEN",
        "INPUT_APPROVERS",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cleanup_without_checkpoint_is_a_noop() {
    approvalctl()
        .arg("cleanup")
        .assert()
        .success()
        .stdout(predicate::str::contains("No approval request found for cleanup"));
}

#[test]
fn test_run_rejects_non_positive_timeout() {
    approvalctl()
        .arg("run")
        .env("INPUT_TIMEOUT-SECONDS", "0")
        .env("INPUT_POLL-INTERVAL-SECONDS", "5")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must be a positive number"))
        .stdout(predicate::str::contains("::error::"));
}

#[test]
fn test_run_rejects_invalid_boolean() {
    approvalctl()
        .arg("run")
        .env("INPUT_TIMEOUT-SECONDS", "60")
        .env("INPUT_POLL-INTERVAL-SECONDS", "5")
        .env("INPUT_FAIL-ON-TIMEOUT", "yes")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fail-on-timeout"));
}

#[test]
fn test_run_requires_repository() {
    approvalctl()
        .arg("run")
        .env("INPUT_TIMEOUT-SECONDS", "60")
        .env("INPUT_POLL-INTERVAL-SECONDS", "5")
        .env("GITHUB_TOKEN", "t")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GITHUB_REPOSITORY"));
}

#[test]
fn test_run_approved_by_listed_user() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/repos/octo/app/issues");
        then.status(201).json_body(json!({
            "number": 3,
            "html_url": "https://github.com/octo/app/issues/3",
            "state": "open"
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/app/issues/3");
        then.status(200).json_body(json!({
            "number": 3,
            "html_url": "https://github.com/octo/app/issues/3",
            "state": "open"
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/app/issues/3/comments");
        then.status(200).json_body(json!([{
            "id": 99,
            "body": "Approved!",
            "user": { "login": "alice" },
            "created_at": "2030-01-01T00:00:00Z"
        }]));
    });
    let closing_comment = server.mock(|when, then| {
        when.method(POST).path("/repos/octo/app/issues/3/comments");
        then.status(201).json_body(json!({ "id": 100 }));
    });
    let close = server.mock(|when, then| {
        when.method(PATCH)
            .path("/repos/octo/app/issues/3")
            .json_body(json!({ "state": "closed", "state_reason": "completed" }));
        then.status(200).json_body(json!({}));
    });

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("output");
    let state = dir.path().join("state");

    approvalctl()
        .arg("run")
        .env("INPUT_TIMEOUT-SECONDS", "60")
        .env("INPUT_POLL-INTERVAL-SECONDS", "1")
        .env("INPUT_APPROVERS", "alice")
        .env("INPUT_GITHUB-TOKEN", "test-token")
        .env("GITHUB_REPOSITORY", "octo/app")
        .env("GITHUB_API_URL", server.base_url())
        .env("GITHUB_OUTPUT", &output)
        .env("GITHUB_STATE", &state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Approval granted by: alice"));

    create.assert();
    closing_comment.assert();
    close.assert();

    let outputs = read_file_commands(&output);
    assert_eq!(outputs["status"], "approved");
    assert_eq!(outputs["approvers"], "alice");
    assert_eq!(outputs["issue-url"], "https://github.com/octo/app/issues/3");

    // saved on creation, released after the close
    let saved = read_file_commands(&state);
    assert_eq!(saved["approval_request"], "");
}

#[test]
fn test_cleanup_closes_checkpointed_issue() {
    let server = MockServer::start();
    let close = server.mock(|when, then| {
        when.method(PATCH)
            .path("/repos/octo/app/issues/8")
            .json_body(json!({ "state": "closed", "state_reason": "not_planned" }));
        then.status(200).json_body(json!({}));
    });
    let checkpoint = json!({
        "id": 8,
        "ticketUrl": "https://github.com/octo/app/issues/8",
        "createdAt": "2024-05-01T10:00:00Z",
        "expiresAt": "2024-05-01T10:05:00Z"
    });

    approvalctl()
        .arg("cleanup")
        .env("STATE_approval_request", checkpoint.to_string())
        .env("GITHUB_TOKEN", "test-token")
        .env("GITHUB_REPOSITORY", "octo/app")
        .env("GITHUB_API_URL", server.base_url())
        .assert()
        .success()
        .stdout(predicate::str::contains("Closed abandoned approval issue #8"));

    close.assert();
}

#[test]
fn test_cleanup_close_failure_fails_the_step() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PATCH).path("/repos/octo/app/issues/8");
        then.status(403).body("forbidden");
    });
    let checkpoint = json!({
        "id": 8,
        "ticketUrl": "https://github.com/octo/app/issues/8",
        "createdAt": "2024-05-01T10:00:00Z",
        "expiresAt": "2024-05-01T10:05:00Z"
    });

    approvalctl()
        .arg("cleanup")
        .env("STATE_approval_request", checkpoint.to_string())
        .env("GITHUB_TOKEN", "test-token")
        .env("GITHUB_REPOSITORY", "octo/app")
        .env("GITHUB_API_URL", server.base_url())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to close approval issue #8"));
}
