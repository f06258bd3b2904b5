//! `GithubTracker` against a mock GitHub REST API.

use approvalctl::config::RepoRef;
use approvalctl::tracker::{CloseReason, GithubTracker, TicketState, TicketTracker, TrackerError};
use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;

fn tracker(server: &MockServer) -> GithubTracker {
    GithubTracker::new(
        &server.base_url(),
        "test-token",
        RepoRef::parse("octo/app").unwrap(),
    )
    .unwrap()
}

fn comment_json(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "body": format!("comment {}", id),
        "user": { "login": "alice" },
        "created_at": "2024-05-01T10:00:00Z"
    })
}

#[tokio::test]
async fn test_create_issue_sends_headers_and_payload() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/octo/app/issues")
                .header("authorization", "Bearer test-token")
                .header("accept", "application/vnd.github+json")
                .header("x-github-api-version", "2022-11-28")
                .json_body(json!({ "title": "Approve deploy", "body": "please" }));
            then.status(201).json_body(json!({
                "number": 12,
                "html_url": "https://github.com/octo/app/issues/12",
                "state": "open",
                "created_at": "2024-05-01T09:30:00Z"
            }));
        })
        .await;

    let ticket = tracker(&server)
        .create_ticket("Approve deploy", "please")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(ticket.id, 12);
    assert_eq!(ticket.url, "https://github.com/octo/app/issues/12");
    assert_eq!(ticket.state, TicketState::Open);
    assert_eq!(
        ticket.created_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_get_closed_issue() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/octo/app/issues/12");
            then.status(200).json_body(json!({
                "number": 12,
                "html_url": "https://github.com/octo/app/issues/12",
                "state": "closed"
            }));
        })
        .await;

    let ticket = tracker(&server).get_ticket(12).await.unwrap();
    assert_eq!(ticket.state, TicketState::Closed);
    assert_eq!(ticket.created_at, None);
}

#[tokio::test]
async fn test_list_comments_paginates_with_since() {
    let server = MockServer::start_async().await;
    let first_page: Vec<_> = (1..=100).map(comment_json).collect();
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/issues/12/comments")
                .query_param("per_page", "100")
                .query_param("page", "1")
                .query_param("since", "2024-05-01T09:30:00Z");
            then.status(200).json_body(json!(first_page));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/issues/12/comments")
                .query_param("page", "2");
            then.status(200).json_body(json!([comment_json(101)]));
        })
        .await;

    let since = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    let comments = tracker(&server)
        .list_comments(12, Some(since))
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(comments.len(), 101);
    assert_eq!(comments[100].id, 101);
    assert_eq!(comments[0].author, "alice");
}

#[tokio::test]
async fn test_close_issue_with_reason() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/repos/octo/app/issues/12")
                .json_body(json!({ "state": "closed", "state_reason": "not_planned" }));
            then.status(200).json_body(json!({}));
        })
        .await;

    tracker(&server)
        .close_ticket(12, Some(CloseReason::NotPlanned))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_add_comment() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/octo/app/issues/12/comments")
                .json_body(json!({ "body": "done" }));
            then.status(201).json_body(json!({ "id": 1 }));
        })
        .await;

    tracker(&server).add_comment(12, "done").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_author_permission_levels() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/collaborators/admin-user/permission");
            then.status(200).json_body(json!({ "permission": "admin", "role_name": "admin" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/collaborators/reader/permission");
            then.status(200).json_body(json!({ "permission": "read", "role_name": "triage" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/collaborators/maintainer/permission");
            then.status(200).json_body(json!({ "permission": "write", "role_name": "maintain" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/collaborators/stranger/permission");
            then.status(404).json_body(json!({ "message": "Not Found" }));
        })
        .await;

    let tracker = tracker(&server);
    assert!(tracker.check_author_permission("admin-user").await.unwrap());
    assert!(tracker.check_author_permission("maintainer").await.unwrap());
    assert!(!tracker.check_author_permission("reader").await.unwrap());
    assert!(!tracker.check_author_permission("stranger").await.unwrap());
}

#[tokio::test]
async fn test_permission_server_error_propagates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/app/collaborators/alice/permission");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = tracker(&server)
        .check_author_permission("alice")
        .await
        .unwrap_err();
    match err {
        TrackerError::Status { status, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_team_membership() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/orgs/octo/teams/release/memberships/alice");
            then.status(200).json_body(json!({ "state": "active", "role": "member" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/orgs/octo/teams/release/memberships/bob");
            then.status(200).json_body(json!({ "state": "pending", "role": "member" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/orgs/octo/teams/release/memberships/carol");
            then.status(404);
        })
        .await;

    let tracker = tracker(&server);
    assert!(tracker.check_team_membership("release", "alice").await.unwrap());
    assert!(!tracker.check_team_membership("release", "bob").await.unwrap());
    assert!(!tracker.check_team_membership("release", "carol").await.unwrap());
}
