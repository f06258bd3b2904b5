//! GitHub Issues adapter for `TicketTracker`.
//!
//! Talks to the REST API (`/repos/{owner}/{repo}/issues/...`) with a single
//! reusable `reqwest::Client` carrying the auth and API-version headers.

use crate::approval::types::Comment;
use crate::config::RepoRef;
use crate::tracker::{CloseReason, Ticket, TicketId, TicketState, TicketTracker, TrackerError, TrackerResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    html_url: String,
    state: TicketState,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubIssueComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    user: GithubUser,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GithubPermission {
    permission: String,
    #[serde(default)]
    role_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubMembership {
    state: String,
}

impl From<GithubIssue> for Ticket {
    fn from(issue: GithubIssue) -> Self {
        Self {
            id: issue.number,
            url: issue.html_url,
            state: issue.state,
            created_at: issue.created_at,
        }
    }
}

impl From<GithubIssueComment> for Comment {
    fn from(comment: GithubIssueComment) -> Self {
        Self {
            id: comment.id,
            body: comment.body.unwrap_or_default(),
            author: comment.user.login,
            created_at: comment.created_at,
        }
    }
}

/// Production `TicketTracker` backed by GitHub Issues.
#[derive(Clone)]
pub struct GithubTracker {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubTracker {
    pub fn new(api_base: &str, token: &str, repo: RepoRef) -> TrackerResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("approvalctl"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| TrackerError::Unavailable(format!("invalid authorization header: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_base, self.repo.owner, self.repo.name
        )
    }

    /// Send a request and decode a successful JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> TrackerResult<T> {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|e| TrackerError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }

    /// Send a request, mapping non-success statuses to `TrackerError::Status`.
    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> TrackerResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            body: truncate_for_error(&body, 500),
        })
    }
}

#[async_trait]
impl TicketTracker for GithubTracker {
    async fn create_ticket(&self, title: &str, body: &str) -> TrackerResult<Ticket> {
        tracing::debug!("Creating issue in {}: {}", self.repo, title);
        let request = self
            .http
            .post(self.issues_url())
            .json(&json!({ "title": title, "body": body }));
        let issue: GithubIssue = self.send_json("create issue", request).await?;
        tracing::info!("Successfully created issue: {}", issue.html_url);
        Ok(issue.into())
    }

    async fn get_ticket(&self, id: TicketId) -> TrackerResult<Ticket> {
        tracing::debug!("Getting issue #{}", id);
        let request = self.http.get(format!("{}/{}", self.issues_url(), id));
        let issue: GithubIssue = self.send_json("get issue", request).await?;
        Ok(issue.into())
    }

    async fn list_comments(
        &self,
        id: TicketId,
        since: Option<DateTime<Utc>>,
    ) -> TrackerResult<Vec<Comment>> {
        let since = since.map(|s| s.to_rfc3339_opts(SecondsFormat::Secs, true));
        tracing::debug!("Listing comments on issue #{} since {:?}", id, since);

        let mut page = 1_u32;
        let mut comments = Vec::new();
        loop {
            let mut request = self
                .http
                .get(format!("{}/{}/comments", self.issues_url(), id))
                .query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ]);
            if let Some(ref since) = since {
                request = request.query(&[("since", since)]);
            }
            let chunk: Vec<GithubIssueComment> =
                self.send_json("list issue comments", request).await?;
            let chunk_len = chunk.len();
            comments.extend(chunk.into_iter().map(Comment::from));
            if chunk_len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(comments)
    }

    async fn add_comment(&self, id: TicketId, body: &str) -> TrackerResult<()> {
        tracing::debug!("Adding comment to issue #{}", id);
        let request = self
            .http
            .post(format!("{}/{}/comments", self.issues_url(), id))
            .json(&json!({ "body": body }));
        self.send("add issue comment", request).await?;
        Ok(())
    }

    async fn close_ticket(&self, id: TicketId, reason: Option<CloseReason>) -> TrackerResult<()> {
        tracing::debug!("Closing issue #{} with reason {:?}", id, reason);
        let payload = match reason {
            Some(reason) => json!({ "state": "closed", "state_reason": reason }),
            None => json!({ "state": "closed" }),
        };
        let request = self
            .http
            .patch(format!("{}/{}", self.issues_url(), id))
            .json(&payload);
        self.send("close issue", request).await?;
        Ok(())
    }

    async fn check_author_permission(&self, author: &str) -> TrackerResult<bool> {
        tracing::debug!("Checking repository permission of {}", author);
        let request = self.http.get(format!(
            "{}/repos/{}/{}/collaborators/{}/permission",
            self.api_base, self.repo.owner, self.repo.name, author
        ));
        match self
            .send_json::<GithubPermission>("check collaborator permission", request)
            .await
        {
            Ok(p) => Ok(is_write_level(&p.permission)
                || p.role_name.as_deref().map_or(false, is_write_level)),
            Err(TrackerError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn check_team_membership(&self, team: &str, author: &str) -> TrackerResult<bool> {
        tracing::debug!("Checking membership of {} in team {}", author, team);
        let request = self.http.get(format!(
            "{}/orgs/{}/teams/{}/memberships/{}",
            self.api_base, self.repo.owner, team, author
        ));
        match self
            .send_json::<GithubMembership>("check team membership", request)
            .await
        {
            Ok(m) => Ok(m.state == "active"),
            Err(TrackerError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn is_write_level(permission: &str) -> bool {
    matches!(permission, "write" | "maintain" | "admin")
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
