//! Ticket-tracking capability set.
//!
//! The approval lifecycle never talks HTTP directly. Everything it needs from
//! the issue tracker goes through `TicketTracker`, which has one production
//! adapter (`GithubTracker`) and one scripted test double (`FakeTracker`).

pub mod fake;
pub mod github;

use crate::approval::types::Comment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use fake::FakeTracker;
pub use github::GithubTracker;

/// Opaque ticket identifier (the issue number on GitHub).
pub type TicketId = u64;

/// Whether a ticket is still accepting responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    Open,
    Closed,
}

/// Reason recorded when a ticket is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Completed,
    NotPlanned,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Completed => write!(f, "completed"),
            CloseReason::NotPlanned => write!(f, "not_planned"),
        }
    }
}

/// A ticket as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    pub url: String,
    pub state: TicketState,
    /// Creation instant on the tracker's clock, when it reports one.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {operation} response: {message}")]
    Decode { operation: String, message: String },

    #[error("tracker unavailable: {0}")]
    Unavailable(String),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Operations the approval lifecycle consumes from the ticket tracker.
#[async_trait]
pub trait TicketTracker: Send + Sync {
    async fn create_ticket(&self, title: &str, body: &str) -> TrackerResult<Ticket>;

    async fn get_ticket(&self, id: TicketId) -> TrackerResult<Ticket>;

    /// Comments in chronological order, optionally only those at or after `since`.
    async fn list_comments(
        &self,
        id: TicketId,
        since: Option<DateTime<Utc>>,
    ) -> TrackerResult<Vec<Comment>>;

    async fn add_comment(&self, id: TicketId, body: &str) -> TrackerResult<()>;

    async fn close_ticket(&self, id: TicketId, reason: Option<CloseReason>) -> TrackerResult<()>;

    /// Whether `author` holds write-level access to the repository.
    async fn check_author_permission(&self, author: &str) -> TrackerResult<bool>;

    /// Whether `author` is an active member of `team`.
    async fn check_team_membership(&self, team: &str, author: &str) -> TrackerResult<bool>;
}
