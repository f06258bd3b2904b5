//! Scripted in-memory `TicketTracker` used by tests and local dry runs.
//!
//! Comments and external closure are scheduled at offsets from ticket
//! creation, measured on the tokio clock so paused-time tests stay
//! deterministic. Every call is recorded with its offset for later assertions.

use crate::approval::types::Comment;
use crate::tracker::{CloseReason, Ticket, TicketId, TicketState, TicketTracker, TrackerError, TrackerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Operations of the tracker, used for failure injection and call records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    CreateTicket,
    GetTicket,
    ListComments,
    AddComment,
    CloseTicket,
    CheckAuthorPermission,
    CheckTeamMembership,
}

/// One recorded call: which operation, and how long after ticket creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedCall {
    pub op: FakeOp,
    pub at: Duration,
}

struct ScriptedComment {
    offset: Duration,
    author: String,
    body: String,
}

struct FakeState {
    ticket: Option<Ticket>,
    origin: Option<(Instant, DateTime<Utc>)>,
    server_skew: chrono::Duration,
    permission_errors: HashSet<String>,
    comments: Vec<ScriptedComment>,
    closed_after: Option<Duration>,
    closed_by_call: bool,
    permitted: HashSet<String>,
    teams: HashMap<String, HashSet<String>>,
    failures: HashMap<FakeOp, u32>,
    calls: Vec<RecordedCall>,
    posted: Vec<String>,
    close_reasons: Vec<Option<CloseReason>>,
}

pub struct FakeTracker {
    state: Mutex<FakeState>,
}

impl Default for FakeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                ticket: None,
                origin: None,
                server_skew: chrono::Duration::zero(),
                permission_errors: HashSet::new(),
                comments: Vec::new(),
                closed_after: None,
                closed_by_call: false,
                permitted: HashSet::new(),
                teams: HashMap::new(),
                failures: HashMap::new(),
                calls: Vec::new(),
                posted: Vec::new(),
                close_reasons: Vec::new(),
            }),
        }
    }

    /// Pretend a ticket already exists (e.g. opened by an earlier phase).
    pub fn with_existing_ticket(self, id: TicketId) -> Self {
        self.lock().open(id);
        self
    }

    /// Grant repository write permission to `author`.
    pub fn with_permitted(self, author: &str) -> Self {
        self.lock().permitted.insert(author.to_string());
        self
    }

    pub fn with_team_member(self, team: &str, author: &str) -> Self {
        self.lock()
            .teams
            .entry(team.to_string())
            .or_default()
            .insert(author.to_string());
        self
    }

    /// Post a comment `offset` after the ticket is created.
    pub fn with_comment_at(self, offset: Duration, author: &str, body: &str) -> Self {
        self.lock().comments.push(ScriptedComment {
            offset,
            author: author.to_string(),
            body: body.to_string(),
        });
        self
    }

    /// Fail every permission lookup for `author` with a server error.
    pub fn with_permission_error(self, author: &str) -> Self {
        self.lock().permission_errors.insert(author.to_string());
        self
    }

    /// Run the tracker's clock `skew` away from the local one.
    pub fn with_server_clock_skew(self, skew: chrono::Duration) -> Self {
        self.lock().server_skew = skew;
        self
    }

    /// Close the ticket from outside `offset` after it is created.
    pub fn with_closed_at(self, offset: Duration) -> Self {
        self.lock().closed_after = Some(offset);
        self
    }

    /// Fail the next `times` calls of `op`.
    pub fn failing(self, op: FakeOp, times: u32) -> Self {
        self.lock().failures.insert(op, times);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: FakeOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Bodies of comments posted through `add_comment`.
    pub fn posted_comments(&self) -> Vec<String> {
        self.lock().posted.clone()
    }

    /// Reasons passed to successful `close_ticket` calls.
    pub fn close_reasons(&self) -> Vec<Option<CloseReason>> {
        self.lock().close_reasons.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and apply any injected failure.
    fn enter(&self, op: FakeOp) -> TrackerResult<MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        let at = state
            .origin
            .map(|(instant, _)| instant.elapsed())
            .unwrap_or_default();
        state.calls.push(RecordedCall { op, at });

        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TrackerError::Unavailable(format!(
                    "injected failure for {:?}",
                    op
                )));
            }
        }
        Ok(state)
    }
}

impl FakeState {
    fn open(&mut self, id: TicketId) -> Ticket {
        let created_at = Utc::now() + self.server_skew;
        let ticket = Ticket {
            id,
            url: ticket_url(id),
            state: TicketState::Open,
            created_at: Some(created_at),
        };
        self.ticket = Some(ticket.clone());
        self.origin = Some((Instant::now(), created_at));
        ticket
    }

    fn ticket(&self, id: TicketId) -> TrackerResult<Ticket> {
        match self.ticket {
            Some(ref ticket) if ticket.id == id => {
                let mut ticket = ticket.clone();
                if self.is_closed() {
                    ticket.state = TicketState::Closed;
                }
                Ok(ticket)
            }
            _ => Err(TrackerError::Status {
                operation: "get issue".to_string(),
                status: 404,
                body: format!("issue #{} not found", id),
            }),
        }
    }

    fn elapsed(&self) -> Duration {
        self.origin
            .map(|(instant, _)| instant.elapsed())
            .unwrap_or_default()
    }

    fn is_closed(&self) -> bool {
        self.closed_by_call
            || self
                .closed_after
                .map_or(false, |offset| self.elapsed() >= offset)
    }
}

#[async_trait]
impl TicketTracker for FakeTracker {
    async fn create_ticket(&self, _title: &str, _body: &str) -> TrackerResult<Ticket> {
        let mut state = self.enter(FakeOp::CreateTicket)?;
        Ok(state.open(1))
    }

    async fn get_ticket(&self, id: TicketId) -> TrackerResult<Ticket> {
        let state = self.enter(FakeOp::GetTicket)?;
        state.ticket(id)
    }

    async fn list_comments(
        &self,
        id: TicketId,
        since: Option<DateTime<Utc>>,
    ) -> TrackerResult<Vec<Comment>> {
        let state = self.enter(FakeOp::ListComments)?;
        state.ticket(id)?;
        let (_, origin_utc) = state
            .origin
            .unwrap_or((Instant::now(), Utc::now() + state.server_skew));
        let elapsed = state.elapsed();

        let mut visible: Vec<Comment> = state
            .comments
            .iter()
            .enumerate()
            .filter(|(_, c)| c.offset <= elapsed)
            .map(|(i, c)| Comment {
                id: i as u64 + 1,
                body: c.body.clone(),
                author: c.author.clone(),
                created_at: origin_utc
                    + chrono::Duration::from_std(c.offset).unwrap_or_else(|_| chrono::Duration::zero()),
            })
            .filter(|c| since.map_or(true, |since| c.created_at >= since))
            .collect();
        visible.sort_by_key(|c| c.created_at);
        Ok(visible)
    }

    async fn add_comment(&self, id: TicketId, body: &str) -> TrackerResult<()> {
        let mut state = self.enter(FakeOp::AddComment)?;
        state.ticket(id)?;
        state.posted.push(body.to_string());
        Ok(())
    }

    async fn close_ticket(&self, id: TicketId, reason: Option<CloseReason>) -> TrackerResult<()> {
        let mut state = self.enter(FakeOp::CloseTicket)?;
        state.ticket(id)?;
        state.closed_by_call = true;
        state.close_reasons.push(reason);
        Ok(())
    }

    async fn check_author_permission(&self, author: &str) -> TrackerResult<bool> {
        let state = self.enter(FakeOp::CheckAuthorPermission)?;
        if state.permission_errors.contains(author) {
            return Err(TrackerError::Status {
                operation: "check collaborator permission".to_string(),
                status: 500,
                body: format!("permission lookup for {} failed", author),
            });
        }
        Ok(state.permitted.contains(author))
    }

    async fn check_team_membership(&self, team: &str, author: &str) -> TrackerResult<bool> {
        let state = self.enter(FakeOp::CheckTeamMembership)?;
        Ok(state
            .teams
            .get(team)
            .map_or(false, |members| members.contains(author)))
    }
}

fn ticket_url(id: TicketId) -> String {
    format!("https://github.com/test-owner/test-repo/issues/{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_comments_appear_at_their_offsets() {
        let tracker = FakeTracker::new()
            .with_comment_at(Duration::from_secs(5), "alice", "first")
            .with_comment_at(Duration::from_secs(10), "bob", "second");
        let ticket = tracker.create_ticket("t", "b").await.unwrap();

        assert!(tracker.list_comments(ticket.id, None).await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        let comments = tracker.list_comments(ticket.id, None).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "alice");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(tracker.list_comments(ticket.id, None).await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_failures_are_consumed() {
        let tracker = FakeTracker::new().failing(FakeOp::GetTicket, 1);
        let ticket = tracker.create_ticket("t", "b").await.unwrap();

        assert!(tracker.get_ticket(ticket.id).await.is_err());
        assert!(tracker.get_ticket(ticket.id).await.is_ok());
        assert_eq!(tracker.count(FakeOp::GetTicket), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_closure() {
        let tracker = FakeTracker::new().with_closed_at(Duration::from_secs(3));
        let ticket = tracker.create_ticket("t", "b").await.unwrap();
        assert_eq!(tracker.get_ticket(ticket.id).await.unwrap().state, TicketState::Open);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(tracker.get_ticket(ticket.id).await.unwrap().state, TicketState::Closed);
    }
}
