//! Who may approve or reject.
//!
//! The allowed-approver list is checked in order: `anyone`, `author` (the
//! workflow actor), explicit usernames, then `team:<slug>` entries. An empty
//! list falls back to the repository permission of the commenter.

use crate::tracker::{TicketTracker, TrackerResult};
use std::sync::Arc;
use tracing::{debug, warn};

const TEAM_PREFIX: &str = "team:";

#[derive(Clone)]
pub struct PermissionChecker {
    tracker: Arc<dyn TicketTracker>,
    approvers: Vec<String>,
    /// The user who triggered the workflow
    actor: String,
}

impl PermissionChecker {
    pub fn new(tracker: Arc<dyn TicketTracker>, approvers: Vec<String>, actor: impl Into<String>) -> Self {
        Self {
            tracker,
            approvers,
            actor: actor.into(),
        }
    }

    /// Whether `author` may resolve the approval.
    ///
    /// Team lookup failures are logged and skipped. A failed repository
    /// permission lookup is returned as an error so the caller can retry the
    /// comment later instead of dismissing it.
    pub async fn is_allowed(&self, author: &str) -> TrackerResult<bool> {
        debug!(
            "Checking if {} may approve. Allowed approvers: [{}]",
            author,
            self.approvers.join(", ")
        );

        if self.approvers.iter().any(|a| a == "anyone") {
            debug!("{} is allowed (anyone can approve)", author);
            return Ok(true);
        }

        if self.approvers.iter().any(|a| a == "author") && author == self.actor {
            debug!("{} is allowed (workflow author)", author);
            return Ok(true);
        }

        if self.approvers.iter().any(|a| a.eq_ignore_ascii_case(author)) {
            debug!("{} is allowed (explicitly listed)", author);
            return Ok(true);
        }

        for team in self
            .approvers
            .iter()
            .filter_map(|a| a.strip_prefix(TEAM_PREFIX))
        {
            match self.tracker.check_team_membership(team, author).await {
                Ok(true) => {
                    debug!("{} is allowed (member of team {})", author, team);
                    return Ok(true);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Failed to check membership of {} in team {}: {}",
                        author, team, e
                    );
                }
            }
        }

        if self.approvers.is_empty() {
            let permitted = self.tracker.check_author_permission(author).await?;
            debug!("{} has repository write permission? {}", author, permitted);
            return Ok(permitted);
        }

        debug!("{} is not in the allowed approvers list", author);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::fake::{FakeOp, FakeTracker};

    fn checker(tracker: Arc<FakeTracker>, approvers: &[&str]) -> PermissionChecker {
        PermissionChecker::new(
            tracker,
            approvers.iter().map(|a| a.to_string()).collect(),
            "octocat",
        )
    }

    #[tokio::test]
    async fn test_anyone_allows_everybody() {
        let tracker = Arc::new(FakeTracker::new());
        let checker = checker(tracker.clone(), &["anyone"]);
        assert!(checker.is_allowed("stranger").await.unwrap());
        assert_eq!(tracker.count(FakeOp::CheckAuthorPermission), 0);
    }

    #[tokio::test]
    async fn test_author_matches_workflow_actor_only() {
        let tracker = Arc::new(FakeTracker::new());
        let checker = checker(tracker, &["author"]);
        assert!(checker.is_allowed("octocat").await.unwrap());
        assert!(!checker.is_allowed("someone-else").await.unwrap());
    }

    #[tokio::test]
    async fn test_explicit_username() {
        let tracker = Arc::new(FakeTracker::new());
        let checker = checker(tracker, &["alice", "bob"]);
        assert!(checker.is_allowed("bob").await.unwrap());
        assert!(!checker.is_allowed("carol").await.unwrap());
    }

    #[tokio::test]
    async fn test_team_membership() {
        let tracker = Arc::new(FakeTracker::new().with_team_member("release", "dana"));
        let checker = checker(tracker, &["team:release"]);
        assert!(checker.is_allowed("dana").await.unwrap());
        assert!(!checker.is_allowed("erin").await.unwrap());
    }

    #[tokio::test]
    async fn test_team_lookup_failure_is_skipped() {
        let tracker = Arc::new(
            FakeTracker::new()
                .with_team_member("ops", "dana")
                .failing(FakeOp::CheckTeamMembership, 1),
        );
        let checker = checker(tracker.clone(), &["team:release", "team:ops"]);
        assert!(checker.is_allowed("dana").await.unwrap());
        assert_eq!(tracker.count(FakeOp::CheckTeamMembership), 2);
    }

    #[tokio::test]
    async fn test_empty_list_uses_repository_permission() {
        let tracker = Arc::new(FakeTracker::new().with_permitted("alice"));
        let checker = checker(tracker, &[]);
        assert!(checker.is_allowed("alice").await.unwrap());
        assert!(!checker.is_allowed("mallory").await.unwrap());
    }

    #[tokio::test]
    async fn test_repository_permission_failure_propagates() {
        let tracker = Arc::new(
            FakeTracker::new()
                .with_permitted("alice")
                .failing(FakeOp::CheckAuthorPermission, 1),
        );
        let checker = checker(tracker, &[]);
        assert!(checker.is_allowed("alice").await.is_err());
        assert!(checker.is_allowed("alice").await.unwrap());
    }
}
