//! Closes the ticket once a verdict is reached.
//!
//! Both steps are best-effort: a failed comment or close is logged and
//! swallowed, because the verdict is already decided and must still be
//! reported.

use crate::approval::types::Verdict;
use crate::tracker::{CloseReason, TicketId, TicketTracker};
use std::sync::Arc;
use tracing::{info, warn};

/// What the finalizer managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalization {
    pub commented: bool,
    pub closed: bool,
}

pub struct Finalizer {
    tracker: Arc<dyn TicketTracker>,
    fail_on_timeout: bool,
}

impl Finalizer {
    pub fn new(tracker: Arc<dyn TicketTracker>, fail_on_timeout: bool) -> Self {
        Self {
            tracker,
            fail_on_timeout,
        }
    }

    /// Post the closing comment, then close the ticket. Never fails.
    pub async fn finalize(&self, verdict: &Verdict, id: TicketId) -> Finalization {
        let message = self.closing_message(verdict);
        info!("{}", message);

        let commented = match self.tracker.add_comment(id, &message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to post closing comment on issue #{}: {}", id, e);
                false
            }
        };

        let reason = self.close_reason(verdict);
        let closed = match self.tracker.close_ticket(id, Some(reason)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to close issue #{} as {}: {}", id, reason, e);
                false
            }
        };

        Finalization { commented, closed }
    }

    pub fn close_reason(&self, verdict: &Verdict) -> CloseReason {
        match verdict {
            Verdict::Approved { .. } => CloseReason::Completed,
            Verdict::Rejected { .. } => CloseReason::NotPlanned,
            Verdict::TimedOut { .. } if self.fail_on_timeout => CloseReason::NotPlanned,
            Verdict::TimedOut { .. } => CloseReason::Completed,
        }
    }

    pub fn closing_message(&self, verdict: &Verdict) -> String {
        match verdict {
            Verdict::Approved { approvers, .. } => {
                let by = if approvers.is_empty() {
                    String::new()
                } else {
                    format!(" by @{}", approvers.join(", @"))
                };
                format!(
                    "✅ **Approval Received{}**\n\nThe manual approval request has been approved.",
                    by
                )
            }
            Verdict::Rejected { .. } => {
                "❌ **Approval Rejected**\n\nThe manual approval request has been rejected."
                    .to_string()
            }
            Verdict::TimedOut { .. } => {
                let outcome = if self.fail_on_timeout {
                    "timed out"
                } else {
                    "approved"
                };
                format!(
                    "⏱️ **Approval Timed Out**\n\nThe manual approval request has been {}.",
                    outcome
                )
            }
        }
    }
}
