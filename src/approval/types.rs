//! Data model of one approval run.

use crate::tracker::TicketId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an in-flight approval. Immutable once the ticket is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: TicketId,
    pub ticket_url: String,
    pub created_at: DateTime<Utc>,
    /// `created_at + timeout`
    pub expires_at: DateTime<Utc>,
}

/// One observed response on the ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Terminal outcome of an approval run. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Verdict {
    Approved {
        approvers: Vec<String>,
        ticket_url: String,
        timestamp: DateTime<Utc>,
    },
    /// Keyword rejection, or external closure (no approvers, always failing).
    Rejected {
        approvers: Vec<String>,
        failed: bool,
        ticket_url: String,
        timestamp: DateTime<Utc>,
    },
    TimedOut {
        failed: bool,
        ticket_url: String,
        timestamp: DateTime<Utc>,
    },
}

impl Verdict {
    /// Status string reported as the `status` step output.
    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Approved { .. } => "approved",
            Verdict::Rejected { .. } => "rejected",
            Verdict::TimedOut { .. } => "timed-out",
        }
    }

    pub fn failed(&self) -> bool {
        match self {
            Verdict::Approved { .. } => false,
            Verdict::Rejected { failed, .. } | Verdict::TimedOut { failed, .. } => *failed,
        }
    }

    pub fn approvers(&self) -> &[String] {
        match self {
            Verdict::Approved { approvers, .. } | Verdict::Rejected { approvers, .. } => approvers,
            Verdict::TimedOut { .. } => &[],
        }
    }

    pub fn ticket_url(&self) -> &str {
        match self {
            Verdict::Approved { ticket_url, .. }
            | Verdict::Rejected { ticket_url, .. }
            | Verdict::TimedOut { ticket_url, .. } => ticket_url,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Verdict::Approved { timestamp, .. }
            | Verdict::Rejected { timestamp, .. }
            | Verdict::TimedOut { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Verdict::Rejected { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Verdict::TimedOut { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approved { approvers, .. } => {
                write!(f, "approved by {}", approvers.join(", "))
            }
            Verdict::Rejected { approvers, .. } if approvers.is_empty() => {
                write!(f, "rejected (ticket closed)")
            }
            Verdict::Rejected { approvers, .. } => {
                write!(f, "rejected by {}", approvers.join(", "))
            }
            Verdict::TimedOut { .. } => write!(f, "timed out"),
        }
    }
}
