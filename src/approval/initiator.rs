//! Opens the approval ticket and records the request.

use crate::approval::checkpoint::Checkpoint;
use crate::approval::types::ApprovalRequest;
use crate::tracker::TicketTracker;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub struct RequestInitiator {
    tracker: Arc<dyn TicketTracker>,
    checkpoint: Checkpoint,
    timeout: Duration,
}

impl RequestInitiator {
    pub fn new(tracker: Arc<dyn TicketTracker>, checkpoint: Checkpoint, timeout: Duration) -> Self {
        Self {
            tracker,
            checkpoint,
            timeout,
        }
    }

    /// Create the ticket (once, no retry) and checkpoint the resulting request.
    ///
    /// The timeout is range-checked before anything is created, and the
    /// checkpoint is written before returning, so every ticket this opens
    /// can be closed by the cleanup phase.
    pub async fn open(&self, title: &str, body: &str) -> Result<ApprovalRequest> {
        let timeout = chrono::Duration::from_std(self.timeout)
            .ok()
            .filter(|timeout| Utc::now().checked_add_signed(*timeout).is_some())
            .context("Approval timeout is out of range")?;

        let ticket = self
            .tracker
            .create_ticket(title, body)
            .await
            .context("Failed to create approval issue")?;

        // the tracker filters comments on its own clock
        let created_at = ticket.created_at.unwrap_or_else(Utc::now);
        let expires_at = Utc::now()
            .checked_add_signed(timeout)
            .context("Approval timeout is out of range")?;
        let request = ApprovalRequest {
            id: ticket.id,
            ticket_url: ticket.url,
            created_at,
            expires_at,
        };

        self.checkpoint.save(&request)?;
        tracing::debug!("Saved approval checkpoint for issue #{}", request.id);
        Ok(request)
    }
}
