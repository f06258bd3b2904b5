//! Post-phase cleanup of an abandoned approval.
//!
//! When the job is cancelled before a verdict is reached, the ticket is still
//! open. Cleanup loads the checkpoint and closes that ticket as not planned.
//! No verdict is computed. Without a checkpoint this is a no-op.

use crate::approval::checkpoint::Checkpoint;
use crate::tracker::{CloseReason, TicketId, TicketTracker};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Close the checkpointed ticket, if any. Returns the closed ticket's id.
///
/// `connect` is only called when there is something to close, so a run
/// without a checkpoint needs no tracker credentials at all.
pub async fn cleanup<F>(checkpoint: &Checkpoint, connect: F) -> Result<Option<TicketId>>
where
    F: FnOnce() -> Result<Arc<dyn TicketTracker>>,
{
    let Some(request) = checkpoint.load()? else {
        info!("No approval request found for cleanup");
        return Ok(None);
    };

    let tracker = connect()?;
    info!("Closing abandoned approval request at {}", request.ticket_url);
    tracker
        .close_ticket(request.id, Some(CloseReason::NotPlanned))
        .await
        .with_context(|| format!("Failed to close approval issue #{}", request.id))?;

    if let Err(e) = checkpoint.release() {
        warn!("Failed to release approval checkpoint: {:#}", e);
    }
    Ok(Some(request.id))
}
