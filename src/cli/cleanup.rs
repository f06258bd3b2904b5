//! `approvalctl cleanup` — the post phase, run even when the job is cancelled.

use crate::actions::FileCommands;
use crate::approval::{self, Checkpoint};
use crate::config::{resolve_token, RunnerContext};
use crate::tracker::{GithubTracker, TicketTracker};
use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

/// Close the issue left open by an interrupted main phase, if any.
pub async fn run_cleanup(github_token: Option<String>) -> Result<()> {
    let checkpoint = Checkpoint::new(Arc::new(FileCommands::from_env()));

    let closed = approval::cleanup(&checkpoint, || {
        let context = RunnerContext::from_env().context("Invalid runner environment")?;
        let token = resolve_token(github_token.as_deref())?;
        let tracker = GithubTracker::new(&context.api_url, &token, context.repo)
            .context("Failed to build GitHub client")?;
        Ok(Arc::new(tracker) as Arc<dyn TicketTracker>)
    })
    .await?;

    if let Some(id) = closed {
        println!("  {} Closed abandoned approval issue #{}", "✓".green(), id);
    }
    Ok(())
}
