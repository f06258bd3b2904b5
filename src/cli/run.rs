//! `approvalctl run` — the main phase of the step.
//!
//! 1. Read the inputs and the runner context
//! 2. Open the approval issue and checkpoint it
//! 3. Wait for the verdict (approval, rejection, closure or timeout)
//! 4. Publish the step outputs and report the result

use crate::actions::{error_annotation, FileCommands};
use crate::approval::{Checkpoint, LifecycleEngine, RequestInitiator, Verdict};
use crate::config::{Inputs, RunnerContext};
use crate::content::{env_context, ContentBuilder};
use crate::policy::{PermissionChecker, Policy};
use crate::tracker::{GithubTracker, TicketTracker};
use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

/// Run the main phase. Returns whether the step should be marked as failed.
pub async fn run_gate(inputs: Inputs) -> Result<bool> {
    let policy = Arc::new(inputs.policy().context("Invalid step inputs")?);
    let context = RunnerContext::from_env().context("Invalid runner environment")?;
    let token = inputs.token()?;

    let tracker: Arc<dyn TicketTracker> = Arc::new(
        GithubTracker::new(&context.api_url, &token, context.repo.clone())
            .context("Failed to build GitHub client")?,
    );
    let commands = Arc::new(FileCommands::from_env());

    let content = ContentBuilder::new(&context, &policy);
    let title = content.title(&inputs.issue_title, env_context);
    let body = content.body(&inputs.issue_body, env_context);

    println!();
    println!("  {} {}", "⚖".bold(), title.bold());
    println!(
        "  Repository: {}  Timeout: {}s  Poll: {}s",
        context.repo.to_string().cyan(),
        policy.timeout.as_secs_f64(),
        policy.poll_interval.as_secs_f64()
    );

    let checkpoint = Checkpoint::new(commands.clone());
    let verdict =
        request_approval(tracker, checkpoint, policy, &context.actor, &title, &body).await?;

    publish_outputs(&verdict, &commands)?;
    Ok(report(&verdict))
}

/// Open the issue, then wait for and finalize the verdict.
pub async fn request_approval(
    tracker: Arc<dyn TicketTracker>,
    checkpoint: Checkpoint,
    policy: Arc<Policy>,
    actor: &str,
    title: &str,
    body: &str,
) -> Result<Verdict> {
    let initiator = RequestInitiator::new(tracker.clone(), checkpoint.clone(), policy.timeout);
    let request = initiator.open(title, body).await?;

    let permissions = PermissionChecker::new(tracker.clone(), policy.approvers.clone(), actor);
    let engine =
        LifecycleEngine::new(request, policy, tracker, permissions).with_checkpoint(checkpoint);
    Ok(engine.await_verdict().await)
}

/// Write the `status`, `approvers` and `issue-url` step outputs.
pub fn publish_outputs(verdict: &Verdict, commands: &FileCommands) -> Result<()> {
    commands.set_output("status", verdict.status())?;
    commands.set_output("approvers", &verdict.approvers().join(","))?;
    commands.set_output("issue-url", verdict.ticket_url())?;
    Ok(())
}

/// Print the result; failing verdicts also get an error annotation.
fn report(verdict: &Verdict) -> bool {
    println!();
    let message = match verdict {
        Verdict::Approved { approvers, .. } => {
            println!(
                "  {} Approval granted by: {}",
                "✓".green().bold(),
                approvers.join(", ").bold()
            );
            println!("  Issue: {}", verdict.ticket_url().dimmed());
            println!();
            return false;
        }
        Verdict::Rejected { .. } => "❌ Approval request was rejected",
        Verdict::TimedOut { .. } => "⏱️ Approval request timed out",
    };

    if verdict.failed() {
        println!("  {} {}", "✗".red().bold(), message);
    } else {
        println!("  {} {}", "!".yellow().bold(), message);
    }
    println!("  Issue: {}", verdict.ticket_url().dimmed());
    println!();

    if verdict.failed() {
        println!("{}", error_annotation(message));
    }
    verdict.failed()
}
