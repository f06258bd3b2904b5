//! Approval lifecycle engine.
//!
//! Runs two tokio tasks against one resolution latch:
//! 1. a timeout task that fires once at the request's expiry
//! 2. a poll task that checks the ticket state, then scans new comments
//!    through the decision function, every poll interval
//!
//! The first task to resolve the latch wins. The other task is aborted, and
//! any resolution it still produces is dropped. Both tasks live in a
//! `JoinSet`, so cancelling `await_verdict` stops them too. The winning verdict is
//! finalized (comment + close) before `await_verdict` returns.

use crate::approval::checkpoint::Checkpoint;
use crate::approval::finalizer::Finalizer;
use crate::approval::types::{ApprovalRequest, Verdict};
use crate::policy::{Decision, PermissionChecker, Policy, PolicyEngine};
use crate::tracker::{TicketState, TicketTracker};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Single-assignment latch guarding the terminal transition.
struct ResolutionLatch {
    sender: Mutex<Option<oneshot::Sender<Verdict>>>,
}

impl ResolutionLatch {
    fn new() -> (Arc<Self>, oneshot::Receiver<Verdict>) {
        let (tx, rx) = oneshot::channel();
        let latch = Self {
            sender: Mutex::new(Some(tx)),
        };
        (Arc::new(latch), rx)
    }

    /// Deliver `verdict` if nobody has yet. Returns whether this call won.
    fn resolve(&self, verdict: Verdict) -> bool {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => tx.send(verdict).is_ok(),
            None => {
                debug!("Discarding late resolution: {}", verdict);
                false
            }
        }
    }

    fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

pub struct LifecycleEngine {
    request: ApprovalRequest,
    policy: Arc<Policy>,
    tracker: Arc<dyn TicketTracker>,
    decisions: PolicyEngine,
    finalizer: Finalizer,
    checkpoint: Option<Checkpoint>,
}

impl LifecycleEngine {
    pub fn new(
        request: ApprovalRequest,
        policy: Arc<Policy>,
        tracker: Arc<dyn TicketTracker>,
        permissions: PermissionChecker,
    ) -> Self {
        Self {
            decisions: PolicyEngine::new(policy.clone(), permissions),
            finalizer: Finalizer::new(tracker.clone(), policy.fail_on_timeout),
            request,
            policy,
            tracker,
            checkpoint: None,
        }
    }

    /// Release this checkpoint once the ticket has been closed.
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn request(&self) -> &ApprovalRequest {
        &self.request
    }

    /// Wait for the single terminal verdict, finalize it, and return it.
    pub async fn await_verdict(self) -> Verdict {
        let LifecycleEngine {
            request,
            policy,
            tracker,
            decisions,
            finalizer,
            checkpoint,
        } = self;

        info!("Approval request created at {}", request.ticket_url);
        info!("Waiting for approval at {}", request.ticket_url);

        let (latch, resolved) = ResolutionLatch::new();
        // dropping the set aborts both tasks, even if this future is cancelled
        let mut tasks = JoinSet::new();

        let remaining = (request.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let deadline = Instant::now() + remaining;
        {
            let latch = latch.clone();
            let ticket_url = request.ticket_url.clone();
            let failed = policy.fail_on_timeout;
            tasks.spawn(async move {
                sleep_until(deadline).await;
                info!("⏱️ Approval request timed out");
                latch.resolve(Verdict::TimedOut {
                    failed,
                    ticket_url,
                    timestamp: Utc::now(),
                });
            });
        }

        {
            let poller = Poller {
                tracker,
                decisions,
                request: request.clone(),
                fail_on_rejection: policy.fail_on_rejection,
                seen: HashSet::new(),
            };
            let latch = latch.clone();
            let poll_interval = policy.poll_interval;
            tasks.spawn(async move { poller.run(poll_interval, &latch).await });
        }

        let verdict = match resolved.await {
            Ok(verdict) => verdict,
            Err(_) => {
                // both tasks ended without resolving (e.g. a panic); report a timeout
                warn!("Approval tasks stopped without a verdict; treating as timeout");
                Verdict::TimedOut {
                    failed: policy.fail_on_timeout,
                    ticket_url: request.ticket_url.clone(),
                    timestamp: Utc::now(),
                }
            }
        };
        tasks.abort_all();
        debug!("Resolved approval for issue #{}: {}", request.id, verdict);

        let finalization = finalizer.finalize(&verdict, request.id).await;
        if finalization.closed {
            if let Some(checkpoint) = checkpoint {
                if let Err(e) = checkpoint.release() {
                    warn!("Failed to release approval checkpoint: {:#}", e);
                }
            }
        }
        verdict
    }
}

/// State owned by the poll task.
struct Poller {
    tracker: Arc<dyn TicketTracker>,
    decisions: PolicyEngine,
    request: ApprovalRequest,
    fail_on_rejection: bool,
    /// Comments already judged indeterminate; never re-decided
    seen: HashSet<u64>,
}

impl Poller {
    async fn run(mut self, poll_interval: Duration, latch: &ResolutionLatch) {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if latch.is_resolved() {
                return;
            }
            match self.poll_once(latch).await {
                Some(verdict) => {
                    latch.resolve(verdict);
                    return;
                }
                None => info!("Still waiting for approval at {}", self.request.ticket_url),
            }
        }
    }

    /// One poll cycle: ticket state first, then new comments in order.
    async fn poll_once(&mut self, latch: &ResolutionLatch) -> Option<Verdict> {
        let id = self.request.id;

        match self.tracker.get_ticket(id).await {
            Ok(ticket) if ticket.state == TicketState::Closed => {
                info!("Issue was closed unexpectedly, treating as rejection");
                return Some(Verdict::Rejected {
                    approvers: Vec::new(),
                    failed: true,
                    ticket_url: self.request.ticket_url.clone(),
                    timestamp: Utc::now(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to check state of issue #{}: {}", id, e);
                return None;
            }
        }

        if latch.is_resolved() {
            return None;
        }
        let comments = match self
            .tracker
            .list_comments(id, Some(self.request.created_at))
            .await
        {
            Ok(comments) => comments,
            Err(e) => {
                warn!("Failed to list comments on issue #{}: {}", id, e);
                return None;
            }
        };
        debug!("Found {} comments on issue #{}", comments.len(), id);

        for comment in comments {
            if self.seen.contains(&comment.id) {
                continue;
            }
            if latch.is_resolved() {
                return None;
            }
            match self.decisions.decide(&comment).await {
                Ok(Decision::Approved) => {
                    return Some(Verdict::Approved {
                        approvers: vec![comment.author],
                        ticket_url: self.request.ticket_url.clone(),
                        timestamp: Utc::now(),
                    });
                }
                Ok(Decision::Rejected) => {
                    return Some(Verdict::Rejected {
                        approvers: vec![comment.author],
                        failed: self.fail_on_rejection,
                        ticket_url: self.request.ticket_url.clone(),
                        timestamp: Utc::now(),
                    });
                }
                Ok(Decision::Indeterminate) => {
                    self.seen.insert(comment.id);
                }
                Err(e) => {
                    // left out of `seen` so the next cycle retries it
                    warn!(
                        "Failed to process comment {} from {}: {}",
                        comment.id, comment.author, e
                    );
                }
            }
        }
        None
    }
}
