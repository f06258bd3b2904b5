//! Comment decision function.
//!
//! Maps one comment to approved, rejected or indeterminate. Rejection
//! keywords are checked before approval keywords, so a permitted comment
//! carrying both resolves to a rejection. A keyword class from an author who
//! fails the permission check falls through to the next class.
//!
//! Permission results are never cached: each matching keyword class costs
//! one permission lookup, and a comment costs at most two.

use crate::approval::types::Comment;
use crate::policy::permission::PermissionChecker;
use crate::policy::types::{Decision, Policy};
use crate::tracker::TrackerResult;
use std::sync::Arc;
use tracing::debug;

pub struct PolicyEngine {
    policy: Arc<Policy>,
    permissions: PermissionChecker,
}

impl PolicyEngine {
    pub fn new(policy: Arc<Policy>, permissions: PermissionChecker) -> Self {
        Self {
            policy,
            permissions,
        }
    }

    /// Decide what a single comment means under the policy.
    pub async fn decide(&self, comment: &Comment) -> TrackerResult<Decision> {
        let body = comment.body.to_lowercase();
        debug!(
            "Processing comment {} from {}: \"{}\"",
            comment.id,
            comment.author,
            preview(&body, 100)
        );

        if contains_any(&body, &self.policy.rejection_keywords) {
            let permitted = self.permissions.is_allowed(&comment.author).await?;
            debug!("Rejection from {} permitted? {}", comment.author, permitted);
            if permitted {
                return Ok(Decision::Rejected);
            }
        }

        if contains_any(&body, &self.policy.approval_keywords) {
            let permitted = self.permissions.is_allowed(&comment.author).await?;
            debug!("Approval from {} permitted? {}", comment.author, permitted);
            if permitted {
                return Ok(Decision::Approved);
            }
        }

        debug!("No actionable keywords in comment from {}", comment.author);
        Ok(Decision::Indeterminate)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

/// Whether any of the (already lower-cased) keywords occurs in `body`.
pub fn contains_any(body: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| body.contains(k.as_str()))
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
