//! Core types for approval policy evaluation.
//!
//! A `Policy` is built once from validated inputs and never changes for the
//! rest of the run. Keywords are normalized (trimmed, lower-cased) at build
//! time so matching a comment is a plain substring search.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Keyword used when no approval keywords are configured.
pub const DEFAULT_APPROVAL_KEYWORD: &str = "approved!";

/// Immutable approval policy for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// How long to wait for a response before timing out
    pub timeout: Duration,
    /// Delay between two poll cycles
    pub poll_interval: Duration,
    /// Lower-cased approval keywords, never empty
    pub approval_keywords: Vec<String>,
    /// Lower-cased rejection keywords; empty disables rejection by keyword
    pub rejection_keywords: Vec<String>,
    pub fail_on_rejection: bool,
    pub fail_on_timeout: bool,
    /// Allowed approvers: usernames, `anyone`, `author` or `team:<slug>`.
    /// Empty means "anyone with write access to the repository".
    pub approvers: Vec<String>,
}

impl Policy {
    /// Create a policy with default keywords and failing rejection/timeout.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::NonPositive {
                name: "timeout-seconds".to_string(),
                value: format!("{}", timeout.as_secs_f64()),
            });
        }
        if poll_interval.is_zero() {
            return Err(ConfigError::NonPositive {
                name: "poll-interval-seconds".to_string(),
                value: format!("{}", poll_interval.as_secs_f64()),
            });
        }

        Ok(Self {
            timeout,
            poll_interval,
            approval_keywords: vec![DEFAULT_APPROVAL_KEYWORD.to_string()],
            rejection_keywords: Vec::new(),
            fail_on_rejection: true,
            fail_on_timeout: true,
            approvers: Vec::new(),
        })
    }

    /// Set approval keywords. An empty list falls back to `approved!`.
    pub fn with_approval_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        let keywords = normalize_keywords(keywords);
        self.approval_keywords = if keywords.is_empty() {
            vec![DEFAULT_APPROVAL_KEYWORD.to_string()]
        } else {
            keywords
        };
        self
    }

    /// Set rejection keywords. No default: empty disables keyword rejection.
    pub fn with_rejection_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        self.rejection_keywords = normalize_keywords(keywords);
        self
    }

    pub fn with_fail_on_rejection(mut self, fail: bool) -> Self {
        self.fail_on_rejection = fail;
        self
    }

    pub fn with_fail_on_timeout(mut self, fail: bool) -> Self {
        self.fail_on_timeout = fail;
        self
    }

    pub fn with_approvers<S: AsRef<str>>(mut self, approvers: &[S]) -> Self {
        self.approvers = approvers
            .iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        self
    }
}

fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Outcome of evaluating a single comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    /// No permitted keyword match; keep waiting.
    Indeterminate,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Decision::Indeterminate)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => write!(f, "approved"),
            Decision::Rejected => write!(f, "rejected"),
            Decision::Indeterminate => write!(f, "indeterminate"),
        }
    }
}
