//! Step inputs.
//!
//! Names follow the action's input names; the runner exports each one as
//! `INPUT_<NAME>` with the name upper-cased and hyphens kept.

use crate::config::ConfigError;
use crate::policy::Policy;
use clap::Args;
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct Inputs {
    /// Seconds to wait for a response before timing out
    #[arg(long, env = "INPUT_TIMEOUT-SECONDS")]
    pub timeout_seconds: String,

    /// Seconds between two checks of the approval issue
    #[arg(long, env = "INPUT_POLL-INTERVAL-SECONDS")]
    pub poll_interval_seconds: String,

    /// Comma-separated approval keywords (default: approved!)
    #[arg(long, env = "INPUT_APPROVAL-KEYWORDS", default_value = "")]
    pub approval_keywords: String,

    /// Comma-separated rejection keywords (default: none)
    #[arg(long, env = "INPUT_REJECTION-KEYWORDS", default_value = "")]
    pub rejection_keywords: String,

    /// Fail the step when the request is rejected
    #[arg(long, env = "INPUT_FAIL-ON-REJECTION", default_value = "true")]
    pub fail_on_rejection: String,

    /// Fail the step when the request times out
    #[arg(long, env = "INPUT_FAIL-ON-TIMEOUT", default_value = "true")]
    pub fail_on_timeout: String,

    /// Issue title template
    #[arg(long, env = "INPUT_ISSUE-TITLE", default_value = "")]
    pub issue_title: String,

    /// Issue body template
    #[arg(long, env = "INPUT_ISSUE-BODY", default_value = "")]
    pub issue_body: String,

    /// Comma-separated allowed approvers: usernames, `anyone`, `author`, `team:<slug>`
    #[arg(long, env = "INPUT_APPROVERS", default_value = "")]
    pub approvers: String,

    /// Token used for the GitHub API (falls back to GITHUB_TOKEN)
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

impl Inputs {
    /// Validate the inputs and build the run's policy.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        let timeout = positive_seconds("timeout-seconds", &self.timeout_seconds)?;
        let poll_interval = positive_seconds("poll-interval-seconds", &self.poll_interval_seconds)?;

        Ok(Policy::new(timeout, poll_interval)?
            .with_approval_keywords(&comma_separated(&self.approval_keywords))
            .with_rejection_keywords(&comma_separated(&self.rejection_keywords))
            .with_fail_on_rejection(parse_bool("fail-on-rejection", &self.fail_on_rejection)?)
            .with_fail_on_timeout(parse_bool("fail-on-timeout", &self.fail_on_timeout)?)
            .with_approvers(&comma_separated(&self.approvers)))
    }

    /// The API token: the explicit input first, then `GITHUB_TOKEN`.
    pub fn token(&self) -> Result<String, ConfigError> {
        resolve_token(self.github_token.as_deref())
    }
}

/// A non-blank explicit token, else `GITHUB_TOKEN`.
pub fn resolve_token(explicit: Option<&str>) -> Result<String, ConfigError> {
    explicit
        .map(str::to_string)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConfigError::Missing("github-token (or GITHUB_TOKEN)".to_string()))
}

/// Split a comma-separated list, trimming and dropping empty entries.
pub fn comma_separated(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Parse a positive (possibly fractional) number of seconds.
pub fn positive_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let non_positive = || ConfigError::NonPositive {
        name: name.to_string(),
        value: raw.to_string(),
    };
    let seconds: f64 = raw.trim().parse().map_err(|_| non_positive())?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(non_positive());
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| non_positive())
}

/// Boolean inputs accept the YAML 1.2 core schema spellings only.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(ConfigError::Invalid {
            name: name.to_string(),
            value: format!(
                "'{}' (expected one of: true | True | TRUE | false | False | FALSE)",
                other
            ),
        }),
    }
}
