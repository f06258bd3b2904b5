//! Runner environment (`GITHUB_*` variables).

use crate::config::ConfigError;
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// `owner/repo` pair identifying the repository that hosts the tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Invalid {
            name: "GITHUB_REPOSITORY".to_string(),
            value: format!("'{}' (expected owner/repo)", raw),
        };
        let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;
        let valid = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(name) {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Context of the workflow run that requested approval.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerContext {
    pub repo: RepoRef,
    pub api_url: String,
    pub server_url: String,
    pub workflow: String,
    /// Job id as written in the workflow file
    pub job: String,
    pub action: String,
    pub actor: String,
    pub event_name: String,
    pub run_id: u64,
}

impl RunnerContext {
    /// Read the context from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or(default).to_string();

        let repo = get("GITHUB_REPOSITORY")
            .ok_or_else(|| ConfigError::Missing("GITHUB_REPOSITORY".to_string()))?;
        let run_id = match get("GITHUB_RUN_ID") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "GITHUB_RUN_ID".to_string(),
                value: raw.to_string(),
            })?,
            None => 0,
        };

        Ok(Self {
            repo: RepoRef::parse(repo)?,
            api_url: or_default("GITHUB_API_URL", DEFAULT_API_URL),
            server_url: or_default("GITHUB_SERVER_URL", DEFAULT_SERVER_URL),
            workflow: or_default("GITHUB_WORKFLOW", "undefined-workflow"),
            job: or_default("GITHUB_JOB", "undefined-job"),
            action: or_default("GITHUB_ACTION", "undefined-action"),
            actor: or_default("GITHUB_ACTOR", "undefined-actor"),
            event_name: or_default("GITHUB_EVENT_NAME", "undefined-event"),
            run_id,
        })
    }

    /// Link to the workflow run page.
    pub fn run_url(&self) -> String {
        format!(
            "{}/{}/{}/actions/runs/{}",
            self.server_url.trim_end_matches('/'),
            self.repo.owner,
            self.repo.name,
            self.run_id
        )
    }
}
