//! Resumable checkpoint of the open approval request.
//!
//! The main phase saves the request right after the ticket is created, so a
//! separate cleanup phase (run when the job is cancelled) can still find and
//! close the ticket.

use crate::approval::types::ApprovalRequest;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key under which the request is stored.
pub const CHECKPOINT_KEY: &str = "approval_request";

/// Host key/value persistence for one run. Empty values read back as `None`.
pub trait StateStore: Send + Sync {
    fn save_state(&self, key: &str, value: &str) -> Result<()>;
    fn get_state(&self, key: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct Checkpoint {
    store: Arc<dyn StateStore>,
}

impl Checkpoint {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, request: &ApprovalRequest) -> Result<()> {
        let json = serde_json::to_string(request).context("Failed to serialize approval request")?;
        self.store
            .save_state(CHECKPOINT_KEY, &json)
            .context("Failed to save approval checkpoint")
    }

    pub fn load(&self) -> Result<Option<ApprovalRequest>> {
        let Some(json) = self.store.get_state(CHECKPOINT_KEY)? else {
            return Ok(None);
        };
        if json.trim().is_empty() {
            return Ok(None);
        }
        let request = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse approval checkpoint: {}", json))?;
        Ok(Some(request))
    }

    /// Overwrite the checkpoint with an empty value once the ticket is closed.
    pub fn release(&self) -> Result<()> {
        self.store
            .save_state(CHECKPOINT_KEY, "")
            .context("Failed to release approval checkpoint")
    }
}

/// In-memory `StateStore` for tests and single-process runs.
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn save_state(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_state(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned())
    }
}
