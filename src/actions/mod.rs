//! Runner file commands.
//!
//! Step outputs and saved state are appended to the files named by
//! `GITHUB_OUTPUT` and `GITHUB_STATE` using the heredoc form
//! `name<<DELIM\nvalue\nDELIM\n`. Saved state comes back to the post phase as
//! `STATE_<name>` environment variables.

use crate::approval::checkpoint::StateStore;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const STATE_ENV_PREFIX: &str = "STATE_";

pub struct FileCommands {
    output_file: Option<PathBuf>,
    state_file: Option<PathBuf>,
    /// State saved by the main phase, keyed without the `STATE_` prefix
    saved_state: HashMap<String, String>,
}

impl FileCommands {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        let file_var = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };
        let saved_state = std::env::vars()
            .filter_map(|(k, v)| k.strip_prefix(STATE_ENV_PREFIX).map(|k| (k.to_string(), v)))
            .collect();

        Self {
            output_file: file_var("GITHUB_OUTPUT"),
            state_file: file_var("GITHUB_STATE"),
            saved_state,
        }
    }

    /// Build with explicit files and previously saved state (for testing).
    pub fn new(
        output_file: Option<PathBuf>,
        state_file: Option<PathBuf>,
        saved_state: HashMap<String, String>,
    ) -> Self {
        Self {
            output_file,
            state_file,
            saved_state,
        }
    }

    /// Set a step output. Without an output file the value is only logged.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        match self.output_file {
            Some(ref path) => append_file_command(path, name, value),
            None => {
                tracing::info!("Output {}={}", name, value);
                Ok(())
            }
        }
    }
}

impl StateStore for FileCommands {
    fn save_state(&self, key: &str, value: &str) -> Result<()> {
        match self.state_file {
            Some(ref path) => append_file_command(path, key, value),
            None => {
                tracing::warn!(
                    "GITHUB_STATE is not set; state '{}' will not reach the cleanup phase",
                    key
                );
                Ok(())
            }
        }
    }

    fn get_state(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .saved_state
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned())
    }
}

/// Append `name<<DELIM\nvalue\nDELIM\n` to a runner command file.
fn append_file_command(path: &Path, name: &str, value: &str) -> Result<()> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    if name.contains(&delimiter) || value.contains(&delimiter) {
        bail!("Unexpected input: value should not contain the delimiter {}", delimiter);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open command file: {}", path.display()))?;
    write!(file, "{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)
        .with_context(|| format!("Failed to write command file: {}", path.display()))?;
    file.flush()?;
    Ok(())
}

/// Workflow command that marks the step as failed in the run log.
pub fn error_annotation(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Parse a command file back into name/value pairs (last write wins).
#[cfg(test)]
pub(crate) fn parse_file_commands(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let Some((name, delimiter)) = line.split_once("<<") else {
            continue;
        };
        let mut value = Vec::new();
        for body_line in lines.by_ref() {
            if body_line == delimiter {
                break;
            }
            value.push(body_line);
        }
        values.insert(name.to_string(), value.join("\n"));
    }
    values
}
