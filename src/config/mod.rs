//! Pipeline inputs and runner environment.
//!
//! The runner hands step inputs over as `INPUT_<NAME>` environment variables,
//! so every input is a clap argument with an `env` fallback. Validation turns
//! raw inputs into the immutable `Policy`.

pub mod environment;
pub mod inputs;

use thiserror::Error;

pub use environment::{RepoRef, RunnerContext};
pub use inputs::{resolve_token, Inputs};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name}: {value} (must be a positive number)")]
    NonPositive { name: String, value: String },

    #[error("Invalid {name}: {value}")]
    Invalid { name: String, value: String },

    #[error("Missing required {0}")]
    Missing(String),
}
