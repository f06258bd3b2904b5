//! Approvalctl — manual approval gate for CI pipelines.
//!
//! This library exposes the core components of approvalctl for integration
//! testing and programmatic use. The binary entrypoint is in `main.rs`.

pub mod actions;
pub mod approval;
pub mod cli;
pub mod config;
pub mod content;
pub mod policy;
pub mod tracker;
