pub mod engine;
pub mod permission;
pub mod types;

pub use engine::PolicyEngine;
pub use permission::PermissionChecker;
pub use types::*;
