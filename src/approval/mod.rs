pub mod checkpoint;
pub mod cleanup;
pub mod finalizer;
pub mod initiator;
pub mod lifecycle;
pub mod types;

pub use checkpoint::{Checkpoint, MemoryStateStore, StateStore};
pub use cleanup::cleanup;
pub use finalizer::{Finalization, Finalizer};
pub use initiator::RequestInitiator;
pub use lifecycle::LifecycleEngine;
pub use types::{ApprovalRequest, Comment, Verdict};
