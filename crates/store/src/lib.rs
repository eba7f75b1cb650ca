//! `store` crate — the persisted instance record and the `Storage` capability.
//!
//! Provides the [`WorkflowState`] snapshot with its copy-on-write update
//! operations, the [`Storage`] trait hosts implement for durability, and an
//! [`InMemoryStorage`] for embedding and tests.  No routing logic lives here.

pub mod error;
pub mod models;
pub mod storage;
pub mod memory;

pub use error::StoreError;
pub use memory::InMemoryStorage;
pub use models::{HistoryEntry, WorkflowState, WorkflowStatus};
pub use storage::Storage;
