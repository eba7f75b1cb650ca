//! The `Storage` trait: how workflow instances are persisted.
//!
//! Every method returns a `Result<T, StoreError>`.  Implementations hold no
//! routing logic: they store and return whole [`WorkflowState`] snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{StoreError, WorkflowState, WorkflowStatus};

#[async_trait]
pub trait Storage: Send + Sync {
    /// Upsert by instance id.
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] if the instance is unknown.
    async fn load(&self, instance_id: &str) -> Result<WorkflowState, StoreError>;

    async fn delete(&self, instance_id: &str) -> Result<(), StoreError>;

    async fn exists(&self, instance_id: &str) -> Result<bool, StoreError>;

    async fn find_by_status(&self, status: WorkflowStatus)
        -> Result<Vec<WorkflowState>, StoreError>;

    /// Instances whose `scheduled_at` is strictly before `time`.
    async fn find_scheduled_before(
        &self,
        time: DateTime<Utc>,
    ) -> Result<Vec<WorkflowState>, StoreError>;
}
