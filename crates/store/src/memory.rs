//! In-memory `Storage` implementation.
//!
//! Nothing survives the process.  Listings are ordered by creation time
//! (then instance id) so sweeps over them are deterministic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::trace;

use crate::{Storage, StoreError, WorkflowState, WorkflowStatus};

#[derive(Default)]
pub struct InMemoryStorage {
    states: RwLock<HashMap<String, WorkflowState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored snapshot.
    pub fn all(&self) -> Vec<WorkflowState> {
        self.collect(|_| true)
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    pub fn clear(&self) {
        self.states.write().clear();
    }

    fn collect(&self, keep: impl Fn(&WorkflowState) -> bool) -> Vec<WorkflowState> {
        let states = self.states.read();
        let mut found: Vec<WorkflowState> = states.values().filter(|s| keep(s)).cloned().collect();
        found.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.instance_id().cmp(b.instance_id()))
        });
        found
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        trace!(instance_id = state.instance_id(), status = %state.status(), "saving snapshot");
        self.states
            .write()
            .insert(state.instance_id().to_owned(), state.clone());
        Ok(())
    }

    async fn load(&self, instance_id: &str) -> Result<WorkflowState, StoreError> {
        self.states
            .read()
            .get(instance_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(instance_id.to_owned()))
    }

    async fn delete(&self, instance_id: &str) -> Result<(), StoreError> {
        self.states.write().remove(instance_id);
        Ok(())
    }

    async fn exists(&self, instance_id: &str) -> Result<bool, StoreError> {
        Ok(self.states.read().contains_key(instance_id))
    }

    async fn find_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<WorkflowState>, StoreError> {
        Ok(self.collect(|s| s.status() == status))
    }

    async fn find_scheduled_before(
        &self,
        time: DateTime<Utc>,
    ) -> Result<Vec<WorkflowState>, StoreError> {
        Ok(self.collect(|s| s.scheduled_at().is_some_and(|at| at < time)))
    }
}
