//! Compiled workflows keyed by workflow id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::compile::CompiledWorkflow;
use crate::EngineError;

/// Shared lookup table the runtime resolves workflow ids against.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, Arc<CompiledWorkflow>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workflow; a later registration under the same id replaces it.
    pub fn register(&self, workflow: CompiledWorkflow) {
        info!("registering workflow '{}' ({} steps)", workflow.id(), workflow.steps().len());
        self.workflows
            .write()
            .insert(workflow.id().to_owned(), Arc::new(workflow));
    }

    /// # Errors
    /// [`EngineError::WorkflowNotFound`] if nothing is registered under `workflow_id`.
    pub fn get(&self, workflow_id: &str) -> Result<Arc<CompiledWorkflow>, EngineError> {
        self.workflows
            .read()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_owned()))
    }

    pub fn has(&self, workflow_id: &str) -> bool {
        self.workflows.read().contains_key(workflow_id)
    }

    /// Every registered workflow, ordered by id.
    pub fn all(&self) -> Vec<Arc<CompiledWorkflow>> {
        let mut all: Vec<_> = self.workflows.read().values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::build;
    use crate::models::{StepDefinition, WorkflowDefinition};

    fn single_step(id: &str, action: &str) -> CompiledWorkflow {
        build(
            &WorkflowDefinition::new(id)
                .step(StepDefinition::new("only").actions([action]).final_step()),
        )
        .unwrap()
    }

    #[test]
    fn get_returns_registered_workflow() {
        let registry = WorkflowRegistry::new();
        registry.register(single_step("orders", "A"));

        assert!(registry.has("orders"));
        assert_eq!(registry.get("orders").unwrap().id(), "orders");
    }

    #[test]
    fn unknown_workflow_is_not_found() {
        let registry = WorkflowRegistry::new();
        let err = registry.get("ghost").unwrap_err();
        assert!(matches!(err, EngineError::WorkflowNotFound(ref id) if id == "ghost"));
        assert!(err.is_not_found());
        assert!(!registry.has("ghost"));
    }

    #[test]
    fn last_registration_wins() {
        let registry = WorkflowRegistry::new();
        registry.register(single_step("orders", "Old"));
        registry.register(single_step("orders", "New"));

        assert_eq!(registry.len(), 1);
        let step = registry.get("orders").unwrap().step("only").cloned().unwrap();
        assert_eq!(step.actions()[0], "New");
    }

    #[test]
    fn all_is_sorted_by_id() {
        let registry = WorkflowRegistry::new();
        registry.register(single_step("zeta", "A"));
        registry.register(single_step("alpha", "A"));

        let ids: Vec<String> = registry.all().iter().map(|w| w.id().to_owned()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
