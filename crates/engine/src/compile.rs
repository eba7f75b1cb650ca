//! Compiled, execution-ready workflow graph.
//!
//! A [`CompiledWorkflow`] is built once from a definition and never mutated
//! afterwards.  The registry hands it out behind an `Arc`, so any number of
//! runtime calls can read it concurrently.

use std::collections::HashMap;

use actions::ActionRef;

use crate::expression::ExpressionEvaluator;
use crate::models::{Condition, RetryPolicy, WorkflowDefinition};
use crate::validate::validate;
use crate::EngineError;

/// Immutable mirror of a step definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStep {
    id: String,
    actions: Vec<ActionRef>,
    parallel_actions: Vec<ActionRef>,
    /// Sequential then parallel.
    all_actions: Vec<ActionRef>,
    conditions: Vec<Condition>,
    success_step: Option<String>,
    fail_step: Option<String>,
    delay: Option<u64>,
    timeout: Option<u64>,
    retry: Option<RetryPolicy>,
    is_final: bool,
}

impl CompiledStep {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[ActionRef] {
        &self.actions
    }

    pub fn parallel_actions(&self) -> &[ActionRef] {
        &self.parallel_actions
    }

    pub fn all_actions(&self) -> &[ActionRef] {
        &self.all_actions
    }

    pub fn has_parallel_actions(&self) -> bool {
        !self.parallel_actions.is_empty()
    }

    /// Whether this step is waiting on `action` (sequential or parallel).
    pub fn references(&self, action: &ActionRef) -> bool {
        self.all_actions.contains(action)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn success_step(&self) -> Option<&str> {
        self.success_step.as_deref()
    }

    pub fn fail_step(&self) -> Option<&str> {
        self.fail_step.as_deref()
    }

    pub fn delay(&self) -> Option<u64> {
        self.delay
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

/// Immutable workflow graph keyed by step id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledWorkflow {
    id: String,
    description: Option<String>,
    /// Declaration order.
    steps: Vec<CompiledStep>,
    index: HashMap<String, usize>,
    first_step_id: String,
}

impl CompiledWorkflow {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn first_step_id(&self) -> &str {
        &self.first_step_id
    }

    pub fn step(&self, step_id: &str) -> Option<&CompiledStep> {
        self.index.get(step_id).map(|&i| &self.steps[i])
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[CompiledStep] {
        &self.steps
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Compile a definition without validating it.
///
/// Only the empty-workflow check is made here; run [`validate`] first (or
/// use [`compile`]) for anything coming from outside the process.  A later
/// step reusing an id replaces the earlier one in place.
pub fn build(definition: &WorkflowDefinition) -> Result<CompiledWorkflow, EngineError> {
    let Some(first) = definition.steps.first() else {
        return Err(EngineError::EmptyWorkflow(definition.id.clone()));
    };

    let mut steps: Vec<CompiledStep> = Vec::with_capacity(definition.steps.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(definition.steps.len());

    for step in &definition.steps {
        let all_actions = step
            .actions
            .iter()
            .chain(step.parallel_actions.iter())
            .cloned()
            .collect();

        let compiled = CompiledStep {
            id: step.id.clone(),
            actions: step.actions.clone(),
            parallel_actions: step.parallel_actions.clone(),
            all_actions,
            conditions: step.conditions.clone(),
            success_step: step.success_step.clone(),
            fail_step: step.fail_step.clone(),
            delay: step.delay,
            timeout: step.timeout,
            retry: step.retry,
            is_final: step.is_final,
        };

        match index.get(&step.id) {
            Some(&i) => steps[i] = compiled,
            None => {
                index.insert(step.id.clone(), steps.len());
                steps.push(compiled);
            }
        }
    }

    Ok(CompiledWorkflow {
        id: definition.id.clone(),
        description: definition.description.clone(),
        steps,
        index,
        first_step_id: first.id.clone(),
    })
}

/// Validate then build.
pub fn compile(
    definition: &WorkflowDefinition,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<CompiledWorkflow, EngineError> {
    validate(definition, evaluator)?;
    build(definition)
}
