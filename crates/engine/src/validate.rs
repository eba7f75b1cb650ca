//! Definition validation: run this before compiling or registering a workflow.
//!
//! Rules enforced (fail-fast, first violation wins):
//! 1. The workflow has at least one step.
//! 2. Step IDs are unique.
//! 3. Every step has at least one sequential or parallel action.
//! 4. Final steps declare no success/fail transition.
//! 5. Condition expressions parse.
//! 6. Every transition and condition target names an existing step.
//! 7. At least one step is final.  Reachability is not checked.

use std::collections::HashSet;

use crate::expression::ExpressionEvaluator;
use crate::models::WorkflowDefinition;
use crate::EngineError;

/// Validate a workflow definition.
///
/// # Errors
/// Returns the [`EngineError`] definition variant for the first rule broken.
pub fn validate(
    definition: &WorkflowDefinition,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<(), EngineError> {
    if definition.steps.is_empty() {
        return Err(EngineError::EmptyWorkflow(definition.id.clone()));
    }

    // -----------------------------------------------------------------------
    // Per-step checks
    // -----------------------------------------------------------------------
    let mut step_ids: HashSet<&str> = HashSet::new();
    for step in &definition.steps {
        if !step_ids.insert(step.id.as_str()) {
            return Err(EngineError::DuplicateStepId {
                workflow_id: definition.id.clone(),
                step_id: step.id.clone(),
            });
        }

        if step.actions.is_empty() && step.parallel_actions.is_empty() {
            return Err(EngineError::StepWithoutActions(step.id.clone()));
        }

        if step.is_final && (step.success_step.is_some() || step.fail_step.is_some()) {
            return Err(EngineError::FinalStepWithTransitions(step.id.clone()));
        }

        for condition in &step.conditions {
            if !evaluator.is_valid(&condition.expression) {
                return Err(EngineError::InvalidExpression {
                    step_id: step.id.clone(),
                    expression: condition.expression.clone(),
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------
    for step in &definition.steps {
        let targets = step
            .success_step
            .iter()
            .map(|t| (t, "success"))
            .chain(step.fail_step.iter().map(|t| (t, "fail")))
            .chain(step.conditions.iter().map(|c| (&c.target_step_id, "condition")));

        for (target, kind) in targets {
            if !step_ids.contains(target.as_str()) {
                return Err(EngineError::UnknownStepReference {
                    step_id: step.id.clone(),
                    target: target.clone(),
                    kind,
                });
            }
        }
    }

    if !definition.steps.iter().any(|s| s.is_final) {
        return Err(EngineError::NoFinalStep(definition.id.clone()));
    }

    Ok(())
}
