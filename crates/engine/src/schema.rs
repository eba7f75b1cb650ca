//! JSON interchange format for workflows.
//!
//! ```json
//! {
//!   "id": "orders",
//!   "description": "Order processing",
//!   "first_step": "validate",
//!   "steps": [{
//!     "id": "validate",
//!     "actions": ["ValidateOrder"],
//!     "parallel_actions": [],
//!     "conditions": [{ "expression": "result > 1000", "target_step": "review", "description": null }],
//!     "transitions": { "success": "ship", "fail": "cancel" },
//!     "delay": null,
//!     "timeout": 60,
//!     "retry": { "max_attempts": 3, "delay_seconds": 2, "backoff": "exponential" },
//!     "is_final": false
//!   }]
//! }
//! ```
//!
//! Serializing a compiled workflow, reading it back as a definition and
//! compiling again yields an identical graph.

use actions::ActionRef;
use serde::{Deserialize, Serialize};

use crate::compile::CompiledWorkflow;
use crate::models::{Backoff, Condition, RetryPolicy, StepDefinition, WorkflowDefinition};
use crate::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSchema {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Informational; the entry step is always the first listed step.
    #[serde(default)]
    pub first_step: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSchema {
    pub id: String,
    #[serde(default)]
    pub actions: Vec<ActionRef>,
    #[serde(default)]
    pub parallel_actions: Vec<ActionRef>,
    #[serde(default)]
    pub conditions: Vec<ConditionSchema>,
    #[serde(default)]
    pub transitions: TransitionsSchema,
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retry: Option<RetrySchema>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSchema {
    pub expression: String,
    pub target_step: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionsSchema {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub fail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySchema {
    pub max_attempts: u32,
    #[serde(default)]
    pub delay_seconds: u64,
    #[serde(default)]
    pub backoff: Backoff,
}

// ---------------------------------------------------------------------------
// compiled → document
// ---------------------------------------------------------------------------

impl From<&CompiledWorkflow> for WorkflowSchema {
    fn from(workflow: &CompiledWorkflow) -> Self {
        let steps = workflow
            .steps()
            .iter()
            .map(|step| StepSchema {
                id: step.id().to_owned(),
                actions: step.actions().to_vec(),
                parallel_actions: step.parallel_actions().to_vec(),
                conditions: step
                    .conditions()
                    .iter()
                    .map(|c| ConditionSchema {
                        expression: c.expression.clone(),
                        target_step: c.target_step_id.clone(),
                        description: c.description.clone(),
                    })
                    .collect(),
                transitions: TransitionsSchema {
                    success: step.success_step().map(str::to_owned),
                    fail: step.fail_step().map(str::to_owned),
                },
                delay: step.delay(),
                timeout: step.timeout(),
                retry: step.retry().map(|r| RetrySchema {
                    max_attempts: r.max_attempts,
                    delay_seconds: r.delay_seconds,
                    backoff: r.backoff,
                }),
                is_final: step.is_final(),
            })
            .collect();

        Self {
            id: workflow.id().to_owned(),
            description: workflow.description().map(str::to_owned),
            first_step: Some(workflow.first_step_id().to_owned()),
            steps,
        }
    }
}

impl CompiledWorkflow {
    pub fn to_schema(&self) -> WorkflowSchema {
        WorkflowSchema::from(self)
    }

    /// Pretty-printed interchange JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(&self.to_schema()).map_err(EngineError::Serialization)
    }
}

// ---------------------------------------------------------------------------
// document → definition
// ---------------------------------------------------------------------------

impl WorkflowSchema {
    /// Structural checks, then conversion.  Graph rules are left to the
    /// validator.
    pub fn into_definition(self) -> Result<WorkflowDefinition, EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::Schema("workflow id must be a non-empty string".into()));
        }
        if self.steps.is_empty() {
            return Err(EngineError::Schema(format!(
                "workflow '{}' must have at least one step",
                self.id
            )));
        }
        if let Some(index) = self.steps.iter().position(|s| s.id.trim().is_empty()) {
            return Err(EngineError::Schema(format!(
                "step at index {index} must have a non-empty id"
            )));
        }

        let steps = self.steps.into_iter().map(StepSchema::into_definition).collect();

        Ok(WorkflowDefinition {
            id: self.id,
            description: self.description,
            steps,
        })
    }
}

impl StepSchema {
    fn into_definition(self) -> StepDefinition {
        StepDefinition {
            id: self.id,
            actions: self.actions,
            parallel_actions: self.parallel_actions,
            conditions: self
                .conditions
                .into_iter()
                .map(|c| Condition {
                    expression: c.expression,
                    target_step_id: c.target_step,
                    description: c.description,
                })
                .collect(),
            success_step: self.transitions.success,
            fail_step: self.transitions.fail,
            delay: self.delay,
            timeout: self.timeout,
            retry: self
                .retry
                .map(|r| RetryPolicy::new(r.max_attempts, r.delay_seconds, r.backoff)),
            is_final: self.is_final,
        }
    }
}

impl WorkflowDefinition {
    pub fn from_schema(schema: WorkflowSchema) -> Result<Self, EngineError> {
        schema.into_definition()
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let schema: WorkflowSchema = serde_json::from_str(json)?;
        schema.into_definition()
    }
}
