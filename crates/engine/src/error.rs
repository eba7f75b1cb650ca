//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the workflow engine (definition checks + runtime).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Definition errors ------

    /// The workflow declares no steps.
    #[error("workflow '{0}' must have at least one step")]
    EmptyWorkflow(String),

    /// Two or more steps share the same ID.
    #[error("duplicate step ID '{step_id}' in workflow '{workflow_id}'")]
    DuplicateStepId { workflow_id: String, step_id: String },

    /// A step with neither sequential nor parallel actions.
    #[error("step '{0}' must have at least one action")]
    StepWithoutActions(String),

    /// A final step declaring a success or fail transition.
    #[error("final step '{0}' cannot have transitions")]
    FinalStepWithTransitions(String),

    /// A transition or condition targets a step that doesn't exist.
    #[error("step '{step_id}' references non-existent {kind} step '{target}'")]
    UnknownStepReference {
        step_id: String,
        target: String,
        kind: &'static str,
    },

    /// The expression evaluator rejected a condition.
    #[error("invalid expression '{expression}' in step '{step_id}'")]
    InvalidExpression { step_id: String, expression: String },

    #[error("workflow '{0}' must have at least one final step")]
    NoFinalStep(String),

    /// Interchange document is structurally wrong.
    #[error("invalid workflow document: {0}")]
    Schema(String),

    #[error("invalid workflow JSON: {0}")]
    Json(#[from] serde_json::Error),

    // ------ Lookup errors ------

    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("workflow instance '{0}' not found")]
    InstanceNotFound(String),

    // ------ Runtime errors ------

    /// A runtime reference to a step the compiled graph doesn't have.
    #[error("step '{step_id}' not found in workflow '{workflow_id}'")]
    StepTransition { workflow_id: String, step_id: String },

    #[error("storage error: {0}")]
    Storage(#[from] store::StoreError),

    #[error("executor error: {0}")]
    Action(#[from] actions::ActionError),

    /// Writing a compiled workflow back out failed.
    #[error("cannot serialize workflow: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("i/o error on '{path}': {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Structurally invalid workflow definition.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyWorkflow(_)
                | Self::DuplicateStepId { .. }
                | Self::StepWithoutActions(_)
                | Self::FinalStepWithTransitions(_)
                | Self::UnknownStepReference { .. }
                | Self::InvalidExpression { .. }
                | Self::NoFinalStep(_)
                | Self::Schema(_)
                | Self::Json(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::WorkflowNotFound(_) | Self::InstanceNotFound(_))
    }
}
