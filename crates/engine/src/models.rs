//! Authoring-time domain models for the workflow engine.
//!
//! A [`WorkflowDefinition`] is plain data: build it up with the by-value
//! methods below (or deserialize it, see [`crate::schema`]), then hand it to
//! [`crate::compile`] to get the frozen, validated graph the runtime uses.

use actions::ActionRef;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// How the delay grows between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

/// Same-step retry on a failed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first failure.
    pub max_attempts: u32,
    /// Base delay; 0 re-dispatches immediately.
    pub delay_seconds: u64,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_seconds: u64, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            delay_seconds,
            backoff,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        match self.backoff {
            Backoff::Fixed => self.delay_seconds,
            Backoff::Linear => self.delay_seconds.saturating_mul(u64::from(attempt)),
            Backoff::Exponential => {
                let factor = 2u64
                    .checked_pow(attempt.saturating_sub(1))
                    .unwrap_or(u64::MAX);
                self.delay_seconds.saturating_mul(factor)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Conditional route: if `expression` evaluates to `true`, go to `target_step_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub expression: String,
    pub target_step_id: String,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// StepDefinition
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique within the workflow (referenced by transitions and conditions).
    pub id: String,
    pub actions: Vec<ActionRef>,
    /// Dispatched together; the step exits once all of them reported.
    pub parallel_actions: Vec<ActionRef>,
    /// Checked in order on success, before `success_step`.
    pub conditions: Vec<Condition>,
    pub success_step: Option<String>,
    pub fail_step: Option<String>,
    /// Seconds to wait before entering the step.
    pub delay: Option<u64>,
    /// Seconds the step may run before it is routed to `fail_step`.
    pub timeout: Option<u64>,
    pub retry: Option<RetryPolicy>,
    pub is_final: bool,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
            parallel_actions: Vec::new(),
            conditions: Vec::new(),
            success_step: None,
            fail_step: None,
            delay: None,
            timeout: None,
            retry: None,
            is_final: false,
        }
    }

    pub fn actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ActionRef>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn parallel<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ActionRef>,
    {
        self.parallel_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn when(self, expression: impl Into<String>, target_step_id: impl Into<String>) -> Self {
        self.push_condition(expression.into(), target_step_id.into(), None)
    }

    pub fn when_described(
        self,
        expression: impl Into<String>,
        target_step_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.push_condition(
            expression.into(),
            target_step_id.into(),
            Some(description.into()),
        )
    }

    fn push_condition(
        mut self,
        expression: String,
        target_step_id: String,
        description: Option<String>,
    ) -> Self {
        self.conditions.push(Condition {
            expression,
            target_step_id,
            description,
        });
        self
    }

    pub fn on_success(mut self, step_id: impl Into<String>) -> Self {
        self.success_step = Some(step_id.into());
        self
    }

    pub fn on_fail(mut self, step_id: impl Into<String>) -> Self {
        self.fail_step = Some(step_id.into());
        self
    }

    pub fn delay(mut self, seconds: u64) -> Self {
        self.delay = Some(seconds);
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn retry(mut self, max_attempts: u32, delay_seconds: u64, backoff: Backoff) -> Self {
        self.retry = Some(RetryPolicy::new(max_attempts, delay_seconds, backoff));
        self
    }

    pub fn final_step(mut self) -> Self {
        self.is_final = true;
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

/// A complete workflow definition.  The first step is the entry step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Replace the step list.
    pub fn sequence(mut self, steps: impl IntoIterator<Item = StepDefinition>) -> Self {
        self.steps = steps.into_iter().collect();
        self
    }
}
