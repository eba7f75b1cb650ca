//! The `Executor` trait: the contract an action backend must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::{ActionError, ActionRef};

/// Dispatches actions and hands back their results.
///
/// Dispatch is fire-and-forget: the engine never waits on an action.  The
/// host tells the engine when an action finished (`action_received`) and the
/// engine then calls [`Executor::get_action_result`].
#[async_trait]
pub trait Executor: Send + Sync {
    /// Schedule a single action, optionally with a caller-supplied argument.
    async fn schedule_action(
        &self,
        action: &ActionRef,
        argument: Option<&Value>,
    ) -> Result<(), ActionError>;

    /// Schedule a group of actions that run concurrently.
    async fn schedule_parallel_actions(&self, actions: &[ActionRef]) -> Result<(), ActionError>;

    /// Schedule an action to start after `delay_seconds`.
    ///
    /// The engine's own delay and retry paths do not use this; they park the
    /// instance in `Waiting` and resume it from `tick`.
    async fn schedule_delayed_action(
        &self,
        action: &ActionRef,
        delay_seconds: u64,
        argument: Option<&Value>,
    ) -> Result<(), ActionError>;

    async fn is_action_completed(&self, action: &ActionRef) -> Result<bool, ActionError>;

    /// Fetch the raw result of a completed action.
    async fn get_action_result(&self, action: &ActionRef) -> Result<Value, ActionError>;

    /// Ask the backend to abandon an action.  Returns whether it was cancelled.
    async fn cancel_action(&self, action: &ActionRef) -> Result<bool, ActionError>;
}

/// Decide whether an action result counts as a success.
///
/// - a JSON boolean is used as-is;
/// - an object with a boolean `success` member reports its own outcome;
/// - anything else (null, numbers, strings, other objects) is a success.
pub fn is_success(result: &Value) -> bool {
    match result {
        Value::Bool(ok) => *ok,
        Value::Object(map) => map.get("success").and_then(Value::as_bool).unwrap_or(true),
        _ => true,
    }
}
