//! `MockExecutor`: a test double for `Executor`.
//!
//! Records every dispatch in call order and serves results that the test
//! injects with [`MockExecutor::complete_action`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::{ActionError, ActionRef, Executor};

/// One recorded dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAction {
    pub action: ActionRef,
    pub argument: Option<Value>,
    /// Set only for `schedule_delayed_action`.
    pub delay_seconds: Option<u64>,
}

#[derive(Default)]
struct Inner {
    scheduled: Vec<ScheduledAction>,
    results: HashMap<String, Value>,
    completed: HashMap<String, bool>,
}

/// An in-process executor that never runs anything.
#[derive(Default)]
pub struct MockExecutor {
    inner: Mutex<Inner>,
    /// When set, every dispatch fails with this message.
    dispatch_failure: Option<String>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose dispatch calls always fail.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            dispatch_failure: Some(message.into()),
        }
    }

    /// Mark an action finished with the given raw result.
    pub fn complete_action(&self, action: impl Into<ActionRef>, result: Value) {
        let action = action.into();
        let mut inner = self.inner.lock();
        inner.results.insert(action.name().to_owned(), result);
        inner.completed.insert(action.name().to_owned(), true);
    }

    /// All dispatches seen so far, in call order.
    pub fn scheduled_actions(&self) -> Vec<ScheduledAction> {
        self.inner.lock().scheduled.clone()
    }

    /// Names of all dispatched actions, in call order.
    pub fn scheduled_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .scheduled
            .iter()
            .map(|s| s.action.name().to_owned())
            .collect()
    }

    pub fn scheduled_count(&self) -> usize {
        self.inner.lock().scheduled.len()
    }

    pub fn clear(&self) {
        *self.inner.lock() = Inner::default();
    }

    fn record(
        &self,
        action: &ActionRef,
        argument: Option<&Value>,
        delay_seconds: Option<u64>,
    ) -> Result<(), ActionError> {
        if let Some(message) = &self.dispatch_failure {
            return Err(ActionError::Dispatch {
                action: action.name().to_owned(),
                message: message.clone(),
            });
        }

        debug!("mock executor scheduled '{}'", action);
        let mut inner = self.inner.lock();
        inner.scheduled.push(ScheduledAction {
            action: action.clone(),
            argument: argument.cloned(),
            delay_seconds,
        });
        inner.completed.insert(action.name().to_owned(), false);
        Ok(())
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn schedule_action(
        &self,
        action: &ActionRef,
        argument: Option<&Value>,
    ) -> Result<(), ActionError> {
        self.record(action, argument, None)
    }

    async fn schedule_parallel_actions(&self, actions: &[ActionRef]) -> Result<(), ActionError> {
        for action in actions {
            self.record(action, None, None)?;
        }
        Ok(())
    }

    async fn schedule_delayed_action(
        &self,
        action: &ActionRef,
        delay_seconds: u64,
        argument: Option<&Value>,
    ) -> Result<(), ActionError> {
        self.record(action, argument, Some(delay_seconds))
    }

    async fn is_action_completed(&self, action: &ActionRef) -> Result<bool, ActionError> {
        Ok(self
            .inner
            .lock()
            .completed
            .get(action.name())
            .copied()
            .unwrap_or(false))
    }

    async fn get_action_result(&self, action: &ActionRef) -> Result<Value, ActionError> {
        Ok(self
            .inner
            .lock()
            .results
            .get(action.name())
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn cancel_action(&self, action: &ActionRef) -> Result<bool, ActionError> {
        let mut inner = self.inner.lock();
        inner.results.remove(action.name());
        inner.completed.remove(action.name());
        Ok(true)
    }
}
