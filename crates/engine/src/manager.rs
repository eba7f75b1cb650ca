//! Workflow runtime.
//!
//! `WorkflowManager` is the state machine that moves instances through a
//! compiled graph:
//! 1. `start` creates an instance at the entry step and dispatches its actions.
//! 2. `action_received` feeds a finished action's result through fan-in,
//!    retry, conditional routing and transitions.
//! 3. `tick` resumes parked instances whose time has come and fails over
//!    steps that ran past their timeout.
//!
//! Every change produces a new [`WorkflowState`] snapshot which is saved as
//! a whole.  Nothing here waits on an action: dispatch is fire-and-forget.
//!
//! # Concurrency
//! The manager does no per-instance locking.  Hosts must make sure at most
//! one `start`/`tick`/`action_received`/`cancel` call touches a given instance
//! at a time (single-owner dispatch, or optimistic versioning in their
//! `Storage`).

use std::sync::Arc;

use chrono::Duration;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use actions::{is_success, ActionRef, Executor};
use store::{Storage, StoreError, WorkflowState, WorkflowStatus};

use crate::clock::Clock;
use crate::compile::{CompiledStep, CompiledWorkflow};
use crate::expression::ExpressionEvaluator;
use crate::registry::WorkflowRegistry;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Prepended to every generated instance id.
    pub instance_id_prefix: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            instance_id_prefix: "wf_".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick outcome
// ---------------------------------------------------------------------------

/// What a single `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Waiting instances put back to work.
    pub resumed: usize,
    /// Running instances whose step exceeded its timeout.
    pub timed_out: usize,
}

// ---------------------------------------------------------------------------
// WorkflowManager
// ---------------------------------------------------------------------------

pub struct WorkflowManager {
    executor: Arc<dyn Executor>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    registry: Arc<WorkflowRegistry>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    config: ManagerConfig,
}

impl WorkflowManager {
    pub fn new(
        executor: Arc<dyn Executor>,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        registry: Arc<WorkflowRegistry>,
        evaluator: Arc<dyn ExpressionEvaluator>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            executor,
            storage,
            clock,
            registry,
            evaluator,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    /// Start a new instance with an empty context.
    ///
    /// `argument` is passed to each of the entry step's sequential actions.
    ///
    /// # Errors
    /// [`EngineError::WorkflowNotFound`] for an unregistered workflow, plus
    /// any storage or executor failure.
    pub async fn start(
        &self,
        workflow_id: &str,
        argument: Option<Value>,
    ) -> Result<String, EngineError> {
        self.start_with_context(workflow_id, argument, Map::new()).await
    }

    /// Start a new instance whose conditions see `context`.
    #[instrument(skip(self, argument, context))]
    pub async fn start_with_context(
        &self,
        workflow_id: &str,
        argument: Option<Value>,
        context: Map<String, Value>,
    ) -> Result<String, EngineError> {
        let workflow = self.registry.get(workflow_id)?;
        let first_step = step_of(&workflow, workflow.first_step_id())?;

        let instance_id = self.generate_instance_id();
        let state = WorkflowState::new(
            &instance_id,
            workflow_id,
            first_step.id(),
            context,
            self.clock.now(),
        );
        self.storage.save(&state).await?;

        self.dispatch_step(first_step, argument.as_ref()).await?;

        info!("started instance {} at step '{}'", instance_id, first_step.id());
        Ok(instance_id)
    }

    /// Heartbeat: resume due `Waiting` instances, then fail over timed-out
    /// `Running` ones.  Both lists are read before either sweep runs.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickSummary, EngineError> {
        let running = self.storage.find_by_status(WorkflowStatus::Running).await?;
        let waiting = self.storage.find_by_status(WorkflowStatus::Waiting).await?;
        let mut summary = TickSummary::default();

        for state in waiting {
            let due = state
                .scheduled_at()
                .is_some_and(|at| self.clock.is_past(at));
            if due {
                self.resume(state).await?;
                summary.resumed += 1;
            }
        }

        for state in running {
            if self.check_timeout(state).await? {
                summary.timed_out += 1;
            }
        }

        if summary != TickSummary::default() {
            debug!("tick resumed {} and timed out {}", summary.resumed, summary.timed_out);
        }
        Ok(summary)
    }

    /// The host reports that `action` finished.
    ///
    /// Every `Running` instance whose current step awaits the action gets the
    /// executor's result.  Returns how many instances were affected; a stray
    /// or duplicate notification affects none and is not an error.
    #[instrument(skip_all)]
    pub async fn action_received(
        &self,
        action: impl Into<ActionRef>,
    ) -> Result<usize, EngineError> {
        let action = action.into();
        let running = self.storage.find_by_status(WorkflowStatus::Running).await?;
        let mut affected = 0;

        for state in running {
            let workflow = self.registry.get(state.workflow_id())?;
            let Some(step) = workflow.step(state.current_step_id()) else {
                continue;
            };
            if !step.references(&action) {
                continue;
            }

            let result = self.executor.get_action_result(&action).await?;
            self.process_action_result(&workflow, step, state, &action, result)
                .await?;
            affected += 1;
        }

        if affected == 0 {
            debug!("no running instance awaits action '{}'", action);
        }
        Ok(affected)
    }

    /// Force an instance to `Cancelled`.  Unknown ids are ignored.
    ///
    /// The step graph's fail route is not taken and in-flight actions are
    /// not cancelled at the executor.
    #[instrument(skip(self))]
    pub async fn cancel(&self, instance_id: &str) -> Result<(), EngineError> {
        if !self.storage.exists(instance_id).await? {
            return Ok(());
        }

        let state = self.storage.load(instance_id).await?;
        let cancelled = state.with_status(WorkflowStatus::Cancelled, self.clock.now());
        self.storage.save(&cancelled).await?;
        info!("cancelled instance {} at step '{}'", instance_id, cancelled.current_step_id());
        Ok(())
    }

    /// # Errors
    /// [`EngineError::InstanceNotFound`] if storage has no such instance.
    pub async fn get_state(&self, instance_id: &str) -> Result<WorkflowState, EngineError> {
        self.storage.load(instance_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => EngineError::InstanceNotFound(id),
            other => EngineError::Storage(other),
        })
    }

    // -----------------------------------------------------------------------
    // Internal: result processing
    // -----------------------------------------------------------------------

    async fn process_action_result(
        &self,
        workflow: &CompiledWorkflow,
        step: &CompiledStep,
        state: WorkflowState,
        action: &ActionRef,
        result: Value,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut updated = state.with_history_entry(step.id(), action.name(), result.clone(), now);

        // Fan-in: stay on the step until every parallel action reported.
        if step.has_parallel_actions() {
            updated = updated.with_action_completed(step.id(), action.name(), now);

            let all_done = step
                .parallel_actions()
                .iter()
                .all(|a| updated.is_action_completed(step.id(), a.name()));
            if !all_done {
                debug!(
                    "instance {} step '{}': {}/{} parallel actions done",
                    updated.instance_id(),
                    step.id(),
                    updated.completed_actions(step.id()).len(),
                    step.parallel_actions().len()
                );
                self.storage.save(&updated).await?;
                return Ok(());
            }

            updated = updated.with_completed_cleared(step.id(), now);
        }

        if step.is_final() {
            let finished = updated.with_status(WorkflowStatus::Completed, now);
            self.storage.save(&finished).await?;
            info!("instance {} completed at '{}'", finished.instance_id(), step.id());
            return Ok(());
        }

        let success = is_success(&result);

        if !success {
            if let Some(retry) = step.retry() {
                let attempt = updated.retry_attempt(step.id());

                if attempt < retry.max_attempts {
                    let retried = updated.with_retry_incremented(step.id(), now);
                    let delay = retry.delay_for_attempt(attempt + 1);

                    warn!(
                        "instance {} step '{}' failed (retry {}/{}), retrying in {}s",
                        retried.instance_id(),
                        step.id(),
                        attempt + 1,
                        retry.max_attempts,
                        delay
                    );

                    if delay > 0 {
                        let parked = retried.with_schedule(self.clock.add_interval(delay), now);
                        self.storage.save(&parked).await?;
                        return Ok(());
                    }

                    self.storage.save(&retried).await?;
                    self.dispatch_step(step, None).await?;
                    return Ok(());
                }

                warn!(
                    "instance {} step '{}' exhausted {} retries",
                    updated.instance_id(),
                    step.id(),
                    retry.max_attempts
                );
            }
        }

        updated = updated.with_retry_reset(step.id(), now);

        let mut next_step_id = None;
        if success && !step.conditions().is_empty() {
            next_step_id = self.evaluate_conditions(step, &result, updated.context());
        }
        let next_step_id = next_step_id.or_else(|| {
            let route = if success { step.success_step() } else { step.fail_step() };
            route.map(str::to_owned)
        });

        let Some(next_step_id) = next_step_id else {
            let status = if success {
                WorkflowStatus::Completed
            } else {
                WorkflowStatus::Failed
            };
            let finished = updated.with_status(status, now);
            self.storage.save(&finished).await?;
            info!("instance {} {} at '{}'", finished.instance_id(), status, step.id());
            return Ok(());
        };

        let next_step = step_of(workflow, &next_step_id)?;
        let moved = updated.with_next_step(next_step.id(), now);

        if let Some(delay) = next_step.delay() {
            let parked = moved.with_schedule(self.clock.add_interval(delay), now);
            self.storage.save(&parked).await?;
            debug!(
                "instance {} enters '{}' in {}s",
                parked.instance_id(),
                next_step.id(),
                delay
            );
            return Ok(());
        }

        let moved = moved.with_status(WorkflowStatus::Running, now);
        self.storage.save(&moved).await?;
        self.dispatch_step(next_step, None).await?;
        debug!("instance {} moved '{}' -> '{}'", moved.instance_id(), step.id(), next_step.id());
        Ok(())
    }

    /// First condition evaluating to `true` wins.  Evaluation errors count as
    /// no match.
    fn evaluate_conditions(
        &self,
        step: &CompiledStep,
        result: &Value,
        context: &Map<String, Value>,
    ) -> Option<String> {
        let variables = json!({
            "result": result,
            "context": context,
        });

        for condition in step.conditions() {
            match self.evaluator.evaluate(&condition.expression, &variables) {
                Ok(Value::Bool(true)) => return Some(condition.target_step_id.clone()),
                Ok(_) => {}
                Err(e) => debug!("condition on step '{}' skipped: {}", step.id(), e),
            }
        }

        None
    }

    // -----------------------------------------------------------------------
    // Internal: time-driven transitions
    // -----------------------------------------------------------------------

    async fn resume(&self, state: WorkflowState) -> Result<(), EngineError> {
        let workflow = self.registry.get(state.workflow_id())?;
        let step = step_of(&workflow, state.current_step_id())?;

        let resumed = state.with_status(WorkflowStatus::Running, self.clock.now());
        self.storage.save(&resumed).await?;
        self.dispatch_step(step, None).await?;

        debug!("instance {} resumed at '{}'", resumed.instance_id(), step.id());
        Ok(())
    }

    /// Returns whether the instance timed out.
    async fn check_timeout(&self, state: WorkflowState) -> Result<bool, EngineError> {
        let workflow = self.registry.get(state.workflow_id())?;
        let Some(step) = workflow.step(state.current_step_id()) else {
            return Ok(false);
        };
        let Some(timeout) = step.timeout() else {
            return Ok(false);
        };

        let Some(limit) = i64::try_from(timeout).ok().and_then(Duration::try_seconds) else {
            return Ok(false);
        };

        let now = self.clock.now();
        let elapsed = now - state.updated_at();
        if elapsed <= limit {
            return Ok(false);
        }

        warn!(
            "instance {} step '{}' timed out after {}ms",
            state.instance_id(),
            step.id(),
            elapsed.num_milliseconds()
        );

        let left = state.with_completed_cleared(step.id(), now);

        match step.fail_step() {
            Some(fail_step_id) => {
                let fail_step = step_of(&workflow, fail_step_id)?;
                let moved = left
                    .with_next_step(fail_step.id(), now)
                    .with_status(WorkflowStatus::Running, now);
                self.storage.save(&moved).await?;
                self.dispatch_step(fail_step, None).await?;
            }
            None => {
                let failed = left.with_status(WorkflowStatus::Failed, now);
                self.storage.save(&failed).await?;
            }
        }

        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Internal: helpers
    // -----------------------------------------------------------------------

    /// Parallel actions first, then the sequential ones.
    async fn dispatch_step(
        &self,
        step: &CompiledStep,
        argument: Option<&Value>,
    ) -> Result<(), EngineError> {
        if step.has_parallel_actions() {
            self.executor
                .schedule_parallel_actions(step.parallel_actions())
                .await?;
        }

        for action in step.actions() {
            self.executor.schedule_action(action, argument).await?;
        }

        Ok(())
    }

    fn generate_instance_id(&self) -> String {
        format!("{}{}", self.config.instance_id_prefix, Uuid::new_v4().simple())
    }
}

fn step_of<'a>(
    workflow: &'a CompiledWorkflow,
    step_id: &str,
) -> Result<&'a CompiledStep, EngineError> {
    workflow
        .step(step_id)
        .ok_or_else(|| EngineError::StepTransition {
            workflow_id: workflow.id().to_owned(),
            step_id: step_id.to_owned(),
        })
}
