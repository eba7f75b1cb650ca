//! The persisted per-instance execution record.
//!
//! A [`WorkflowState`] is an immutable snapshot.  Every update method takes
//! `&self` and returns a new snapshot with `updated_at` set to the supplied
//! `now`; the previous snapshot is left untouched.  The engine hands each new
//! snapshot to [`Storage::save`](crate::Storage::save) as one unit.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::StoreError;

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Never produced by the engine; `start` goes straight to `Running`.
    #[default]
    Pending,
    Running,
    /// Parked until `scheduled_at` (step delay or retry backoff).
    Waiting,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending   => write!(f, "pending"),
            Self::Running   => write!(f, "running"),
            Self::Waiting   => write!(f, "waiting"),
            Self::Completed => write!(f, "completed"),
            Self::Failed    => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"   => Ok(Self::Pending),
            "running"   => Ok(Self::Running),
            "waiting"   => Ok(Self::Waiting),
            "completed" => Ok(Self::Completed),
            "failed"    => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other       => Err(format!("unknown workflow status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One action result recorded against a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step_id: String,
    pub action_id: String,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Snapshot of one workflow instance.
///
/// Invariants upheld by the update methods:
/// - `instance_id` never changes;
/// - `status == Waiting` exactly when `scheduled_at` is set;
/// - history is append-only with non-decreasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    instance_id: String,
    workflow_id: String,
    current_step_id: String,
    status: WorkflowStatus,
    /// User data visible to condition expressions as `context`.
    context: Map<String, Value>,
    scheduled_at: Option<DateTime<Utc>>,
    history: Vec<HistoryEntry>,
    /// step id → failed attempts retried so far.
    #[serde(default)]
    retry_attempts: BTreeMap<String, u32>,
    /// step id → parallel actions that have reported.
    #[serde(default)]
    completed_actions: BTreeMap<String, BTreeSet<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// A fresh instance, `Running` at its entry step.
    pub fn new(
        instance_id: impl Into<String>,
        workflow_id: impl Into<String>,
        first_step_id: impl Into<String>,
        context: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            workflow_id: workflow_id.into(),
            current_step_id: first_step_id.into(),
            status: WorkflowStatus::Running,
            context,
            scheduled_at: None,
            history: Vec::new(),
            retry_attempts: BTreeMap::new(),
            completed_actions: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn current_step_id(&self) -> &str {
        &self.current_step_id
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Parked with a resume time.
    pub fn is_delayed(&self) -> bool {
        self.status == WorkflowStatus::Waiting && self.scheduled_at.is_some()
    }

    // -----------------------------------------------------------------------
    // Copy-on-write updates
    // -----------------------------------------------------------------------

    fn touched(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.updated_at = now;
        next
    }

    /// Move to another step, keeping the current status.
    pub fn with_next_step(&self, step_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.current_step_id = step_id.into();
        next
    }

    /// Change status.  Leaving `Waiting` clears `scheduled_at`; to park an
    /// instance use [`WorkflowState::with_schedule`].
    pub fn with_status(&self, status: WorkflowStatus, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.status = status;
        if status != WorkflowStatus::Waiting {
            next.scheduled_at = None;
        }
        next
    }

    /// Park the instance in `Waiting` until `scheduled_at`.
    pub fn with_schedule(&self, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.status = WorkflowStatus::Waiting;
        next.scheduled_at = Some(scheduled_at);
        next
    }

    pub fn with_context(&self, context: Map<String, Value>, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.context = context;
        next
    }

    /// Append a history entry.  A timestamp older than the last entry is
    /// clamped to it so history stays ordered.
    pub fn with_history_entry(
        &self,
        step_id: impl Into<String>,
        action_id: impl Into<String>,
        result: Value,
        now: DateTime<Utc>,
    ) -> Self {
        let timestamp = match self.history.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let mut next = self.touched(now);
        next.history.push(HistoryEntry {
            step_id: step_id.into(),
            action_id: action_id.into(),
            result,
            timestamp,
        });
        next
    }

    // -----------------------------------------------------------------------
    // Retry bookkeeping
    // -----------------------------------------------------------------------

    pub fn retry_attempt(&self, step_id: &str) -> u32 {
        self.retry_attempts.get(step_id).copied().unwrap_or(0)
    }

    pub fn with_retry_incremented(&self, step_id: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        *next.retry_attempts.entry(step_id.to_owned()).or_insert(0) += 1;
        next
    }

    pub fn with_retry_reset(&self, step_id: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.retry_attempts.remove(step_id);
        next
    }

    // -----------------------------------------------------------------------
    // Fan-in bookkeeping
    // -----------------------------------------------------------------------

    /// Parallel actions of `step_id` that have reported so far.
    pub fn completed_actions(&self, step_id: &str) -> Vec<&str> {
        self.completed_actions
            .get(step_id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_action_completed(&self, step_id: &str, action_id: &str) -> bool {
        self.completed_actions
            .get(step_id)
            .is_some_and(|set| set.contains(action_id))
    }

    pub fn with_action_completed(
        &self,
        step_id: &str,
        action_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut next = self.touched(now);
        next.completed_actions
            .entry(step_id.to_owned())
            .or_default()
            .insert(action_id.into());
        next
    }

    pub fn with_completed_cleared(&self, step_id: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.completed_actions.remove(step_id);
        next
    }

    // -----------------------------------------------------------------------
    // Interchange
    // -----------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}
