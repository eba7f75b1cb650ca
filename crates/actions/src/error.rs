//! Executor-level error type.

use thiserror::Error;

/// Errors surfaced by an [`Executor`](crate::Executor) implementation.
///
/// The engine never retries these; they propagate straight to the caller of
/// `start` / `tick` / `action_received`.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// The backend refused or failed to schedule the action.
    #[error("failed to dispatch action '{action}': {message}")]
    Dispatch { action: String, message: String },

    /// The backend could not produce a result for the action.
    #[error("result for action '{action}' is unavailable: {message}")]
    ResultUnavailable { action: String, message: String },
}
