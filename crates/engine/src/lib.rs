//! `engine` crate — workflow definitions, validation, compilation and the
//! tick-driven runtime.

pub mod models;
pub mod error;
pub mod validate;
pub mod compile;
pub mod registry;
pub mod schema;
pub mod loader;
pub mod clock;
pub mod expression;
pub mod manager;

pub use models::{Backoff, Condition, RetryPolicy, StepDefinition, WorkflowDefinition};
pub use error::EngineError;
pub use validate::validate;
pub use compile::{build, compile, CompiledStep, CompiledWorkflow};
pub use registry::WorkflowRegistry;
pub use schema::WorkflowSchema;
pub use loader::WorkflowLoader;
pub use clock::{Clock, ManualClock, SystemClock};
pub use expression::{ExpressionError, ExpressionEvaluator, JinjaExpressionEvaluator};
pub use manager::{ManagerConfig, TickSummary, WorkflowManager};
