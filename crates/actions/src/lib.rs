//! `actions` crate — action identifiers and the `Executor` capability.
//!
//! The engine never runs actions itself.  It hands [`ActionRef`]s to an
//! [`Executor`] supplied by the host and later asks the same executor for
//! the result once the host reports completion.

pub mod action;
pub mod error;
pub mod traits;
pub mod mock;

pub use action::ActionRef;
pub use error::ActionError;
pub use traits::{is_success, Executor};
