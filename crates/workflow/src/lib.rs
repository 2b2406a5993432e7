//! Workflow orchestration for aval cases.
//!
//! [`WorkflowEngine`] runs each state machine operation and, only after it
//! committed, dispatches the document and notification side effects as
//! tracked background tasks. Side-effect failures are logged and published
//! on the event bus; they never reach the caller.

pub mod engine;
pub mod error;
mod side_effects;
pub mod templates;

pub use engine::{Collaborators, WorkflowEngine};
pub use error::{SideEffectError, WorkflowError};
