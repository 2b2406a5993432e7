//! Domain core of the aval workflow: events, cases, technical requests, the
//! audit trail, the state machine rules and the persistence seam they run
//! behind.

#[macro_use]
mod macros;

pub mod audit;
pub mod case;
pub mod error;
pub mod event;
pub mod hashing;
pub mod machine;
pub mod request;
pub mod store;
pub mod transitions;
pub mod types;

pub use machine::CaseStateMachine;
