//! Aval workflow events and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying [`WorkflowEvent`]s.
//! - [`EventLogger`]: background subscriber that writes every event to the
//!   tracing output.
//! - [`Notifier`]: best-effort fan-out of a message to device tokens, with
//!   the [`PushNotifier`] gateway client and the [`NoopNotifier`].

pub mod bus;
pub mod delivery;
pub mod logger;
pub mod notifier;

pub use bus::{EventBus, WorkflowEvent};
pub use delivery::push::{PushConfig, PushNotifier};
pub use logger::EventLogger;
pub use notifier::{Notification, NoopNotifier, Notifier, NotifyError, NotifyOutcome};
