//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`WorkflowEvent`]s. It is
//! shared via `Arc<EventBus>` between the workflow engine and its observers.

use aval_core::types::DbId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type names published by the workflow engine.
pub mod types {
    pub const CASE_OPENED: &str = "case.opened";
    pub const CASE_SUBMITTED: &str = "case.submitted";
    pub const CASE_APPROVED: &str = "case.approved";
    pub const CASE_REJECTED: &str = "case.rejected";
    pub const REQUEST_WITHDRAWN: &str = "case.request_withdrawn";
    pub const ARTIFACT_ATTACHED: &str = "case.artifact_attached";
    pub const NOTIFICATION_SENT: &str = "notification.sent";
    pub const SIDE_EFFECT_FAILED: &str = "side_effect.failed";
}

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// Something that happened to a case.
///
/// Constructed via [`WorkflowEvent::new`] and enriched with the builder
/// methods [`for_case`](WorkflowEvent::for_case),
/// [`with_actor`](WorkflowEvent::with_actor), and
/// [`with_payload`](WorkflowEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Dot-separated event name, e.g. `"case.approved"`.
    pub event_type: String,

    pub case_id: Option<DbId>,

    /// The sports event the case belongs to.
    pub event_id: Option<DbId>,

    /// Optional id of the user that triggered the event.
    pub actor_user_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            case_id: None,
            event_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the case and its sports event.
    pub fn for_case(mut self, case_id: DbId, event_id: DbId) -> Self {
        self.case_id = Some(case_id);
        self.event_id = Some(event_id);
        self
    }

    /// Attach the acting user, if known.
    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// A `side_effect.failed` event for `step` on a case.
    pub fn side_effect_failed(case_id: DbId, step: &str, error: impl ToString) -> Self {
        let mut event = Self::new(types::SIDE_EFFECT_FAILED).with_payload(serde_json::json!({
            "step": step,
            "error": error.to_string(),
        }));
        event.case_id = Some(case_id);
        event
    }

    pub fn is_failure(&self) -> bool {
        self.event_type == types::SIDE_EFFECT_FAILED
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use aval_events::bus::{EventBus, WorkflowEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(WorkflowEvent::new("case.opened"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: WorkflowEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
