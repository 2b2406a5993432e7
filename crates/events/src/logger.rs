//! Tracing sink for the event bus.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every [`WorkflowEvent`] to the tracing output, at `error` level
//! for side-effect failures. It runs until the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::WorkflowEvent;

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop; returns the number of events seen.
    pub async fn run(mut receiver: broadcast::Receiver<WorkflowEvent>) -> u64 {
        let mut seen = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    seen += 1;
                    Self::log(&event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, logger shutting down");
                    break;
                }
            }
        }
        seen
    }

    fn log(event: &WorkflowEvent) {
        if event.is_failure() {
            tracing::error!(
                case_id = ?event.case_id,
                payload = %event.payload,
                "Side effect failed"
            );
        } else {
            tracing::info!(
                event_type = %event.event_type,
                case_id = ?event.case_id,
                event_id = ?event.event_id,
                actor = ?event.actor_user_id,
                payload = %event.payload,
                "Workflow event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn stops_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLogger::run(bus.subscribe()));

        bus.publish(WorkflowEvent::new("case.opened"));
        bus.publish(WorkflowEvent::side_effect_failed(1, "notify", "boom"));
        drop(bus);

        assert_eq!(handle.await.unwrap(), 2);
    }
}
