//! Fixed notification messages per workflow action.

use aval_core::case::Case;
use aval_core::event::Event;
use aval_events::Notification;

fn data(case: &Case, event: &Event) -> serde_json::Value {
    serde_json::json!({
        "case_id": case.id,
        "event_id": event.id,
        "state": case.state,
    })
}

/// To reviewers: a request was filed.
pub fn submitted(case: &Case, event: &Event) -> Notification {
    Notification::new(
        "New aval request",
        format!("{} ({}) has a technical request awaiting review.", event.name, event.code),
    )
    .with_data(data(case, event))
}

/// To requesters: the request was approved.
pub fn approved(case: &Case, event: &Event) -> Notification {
    Notification::new(
        "Aval approved",
        format!("The aval for {} ({}) was approved.", event.name, event.code),
    )
    .with_data(data(case, event))
}

/// To requesters: the request was rejected, with the reason when given.
pub fn rejected(case: &Case, event: &Event) -> Notification {
    let body = match case.comment.as_deref() {
        Some(reason) => format!(
            "The aval for {} ({}) was rejected: {reason}",
            event.name, event.code
        ),
        None => format!("The aval for {} ({}) was rejected.", event.name, event.code),
    };
    Notification::new("Aval rejected", body).with_data(data(case, event))
}
