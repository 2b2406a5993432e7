//! Best-effort notification fan-out.
//!
//! A [`Notifier`] sends one [`Notification`] to a set of device tokens and
//! reports how many deliveries succeeded. Individual failures are counted
//! and logged by the implementation, never returned.

use async_trait::async_trait;
use serde::Serialize;

/// Error for a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Push gateway returned HTTP {0}")]
    HttpStatus(u16),
}

/// A templated message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Extra key/value data delivered with the message.
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Delivery counts for one `send`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotifyOutcome {
    pub delivered: usize,
    pub failed: usize,
}

impl NotifyOutcome {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, tokens: &[String], notification: &Notification) -> NotifyOutcome;
}

/// Drops every message. Used when no push gateway is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, tokens: &[String], notification: &Notification) -> NotifyOutcome {
        tracing::debug!(
            recipients = tokens.len(),
            title = %notification.title,
            "Push gateway not configured, notification dropped"
        );
        NotifyOutcome::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_reports_nothing_attempted() {
        let outcome = NoopNotifier
            .send(&["a".to_string()], &Notification::new("t", "b"))
            .await;
        assert_eq!(outcome.attempted(), 0);
    }

    #[test]
    fn notify_error_display_http_status() {
        assert_eq!(
            NotifyError::HttpStatus(503).to_string(),
            "Push gateway returned HTTP 503"
        );
    }
}
