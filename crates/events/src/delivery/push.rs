//! Push notification delivery through an HTTP gateway.
//!
//! [`PushNotifier`] POSTs one JSON message per device token to the
//! configured gateway. Requests run concurrently; each failure is logged and
//! counted in the [`NotifyOutcome`]. Configuration is loaded from the
//! environment; if `PUSH_GATEWAY_URL` is not set, [`PushConfig::from_env`]
//! returns `None` and a [`NoopNotifier`](crate::notifier::NoopNotifier)
//! should be used instead.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::notifier::{Notification, Notifier, NotifyError, NotifyOutcome};

/// Default HTTP timeout for a single delivery.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// PushConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Gateway endpoint that accepts `{to, title, body, data}` messages.
    pub gateway_url: String,
    /// Optional bearer token for the gateway.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `PUSH_GATEWAY_URL` is not set.
    ///
    /// | Variable            | Required | Default |
    /// |---------------------|----------|---------|
    /// | `PUSH_GATEWAY_URL`  | yes      | -       |
    /// | `PUSH_API_KEY`      | no       | -       |
    /// | `PUSH_TIMEOUT_SECS` | no       | `10`    |
    pub fn from_env() -> Option<Self> {
        let gateway_url = std::env::var("PUSH_GATEWAY_URL").ok()?;
        Some(Self {
            gateway_url,
            api_key: std::env::var("PUSH_API_KEY").ok(),
            timeout: Duration::from_secs(
                std::env::var("PUSH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// PushNotifier
// ---------------------------------------------------------------------------

pub struct PushNotifier {
    client: reqwest::Client,
    config: PushConfig,
}

impl PushNotifier {
    pub fn new(config: PushConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, token: &str, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "to": token,
            "title": notification.title,
            "body": notification.body,
            "data": notification.data,
        });
        let mut request = self.client.post(&self.config.gateway_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn send(&self, tokens: &[String], notification: &Notification) -> NotifyOutcome {
        let results = join_all(tokens.iter().map(|t| self.try_send(t, notification))).await;

        let mut outcome = NotifyOutcome::default();
        for (token, result) in tokens.iter().zip(results) {
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(token = %token, error = %e, "Push delivery failed");
                }
            }
        }
        tracing::debug!(
            delivered = outcome.delivered,
            failed = outcome.failed,
            title = %notification.title,
            "Push fan-out finished"
        );
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
