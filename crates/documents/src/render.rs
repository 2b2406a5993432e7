//! Report rendering.
//!
//! [`DocumentRenderer`] turns a structured payload into PDF bytes. Layout
//! and styling live in the rendering service; [`HttpRenderer`] posts the
//! payload to `{RENDERER_URL}/reports/{kind}` and returns the body.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::report::ReportKind;

/// PDF files start with this signature.
pub(crate) const PDF_MAGIC: &[u8] = b"%PDF-";

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, kind: ReportKind, data: &serde_json::Value) -> Result<Vec<u8>, RenderError>;
}

// ---------------------------------------------------------------------------
// RendererConfig
// ---------------------------------------------------------------------------

/// Default renderer base URL.
const DEFAULT_RENDERER_URL: &str = "http://localhost:3001";

/// Default timeout for one render request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RendererConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Default                 |
    /// |-------------------------|-------------------------|
    /// | `RENDERER_URL`          | `http://localhost:3001` |
    /// | `RENDERER_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("RENDERER_URL")
                .unwrap_or_else(|_| DEFAULT_RENDERER_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(
                std::env::var("RENDERER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpRenderer
// ---------------------------------------------------------------------------

/// HTTP client for the report rendering service.
pub struct HttpRenderer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self, kind: ReportKind) -> String {
        format!("{}/reports/{}", self.base_url, kind.slug())
    }
}

#[async_trait]
impl DocumentRenderer for HttpRenderer {
    async fn render(&self, kind: ReportKind, data: &serde_json::Value) -> Result<Vec<u8>, RenderError> {
        let response = self
            .client
            .post(self.endpoint(kind))
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RenderError::Renderer {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(RenderError::NotPdf(kind));
        }
        tracing::debug!(kind = %kind, size = bytes.len(), "Report rendered");
        Ok(bytes.to_vec())
    }
}
