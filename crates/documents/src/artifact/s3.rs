//! S3-backed artifact store.
//!
//! Objects are written to one bucket and addressed by
//! `{public_base_url}/{key}`. A custom endpoint (MinIO, LocalStack) switches
//! the client to path-style addressing.

use async_trait::async_trait;
use aval_core::hashing::content_key;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use super::{content_type_for, extension_for, ArtifactStore};
use crate::error::ArtifactError;

/// Default AWS region when `AWS_REGION` is not set.
const DEFAULT_REGION: &str = "us-east-1";

// ---------------------------------------------------------------------------
// S3Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint, e.g. `http://localhost:9000` for MinIO.
    pub endpoint: Option<String>,
    /// Base of the URLs handed back to callers, without trailing slash.
    pub public_base_url: String,
}

impl S3Config {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `S3_BUCKET` is not set. Credentials come from the
    /// standard AWS provider chain.
    ///
    /// | Variable        | Required | Default                                   |
    /// |-----------------|----------|-------------------------------------------|
    /// | `S3_BUCKET`     | yes      | -                                         |
    /// | `AWS_REGION`    | no       | `us-east-1`                               |
    /// | `S3_ENDPOINT`   | no       | -                                         |
    /// | `S3_PUBLIC_URL` | no       | endpoint/bucket, or the AWS virtual host  |
    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("S3_BUCKET").ok()?;
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let endpoint = std::env::var("S3_ENDPOINT").ok();
        let public_base_url = std::env::var("S3_PUBLIC_URL")
            .ok()
            .unwrap_or_else(|| default_public_url(&bucket, &region, endpoint.as_deref()));
        Some(Self {
            bucket,
            region,
            endpoint,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    /// The object key of one of our URLs.
    pub fn key_for<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.as_str())?
            .strip_prefix('/')
            .filter(|key| !key.is_empty())
    }
}

fn default_public_url(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{bucket}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
    }
}

// ---------------------------------------------------------------------------
// S3ArtifactStore
// ---------------------------------------------------------------------------

pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl S3ArtifactStore {
    /// Build a client from the AWS environment plus `config`.
    pub async fn connect(config: S3Config) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            config,
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String, ArtifactError> {
        let extension = extension_for(&bytes);
        let key = content_key(folder, &bytes, extension);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type_for(extension))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ArtifactError::Backend(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.config.bucket, key = %key, size, "Artifact uploaded");
        Ok(self.config.object_url(&key))
    }

    async fn delete(&self, url: &str) -> Result<(), ArtifactError> {
        let key = self
            .config
            .key_for(url)
            .ok_or_else(|| ArtifactError::ForeignUrl(url.to_string()))?;

        // S3 DeleteObject succeeds for keys that do not exist.
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ArtifactError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
