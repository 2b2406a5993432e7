//! Artifact persistence.
//!
//! Objects are content-addressed: the key is `{folder}/{sha256}.{ext}`, so
//! storing identical bytes twice yields the same URL.

pub mod local;
pub mod s3;

use async_trait::async_trait;

use crate::error::ArtifactError;
use crate::render::PDF_MAGIC;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `folder` and return the artifact URL.
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String, ArtifactError>;

    /// Remove an artifact. Deleting a missing object is not an error.
    async fn delete(&self, url: &str) -> Result<(), ArtifactError>;

    /// Store the new bytes, then drop the previous artifact.
    ///
    /// The old object is only removed once the upload succeeded, and a
    /// failed delete is logged rather than returned.
    async fn replace(
        &self,
        old_url: Option<&str>,
        bytes: Vec<u8>,
        folder: &str,
    ) -> Result<String, ArtifactError> {
        let url = self.upload(bytes, folder).await?;
        if let Some(old) = old_url.filter(|old| *old != url) {
            if let Err(e) = self.delete(old).await {
                tracing::warn!(url = old, error = %e, "Failed to delete replaced artifact");
            }
        }
        Ok(url)
    }
}

/// File extension for an object, sniffed from its leading bytes.
pub fn extension_for(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) {
        "pdf"
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else {
        "bin"
    }
}

/// Content type matching [`extension_for`].
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
