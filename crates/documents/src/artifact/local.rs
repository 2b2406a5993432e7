//! Filesystem-backed artifact store.
//!
//! Objects live under a root directory and are addressed by `file://` URLs.
//! The store also implements [`RemoteFetch`] for its own URLs, so the merge
//! step can read artifacts back without an HTTP server.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aval_core::hashing::content_key;

use super::{extension_for, ArtifactStore};
use crate::error::{ArtifactError, FetchError};
use crate::fetch::RemoteFetch;

const SCHEME: &str = "file://";

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn url_for(path: &Path) -> String {
        format!("{SCHEME}{}", path.display())
    }

    /// Map a URL back to a path, refusing anything outside the root.
    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let path = PathBuf::from(url.strip_prefix(SCHEME)?);
        let inside = path.starts_with(&self.root)
            && !path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        inside.then_some(path)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String, ArtifactError> {
        let key = content_key(folder, &bytes, extension_for(&bytes));
        let path = self.root.join(&key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(key = %key, size = bytes.len(), "Artifact written");
        Ok(Self::url_for(&path))
    }

    async fn delete(&self, url: &str) -> Result<(), ArtifactError> {
        let path = self
            .path_for(url)
            .ok_or_else(|| ArtifactError::ForeignUrl(url.to_string()))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RemoteFetch for LocalArtifactStore {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self
            .path_for(url)
            .ok_or_else(|| FetchError::ForeignUrl(url.to_string()))?;
        Ok(tokio::fs::read(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn upload_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());

        let a = store.upload(b"%PDF-1.4 a".to_vec(), "avales/dtm").await.unwrap();
        let b = store.upload(b"%PDF-1.4 a".to_vec(), "avales/dtm").await.unwrap();

        assert_eq!(a, b);
        assert!(a.starts_with("file://"));
        assert!(a.ends_with(".pdf"));
        assert!(a.contains("/avales/dtm/"));
        assert_eq!(store.get(&a).await.unwrap(), b"%PDF-1.4 a");
    }

    #[tokio::test]
    async fn replace_removes_previous_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let old = store.upload(b"old".to_vec(), "avales/pda").await.unwrap();

        let new = store
            .replace(Some(&old), b"new".to_vec(), "avales/pda")
            .await
            .unwrap();

        assert_ne!(old, new);
        assert_matches!(store.get(&old).await, Err(FetchError::Io(_)));
        assert_eq!(store.get(&new).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn replace_with_identical_bytes_keeps_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let old = store.upload(b"same".to_vec(), "x").await.unwrap();

        let new = store.replace(Some(&old), b"same".to_vec(), "x").await.unwrap();

        assert_eq!(old, new);
        assert_eq!(store.get(&new).await.unwrap(), b"same");
    }

    #[tokio::test]
    async fn foreign_urls_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());

        assert_matches!(
            store.delete("https://example.com/a.pdf").await,
            Err(ArtifactError::ForeignUrl(_))
        );
        assert_matches!(store.get("file:///etc/hosts").await, Err(FetchError::ForeignUrl(_)));
        // Deleting something already gone is fine.
        let missing = format!("file://{}/nope.pdf", dir.path().display());
        store.delete(&missing).await.unwrap();
    }
}
