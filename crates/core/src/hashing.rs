//! Content hashing for artifact object names.
//!
//! Artifacts are stored under a name derived from their bytes, so uploading
//! the same rendered document twice yields the same object key.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Build the object key for an artifact: `{folder}/{sha256}.{extension}`.
///
/// Leading and trailing slashes on `folder` are ignored; an empty folder
/// places the object at the root.
pub fn content_key(folder: &str, data: &[u8], extension: &str) -> String {
    let folder = folder.trim_matches('/');
    let digest = sha256_hex(data);
    if folder.is_empty() {
        format!("{digest}.{extension}")
    } else {
        format!("{folder}/{digest}.{extension}")
    }
}
