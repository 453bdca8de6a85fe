// src/store/mod.rs
//! Key-addressed blob store with optimistic concurrency.
//!
//! Versions are content hashes. A `put` must name the version it read; a stale or
//! missing version fails with [`TrackerError::Conflict`] and is never retried here.

pub mod documents;
pub mod fs;
pub mod memory;

pub use documents::{publish_results, PublishOutcome};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Result, TrackerError};

/// Result of a read. Both fields are `None` when nothing is stored at the path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    pub content: Option<String>,
    pub version: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Blob>;

    /// Write `content`. `expected_version` must match the stored version, and must
    /// be `None` exactly when nothing is stored yet. Returns the new version.
    async fn put(&self, path: &str, content: &str, expected_version: Option<&str>)
        -> Result<String>;
}

/// 40 hex chars of SHA-256 over the content.
pub fn content_version(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut out = String::with_capacity(40);
    for b in digest.iter().take(20) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn check_version(
    path: &str,
    current: Option<&str>,
    expected: Option<&str>,
) -> Result<()> {
    if current == expected {
        Ok(())
    } else {
        tracing::debug!(path, ?current, ?expected, "blob version mismatch");
        Err(TrackerError::Conflict {
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_stable_hex() {
        let v = content_version("[]");
        assert_eq!(v.len(), 40);
        assert_eq!(v, content_version("[]"));
        assert_ne!(v, content_version("[ ]"));
    }

    #[test]
    fn version_check() {
        assert!(check_version("p", None, None).is_ok());
        assert!(check_version("p", Some("a"), Some("a")).is_ok());
        assert!(matches!(
            check_version("p", Some("a"), None),
            Err(TrackerError::Conflict { .. })
        ));
        assert!(check_version("p", None, Some("a")).is_err());
    }
}
