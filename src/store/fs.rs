// src/store/fs.rs
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{check_version, content_version, Blob, BlobStore};
use crate::error::{Result, TrackerError};

/// Blob store over a directory. Paths are relative to `root`.
/// Check-and-write is serialized in-process; writes go through a temp file + rename.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || !safe {
            return Err(TrackerError::Store(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(rel))
    }

    async fn read(&self, full: &Path) -> Result<Option<String>> {
        match fs::read_to_string(full).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, path: &str) -> Result<Blob> {
        let full = self.resolve(path)?;
        let content = self.read(&full).await?;
        Ok(Blob {
            version: content.as_deref().map(content_version),
            content,
        })
    }

    async fn put(
        &self,
        path: &str,
        content: &str,
        expected_version: Option<&str>,
    ) -> Result<String> {
        let full = self.resolve(path)?;
        let _held = self.write_lock.lock().await;

        let current = self.read(&full).await?.map(|c| content_version(&c));
        check_version(path, current.as_deref(), expected_version)?;

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = full.with_extension("tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &full).await?;
        tracing::debug!(path, bytes = content.len(), "blob written");
        Ok(content_version(content))
    }
}
