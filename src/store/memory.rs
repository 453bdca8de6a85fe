// src/store/memory.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{check_version, content_version, Blob, BlobStore};
use crate::error::Result;

/// In-process store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = blobs.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, path: &str) -> Result<Blob> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(match blobs.get(path) {
            Some(content) => Blob {
                version: Some(content_version(content)),
                content: Some(content.clone()),
            },
            None => Blob::default(),
        })
    }

    async fn put(
        &self,
        path: &str,
        content: &str,
        expected_version: Option<&str>,
    ) -> Result<String> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        let current = blobs.get(path).map(|c| content_version(c));
        check_version(path, current.as_deref(), expected_version)?;
        blobs.insert(path.to_string(), content.to_string());
        Ok(content_version(content))
    }
}
