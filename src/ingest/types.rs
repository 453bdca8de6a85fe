// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical field name -> extractor-specific expression (CSS selector, JSON key, ...).
pub type Selectors = BTreeMap<String, String>;

/// Free-form output of an extractor, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRecord {
    pub title: Option<String>,
    pub institute: Option<String>,
    pub deadline: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub date_added: Option<String>,
}

/// Fetch-and-extract capability for one source.
/// Timeouts are the implementation's business; the orchestrator only paces calls.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str, selectors: &Selectors) -> Result<Vec<RawRecord>>;
    fn name(&self) -> &'static str;
}
