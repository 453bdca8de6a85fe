// src/ingest/providers/fixture.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ingest::types::{Extractor, RawRecord, Selectors};

enum Route {
    Records(Vec<RawRecord>),
    Fail(String),
}

/// Canned extractor keyed by source URL. Unknown URLs fail like an unreachable host.
/// Used by tests and local demos; every call is recorded.
#[derive(Default)]
pub struct FixtureExtractor {
    routes: HashMap<String, Route>,
    calls: Mutex<Vec<String>>,
}

impl FixtureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, url: &str, records: Vec<RawRecord>) -> Self {
        self.routes.insert(url.to_string(), Route::Records(records));
        self
    }

    /// Register a JSON array of raw records (camelCase keys) for `url`.
    pub fn with_json(self, url: &str, json: &str) -> Result<Self> {
        let records: Vec<RawRecord> =
            serde_json::from_str(json).with_context(|| format!("parsing fixture for {url}"))?;
        Ok(self.with_records(url, records))
    }

    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.routes
            .insert(url.to_string(), Route::Fail(message.to_string()));
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    async fn extract(&self, url: &str, _selectors: &Selectors) -> Result<Vec<RawRecord>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        match self.routes.get(url) {
            Some(Route::Records(records)) => Ok(records.clone()),
            Some(Route::Fail(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("no fixture for {url}")),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
