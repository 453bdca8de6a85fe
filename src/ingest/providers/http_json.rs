// src/ingest/providers/http_json.rs
//! Extractor for sources that publish postings as JSON.
//!
//! Selector semantics: `container` is a JSON pointer to the array of postings
//! (document root when absent). Every other selector names the key, or a JSON
//! pointer starting with `/`, to read for that logical field inside one posting.
//! A missing selector falls back to the logical name itself.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::ingest::config::IngestConfig;
use crate::ingest::types::{Extractor, RawRecord, Selectors};

pub struct HttpJsonExtractor {
    client: reqwest::Client,
    respect_robots_txt: bool,
}

impl HttpJsonExtractor {
    pub fn new(user_agent: &str, timeout: Duration, respect_robots_txt: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            respect_robots_txt,
        })
    }

    pub fn from_config(cfg: &IngestConfig) -> Result<Self> {
        Self::new(
            &cfg.user_agent,
            Duration::from_secs(cfg.http_timeout_secs),
            cfg.respect_robots_txt,
        )
    }

    /// Unreachable or missing robots.txt counts as allowed.
    async fn robots_allows(&self, url: &Url) -> bool {
        let Ok(robots) = url.join("/robots.txt") else {
            return true;
        };
        match self.client.get(robots).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => !robots_disallows_all(&body),
                Err(_) => true,
            },
            _ => true,
        }
    }
}

/// Naive check: a `User-agent: *` group together with a bare `Disallow: /` line.
pub fn robots_disallows_all(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    let wildcard = lower
        .lines()
        .any(|l| l.split_whitespace().collect::<Vec<_>>().join(" ") == "user-agent: *");
    let disallow_root = lower
        .lines()
        .any(|l| l.split_whitespace().collect::<Vec<_>>().join(" ") == "disallow: /");
    wildcard && disallow_root
}

/// Map a fetched JSON document onto raw records using `selectors`.
pub fn extract_records(doc: &Value, selectors: &Selectors) -> Result<Vec<RawRecord>> {
    let items = match selectors.get("container") {
        Some(ptr) => doc
            .pointer(ptr)
            .ok_or_else(|| anyhow!("container pointer {ptr} not found"))?,
        None => doc,
    };
    let items = items
        .as_array()
        .ok_or_else(|| anyhow!("expected a JSON array of postings"))?;

    Ok(items
        .iter()
        .map(|item| RawRecord {
            title: field(item, selectors, "title"),
            institute: field(item, selectors, "institute"),
            deadline: field(item, selectors, "deadline"),
            link: field(item, selectors, "link"),
            description: field(item, selectors, "description"),
            date_added: None,
        })
        .collect())
}

fn field(item: &Value, selectors: &Selectors, logical: &str) -> Option<String> {
    let key = selectors.get(logical).map(String::as_str).unwrap_or(logical);
    let v = if key.starts_with('/') {
        item.pointer(key)
    } else {
        item.get(key)
    }?;
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl Extractor for HttpJsonExtractor {
    async fn extract(&self, url: &str, selectors: &Selectors) -> Result<Vec<RawRecord>> {
        let parsed = Url::parse(url).with_context(|| format!("invalid source url {url}"))?;
        if self.respect_robots_txt && !self.robots_allows(&parsed).await {
            tracing::warn!(target: "ingest", %url, "robots.txt disallows fetching; skipping");
            return Ok(Vec::new());
        }
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .context("http get")?
            .error_for_status()
            .context("http status")?;
        let doc: Value = resp.json().await.context("decoding JSON body")?;
        extract_records(&doc, selectors)
    }

    fn name(&self) -> &'static str {
        "http-json"
    }
}
