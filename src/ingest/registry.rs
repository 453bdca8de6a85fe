// src/ingest/registry.rs
//! Source registry: scrape targets, their selector maps, active flags and
//! success/error counters.
//!
//! The registry is the only owner of [`Source`] values. Counters and `lastScraped`
//! are written only by the orchestrator (the `record_*` methods are crate-private).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, TrackerError};
use crate::ingest::normalize::{is_absolute_url, to_base36};
use crate::ingest::types::Selectors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub added_date: DateTime<Utc>,
    #[serde(default)]
    pub last_scraped: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub error_count: u32,
}

fn default_active() -> bool {
    true
}

/// Fields a caller may change after registration. Counters are not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub selectors: Option<Selectors>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_sources: usize,
    pub active_sources: usize,
    pub successful_scrapes: u64,
    pub failed_scrapes: u64,
}

/// Parse `key: value` lines. Lines without a colon, or with an empty key or
/// value, are skipped without error. Only the first colon splits, so values
/// like `a:hover` survive.
pub fn parse_selectors(text: &str) -> Selectors {
    let mut out = Selectors::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if !key.is_empty() && !value.is_empty() {
            out.insert(key.to_string(), value.to_string());
        }
    }
    out
}

fn clean_selectors(selectors: Selectors) -> Selectors {
    selectors
        .into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("source name is required".into()));
    }
    Ok(name.to_string())
}

fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(TrackerError::Validation("source url is required".into()));
    }
    if !is_absolute_url(url) {
        return Err(TrackerError::Validation(format!(
            "source url is not an absolute URL: {url}"
        )));
    }
    Ok(url.to_string())
}

#[derive(Debug, Default)]
pub struct SourceRegistry {
    inner: RwLock<Vec<Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sources(sources: Vec<Source>) -> Self {
        Self {
            inner: RwLock::new(sources),
        }
    }

    /// Seed with the job boards the tracker ships with.
    pub fn with_defaults() -> Self {
        let now = Utc::now();
        let board = |id: &str, name: &str, url: &str, sel: &[(&str, &str)]| Source {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            selectors: sel
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            active: true,
            added_date: now,
            last_scraped: None,
            success_count: 0,
            error_count: 0,
        };
        Self::from_sources(vec![
            board(
                "nature-jobs",
                "Nature Jobs",
                "https://www.nature.com/naturecareers/jobs",
                &[
                    ("container", ".job-listing"),
                    ("title", ".job-title"),
                    ("institute", ".job-location"),
                    ("deadline", ".job-deadline"),
                    ("link", ".job-link"),
                ],
            ),
            board(
                "academic-jobs",
                "Academic Jobs Online",
                "https://academicjobsonline.org",
                &[
                    ("container", ".job-row"),
                    ("title", ".job-title"),
                    ("institute", ".institution"),
                    ("deadline", ".deadline"),
                    ("link", ".apply-link"),
                ],
            ),
        ])
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Source>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Source>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new, active source from user-submitted text.
    pub fn register(&self, name: &str, url: &str, selector_text: &str) -> Result<Source> {
        let name = validate_name(name)?;
        let url = validate_url(url)?;
        let now = Utc::now();

        let mut sources = self.write();
        let id = unique_id(&sources, &name, now);
        let source = Source {
            id,
            name,
            url,
            selectors: parse_selectors(selector_text),
            active: true,
            added_date: now,
            last_scraped: None,
            success_count: 0,
            error_count: 0,
        };
        sources.push(source.clone());
        tracing::info!(target: "ingest", id = %source.id, name = %source.name, "source registered");
        Ok(source)
    }

    /// Validate a source without registering it (used for dry runs).
    pub fn draft(name: &str, url: &str, selector_text: &str) -> Result<Source> {
        Ok(Source {
            id: "draft".to_string(),
            name: validate_name(name)?,
            url: validate_url(url)?,
            selectors: parse_selectors(selector_text),
            active: true,
            added_date: Utc::now(),
            last_scraped: None,
            success_count: 0,
            error_count: 0,
        })
    }

    pub fn get(&self, id: &str) -> Option<Source> {
        self.read().iter().find(|s| s.id == id).cloned()
    }

    /// Flip the active flag. Returns the new state, or `None` for an unknown id.
    pub fn toggle_active(&self, id: &str) -> Option<bool> {
        let mut sources = self.write();
        let source = sources.iter_mut().find(|s| s.id == id)?;
        source.active = !source.active;
        Some(source.active)
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut sources = self.write();
        let before = sources.len();
        sources.retain(|s| s.id != id);
        sources.len() != before
    }

    /// Apply a patch. `Ok(None)` for an unknown id; invalid name/url is rejected
    /// before anything changes.
    pub fn update(&self, id: &str, patch: SourcePatch) -> Result<Option<Source>> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let url = patch.url.as_deref().map(validate_url).transpose()?;

        let mut sources = self.write();
        let Some(source) = sources.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            source.name = name;
        }
        if let Some(url) = url {
            source.url = url;
        }
        if let Some(selectors) = patch.selectors {
            source.selectors = clean_selectors(selectors);
        }
        if let Some(active) = patch.active {
            source.active = active;
        }
        Ok(Some(source.clone()))
    }

    pub fn list(&self) -> Vec<Source> {
        self.read().clone()
    }

    pub fn list_active(&self) -> Vec<Source> {
        self.read().iter().filter(|s| s.active).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let sources = self.read();
        RegistryStats {
            total_sources: sources.len(),
            active_sources: sources.iter().filter(|s| s.active).count(),
            successful_scrapes: sources.iter().map(|s| s.success_count as u64).sum(),
            failed_scrapes: sources.iter().map(|s| s.error_count as u64).sum(),
        }
    }

    /// Returns false when the source is no longer registered.
    pub(crate) fn record_success(&self, id: &str, at: DateTime<Utc>) -> bool {
        let mut sources = self.write();
        match sources.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.success_count = s.success_count.saturating_add(1);
                s.last_scraped = Some(at);
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_failure(&self, id: &str) -> bool {
        let mut sources = self.write();
        match sources.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.error_count = s.error_count.saturating_add(1);
                true
            }
            None => false,
        }
    }
}

/// `slug(name)-base36(millis)`, with a numeric suffix if that is already taken.
fn unique_id(existing: &[Source], name: &str, now: DateTime<Utc>) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = format!("{slug}-{}", to_base36(now.timestamp_millis().max(0) as u64));
    let taken = |id: &str| existing.iter().any(|s| s.id == id);
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_lines_are_best_effort() {
        let text = "container: .job\ntitle : h2 a\nno colon here\n: empty key\nlink:\n  deadline: span:nth-child(2) \n";
        let sel = parse_selectors(text);
        assert_eq!(sel.len(), 3);
        assert_eq!(sel["container"], ".job");
        assert_eq!(sel["title"], "h2 a");
        assert_eq!(sel["deadline"], "span:nth-child(2)");
        assert!(!sel.contains_key("link"));
    }

    #[test]
    fn ids_stay_unique_for_same_name() {
        let reg = SourceRegistry::new();
        let a = reg.register("Same", "https://a.b/c", "").unwrap();
        let b = reg.register("Same", "https://a.b/c", "").unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("same-"));
    }

    #[test]
    fn counters_only_touch_known_sources() {
        let reg = SourceRegistry::new();
        let s = reg.register("Board", "https://a.b/c", "").unwrap();
        assert!(reg.record_success(&s.id, Utc::now()));
        assert!(reg.record_failure(&s.id));
        assert!(!reg.record_failure("missing"));
        let got = reg.get(&s.id).unwrap();
        assert_eq!((got.success_count, got.error_count), (1, 1));
        assert!(got.last_scraped.is_some());
    }

    #[test]
    fn defaults_are_active_and_configured() {
        let reg = SourceRegistry::with_defaults();
        assert_eq!(reg.list_active().len(), 2);
        assert!(reg.list().iter().all(|s| s.selectors.contains_key("container")));
    }
}
