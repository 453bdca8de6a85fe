// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "TRACKER_CONFIG_PATH";

fn default_delay_ms() -> u64 {
    2_000
}
fn default_retention_days() -> i64 {
    7
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_user_agent() -> String {
    "phd-opportunity-tracker/0.1 (+https://github.com)".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// Ingestion settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Pause between consecutive source attempts.
    #[serde(default = "default_delay_ms")]
    pub delay_between_sources_ms: u64,
    /// Age after which logged ingestion errors are evicted.
    #[serde(default = "default_retention_days")]
    pub error_retention_days: i64,
    /// Keep only records mentioning one of these; empty keeps all.
    #[serde(default)]
    pub relevance_keywords: Vec<String>,
    /// Root of the filesystem blob store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,
    /// 0 disables the background scheduler.
    #[serde(default)]
    pub schedule_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delay_between_sources_ms: default_delay_ms(),
            error_retention_days: default_retention_days(),
            relevance_keywords: Vec::new(),
            data_dir: default_data_dir(),
            user_agent: default_user_agent(),
            http_timeout_secs: default_timeout_secs(),
            respect_robots_txt: true,
            schedule_interval_secs: 0,
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<IngestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading ingest config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $TRACKER_CONFIG_PATH
/// 2) config/ingest.toml
/// 3) config/ingest.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<IngestConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("TRACKER_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/ingest.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/ingest.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(IngestConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<IngestConfig> {
    let trimmed = s.trim_start();
    // JSON objects start with '{'; anything else is treated as TOML first.
    let try_toml = hint_ext == "toml" || !trimmed.starts_with('{');
    if try_toml {
        if let Ok(v) = toml::from_str::<IngestConfig>(s) {
            return Ok(sanitize(v));
        }
    }
    if let Ok(v) = serde_json::from_str::<IngestConfig>(s) {
        return Ok(sanitize(v));
    }
    if !try_toml {
        if let Ok(v) = toml::from_str::<IngestConfig>(s) {
            return Ok(sanitize(v));
        }
    }
    Err(anyhow!("unsupported ingest config format"))
}

fn sanitize(mut cfg: IngestConfig) -> IngestConfig {
    if cfg.error_retention_days < 0 {
        cfg.error_retention_days = default_retention_days();
    }
    if cfg.http_timeout_secs == 0 {
        cfg.http_timeout_secs = default_timeout_secs();
    }
    let mut kw: Vec<String> = cfg
        .relevance_keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    kw.sort();
    kw.dedup();
    cfg.relevance_keywords = kw;
    cfg
}
