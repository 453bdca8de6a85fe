// src/ingest/orchestrator.rs
//! Ingestion orchestrator.
//!
//! A run walks the sources one at a time with a fixed pause between attempts, pipes
//! each extractor result through normalize -> validate -> relevance filter, and
//! deduplicates the accumulated set at the end. A failing source is recorded in the
//! run's error list and its counter; it never aborts the run.
//!
//! Only one run may be in flight per orchestrator. A second caller gets
//! [`TrackerError::Concurrency`] immediately instead of waiting.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TrackerError};
use crate::ingest::config::IngestConfig;
use crate::ingest::dedup::deduplicate_counted;
use crate::ingest::normalize::{missing_fields, normalize};
use crate::ingest::registry::{Source, SourceRegistry};
use crate::ingest::types::Extractor;
use crate::ingest::{ensure_metrics_described, is_relevant};
use crate::opportunity::Opportunity;

/// One failed source attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionError {
    pub source: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub total_opportunities: usize,
    pub total_errors: usize,
    pub distinct_sources_represented: usize,
    /// Opportunities vs. errors, not sources vs. errors.
    pub success_rate_percent: u32,
    pub deadline_fallbacks: usize,
    pub invalid_dropped: usize,
    pub filtered_out: usize,
    pub duplicates_removed: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub results: Vec<Opportunity>,
    pub errors: Vec<IngestionError>,
    pub summary: IngestSummary,
    /// Run stopped early on a cancellation request; `results` holds what was gathered.
    #[serde(default)]
    pub cancelled: bool,
}

/// `100` with no errors, else `round(100 * opportunities / (opportunities + errors))`.
pub fn success_rate_percent(total_opportunities: usize, total_errors: usize) -> u32 {
    if total_errors == 0 {
        return 100;
    }
    let ok = total_opportunities as f64;
    (100.0 * ok / (ok + total_errors as f64)).round() as u32
}

#[derive(Debug, Clone)]
pub struct OrchestratorCfg {
    pub delay_between_sources: Duration,
    pub error_retention: chrono::Duration,
    pub relevance_keywords: Vec<String>,
}

impl Default for OrchestratorCfg {
    fn default() -> Self {
        Self {
            delay_between_sources: Duration::from_secs(2),
            error_retention: chrono::Duration::days(7),
            relevance_keywords: Vec::new(),
        }
    }
}

impl From<&IngestConfig> for OrchestratorCfg {
    fn from(cfg: &IngestConfig) -> Self {
        Self {
            delay_between_sources: Duration::from_millis(cfg.delay_between_sources_ms),
            error_retention: chrono::Duration::days(cfg.error_retention_days),
            relevance_keywords: cfg.relevance_keywords.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { started_at: DateTime<Utc> },
}

/// Puts the orchestrator back to `Idle` when dropped, including on early return,
/// panic unwinding, or the run future being dropped.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = RunState::Idle;
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct RunAccumulator {
    results: Vec<Opportunity>,
    errors: Vec<IngestionError>,
    deadline_fallbacks: usize,
    invalid: usize,
    filtered: usize,
}

pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    extractor: Arc<dyn Extractor>,
    cfg: OrchestratorCfg,
    state: Mutex<RunState>,
    error_log: Mutex<Vec<IngestionError>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        extractor: Arc<dyn Extractor>,
        cfg: OrchestratorCfg,
    ) -> Self {
        Self {
            registry,
            extractor,
            cfg,
            state: Mutex::new(RunState::Idle),
            error_log: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), RunState::Running { .. })
    }

    /// Run one pass. `None` means every active source in the registry.
    pub async fn run_ingestion(&self, sources: Option<Vec<Source>>) -> Result<IngestionReport> {
        self.run_ingestion_with_cancel(sources, &CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::run_ingestion`]; `cancel` is checked before every source
    /// and interrupts the pause between sources.
    pub async fn run_ingestion_with_cancel(
        &self,
        sources: Option<Vec<Source>>,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        ensure_metrics_described();
        let _guard = self.try_begin()?;

        let started_at = Utc::now();
        let t0 = Instant::now();
        let sources = sources.unwrap_or_else(|| self.registry.list_active());
        tracing::info!(target: "ingest", sources = sources.len(), extractor = self.extractor.name(), "ingestion started");

        let mut acc = RunAccumulator::default();
        let mut cancelled = false;

        for (i, source) in sources.iter().enumerate() {
            if i > 0 && !self.cfg.delay_between_sources.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.cfg.delay_between_sources) => {}
                }
            }
            if cancel.is_cancelled() {
                cancelled = true;
                tracing::info!(target: "ingest", remaining = sources.len() - i, "ingestion cancelled");
                break;
            }
            self.ingest_source(source, &mut acc).await;
        }

        let (results, duplicates_removed) = deduplicate_counted(acc.results);
        let distinct: BTreeSet<&str> = results.iter().map(|o| o.source.as_str()).collect();

        let summary = IngestSummary {
            total_opportunities: results.len(),
            total_errors: acc.errors.len(),
            distinct_sources_represented: distinct.len(),
            success_rate_percent: success_rate_percent(results.len(), acc.errors.len()),
            deadline_fallbacks: acc.deadline_fallbacks,
            invalid_dropped: acc.invalid,
            filtered_out: acc.filtered,
            duplicates_removed,
            duration_ms: t0.elapsed().as_millis() as u64,
            started_at,
        };

        self.retain_errors(&acc.errors);

        counter!("ingest_runs_total").increment(1);
        counter!("ingest_records_total").increment(results.len() as u64);
        counter!("ingest_dedup_total").increment(duplicates_removed as u64);
        gauge!("ingest_last_run_ts").set(Utc::now().timestamp() as f64);

        tracing::info!(
            target: "ingest",
            opportunities = summary.total_opportunities,
            errors = summary.total_errors,
            duplicates = summary.duplicates_removed,
            fallbacks = summary.deadline_fallbacks,
            success_rate = summary.success_rate_percent,
            "ingestion finished"
        );

        Ok(IngestionReport {
            results,
            errors: acc.errors,
            summary,
            cancelled,
        })
    }

    fn try_begin(&self) -> Result<RunGuard<'_>> {
        let mut state = lock(&self.state);
        if let RunState::Running { started_at } = *state {
            counter!("ingest_rejected_runs_total").increment(1);
            tracing::warn!(target: "ingest", %started_at, "ingestion rejected: run already in progress");
            return Err(TrackerError::Concurrency);
        }
        *state = RunState::Running {
            started_at: Utc::now(),
        };
        Ok(RunGuard { state: &self.state })
    }

    async fn ingest_source(&self, source: &Source, acc: &mut RunAccumulator) {
        let t0 = Instant::now();
        match self.extractor.extract(&source.url, &source.selectors).await {
            Ok(raw) => {
                let found = raw.len();
                let mut kept = 0usize;
                for record in &raw {
                    let normalized = normalize(record, source);
                    if normalized.deadline_fallback {
                        acc.deadline_fallbacks += 1;
                        counter!("ingest_deadline_fallback_total").increment(1);
                    }
                    let missing = missing_fields(&normalized.opportunity);
                    if !missing.is_empty() {
                        acc.invalid += 1;
                        counter!("ingest_invalid_total").increment(1);
                        tracing::debug!(target: "ingest", source = %source.name, ?missing, "record dropped");
                        continue;
                    }
                    if !is_relevant(&normalized.opportunity, &self.cfg.relevance_keywords) {
                        acc.filtered += 1;
                        continue;
                    }
                    acc.results.push(normalized.opportunity);
                    kept += 1;
                }
                self.registry.record_success(&source.id, Utc::now());
                tracing::info!(target: "ingest", source = %source.name, found, kept, "source ingested");
            }
            Err(e) => {
                let message = format!("{e:#}");
                tracing::warn!(target: "ingest", source = %source.name, error = %message, "source failed");
                counter!("ingest_source_errors_total").increment(1);
                self.registry.record_failure(&source.id);
                acc.errors.push(IngestionError {
                    source: source.name.clone(),
                    error: message,
                    timestamp: Utc::now(),
                });
            }
        }
        histogram!("ingest_source_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    }

    /// Dry-run one source: extract, normalize and validate without touching counters,
    /// the error log, or the single-flight guard.
    pub async fn test_source(&self, source: &Source) -> Result<Vec<Opportunity>> {
        let raw = self
            .extractor
            .extract(&source.url, &source.selectors)
            .await
            .map_err(|e| TrackerError::Extraction {
                source_name: source.name.clone(),
                message: format!("{e:#}"),
            })?;
        let kept = raw
            .iter()
            .map(|r| normalize(r, source).opportunity)
            .filter(|o| missing_fields(o).is_empty())
            .collect();
        Ok(kept)
    }

    fn retain_errors(&self, run_errors: &[IngestionError]) {
        let cutoff = Utc::now() - self.cfg.error_retention;
        let mut log = lock(&self.error_log);
        log.extend_from_slice(run_errors);
        log.retain(|e| e.timestamp > cutoff);
    }

    /// Last `limit` errors across runs, oldest first.
    pub fn recent_errors(&self, limit: usize) -> Vec<IngestionError> {
        let log = lock(&self.error_log);
        let start = log.len().saturating_sub(limit);
        log[start..].to_vec()
    }

    /// Drop logged errors older than `days`. Returns how many were removed.
    pub fn clear_old_errors(&self, days: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let mut log = lock(&self.error_log);
        let before = log.len();
        log.retain(|e| e.timestamp > cutoff);
        before - log.len()
    }
}
