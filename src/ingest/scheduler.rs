// src/ingest/scheduler.rs
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TrackerError;
use crate::ingest::orchestrator::Orchestrator;
use crate::store::documents::save_sources;
use crate::store::{publish_results, BlobStore};

#[derive(Clone, Copy, Debug)]
pub struct IngestSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn a background loop that runs ingestion every `interval_secs`, publishes the
/// results and persists source counters. A tick that collides with a manual run is
/// skipped. Cancelling `shutdown` stops the loop and aborts an in-flight run between
/// sources.
pub fn spawn_scheduler(
    cfg: IngestSchedulerCfg,
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn BlobStore>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; start with a full interval instead.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "ingest", "scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }
            run_tick(&orchestrator, store.as_ref(), &shutdown).await;
        }
    })
}

async fn run_tick(orchestrator: &Orchestrator, store: &dyn BlobStore, shutdown: &CancellationToken) {
    let report = match orchestrator.run_ingestion_with_cancel(None, shutdown).await {
        Ok(r) => r,
        Err(TrackerError::Concurrency) => {
            counter!("ingest_scheduler_skipped_total").increment(1);
            tracing::info!(target: "ingest", "scheduled tick skipped: run in progress");
            return;
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, "scheduled ingestion failed");
            return;
        }
    };

    let today = chrono::Utc::now().date_naive();
    if let Err(e) = publish_results(store, &report.results, today).await {
        tracing::warn!(target: "ingest", error = %e, "publishing scheduled results failed");
    }
    if let Err(e) = save_sources(store, &orchestrator.registry().list()).await {
        tracing::warn!(target: "ingest", error = %e, "persisting sources failed");
    }

    gauge!("ingest_scheduler_last_tick_ts").set(chrono::Utc::now().timestamp() as f64);
    tracing::info!(
        target: "ingest",
        kept = report.summary.total_opportunities,
        errors = report.summary.total_errors,
        cancelled = report.cancelled,
        "scheduled ingest tick"
    );
}
