//! PhD Opportunity Tracker: binary entrypoint.
//! Boots the Axum HTTP server: loads config and persisted sources, wires the
//! orchestrator, optional scheduler and metrics, and serves the API.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phd_opportunity_tracker::ingest::config::load_config_default;
use phd_opportunity_tracker::ingest::providers::http_json::HttpJsonExtractor;
use phd_opportunity_tracker::ingest::scheduler::{spawn_scheduler, IngestSchedulerCfg};
use phd_opportunity_tracker::metrics::Metrics;
use phd_opportunity_tracker::store::documents::load_sources;
use phd_opportunity_tracker::store::{BlobStore, FsBlobStore};
use phd_opportunity_tracker::{create_router, AppState, Orchestrator, OrchestratorCfg, SourceRegistry};

/// Compact logs by default; `TRACKER_LOG_JSON=1` switches to JSON lines.
/// A subscriber installed by the runtime takes precedence.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phd_opportunity_tracker=info,ingest=info,warn"));

    let json = std::env::var("TRACKER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading ingest config")?;
    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&cfg.data_dir));

    let (sources, _) = load_sources(store.as_ref())
        .await
        .context("loading persisted sources")?;
    let registry = if sources.is_empty() {
        tracing::info!("no persisted sources, seeding defaults");
        SourceRegistry::with_defaults()
    } else {
        SourceRegistry::from_sources(sources)
    };

    let extractor = HttpJsonExtractor::from_config(&cfg)?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(registry),
        Arc::new(extractor),
        OrchestratorCfg::from(&cfg),
    ));

    if cfg.schedule_interval_secs > 0 {
        // Lives as long as the process.
        let shutdown = CancellationToken::new();
        spawn_scheduler(
            IngestSchedulerCfg {
                interval_secs: cfg.schedule_interval_secs,
            },
            orchestrator.clone(),
            store.clone(),
            shutdown,
        );
        tracing::info!(interval_secs = cfg.schedule_interval_secs, "ingest scheduler started");
    }

    let metrics = Metrics::init()?;
    let router = create_router(AppState::new(orchestrator, store)).merge(metrics.router());

    tracing::info!(data_dir = %cfg.data_dir, "tracker ready");
    Ok(router.into())
}
