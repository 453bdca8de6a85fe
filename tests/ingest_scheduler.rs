// tests/ingest_scheduler.rs
use phd_opportunity_tracker::ingest::providers::fixture::FixtureExtractor;
use phd_opportunity_tracker::ingest::scheduler::{spawn_scheduler, IngestSchedulerCfg};
use phd_opportunity_tracker::ingest::{Orchestrator, OrchestratorCfg, RawRecord, SourceRegistry};
use phd_opportunity_tracker::store::documents::{load_opportunities, load_sources};
use phd_opportunity_tracker::store::{BlobStore, MemoryBlobStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://sched.test/phd";

#[tokio::test]
async fn scheduled_tick_publishes_results_and_sources() {
    let registry = SourceRegistry::new();
    registry.register("Scheduled", URL, "").unwrap();
    let fx = FixtureExtractor::new().with_records(
        URL,
        vec![RawRecord {
            title: Some("PhD in Glaciology".into()),
            institute: Some("UNIS".into()),
            deadline: Some("2099-01-01".into()),
            link: Some("/g".into()),
            ..Default::default()
        }],
    );
    let orch = Arc::new(Orchestrator::new(
        Arc::new(registry),
        Arc::new(fx),
        OrchestratorCfg {
            delay_between_sources: Duration::ZERO,
            ..Default::default()
        },
    ));
    let store = Arc::new(MemoryBlobStore::new());
    let shutdown = CancellationToken::new();

    let handle = spawn_scheduler(
        IngestSchedulerCfg { interval_secs: 1 },
        orch,
        store.clone() as Arc<dyn BlobStore>,
        shutdown.clone(),
    );

    // first tick lands after one interval; sources are saved after publishing
    let mut sources = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        sources = load_sources(store.as_ref()).await.unwrap().0;
        if !sources.is_empty() {
            break;
        }
    }
    assert_eq!(sources.len(), 1);
    assert!(sources[0].success_count >= 1);

    let published = load_opportunities(store.as_ref()).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].title, "PhD in Glaciology");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler stops on shutdown")
        .unwrap();
}
