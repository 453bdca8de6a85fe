// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use phd_opportunity_tracker::ingest::providers::fixture::FixtureExtractor;
use phd_opportunity_tracker::metrics::Metrics;
use phd_opportunity_tracker::{Orchestrator, OrchestratorCfg, SourceRegistry};

#[tokio::test]
async fn metrics_endpoint_contains_ingest_series() {
    // The recorder is process-global; a second init must reuse it.
    let metrics = Metrics::init().expect("install recorder");
    let again = Metrics::init().expect("reuse recorder");

    let registry = SourceRegistry::new();
    registry
        .register("Down", "https://down.test/", "")
        .expect("register");
    let orch = Orchestrator::new(
        Arc::new(registry),
        Arc::new(FixtureExtractor::new()),
        OrchestratorCfg {
            delay_between_sources: Duration::ZERO,
            ..Default::default()
        },
    );
    orch.run_ingestion(None).await.expect("run");

    let app = metrics.router::<()>();
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let out = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(out.contains("ingest_runs_total"), "{out}");
    assert!(out.contains("ingest_source_errors_total"));
    assert!(out.contains("ingest_source_ms"));
    assert!(again.handle.render().contains("ingest_runs_total"));
}
