// tests/providers_json.rs
use phd_opportunity_tracker::ingest::providers::fixture::FixtureExtractor;
use phd_opportunity_tracker::ingest::providers::http_json::extract_records;
use phd_opportunity_tracker::ingest::{parse_selectors, Orchestrator, OrchestratorCfg, SourceRegistry};
use std::sync::Arc;
use std::time::Duration;

const BOARD_JSON: &str = include_str!("fixtures/board.json");
const BOARD_URL: &str = "https://positions.test/api/list";
const SELECTORS: &str = "container: /data/positions
title: name
institute: /employer/name
deadline: closes
link: url
description: summary";

#[test]
fn fixture_document_maps_onto_raw_records() {
    let doc: serde_json::Value = serde_json::from_str(BOARD_JSON).unwrap();
    let recs = extract_records(&doc, &parse_selectors(SELECTORS)).unwrap();
    assert_eq!(recs.len(), 4);
    assert_eq!(recs[0].institute.as_deref(), Some("Karolinska Institutet"));
    assert_eq!(recs[1].link.as_deref(), Some("https://ed.test/jobs/77"));
    assert_eq!(recs[2].description, None);
}

#[tokio::test]
async fn fixture_board_runs_through_the_pipeline() {
    let doc: serde_json::Value = serde_json::from_str(BOARD_JSON).unwrap();
    let recs = extract_records(&doc, &parse_selectors(SELECTORS)).unwrap();

    let registry = SourceRegistry::new();
    registry
        .register("Doctoral Positions Board", BOARD_URL, SELECTORS)
        .unwrap();
    let orch = Orchestrator::new(
        Arc::new(registry),
        Arc::new(FixtureExtractor::new().with_records(BOARD_URL, recs)),
        OrchestratorCfg {
            delay_between_sources: Duration::ZERO,
            ..Default::default()
        },
    );

    let report = orch.run_ingestion(None).await.unwrap();
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.summary.invalid_dropped, 1);
    assert_eq!(report.summary.deadline_fallbacks, 1);

    let first = &report.results[0];
    assert_eq!(first.deadline.to_string(), "2026-04-30");
    assert_eq!(first.link, "https://positions.test/positions/1042");
    assert_eq!(
        first.description,
        "Fully funded doctoral project on proton dosimetry."
    );
    assert_eq!(first.source, "Doctoral Positions Board");
}
