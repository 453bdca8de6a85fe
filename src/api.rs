// src/api.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::{Result, TrackerError};
use crate::export::{self, RssChannel};
use crate::ingest::orchestrator::{IngestSummary, IngestionError, Orchestrator};
use crate::ingest::registry::{RegistryStats, Source, SourcePatch, SourceRegistry};
use crate::opportunity::Opportunity;
use crate::query::{OpportunityQuery, SortDirection, SortField};
use crate::stats::{compute_statistics, Stats};
use crate::store::documents::{load_opportunities, save_sources};
use crate::store::{publish_results, BlobStore, PublishOutcome};

const DEFAULT_ERROR_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SourceRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn BlobStore>,
    pub channel: Arc<RssChannel>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            registry: orchestrator.registry().clone(),
            orchestrator,
            store,
            channel: Arc::new(RssChannel::default()),
        }
    }

    async fn persist_sources(&self) -> Result<()> {
        save_sources(self.store.as_ref(), &self.registry.list()).await?;
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sources", get(list_sources).post(register_source))
        .route("/sources/test", post(test_source))
        .route("/sources/{id}", patch(update_source).delete(remove_source))
        .route("/sources/{id}/toggle", post(toggle_source))
        .route("/ingest", post(ingest))
        .route("/opportunities", get(list_opportunities))
        .route("/stats", get(stats))
        .route("/errors", get(recent_errors))
        .route("/export/csv", get(export_csv))
        .route("/export/json", get(export_json))
        .route("/export/rss", get(export_rss))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct NewSource {
    name: String,
    url: String,
    /// `key: value` lines, as typed into a form.
    #[serde(default)]
    selectors: String,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<Source>> {
    Json(state.registry.list())
}

async fn register_source(
    State(state): State<AppState>,
    Json(body): Json<NewSource>,
) -> Result<(StatusCode, Json<Source>)> {
    let source = state
        .registry
        .register(&body.name, &body.url, &body.selectors)?;
    state.persist_sources().await?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn test_source(
    State(state): State<AppState>,
    Json(body): Json<NewSource>,
) -> Result<Json<Vec<Opportunity>>> {
    let draft = SourceRegistry::draft(&body.name, &body.url, &body.selectors)?;
    let found = state.orchestrator.test_source(&draft).await?;
    Ok(Json(found))
}

async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<SourcePatch>,
) -> Result<Json<Source>> {
    let updated = state
        .registry
        .update(&id, changes)?
        .ok_or_else(|| TrackerError::NotFound(format!("source {id}")))?;
    state.persist_sources().await?;
    Ok(Json(updated))
}

async fn remove_source(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    if !state.registry.remove(&id) {
        return Err(TrackerError::NotFound(format!("source {id}")));
    }
    state.persist_sources().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct ToggleOut {
    id: String,
    active: bool,
}

async fn toggle_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToggleOut>> {
    let active = state
        .registry
        .toggle_active(&id)
        .ok_or_else(|| TrackerError::NotFound(format!("source {id}")))?;
    state.persist_sources().await?;
    Ok(Json(ToggleOut { id, active }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IngestRequest {
    source_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestOut {
    summary: IngestSummary,
    errors: Vec<IngestionError>,
    cancelled: bool,
    published: PublishOutcome,
}

/// Body is optional; an empty body runs every active source.
async fn ingest(State(state): State<AppState>, body: Bytes) -> Result<Json<IngestOut>> {
    let req: IngestRequest = if body.iter().all(u8::is_ascii_whitespace) {
        IngestRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| TrackerError::Validation(format!("invalid ingest request: {e}")))?
    };

    let sources = if req.source_ids.is_empty() {
        None
    } else {
        let picked = req
            .source_ids
            .iter()
            .map(|id| {
                state
                    .registry
                    .get(id)
                    .ok_or_else(|| TrackerError::NotFound(format!("source {id}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Some(picked)
    };

    let report = state.orchestrator.run_ingestion(sources).await?;
    let today = chrono::Utc::now().date_naive();
    let published = publish_results(state.store.as_ref(), &report.results, today).await?;
    state.persist_sources().await?;

    Ok(Json(IngestOut {
        summary: report.summary,
        errors: report.errors,
        cancelled: report.cancelled,
        published,
    }))
}

async fn list_opportunities(
    State(state): State<AppState>,
    Query(q): Query<OpportunityQuery>,
) -> Result<Json<Vec<Opportunity>>> {
    let stored = load_opportunities(state.store.as_ref()).await?;
    Ok(Json(q.apply(&stored)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOut {
    opportunities: Stats,
    sources: RegistryStats,
    ingestion_running: bool,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsOut>> {
    let stored = load_opportunities(state.store.as_ref()).await?;
    let today = chrono::Utc::now().date_naive();
    Ok(Json(StatsOut {
        opportunities: compute_statistics(&stored, today),
        sources: state.registry.stats(),
        ingestion_running: state.orchestrator.is_running(),
    }))
}

#[derive(Deserialize)]
struct ErrorsQuery {
    limit: Option<usize>,
}

async fn recent_errors(
    State(state): State<AppState>,
    Query(q): Query<ErrorsQuery>,
) -> Json<Vec<IngestionError>> {
    Json(
        state
            .orchestrator
            .recent_errors(q.limit.unwrap_or(DEFAULT_ERROR_LIMIT)),
    )
}

async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stored = load_opportunities(state.store.as_ref()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"phd_opportunities.csv\"",
            ),
        ],
        export::to_csv(&stored),
    ))
}

async fn export_json(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stored = load_opportunities(state.store.as_ref()).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        export::to_json(&stored)?,
    ))
}

async fn export_rss(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stored = load_opportunities(state.store.as_ref()).await?;
    let newest_first = OpportunityQuery {
        sort: SortField::DateAdded,
        direction: SortDirection::Desc,
        ..Default::default()
    }
    .apply(&stored);
    let xml = export::to_rss(&newest_first, &state.channel, chrono::Utc::now())?;
    Ok(([(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")], xml))
}
