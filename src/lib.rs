// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod error;
pub mod export;
pub mod ingest;
pub mod metrics;
pub mod opportunity;
pub mod query;
pub mod stats;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::{Result, TrackerError};
pub use crate::ingest::{
    Extractor, IngestionReport, Orchestrator, OrchestratorCfg, Source, SourceRegistry,
};
pub use crate::opportunity::{ArchivedOpportunity, Opportunity};
pub use crate::stats::{compute_statistics, Stats};
