// src/error.rs
//! Error taxonomy shared by the registry, orchestrator, store and API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Malformed registration or patch input (empty name/url, invalid url).
    #[error("validation error: {0}")]
    Validation(String),

    /// A second ingestion run was attempted while one is in flight.
    #[error("ingestion is already in progress")]
    Concurrency,

    /// Per-source extraction failure. Recorded by the orchestrator, never returned from a run.
    #[error("extraction failed for {source_name}: {message}")]
    Extraction {
        source_name: String,
        message: String,
    },

    /// Optimistic-concurrency violation on the blob store.
    #[error("version conflict writing {path}")]
    Conflict { path: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    pub fn status(&self) -> StatusCode {
        match self {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Concurrency | TrackerError::Conflict { .. } => StatusCode::CONFLICT,
            TrackerError::Extraction { .. } => StatusCode::BAD_GATEWAY,
            TrackerError::Store(_)
            | TrackerError::Export(_)
            | TrackerError::Io(_)
            | TrackerError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
