// src/ingest/mod.rs
pub mod config;
pub mod dedup;
pub mod normalize;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod scheduler;
pub mod types;

pub use dedup::deduplicate;
pub use normalize::{clean_text, normalize, normalize_at, Normalized};
pub use orchestrator::{IngestSummary, IngestionError, IngestionReport, Orchestrator, OrchestratorCfg};
pub use registry::{parse_selectors, Source, SourcePatch, SourceRegistry};
pub use types::{Extractor, RawRecord, Selectors};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::opportunity::Opportunity;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingestion runs.");
        describe_counter!(
            "ingest_rejected_runs_total",
            "Runs rejected because another run was in flight."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Per-source extraction failures."
        );
        describe_counter!(
            "ingest_records_total",
            "Opportunities returned after deduplication."
        );
        describe_counter!(
            "ingest_invalid_total",
            "Records dropped for missing required fields."
        );
        describe_counter!("ingest_dedup_total", "Records removed by deduplication.");
        describe_counter!(
            "ingest_deadline_fallback_total",
            "Records whose deadline was replaced by the 6-month fallback."
        );
        describe_histogram!("ingest_source_ms", "Per-source attempt time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingestion last finished.");
        describe_counter!(
            "ingest_scheduler_skipped_total",
            "Scheduled ticks skipped because a run was in flight."
        );
        describe_gauge!(
            "ingest_scheduler_last_tick_ts",
            "Unix ts of the last completed scheduled tick."
        );
    });
}

/// Case-insensitive keyword match over title + description.
/// An empty (or all-blank) keyword list keeps everything.
pub fn is_relevant(opp: &Opportunity, keywords: &[String]) -> bool {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return true;
    }
    let text = format!("{} {}", opp.title, opp.description).to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn opp(title: &str, description: &str) -> Opportunity {
        Opportunity {
            id: "x".into(),
            title: title.into(),
            institute: "Inst".into(),
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            link: "https://a.b/c".into(),
            description: description.into(),
            source: "S".into(),
            date_added: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn relevance_is_case_insensitive_and_optional() {
        let kw = vec!["Medical Physics".to_string(), " dosimetry ".into()];
        assert!(is_relevant(&opp("PhD in medical physics", ""), &kw));
        assert!(is_relevant(&opp("Research post", "Work on DOSIMETRY"), &kw));
        assert!(!is_relevant(&opp("PhD in Linguistics", ""), &kw));
        assert!(is_relevant(&opp("Anything", ""), &[]));
        assert!(is_relevant(&opp("Anything", ""), &["  ".to_string()]));
    }
}
