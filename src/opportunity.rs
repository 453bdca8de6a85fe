// src/opportunity.rs
//! Canonical opportunity records as stored and exported.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One PhD posting after normalization.
///
/// `id` is opaque and carries a per-ingestion token, so two ingestions of the same
/// posting get different ids. Identity for deduplication is [`Opportunity::dedup_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub institute: String,
    pub deadline: NaiveDate,
    pub link: String,
    #[serde(default)]
    pub description: String,
    pub source: String,
    pub date_added: NaiveDate,
    pub scraped_at: DateTime<Utc>,
}

impl Opportunity {
    /// Lowercased title + institute. Exact match only, no fuzzy folding.
    pub fn dedup_key(&self) -> (String, String) {
        (self.title.to_lowercase(), self.institute.to_lowercase())
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.deadline < today
    }
}

/// An expired opportunity moved out of the active set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedOpportunity {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub archived_date: NaiveDate,
}
