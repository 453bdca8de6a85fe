// src/store/documents.rs
//! JSON documents kept in the blob store: source configuration, the active
//! opportunity set, and the append-only archive.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;

use super::BlobStore;
use crate::error::Result;
use crate::ingest::dedup::deduplicate;
use crate::ingest::registry::Source;
use crate::opportunity::{ArchivedOpportunity, Opportunity};
use crate::stats::archive_expired;

pub const SOURCES_PATH: &str = "sources.json";
pub const OPPORTUNITIES_PATH: &str = "opportunities.json";
pub const ARCHIVE_PATH: &str = "archive/archived_opportunities.json";

/// Parsed document plus the version it was read at (`None` = absent).
pub async fn load_json<T: DeserializeOwned, S: BlobStore + ?Sized>(
    store: &S,
    path: &str,
) -> Result<(Option<T>, Option<String>)> {
    let blob = store.get(path).await?;
    let parsed = match blob.content.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(serde_json::from_str(s)?),
        _ => None,
    };
    Ok((parsed, blob.version))
}

pub async fn save_json<T: Serialize + ?Sized, S: BlobStore + ?Sized>(
    store: &S,
    path: &str,
    value: &T,
    expected_version: Option<&str>,
) -> Result<String> {
    let body = serde_json::to_string_pretty(value)?;
    store.put(path, &body, expected_version).await
}

pub async fn load_sources<S: BlobStore + ?Sized>(
    store: &S,
) -> Result<(Vec<Source>, Option<String>)> {
    let (sources, version) = load_json::<Vec<Source>, _>(store, SOURCES_PATH).await?;
    Ok((sources.unwrap_or_default(), version))
}

/// Overwrite the source list, reading the current version first.
/// A concurrent writer between the read and the write surfaces as a conflict.
pub async fn save_sources<S: BlobStore + ?Sized>(store: &S, sources: &[Source]) -> Result<String> {
    let current = store.get(SOURCES_PATH).await?;
    save_json(store, SOURCES_PATH, sources, current.version.as_deref()).await
}

pub async fn load_opportunities<S: BlobStore + ?Sized>(store: &S) -> Result<Vec<Opportunity>> {
    let (opps, _) = load_json::<Vec<Opportunity>, _>(store, OPPORTUNITIES_PATH).await?;
    Ok(opps.unwrap_or_default())
}

pub async fn load_archive<S: BlobStore + ?Sized>(store: &S) -> Result<Vec<ArchivedOpportunity>> {
    let (archived, _) = load_json::<Vec<ArchivedOpportunity>, _>(store, ARCHIVE_PATH).await?;
    Ok(archived.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub active: usize,
    pub archived: usize,
    pub added: usize,
}

/// Merge a run's results into the stored set.
///
/// Stored records come first, so a posting already known keeps its original
/// `dateAdded`. Expired records are appended to the archive (skipping postings whose
/// title and institute are already there) before the active set is rewritten. Conflicts are returned to the caller.
pub async fn publish_results<S: BlobStore + ?Sized>(
    store: &S,
    results: &[Opportunity],
    today: NaiveDate,
) -> Result<PublishOutcome> {
    let (existing, active_version) =
        load_json::<Vec<Opportunity>, _>(store, OPPORTUNITIES_PATH).await?;
    let existing = existing.unwrap_or_default();
    let before = existing.len();

    let mut merged = existing;
    merged.extend(results.iter().cloned());
    let merged = deduplicate(merged);
    let added = merged.len().saturating_sub(before);

    let split = archive_expired(merged, today);
    let archived = split.expired.len();

    if !split.expired.is_empty() {
        let (old, archive_version) =
            load_json::<Vec<ArchivedOpportunity>, _>(store, ARCHIVE_PATH).await?;
        let mut archive = old.unwrap_or_default();
        let mut known: HashSet<(String, String)> =
            archive.iter().map(|a| a.opportunity.dedup_key()).collect();
        archive.extend(
            split
                .expired
                .into_iter()
                .filter(|a| known.insert(a.opportunity.dedup_key())),
        );
        save_json(store, ARCHIVE_PATH, &archive, archive_version.as_deref()).await?;
    }

    save_json(
        store,
        OPPORTUNITIES_PATH,
        &split.active,
        active_version.as_deref(),
    )
    .await?;

    tracing::info!(
        target: "ingest",
        active = split.active.len(),
        archived,
        added,
        "results published"
    );

    Ok(PublishOutcome {
        active: split.active.len(),
        archived,
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;
    use chrono::Utc;

    fn opp(title: &str, deadline: NaiveDate, added: NaiveDate) -> Opportunity {
        Opportunity {
            id: format!("{title}-{added}"),
            title: title.into(),
            institute: "Inst".into(),
            deadline,
            link: "https://a.b/c".into(),
            description: String::new(),
            source: "S".into(),
            date_added: added,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn republish_keeps_first_date_added() {
        let store = MemoryBlobStore::new();
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let far = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

        let first = publish_results(&store, &[opp("PhD A", far, day1)], day1)
            .await
            .unwrap();
        assert_eq!(first.added, 1);

        let second = publish_results(
            &store,
            &[opp("phd a", far, day2), opp("PhD B", far, day2)],
            day2,
        )
        .await
        .unwrap();
        assert_eq!(second.added, 1);
        assert_eq!(second.active, 2);

        let stored = load_opportunities(&store).await.unwrap();
        assert_eq!(stored[0].title, "PhD A");
        assert_eq!(stored[0].date_added, day1);
    }

    #[tokio::test]
    async fn expired_move_to_archive_once() {
        let store = MemoryBlobStore::new();
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let past = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();

        let out = publish_results(&store, &[opp("Old", past, past)], today)
            .await
            .unwrap();
        assert_eq!((out.active, out.archived), (0, 1));
        assert!(load_opportunities(&store).await.unwrap().is_empty());

        let archive = load_archive(&store).await.unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].archived_date, today);
    }
}
