// src/stats.rs
//! Summary counts over an ingested record set, and the active/expired split.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::opportunity::{ArchivedOpportunity, Opportunity};

/// Window for `expiringSoon`, in days after `asOf`.
pub const EXPIRING_SOON_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub new_today: usize,
    pub expiring_soon: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_institute: BTreeMap<String, usize>,
    pub last_updated: Option<NaiveDate>,
}

pub fn compute_statistics(records: &[Opportunity], as_of: NaiveDate) -> Stats {
    let horizon = as_of
        .checked_add_days(Days::new(EXPIRING_SOON_DAYS))
        .unwrap_or(NaiveDate::MAX);

    let mut by_source = BTreeMap::new();
    let mut by_institute = BTreeMap::new();
    for r in records {
        *by_source.entry(r.source.clone()).or_insert(0) += 1;
        *by_institute.entry(r.institute.clone()).or_insert(0) += 1;
    }

    Stats {
        total: records.len(),
        new_today: records.iter().filter(|r| r.date_added == as_of).count(),
        expiring_soon: records
            .iter()
            .filter(|r| r.deadline > as_of && r.deadline <= horizon)
            .count(),
        by_source,
        by_institute,
        last_updated: records.iter().map(|r| r.date_added).max(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSplit {
    pub active: Vec<Opportunity>,
    pub expired: Vec<ArchivedOpportunity>,
}

/// Partition into `deadline >= today` (active) and the rest, stamping expired
/// records with `archivedDate = today`. Order is preserved on both sides.
pub fn archive_expired(records: Vec<Opportunity>, today: NaiveDate) -> ArchiveSplit {
    let mut split = ArchiveSplit::default();
    for r in records {
        if r.is_expired(today) {
            split.expired.push(ArchivedOpportunity {
                opportunity: r,
                archived_date: today,
            });
        } else {
            split.active.push(r);
        }
    }
    split
}
