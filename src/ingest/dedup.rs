// src/ingest/dedup.rs
use std::collections::HashSet;

use crate::opportunity::Opportunity;

/// Keep the first record for each lowercased `(title, institute)` pair.
/// Stable and order-preserving; source, deadline and link do not take part.
pub fn deduplicate(records: Vec<Opportunity>) -> Vec<Opportunity> {
    deduplicate_counted(records).0
}

/// Same as [`deduplicate`], also returning how many records were dropped.
pub fn deduplicate_counted(records: Vec<Opportunity>) -> (Vec<Opportunity>, usize) {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(records.len());
    let mut keep = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for opp in records {
        if seen.insert(opp.dedup_key()) {
            keep.push(opp);
        } else {
            dropped += 1;
        }
    }

    (keep, dropped)
}
