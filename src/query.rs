// src/query.rs
//! Filtering and sorting over an already-ingested record set.

use chrono::NaiveDate;
use serde::Deserialize;
use std::cmp::Ordering;

use crate::opportunity::Opportunity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    Institute,
    #[default]
    Deadline,
    Source,
    DateAdded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Query-string shaped filter. Empty strings behave like absent fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpportunityQuery {
    /// Case-insensitive substring over title, institute and description.
    pub search: Option<String>,
    pub institute: Option<String>,
    pub source: Option<String>,
    /// Keep deadlines on or after this date.
    pub deadline_from: Option<NaiveDate>,
    pub sort: SortField,
    pub direction: SortDirection,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl OpportunityQuery {
    pub fn matches(&self, o: &Opportunity) -> bool {
        if let Some(needle) = non_empty(&self.search) {
            let needle = needle.to_lowercase();
            let hit = o.title.to_lowercase().contains(&needle)
                || o.institute.to_lowercase().contains(&needle)
                || o.description.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if non_empty(&self.institute).is_some_and(|i| o.institute != i) {
            return false;
        }
        if non_empty(&self.source).is_some_and(|s| o.source != s) {
            return false;
        }
        if self.deadline_from.is_some_and(|from| o.deadline < from) {
            return false;
        }
        true
    }

    /// Filter then stable-sort. Text fields compare case-insensitively.
    pub fn apply(&self, records: &[Opportunity]) -> Vec<Opportunity> {
        let mut out: Vec<Opportunity> = records.iter().filter(|o| self.matches(o)).cloned().collect();
        out.sort_by(|a, b| {
            let ord = compare(a, b, self.sort);
            match self.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        out
    }
}

fn compare(a: &Opportunity, b: &Opportunity, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Institute => a.institute.to_lowercase().cmp(&b.institute.to_lowercase()),
        SortField::Deadline => a.deadline.cmp(&b.deadline),
        SortField::Source => a.source.to_lowercase().cmp(&b.source.to_lowercase()),
        SortField::DateAdded => a.date_added.cmp(&b.date_added),
    }
}
