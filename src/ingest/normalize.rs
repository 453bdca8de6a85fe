// src/ingest/normalize.rs
//! Record normalizer: raw extractor output -> well-formed [`Opportunity`].
//!
//! Normalization never fails. A missing or unparseable deadline is replaced with a
//! date six calendar months out and reported through [`Normalized::deadline_fallback`].
//! Records that end up incomplete are rejected afterwards by [`missing_fields`].

use chrono::{DateTime, Months, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use url::Url;

use crate::ingest::registry::Source;
use crate::ingest::types::RawRecord;
use crate::opportunity::Opportunity;

pub const FALLBACK_DEADLINE_MONTHS: u32 = 6;
const ID_SLUG_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub opportunity: Opportunity,
    /// Set when the deadline was substituted, so it can't be mistaken for a real far-off deadline.
    pub deadline_fallback: bool,
}

/// Collapse whitespace runs to a single space and trim.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize using the current time.
pub fn normalize(raw: &RawRecord, source: &Source) -> Normalized {
    normalize_at(raw, source, Utc::now())
}

/// Pure variant of [`normalize`]; `now` drives the id token, fallback deadline,
/// `dateAdded` default and `scrapedAt`.
pub fn normalize_at(raw: &RawRecord, source: &Source, now: DateTime<Utc>) -> Normalized {
    let title = clean_text(raw.title.as_deref().unwrap_or_default());
    let institute = clean_text(raw.institute.as_deref().unwrap_or_default());
    let description = clean_text(raw.description.as_deref().unwrap_or_default());

    let (deadline, deadline_fallback) = match raw.deadline.as_deref().and_then(parse_deadline) {
        Some(d) => (d, false),
        None => {
            tracing::debug!(
                target: "ingest",
                source = %source.name,
                raw = raw.deadline.as_deref().unwrap_or_default(),
                "deadline fallback applied"
            );
            (fallback_deadline(now), true)
        }
    };

    let date_added = raw
        .date_added
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| now.date_naive());

    let opportunity = Opportunity {
        id: opportunity_id(&title, &institute, now),
        link: resolve_link(raw.link.as_deref().unwrap_or_default(), &source.url),
        title,
        institute,
        deadline,
        description,
        source: clean_text(&source.name),
        date_added,
        scraped_at: now,
    };

    Normalized {
        opportunity,
        deadline_fallback,
    }
}

/// Names of required fields that are empty or malformed. Empty means the record is valid.
pub fn missing_fields(o: &Opportunity) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if o.title.is_empty() {
        missing.push("title");
    }
    if o.institute.is_empty() {
        missing.push("institute");
    }
    if !is_absolute_url(&o.link) {
        missing.push("link");
    }
    if o.source.is_empty() {
        missing.push("source");
    }
    missing
}

pub fn is_valid(o: &Opportunity) -> bool {
    missing_fields(o).is_empty()
}

/// Absolute URL with a host (`https://a.b/c` yes; `not a url`, `/path`, `mailto:x` no).
pub fn is_absolute_url(s: &str) -> bool {
    Url::parse(s.trim())
        .map(|u| !u.cannot_be_a_base() && u.has_host())
        .unwrap_or(false)
}

/// Absolute links are kept as written; relative ones are joined onto `base`.
/// Returns an empty string when no absolute link can be produced.
pub fn resolve_link(raw: &str, base: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if is_absolute_url(raw) {
        return raw.to_string();
    }
    Url::parse(base)
        .and_then(|b| b.join(raw))
        .ok()
        .filter(|u| u.has_host())
        .map(|u| u.to_string())
        .unwrap_or_default()
}

pub fn fallback_deadline(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today
        .checked_add_months(Months::new(FALLBACK_DEADLINE_MONTHS))
        .unwrap_or(today)
}

/// Parse the deadline forms seen on job boards. `None` means "use the fallback".
///
/// When the text carries a label such as `deadline` or `closes`, the first date after
/// the first label wins; otherwise the first date anywhere. Order: ISO `YYYY-MM-DD`
/// (covers RFC 3339), `MM/DD/YYYY` with a `DD/MM/YYYY` retry, then written dates like
/// `15 March 2026` or `Mar 15, 2026`.
pub fn parse_deadline(text: &str) -> Option<NaiveDate> {
    let t = clean_text(text);
    if t.is_empty() {
        return None;
    }

    static RE_LABEL: OnceCell<Regex> = OnceCell::new();
    let re_label = RE_LABEL.get_or_init(|| {
        Regex::new(r"(?i)\b(?:deadline|closes|closing(?:\s+date)?|apply\s+by|due(?:\s+date)?)\b")
            .unwrap()
    });
    if let Some(label) = re_label.find(&t) {
        if let Some(date) = first_date(&t[label.end()..]) {
            return Some(date);
        }
    }
    first_date(&t)
}

fn first_date(t: &str) -> Option<NaiveDate> {
    static RE_ISO: OnceCell<Regex> = OnceCell::new();
    let re_iso = RE_ISO.get_or_init(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());
    if let Some(c) = re_iso.captures(t) {
        return ymd(&c[1], &c[2], &c[3]);
    }

    static RE_SLASH: OnceCell<Regex> = OnceCell::new();
    let re_slash =
        RE_SLASH.get_or_init(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());
    if let Some(c) = re_slash.captures(t) {
        return ymd(&c[3], &c[1], &c[2]).or_else(|| ymd(&c[3], &c[2], &c[1]));
    }

    static RE_DAY_FIRST: OnceCell<Regex> = OnceCell::new();
    let re_day_first = RE_DAY_FIRST.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\.?,?\s+(\d{4})\b").unwrap()
    });
    if let Some(c) = re_day_first.captures(t) {
        if let Some(m) = month_from_name(&c[2]) {
            return ymd(&c[3], &m.to_string(), &c[1]);
        }
    }

    static RE_MONTH_FIRST: OnceCell<Regex> = OnceCell::new();
    let re_month_first = RE_MONTH_FIRST.get_or_init(|| {
        Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b").unwrap()
    });
    if let Some(c) = re_month_first.captures(t) {
        if let Some(m) = month_from_name(&c[1]) {
            return ymd(&c[3], &m.to_string(), &c[2]);
        }
    }

    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let lower = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|full| lower.len() >= 3 && full.starts_with(lower.as_str()))
        .map(|i| i as u32 + 1)
}

/// Slug of `title-institute` plus a base36 nanosecond token.
/// The token makes raw ids unique per ingestion; identity lives in the dedup key.
pub fn opportunity_id(title: &str, institute: &str, now: DateTime<Utc>) -> String {
    let slug: String = format!("{title}-{institute}")
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .take(ID_SLUG_MAX)
        .collect();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_millis().saturating_mul(1_000_000));
    format!("{slug}-{}", to_base36(nanos.max(0) as u64))
}

pub(crate) fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
