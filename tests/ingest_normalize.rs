// tests/ingest_normalize.rs
use chrono::{NaiveDate, TimeZone, Utc};
use phd_opportunity_tracker::ingest::normalize::{is_valid, missing_fields, normalize_at};
use phd_opportunity_tracker::ingest::{RawRecord, SourceRegistry};

fn source() -> phd_opportunity_tracker::Source {
    SourceRegistry::new()
        .register("  Uni   Jobs ", "https://jobs.uni.test/phd/list", "")
        .unwrap()
}

fn raw(title: &str, institute: &str, deadline: Option<&str>, link: &str) -> RawRecord {
    RawRecord {
        title: Some(title.into()),
        institute: Some(institute.into()),
        deadline: deadline.map(str::to_string),
        link: Some(link.into()),
        ..Default::default()
    }
}

#[test]
fn collapses_whitespace_and_resolves_relative_links() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let n = normalize_at(
        &raw(
            "  PhD   in\n Machine\tLearning ",
            " ETH  Zurich ",
            Some("2026-05-31"),
            "../apply/42",
        ),
        &source(),
        now,
    );
    let o = &n.opportunity;
    assert_eq!(o.title, "PhD in Machine Learning");
    assert_eq!(o.institute, "ETH Zurich");
    assert_eq!(o.source, "Uni Jobs");
    assert_eq!(o.link, "https://jobs.uni.test/apply/42");
    assert_eq!(o.deadline, NaiveDate::from_ymd_opt(2026, 5, 31).unwrap());
    assert_eq!(o.date_added, now.date_naive());
    assert_eq!(o.scraped_at, now);
    assert!(!n.deadline_fallback);
    assert!(is_valid(o));
}

#[test]
fn unparseable_deadline_falls_back_six_months_and_is_flagged() {
    let now = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
    for deadline in [None, Some(""), Some("rolling basis"), Some("ASAP")] {
        let n = normalize_at(
            &raw("PhD", "Uni", deadline, "https://a.test/x"),
            &source(),
            now,
        );
        assert!(n.deadline_fallback, "{deadline:?} should trigger the fallback");
        assert_eq!(
            n.opportunity.deadline,
            NaiveDate::from_ymd_opt(2026, 7, 10).unwrap()
        );
    }
}

#[test]
fn written_and_slash_deadlines_parse() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let cases = [
        ("15 March 2026", (2026, 3, 15)),
        ("Deadline: March 15, 2026", (2026, 3, 15)),
        ("03/15/2026", (2026, 3, 15)),
        ("15/03/2026", (2026, 3, 15)),
        ("2026-03-15T23:59:00Z", (2026, 3, 15)),
    ];
    for (text, (y, m, d)) in cases {
        let n = normalize_at(&raw("PhD", "Uni", Some(text), "https://a.test/x"), &source(), now);
        assert!(!n.deadline_fallback, "{text} should parse");
        assert_eq!(n.opportunity.deadline, NaiveDate::from_ymd_opt(y, m, d).unwrap());
    }
}

#[test]
fn missing_required_fields_are_reported() {
    let now = Utc::now();
    let n = normalize_at(&raw("   ", "Uni", Some("2030-01-01"), ""), &source(), now);
    assert_eq!(missing_fields(&n.opportunity), vec!["title", "link"]);

    let n = normalize_at(
        &RawRecord {
            title: Some("PhD".into()),
            link: Some("mailto:hr@uni.test".into()),
            ..Default::default()
        },
        &source(),
        now,
    );
    assert_eq!(missing_fields(&n.opportunity), vec!["institute", "link"]);
}

#[test]
fn explicit_date_added_is_kept() {
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
    let mut r = raw("PhD", "Uni", Some("2026-09-01"), "https://a.test/x");
    r.date_added = Some("2026-05-20".into());
    let n = normalize_at(&r, &source(), now);
    assert_eq!(
        n.opportunity.date_added,
        NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()
    );

    r.date_added = Some("yesterday".into());
    let n = normalize_at(&r, &source(), now);
    assert_eq!(n.opportunity.date_added, now.date_naive());
}

#[test]
fn ids_differ_between_ingestions_of_the_same_posting() {
    let r = raw("PhD in AI", "MIT", Some("2030-01-01"), "https://a.test/x");
    let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t2 = t1 + chrono::Duration::milliseconds(1);
    let a = normalize_at(&r, &source(), t1).opportunity;
    let b = normalize_at(&r, &source(), t2).opportunity;
    assert_ne!(a.id, b.id);
    assert!(a.id.starts_with("phd-in-ai-mit-"));
    assert_eq!(a.dedup_key(), b.dedup_key());
}
