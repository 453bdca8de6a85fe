// tests/ingest_registry.rs
use phd_opportunity_tracker::ingest::{parse_selectors, SourcePatch, SourceRegistry};
use phd_opportunity_tracker::TrackerError;

#[test]
fn register_validates_and_defaults() {
    let reg = SourceRegistry::new();

    let err = reg.register("", "https://a.test", "").unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
    let err = reg.register("A", "ftp-less nonsense", "").unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
    assert!(reg.is_empty());

    let s = reg
        .register(" Euraxess ", " https://euraxess.test/jobs ", "title: h2.title")
        .unwrap();
    assert_eq!(s.name, "Euraxess");
    assert_eq!(s.url, "https://euraxess.test/jobs");
    assert!(s.active);
    assert_eq!((s.success_count, s.error_count), (0, 0));
    assert!(s.last_scraped.is_none());
    assert!(s.id.starts_with("euraxess-"));
    assert_eq!(reg.get(&s.id), Some(s));
}

#[test]
fn same_name_twice_gets_distinct_ids() {
    let reg = SourceRegistry::new();
    let a = reg.register("Board", "https://a.test", "").unwrap();
    let b = reg.register("Board", "https://b.test", "").unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(reg.len(), 2);
}

#[test]
fn selector_text_is_lenient() {
    let sel = parse_selectors("container: .job\n\nnot a pair\n: empty key\nlink:\n link : a:hover ");
    assert_eq!(sel.len(), 2);
    assert_eq!(sel["container"], ".job");
    assert_eq!(sel["link"], "a:hover");
}

#[test]
fn toggle_update_remove() {
    let reg = SourceRegistry::new();
    let s = reg.register("Board", "https://a.test", "").unwrap();

    assert_eq!(reg.toggle_active(&s.id), Some(false));
    assert!(reg.list_active().is_empty());
    assert_eq!(reg.toggle_active("missing"), None);

    let bad = reg.update(
        &s.id,
        SourcePatch {
            url: Some("relative/path".into()),
            ..Default::default()
        },
    );
    assert!(matches!(bad, Err(TrackerError::Validation(_))));
    assert_eq!(reg.get(&s.id).unwrap().url, "https://a.test");

    let patched = reg
        .update(
            &s.id,
            SourcePatch {
                name: Some("Board 2".into()),
                active: Some(true),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(patched.name, "Board 2");
    assert!(patched.active);
    assert!(reg.update("missing", SourcePatch::default()).unwrap().is_none());

    assert!(reg.remove(&s.id));
    assert!(!reg.remove(&s.id));
    assert_eq!(reg.stats().total_sources, 0);
}

#[test]
fn defaults_are_active_job_boards() {
    let reg = SourceRegistry::with_defaults();
    let stats = reg.stats();
    assert_eq!(stats.total_sources, 2);
    assert_eq!(stats.active_sources, 2);
    assert!(reg.list().iter().all(|s| s.selectors.contains_key("container")));
}
