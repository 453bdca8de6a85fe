// src/export.rs
//! Stateless renderers for downstream consumers: CSV, JSON and an RSS 2.0 feed.

use chrono::{DateTime, NaiveTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::error::{Result, TrackerError};
use crate::opportunity::Opportunity;

pub const CSV_HEADERS: [&str; 7] = [
    "Title",
    "Institute",
    "Deadline",
    "Source",
    "Date Added",
    "Link",
    "Description",
];
pub const RSS_MAX_ITEMS: usize = 20;

fn csv_field(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn to_csv(opps: &[Opportunity]) -> String {
    let mut lines = Vec::with_capacity(opps.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    for o in opps {
        lines.push(
            [
                csv_field(&o.title),
                csv_field(&o.institute),
                o.deadline.to_string(),
                csv_field(&o.source),
                o.date_added.to_string(),
                csv_field(&o.link),
                csv_field(&o.description),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

pub fn to_json(opps: &[Opportunity]) -> Result<String> {
    Ok(serde_json::to_string_pretty(opps)?)
}

#[derive(Debug, Clone)]
pub struct RssChannel {
    pub title: String,
    pub description: String,
    pub link: String,
}

impl Default for RssChannel {
    fn default() -> Self {
        Self {
            title: "PhD Opportunities".to_string(),
            description: "Latest PhD opportunities gathered from configured sources".to_string(),
            link: "http://localhost:8000/".to_string(),
        }
    }
}

fn emit<W: std::io::Write>(w: &mut Writer<W>, ev: Event<'_>) -> Result<()> {
    w.write_event(ev)
        .map_err(|e| TrackerError::Export(format!("xml write: {e}")))
}

fn text_element<W: std::io::Write>(w: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    emit(w, Event::Start(BytesStart::new(name)))?;
    emit(w, Event::Text(BytesText::new(value)))?;
    emit(w, Event::End(BytesEnd::new(name)))
}

/// RSS 2.0 feed of the first [`RSS_MAX_ITEMS`] records in the given order.
pub fn to_rss(opps: &[Opportunity], channel: &RssChannel, now: DateTime<Utc>) -> Result<String> {
    let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(
        &mut w,
        Event::Start(BytesStart::new("rss").with_attributes([("version", "2.0")])),
    )?;
    emit(&mut w, Event::Start(BytesStart::new("channel")))?;
    text_element(&mut w, "title", &channel.title)?;
    text_element(&mut w, "description", &channel.description)?;
    text_element(&mut w, "link", &channel.link)?;
    text_element(&mut w, "language", "en-us")?;
    text_element(&mut w, "lastBuildDate", &now.to_rfc2822())?;

    for o in opps.iter().take(RSS_MAX_ITEMS) {
        let description = if o.description.is_empty() {
            format!("PhD opportunity at {}", o.institute)
        } else {
            o.description.clone()
        };
        let pub_date = o.date_added.and_time(NaiveTime::MIN).and_utc().to_rfc2822();

        emit(&mut w, Event::Start(BytesStart::new("item")))?;
        text_element(&mut w, "title", &o.title)?;
        text_element(&mut w, "description", &description)?;
        text_element(&mut w, "link", &o.link)?;
        text_element(&mut w, "guid", &o.id)?;
        text_element(&mut w, "pubDate", &pub_date)?;
        text_element(&mut w, "category", "PhD Opportunities")?;
        emit(&mut w, Event::End(BytesEnd::new("item")))?;
    }

    emit(&mut w, Event::End(BytesEnd::new("channel")))?;
    emit(&mut w, Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(w.into_inner().into_inner())
        .map_err(|e| TrackerError::Export(format!("rss is not utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn opp(title: &str, description: &str) -> Opportunity {
        Opportunity {
            id: "id-1".into(),
            title: title.into(),
            institute: "Uni, \"Main\" Campus".into(),
            deadline: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
            link: "https://a.b/c?x=1&y=2".into(),
            description: description.into(),
            source: "Board".into(),
            date_added: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn csv_quotes_and_escapes() {
        let csv = to_csv(&[opp("PhD \"X\"", "")]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Title,Institute,Deadline,Source,Date Added,Link,Description"
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""PhD ""X""","Uni, ""Main"" Campus",2030-01-02,"Board",2026-01-01,"https://a.b/c?x=1&y=2","""#
        );
    }

    #[test]
    fn rss_escapes_and_caps_items() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let many: Vec<_> = (0..25).map(|i| opp(&format!("PhD {i} <b>"), "")).collect();
        let xml = to_rss(&many, &RssChannel::default(), now).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(xml.matches("<item>").count(), RSS_MAX_ITEMS);
        assert!(xml.contains("PhD 0 &lt;b&gt;"));
        assert!(xml.contains("x=1&amp;y=2"));
        assert!(xml.contains("PhD opportunity at Uni"));
        assert!(!xml.contains("PhD 24"));
    }
}
