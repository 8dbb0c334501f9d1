//! iCalendar (RFC 5545) export of a single event
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::geo::Point;

const PRODID: &str = "-//nearby//events//EN";
const MAX_LINE_OCTETS: usize = 75;
const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Length assumed for events that were saved without an end
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub location: Option<Point>,
}

impl CalendarEvent {
    pub fn detail_url(&self, origin: &str) -> String {
        format!(
            "{}/events/{}",
            origin.trim_end_matches('/'),
            urlencoding::encode(&self.id)
        )
    }
}

/// Render `event` as a VCALENDAR with a display alarm `reminder_days`
/// before the start. `origin` is used for the event link.
pub fn render_ics(event: &CalendarEvent, origin: &str, reminder_days: u32, now: DateTime<Utc>) -> String {
    let url = event.detail_url(origin);
    let ends_at = event
        .ends_at
        .filter(|end| *end >= event.starts_at)
        .unwrap_or(event.starts_at + Duration::minutes(DEFAULT_DURATION_MINUTES));
    let description = format!(
        "{}\n\nView event details: {}",
        event.description.as_deref().unwrap_or_default(),
        url
    );

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@nearby", event.id),
        format!("DTSTAMP:{}", now.format(DATE_FORMAT)),
        format!("DTSTART:{}", event.starts_at.format(DATE_FORMAT)),
        format!("DTEND:{}", ends_at.format(DATE_FORMAT)),
        format!("SUMMARY:{}", escape_text(&event.title)),
        format!("DESCRIPTION:{}", escape_text(&description)),
        format!("URL:{}", url),
    ];
    if let Some(address) = event.address.as_deref().filter(|a| !a.trim().is_empty()) {
        lines.push(format!("LOCATION:{}", escape_text(address)));
    }
    if let Some(point) = event.location.filter(Point::is_valid) {
        lines.push(format!("GEO:{};{}", point.lat, point.lng));
    }
    lines.extend([
        "BEGIN:VALARM".to_string(),
        "ACTION:DISPLAY".to_string(),
        "DESCRIPTION:Reminder".to_string(),
        format!("TRIGGER:-P{}D", reminder_days),
        "END:VALARM".to_string(),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ]);

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(&line));
        out.push_str("\r\n");
    }
    out
}

fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

/// Split a content line into chunks of at most 75 octets, never inside a
/// UTF-8 sequence. Continuation lines start with a space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    let mut limit = MAX_LINE_OCTETS;
    for ch in line.chars() {
        if used + ch.len_utf8() > limit {
            out.push_str("\r\n ");
            used = 0;
            // The leading space counts toward the limit
            limit = MAX_LINE_OCTETS - 1;
        }
        out.push(ch);
        used += ch.len_utf8();
    }
    out
}

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("valid regex"));

/// Download name for an event: non-alphanumerics become `_`.
pub fn ics_filename(title: &str) -> String {
    format!("{}.ics", NON_ALNUM.replace_all(title, "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jazz_night() -> CalendarEvent {
        CalendarEvent {
            id: "e1".into(),
            title: "Jazz Night, Live!".into(),
            description: Some("Bring a chair; it's outside".into()),
            starts_at: "2024-06-15T22:00:00Z".parse().unwrap(),
            ends_at: Some("2024-06-16T01:00:00Z".parse().unwrap()),
            address: Some("1 Main St, Charlotte".into()),
            location: Some(Point {
                lat: 35.2271,
                lng: -80.8431,
            }),
        }
    }

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    fn unfold(ics: &str) -> String {
        ics.replace("\r\n ", "")
    }

    #[test]
    fn it_renders_the_event() {
        let ics = render_ics(&jazz_night(), "https://nearby.test/", 2, now());
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        let ics = unfold(&ics);
        assert!(ics.contains("DTSTART:20240615T220000Z\r\n"));
        assert!(ics.contains("DTEND:20240616T010000Z\r\n"));
        assert!(ics.contains("DTSTAMP:20240601T120000Z\r\n"));
        assert!(ics.contains("SUMMARY:Jazz Night\\, Live!\r\n"));
        assert!(ics.contains("LOCATION:1 Main St\\, Charlotte\r\n"));
        assert!(ics.contains("GEO:35.2271;-80.8431\r\n"));
        assert!(ics.contains("URL:https://nearby.test/events/e1\r\n"));
        assert!(ics.contains("TRIGGER:-P2D\r\n"));
        assert!(ics.contains(
            "DESCRIPTION:Bring a chair\\; it's outside\\n\\nView event details: https://nearby.test/events/e1\r\n"
        ));
    }

    #[test]
    fn it_defaults_the_end_and_skips_missing_fields() {
        let event = CalendarEvent {
            ends_at: None,
            address: None,
            location: None,
            description: None,
            ..jazz_night()
        };
        let ics = unfold(&render_ics(&event, "http://localhost", 1, now()));
        assert!(ics.contains("DTEND:20240615T230000Z\r\n"));
        assert!(!ics.contains("LOCATION:"));
        assert!(!ics.contains("GEO:"));
        assert!(ics.contains("DESCRIPTION:\\n\\nView event details: http://localhost/events/e1"));
    }

    #[test]
    fn it_folds_long_lines() {
        let event = CalendarEvent {
            title: "é".repeat(100),
            ..jazz_night()
        };
        let ics = render_ics(&event, "http://localhost", 1, now());
        for line in ics.split("\r\n") {
            assert!(line.len() <= MAX_LINE_OCTETS, "{} octets: {}", line.len(), line);
        }
        assert!(unfold(&ics).contains(&format!("SUMMARY:{}", "é".repeat(100))));
    }

    #[test]
    fn it_builds_filenames() {
        assert_eq!(ics_filename("Jazz Night, Live!"), "Jazz_Night__Live_.ics");
        assert_eq!(ics_filename("Market2024"), "Market2024.ics");
    }
}
