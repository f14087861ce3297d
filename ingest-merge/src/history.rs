//! Parses a dataset-creation timestamp out of a group's `history`
//! attribute, used by the overlap-resolution rule in §4.3.
//!
//! The `history` attribute is free text (typically something netCDF
//! tooling appends a line to on every write), so this is a best-effort
//! regex match rather than a strict parser: any plausible
//! `YYYY-MM-DD[ T]HH:MM:SS` timestamp found in the string is taken as
//! the creation time.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2})").expect("static regex is valid")
    })
}

/// Returns the most recent timestamp found in `history`, or `None` if
/// the attribute is absent or has no recognizable timestamp.
#[must_use]
pub fn parse_creation_time(history: Option<&str>) -> Option<i64> {
    let history = history?;
    let mut latest: Option<i64> = None;
    for caps in timestamp_pattern().captures_iter(history) {
        let date = &caps[1];
        let time = &caps[2];
        let combined = format!("{date} {time}");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %H:%M:%S") {
            let epoch = naive.and_utc().timestamp();
            latest = Some(latest.map_or(epoch, |l: i64| l.max(epoch)));
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_timestamp_from_typical_history_line() {
        let history = "2020-03-04 12:00:01: created by ingest v1.2";
        assert_eq!(parse_creation_time(Some(history)), Some(1_583_323_201));
    }

    #[test]
    fn keeps_the_latest_of_multiple_timestamps() {
        let history = "2020-01-01 00:00:00: initial\n2020-06-01 00:00:00: updated";
        let parsed = parse_creation_time(Some(history)).unwrap();
        let expected = NaiveDateTime::parse_from_str("2020-06-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn returns_none_without_a_recognizable_timestamp() {
        assert_eq!(parse_creation_time(Some("no date here")), None);
        assert_eq!(parse_creation_time(None), None);
    }
}
