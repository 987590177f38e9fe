// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pure parsers for individual feed fields.
//!
//! None of these fail: malformed input degrades to a default so a single bad
//! field never drops an episode.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use regex::Regex;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Entities decoded by [`clean_html`]; `&amp;` goes last so `&amp;lt;` yields `&lt;`
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

/// How the time zone of a date layout is expressed
#[derive(Debug, Clone, Copy)]
enum Zone {
    /// Numeric offset parsed by chrono (`%z`)
    Numeric,
    /// Trailing zone abbreviation such as `GMT` or `PST`
    Named,
    /// RFC 3339 / ISO-8601 with offset
    Iso,
    /// No zone at all, interpreted as UTC
    Utc,
}

/// Publication date layouts, tried in order
const DATE_LAYOUTS: &[(&str, Zone)] = &[
    ("%a, %d %b %Y %H:%M:%S %z", Zone::Numeric),
    ("%a, %d %b %Y %H:%M:%S", Zone::Named),
    ("%d %b %y %H:%M %z", Zone::Numeric),
    ("%d %b %y %H:%M", Zone::Named),
    ("%a, %e %b %Y %H:%M:%S %z", Zone::Numeric),
    ("%Y-%m-%dT%H:%M:%S%:z", Zone::Iso),
    ("%Y-%m-%d %H:%M:%S", Zone::Utc),
];

/// Layouts retried after dropping a leading day name that disagrees with the date
const UNDATED_LAYOUTS: &[(&str, Zone)] = &[
    ("%d %b %Y %H:%M:%S %z", Zone::Numeric),
    ("%d %b %Y %H:%M:%S", Zone::Named),
];

/// Parse an `itunes:duration` value into seconds.
///
/// Accepts plain seconds, `HH:MM:SS` and `MM:SS`. Anything else, including
/// values too large to represent, yields 0.
pub fn parse_duration(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }

    if let Ok(seconds) = raw.parse::<i64>() {
        return seconds.max(0);
    }

    let part = |p: &str| p.trim().parse::<i64>().unwrap_or(0);
    let parts: Vec<&str> = raw.split(':').collect();

    let total = match parts.as_slice() {
        [hours, minutes, seconds] => part(hours)
            .checked_mul(3600)
            .zip(part(minutes).checked_mul(60))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(part(seconds))),
        [minutes, seconds] => part(minutes)
            .checked_mul(60)
            .and_then(|m| m.checked_add(part(seconds))),
        _ => None,
    };

    total.unwrap_or(0).max(0)
}

/// Parse a publication date using the layouts commonly seen in podcast feeds
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    try_layouts(raw, DATE_LAYOUTS).or_else(|| {
        let (_, rest) = raw.split_once(',')?;
        try_layouts(rest.trim(), UNDATED_LAYOUTS)
    })
}

fn try_layouts(raw: &str, layouts: &[(&str, Zone)]) -> Option<DateTime<Utc>> {
    layouts
        .iter()
        .find_map(|&(layout, zone)| parse_with_layout(raw, layout, zone))
}

fn parse_with_layout(raw: &str, layout: &str, zone: Zone) -> Option<DateTime<Utc>> {
    match zone {
        Zone::Numeric => DateTime::parse_from_str(raw, layout)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Zone::Iso => DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, layout))
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Zone::Utc => NaiveDateTime::parse_from_str(raw, layout)
            .ok()
            .map(|naive| naive.and_utc()),
        Zone::Named => {
            let (stamp, name) = raw.rsplit_once(' ')?;
            let offset = zone_offset(name)?;
            let naive = NaiveDateTime::parse_from_str(stamp, layout).ok()?;
            naive
                .and_local_timezone(offset)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

/// Resolve a zone abbreviation; unknown alphabetic names are treated as UTC
fn zone_offset(name: &str) -> Option<FixedOffset> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match name.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };

    FixedOffset::east_opt(hours * 3600)
}

/// Parse iTunes-style boolean flags such as `itunes:explicit`
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1"
    )
}

/// Parse an optional episode or season number; garbage becomes `None`
pub fn parse_number(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|value| value.trim().parse().ok())
}

/// Reduce an HTML fragment to plain text.
///
/// Line breaks become newlines, remaining tags are stripped, a fixed set of
/// entities is decoded and the result is trimmed.
pub fn clean_html(content: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(content, "\n");
    let stripped = HTML_TAG.replace_all(&with_breaks, "");

    let decoded = HTML_ENTITIES
        .iter()
        .fold(stripped.into_owned(), |text, (entity, replacement)| {
            text.replace(entity, replacement)
        });

    decoded.trim().to_string()
}

/// Return the first candidate that is present and not blank
pub(crate) fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_accepts_plain_seconds() {
        assert_eq!(parse_duration("90"), 90);
    }

    #[test]
    fn duration_accepts_hours_minutes_seconds() {
        assert_eq!(parse_duration("01:30:00"), 5400);
    }

    #[test]
    fn duration_accepts_minutes_seconds() {
        assert_eq!(parse_duration("05:30"), 330);
    }

    #[test]
    fn duration_garbage_is_zero() {
        assert_eq!(parse_duration("garbage"), 0);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("1:2:3:4"), 0);
    }

    #[test]
    fn duration_ignores_bad_components() {
        assert_eq!(parse_duration("xx:10"), 10);
    }

    #[test]
    fn duration_overflow_is_zero() {
        assert_eq!(parse_duration("9999999999999999:00:00"), 0);
        assert_eq!(parse_duration("9223372036854775807:59"), 0);
        assert_eq!(parse_duration("1:9223372036854775807:00"), 0);
    }

    #[test]
    fn pub_date_rfc1123z() {
        let parsed = parse_pub_date("Mon, 01 Jan 2024 12:00:00 +0100").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn pub_date_rfc1123_named_zone() {
        let parsed = parse_pub_date("Mon, 01 Jan 2024 12:00:00 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());

        let pacific = parse_pub_date("Mon, 01 Jan 2024 12:00:00 PST").unwrap();
        assert_eq!(pacific, Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap());
    }

    #[test]
    fn pub_date_rfc822_variants() {
        let numeric = parse_pub_date("02 Jan 06 15:04 -0700").unwrap();
        assert_eq!(numeric, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 0).unwrap());

        let named = parse_pub_date("02 Jan 06 15:04 UTC").unwrap();
        assert_eq!(named, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 0).unwrap());
    }

    #[test]
    fn pub_date_single_digit_day() {
        let parsed = parse_pub_date("Tue, 2 Jan 2024 08:30:00 +0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap());
    }

    #[test]
    fn pub_date_iso8601_with_offset() {
        let parsed = parse_pub_date("2024-03-10T09:15:00-05:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 10, 14, 15, 0).unwrap());
    }

    #[test]
    fn pub_date_plain_timestamp_is_utc() {
        let parsed = parse_pub_date("2006-01-02 15:04:05").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn pub_date_with_wrong_weekday_still_parses() {
        // 1 January 2024 was a Monday
        let parsed = parse_pub_date("Fri, 01 Jan 2024 12:00:00 +0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn pub_date_unrecognized_is_none() {
        assert!(parse_pub_date("last tuesday").is_none());
        assert!(parse_pub_date("").is_none());
    }

    #[test]
    fn flags_are_case_insensitive() {
        assert!(parse_flag("yes"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag("clean"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn numbers_degrade_to_none() {
        assert_eq!(parse_number(Some("12")), Some(12));
        assert_eq!(parse_number(Some(" 3 ")), Some(3));
        assert_eq!(parse_number(Some("twelve")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn clean_html_strips_tags_and_decodes_entities() {
        let html = "<p>Hello&nbsp;<b>world</b><br/>Tom &amp; Jerry &lt;3<br>it&#39;s &quot;fine&quot;</p>  ";
        assert_eq!(
            clean_html(html),
            "Hello world\nTom & Jerry <3\nit's \"fine\""
        );
    }

    #[test]
    fn clean_html_handles_br_variants() {
        assert_eq!(clean_html("a<br>b<br/>c<br />d<BR>e"), "a\nb\nc\nd\ne");
    }

    #[test]
    fn clean_html_decodes_amp_last() {
        assert_eq!(clean_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn first_non_empty_skips_blanks() {
        assert_eq!(
            first_non_empty([None, Some("  "), Some("Author"), Some("Other")]),
            Some("Author")
        );
        assert_eq!(first_non_empty([None, Some("")]), None);
    }
}
