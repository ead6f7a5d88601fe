//! Date grammars seen on Estonian federation sites.
//!
//! All dates are naive local calendar values exactly as published; no time
//! zone conversion happens anywhere in the pipeline.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsedDateTime {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl ParsedDateTime {
    fn none() -> Self {
        Self::default()
    }
}

/// Inclusive event span; `end` is None for single-day events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

fn full_datetime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4}).*?(\d{1,2}:\d{2})").unwrap())
}

fn full_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").unwrap())
}

fn yearless_datetime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})\.(\d{2})\.?.*?(\d{1,2}:\d{2})").unwrap())
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    let m: u32 = month.parse().ok()?;
    let d: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, m, d)
}

/// Parse an `HH:MM` clock value (one- or two-digit hour).
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());
    let caps = re.captures(text.trim())?;
    let h: u32 = caps[1].parse().ok()?;
    let m: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

/// Recognize, in priority order: `DD.MM.YYYY, HH:MM`, `DD.MM.YYYY`, and
/// `DD.MM HH:MM`. The last grammar carries no year; `reference_year` fills
/// it in and the substitution is logged, since the sites publish such dates
/// around season boundaries where guessing silently would mis-date events.
///
/// Text matching none of the grammars (or naming an impossible calendar
/// date) yields all-None and the caller must skip the record.
pub fn parse_date(text: &str, reference_year: i32) -> ParsedDateTime {
    let t = crate::normalize::normalize_whitespace(text);
    if t.is_empty() {
        return ParsedDateTime::none();
    }

    if let Some(caps) = full_datetime_re().captures(&t) {
        let year: i32 = match caps[3].parse() {
            Ok(y) => y,
            Err(_) => return ParsedDateTime::none(),
        };
        return match ymd(year, &caps[2], &caps[1]) {
            Some(date) => ParsedDateTime {
                date: Some(date),
                time: parse_clock(&caps[4]),
            },
            None => ParsedDateTime::none(),
        };
    }

    if let Some(caps) = full_date_re().captures(&t) {
        let year: i32 = match caps[3].parse() {
            Ok(y) => y,
            Err(_) => return ParsedDateTime::none(),
        };
        return match ymd(year, &caps[2], &caps[1]) {
            Some(date) => ParsedDateTime {
                date: Some(date),
                time: None,
            },
            None => ParsedDateTime::none(),
        };
    }

    if let Some(caps) = yearless_datetime_re().captures(&t) {
        if let Some(date) = ymd(reference_year, &caps[2], &caps[1]) {
            warn!(raw = %t, year = reference_year, "date without year; applying reference year");
            return ParsedDateTime {
                date: Some(date),
                time: parse_clock(&caps[3]),
            };
        }
    }

    ParsedDateTime::none()
}

fn single_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})\.?$").unwrap())
}

fn month_crossing_range_re() -> &'static Regex {
    // "31.01.-01.02.2026"
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})\.(\d{1,2})\.\s*-\s*(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap()
    })
}

fn same_month_range_re() -> &'static Regex {
    // "14.-15.03.2026" and "14-15.03.2026"
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})\.?\s*-\s*(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap())
}

fn dotless_month_range_re() -> &'static Regex {
    // "31.01-01.02.2026"
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})\.(\d{1,2})\s*-\s*(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap()
    })
}

/// Parse a single date or a hyphen-separated date range into an inclusive
/// span. The year always comes from the final component; open ranges are
/// not a thing on these calendars.
pub fn parse_date_range(text: &str) -> Option<DateSpan> {
    let t = crate::normalize::normalize_whitespace(text);
    if t.is_empty() {
        return None;
    }

    if let Some(caps) = single_date_re().captures(&t) {
        let year: i32 = caps[3].parse().ok()?;
        return Some(DateSpan {
            start: ymd(year, &caps[2], &caps[1])?,
            end: None,
        });
    }

    if let Some(caps) = month_crossing_range_re().captures(&t) {
        let year: i32 = caps[5].parse().ok()?;
        return Some(DateSpan {
            start: ymd(year, &caps[2], &caps[1])?,
            end: Some(ymd(year, &caps[4], &caps[3])?),
        });
    }

    if let Some(caps) = same_month_range_re().captures(&t) {
        let year: i32 = caps[4].parse().ok()?;
        return Some(DateSpan {
            start: ymd(year, &caps[3], &caps[1])?,
            end: Some(ymd(year, &caps[3], &caps[2])?),
        });
    }

    if let Some(caps) = dotless_month_range_re().captures(&t) {
        let year: i32 = caps[5].parse().ok()?;
        return Some(DateSpan {
            start: ymd(year, &caps[2], &caps[1])?,
            end: Some(ymd(year, &caps[4], &caps[3])?),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn full_datetime_with_weekday_prefix() {
        let p = parse_date("T 09.12.2025, 20:00", 2025);
        assert_eq!(p.date, Some(d(2025, 12, 9)));
        assert_eq!(p.time, Some(NaiveTime::from_hms_opt(20, 0, 0).unwrap()));
    }

    #[test]
    fn full_datetime_survives_whitespace_padding() {
        let p = parse_date("  09.12.2025 ,\u{a0}20:00  ", 2024);
        assert_eq!(p.date, Some(d(2025, 12, 9)));
    }

    #[test]
    fn date_without_time() {
        let p = parse_date("18.10.2025", 2025);
        assert_eq!(p.date, Some(d(2025, 10, 18)));
        assert_eq!(p.time, None);
    }

    #[test]
    fn yearless_date_takes_reference_year() {
        let p = parse_date("05.09 18:30", 2026);
        assert_eq!(p.date, Some(d(2026, 9, 5)));
        assert_eq!(p.time, Some(NaiveTime::from_hms_opt(18, 30, 0).unwrap()));
    }

    #[test]
    fn garbage_yields_all_none() {
        assert_eq!(parse_date("Ajakava ja tulemused", 2025), ParsedDateTime::default());
        assert_eq!(parse_date("", 2025), ParsedDateTime::default());
    }

    #[test]
    fn impossible_calendar_date_yields_all_none() {
        assert_eq!(parse_date("32.13.2025, 20:00", 2025), ParsedDateTime::default());
    }

    #[test]
    fn single_date_span() {
        let span = parse_date_range("14.12.2025").unwrap();
        assert_eq!(span.start, d(2025, 12, 14));
        assert_eq!(span.end, None);
    }

    #[test]
    fn month_crossing_range() {
        let span = parse_date_range("31.01.-01.02.2026").unwrap();
        assert_eq!(span.start, d(2026, 1, 31));
        assert_eq!(span.end, Some(d(2026, 2, 1)));
    }

    #[test]
    fn same_month_range_with_and_without_dot() {
        for raw in ["14.-15.03.2026", "14-15.03.2026"] {
            let span = parse_date_range(raw).unwrap();
            assert_eq!(span.start, d(2026, 3, 14));
            assert_eq!(span.end, Some(d(2026, 3, 15)));
        }
    }

    #[test]
    fn dotless_month_crossing_range() {
        let span = parse_date_range("28.02-01.03.2026").unwrap();
        assert_eq!(span.start, d(2026, 2, 28));
        assert_eq!(span.end, Some(d(2026, 3, 1)));
    }

    #[test]
    fn range_with_nbsp_padding() {
        let span = parse_date_range("31.01.\u{a0}-\u{a0}01.02.2026").unwrap();
        assert_eq!(span.start, d(2026, 1, 31));
        assert_eq!(span.end, Some(d(2026, 2, 1)));
    }

    #[test]
    fn header_text_is_not_a_range() {
        assert!(parse_date_range("Kuupäev").is_none());
    }
}
