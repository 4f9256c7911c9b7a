//! Time range parser.
//!
//! Case-insensitive; accepts `"today"`, `"yesterday"` (default), `"this
//! week"` (Monday through today), `"last N days"`, and explicit
//! `YYYY-MM-DD to YYYY-MM-DD`. Any unknown token degrades to `"yesterday"`
//! with a warning logged, never an error — callers always get a usable
//! range.

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// A resolved date range plus the human-readable description that produced
/// it, carried into result envelopes and citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub description: String,
}

fn last_n_days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^last\s+(\d+)\s+days?$").expect("static regex"))
}

fn explicit_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2})\s+to\s+(\d{4}-\d{2}-\d{2})$").expect("static regex")
    })
}

/// Parse a time-range description relative to `today` (plant-local date).
///
/// Always returns a usable range; unparseable input degrades to
/// `"yesterday"` and is logged as a warning rather than surfaced as an
/// error.
pub fn parse(description: &str, today: NaiveDate) -> TimeRange {
    let normalized = description.trim().to_lowercase();

    if normalized == "today" {
        return TimeRange {
            start: today,
            end: today,
            description: "today".to_string(),
        };
    }

    if normalized == "yesterday" || normalized.is_empty() {
        let yesterday = today - Duration::days(1);
        return TimeRange {
            start: yesterday,
            end: yesterday,
            description: "yesterday".to_string(),
        };
    }

    if normalized == "this week" {
        let days_since_monday = today.weekday().num_days_from_monday();
        let monday = today - Duration::days(i64::from(days_since_monday));
        return TimeRange {
            start: monday,
            end: today,
            description: "this week".to_string(),
        };
    }

    if let Some(caps) = last_n_days_re().captures(&normalized) {
        if let Ok(n) = caps[1].parse::<i64>() {
            if n > 0 {
                let start = today - Duration::days(n - 1);
                return TimeRange {
                    start,
                    end: today,
                    description: format!("last {n} days"),
                };
            }
        }
    }

    if let Some(caps) = explicit_range_re().captures(&normalized) {
        let start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d");
        let end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d");
        if let (Ok(start), Ok(end)) = (start, end) {
            if start <= end {
                return TimeRange {
                    start,
                    end,
                    description: format!("{} to {}", caps[1].to_string(), caps[2].to_string()),
                };
            }
        }
    }

    tracing::warn!(
        input = %description,
        "unrecognized time range description, defaulting to yesterday"
    );
    let yesterday = today - Duration::days(1);
    TimeRange {
        start: yesterday,
        end: yesterday,
        description: "yesterday".to_string(),
    }
}

/// Start-of-day instant (midnight, plant-local) for a given date, used by
/// the Action Engine's safety-event window.
pub fn start_of_day(date: NaiveDate) -> chrono::NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_else(|| {
        // `and_hms_opt(0, 0, 0)` cannot fail for a valid NaiveDate; this arm
        // exists only to avoid an `unwrap` in non-test code.
        NaiveDate::from_ymd_opt(date.year(), date.month(), date.day())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date always has a midnight")
    })
}

/// Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn defaults_to_yesterday() {
        let today = date(2026, 1, 6);
        let r = parse("", today);
        assert_eq!(r.start, date(2026, 1, 5));
        assert_eq!(r.end, date(2026, 1, 5));
        assert_eq!(r.description, "yesterday");
    }

    #[test]
    fn unknown_token_degrades_to_yesterday() {
        let today = date(2026, 1, 6);
        let r = parse("next sprint", today);
        assert_eq!(r.description, "yesterday");
    }

    #[test]
    fn parses_today_case_insensitively() {
        let today = date(2026, 1, 6);
        let r = parse("TODAY", today);
        assert_eq!(r.start, today);
        assert_eq!(r.end, today);
    }

    #[test]
    fn parses_this_week_from_monday_to_today() {
        // 2026-01-06 is a Tuesday.
        let today = date(2026, 1, 6);
        let r = parse("this week", today);
        assert_eq!(r.start, date(2026, 1, 5));
        assert_eq!(r.end, today);
    }

    #[test]
    fn parses_last_n_days_inclusive_of_today() {
        let today = date(2026, 1, 10);
        let r = parse("last 7 days", today);
        assert_eq!(r.start, date(2026, 1, 4));
        assert_eq!(r.end, today);
    }

    #[test]
    fn parses_explicit_range() {
        let today = date(2026, 1, 10);
        let r = parse("2026-01-01 to 2026-01-05", today);
        assert_eq!(r.start, date(2026, 1, 1));
        assert_eq!(r.end, date(2026, 1, 5));
    }

    #[test]
    fn idempotent_on_canonical_descriptions() {
        let today = date(2026, 1, 10);
        for desc in ["today", "yesterday", "this week", "last 3 days"] {
            let first = parse(desc, today);
            let second = parse(&first.description, today);
            assert_eq!(first, second, "not idempotent for {desc}");
        }
        let explicit = parse("2026-01-01 to 2026-01-05", today);
        let reparsed = parse(&explicit.description, today);
        assert_eq!(explicit, reparsed);
    }
}
