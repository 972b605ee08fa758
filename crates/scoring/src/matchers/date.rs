use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::MatchResult;
use crate::normalize::{preview, value_text};

/// Tried in order; the first that consumes the whole string wins. US
/// month-first layouts come before day-first ones.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|\
                      november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec";

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"))
        .expect("static regex")
});
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\.?,?\s+(\d{{4}})\b"
    ))
    .expect("static regex")
});

/// Calendar dates. Exact match scores 1.0, one day apart 0.9.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DateMatcher;

impl DateMatcher {
    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        let (Some(g), Some(p)) = (parse_date(gold), parse_date(pred)) else {
            return MatchResult::fail(format!(
                "✗ {field}: parse error ('{}' → '{}')",
                preview(&value_text(gold), 40),
                preview(&value_text(pred), 40)
            ));
        };

        let days = (p - g).num_days().abs();
        match days {
            0 => MatchResult::pass(format!("✓ {field}: {g}")),
            1 => MatchResult::new(0.9, format!("~ {field}: {g} → {p}. Off by 1 day")),
            n => MatchResult::fail(format!("✗ {field}: {g} → {p}. Off by {n} days")),
        }
    }
}

/// Parse a date from a fixed list of layouts, then fall back to finding a
/// "Month Day, Year" or "Day Month Year" phrase inside longer text.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    if let Some(caps) = MONTH_DAY_YEAR.captures(s) {
        if let Some(d) = date_from_parts(&caps[1], &caps[2], &caps[3]) {
            return Some(d);
        }
    }
    let caps = DAY_MONTH_YEAR.captures(s)?;
    date_from_parts(&caps[2], &caps[1], &caps[3])
}

fn date_from_parts(month: &str, day: &str, year: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    if !(1900..=2100).contains(&year) || !(1..=31).contains(&day) {
        return None;
    }
    let month = month_number(month)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let lowered = name.to_lowercase();
    let prefix = lowered.get(..3)?;
    let n = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn common_layouts() {
        for text in [
            "2024-01-15",
            "01/15/2024",
            "January 15, 2024",
            "Jan 15, 2024",
            "15 January 2024",
            "2024/01/15",
            "2024-01-15 09:30:00",
            "2024-01-15T00:00:00Z",
        ] {
            assert_eq!(parse_date(&json!(text)), Some(ymd(2024, 1, 15)), "{text}");
        }
    }

    #[test]
    fn month_first_wins_for_ambiguous_slashes() {
        assert_eq!(parse_date(&json!("03/04/2024")), Some(ymd(2024, 3, 4)));
        // Not a valid month, so day-first applies.
        assert_eq!(parse_date(&json!("25/12/2023")), Some(ymd(2023, 12, 25)));
    }

    #[test]
    fn phrases_inside_text() {
        assert_eq!(
            parse_date(&json!("commencing on the 1st of March, 2025 at noon")),
            Some(ymd(2025, 3, 1))
        );
        assert_eq!(
            parse_date(&json!("Effective as of Sept. 30, 2022")),
            Some(ymd(2022, 9, 30))
        );
        assert_eq!(parse_date(&json!("signed March 5, 1850")), None);
    }

    #[test]
    fn one_day_off_gets_partial_credit() {
        let r = DateMatcher.compare("start", &json!("2024-01-15"), &json!("January 16, 2024"));
        assert_eq!(r.score, 0.9);
        assert!(r.feedback.contains("Off by 1 day"));
    }

    #[test]
    fn far_apart_is_zero() {
        let r = DateMatcher.compare("start", &json!("2024-01-15"), &json!("2024-02-15"));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.contains("Off by 31 days"));
    }

    #[test]
    fn unparseable() {
        let r = DateMatcher.compare("start", &json!("2024-01-15"), &json!("sometime soon"));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.contains("parse error"));
    }
}
