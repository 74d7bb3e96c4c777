// src/filters.rs
//
// Template filters.
//
// - toDateString: "March 23, 2020" on post pages; "Mar 23" elsewhere, with the
//   year appended only when it is not the current year, and "2019" shown as "’19".
// - removeWidows: looks at the last two space-separated words and, when they are
//   short, returns the text trimmed. Anything else passes through untouched.
//
// Both filters are total: values they cannot handle are returned as given.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::error::{PolishError, Result};

/// Context tag selecting the long, always-dated format.
pub const POST_PAGE_CONTEXT: &str = "post-page";

/// Registered name of the date filter.
pub const DATE_FILTER: &str = "toDateString";

/// Registered name of the widow filter.
pub const WIDOWS_FILTER: &str = "removeWidows";

/// A last word shorter than this may not be left alone on a line.
const SHORT_WORD: usize = 8;

/// The second-to-last word must be shorter than this to be pulled along.
const LONG_WORD: usize = 12;

/* ============================== Dates ==================================== */

fn century_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"20(\d{2})").expect("static regex"))
}

/// Format `date` for display, taking "this year" from the local clock.
pub fn to_date_string(date: NaiveDate, context: Option<&str>) -> String {
    to_date_string_in(date, context, Local::now().year())
}

/// Format `date` for display relative to `current_year`.
pub fn to_date_string_in(date: NaiveDate, context: Option<&str>, current_year: i32) -> String {
    if context == Some(POST_PAGE_CONTEXT) {
        return date.format("%B %-d, %Y").to_string();
    }

    let formatted = if date.year() == current_year {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    };

    century_pattern()
        .replacen(&formatted, 1, "\u{2019}$1")
        .into_owned()
}

/// Parse a front-matter date: `YYYY-MM-DD`, RFC 3339, or a naive timestamp.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(PolishError::Date(s.to_string()))
}

/* ============================== Widows =================================== */

/// Length in UTF-16 code units, the unit template strings are measured in.
pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Characters the guarded branch trims: Unicode whitespace and the byte order
/// mark, but not NEL (U+0085).
fn is_trimmed(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && c != '\u{85}')
}

/// Guard against a short last word being orphaned.
///
/// The guarded branch only trims the text; the words and their spacing are kept.
pub fn remove_widows(text: &str) -> &str {
    let words: Vec<&str> = text.split(' ').collect();
    let tail = &words[words.len().saturating_sub(2)..];

    let guarded = match tail {
        [last] => utf16_len(last) < SHORT_WORD,
        // Two short words also satisfy this, since SHORT_WORD < LONG_WORD.
        [prev, last] => utf16_len(prev) < LONG_WORD && utf16_len(last) < SHORT_WORD,
        _ => false,
    };

    if guarded {
        text.trim_matches(is_trimmed)
    } else {
        text
    }
}

/* ============================ Registry =================================== */

/// Signature shared by every registered filter.
pub type FilterFn = fn(&Value, Option<&str>) -> Value;

fn date_filter(value: &Value, context: Option<&str>) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    match parse_date(s) {
        Ok(date) => Value::String(to_date_string(date, context)),
        Err(e) => {
            tracing::debug!("{DATE_FILTER}: {e}; leaving value unchanged");
            value.clone()
        }
    }
}

fn widows_filter(value: &Value, _context: Option<&str>) -> Value {
    match value {
        Value::String(s) => Value::String(remove_widows(s).to_string()),
        other => other.clone(),
    }
}

/// Named filters for the templating layer.
pub struct FilterRegistry {
    filters: BTreeMap<&'static str, FilterFn>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut filters: BTreeMap<&'static str, FilterFn> = BTreeMap::new();
        filters.insert(DATE_FILTER, date_filter);
        filters.insert(WIDOWS_FILTER, widows_filter);
        Self { filters }
    }
}

impl FilterRegistry {
    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    /// Registered filter names, in name order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.keys().copied()
    }

    /// Apply filter `name`; `None` if no such filter is registered.
    pub fn apply(&self, name: &str, value: &Value, context: Option<&str>) -> Option<Value> {
        self.get(name).map(|f| f(value, context))
    }
}
