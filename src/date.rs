use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Returned when no heuristic produced a date and no fallback was available.
pub const DATE_NOT_FOUND: &str = "Date not found";

/// How many leading lines of a document are scanned for a date.
const DATE_SCAN_LINES: usize = 30;

/// Extract a human-readable date string from essay text.
///
/// Checks the first 30 lines for a bold date line (`**May 10, 2025**`),
/// then for loose date patterns, then falls back to the file modification
/// time, then to the sentinel. The returned string is not validated as a
/// real calendar date; that only happens when sorting.
pub fn extract_date(content: &str, modified: Option<DateTime<Utc>>) -> String {
    let four_digits = Regex::new(r"\d{4}").unwrap();
    let bold_span = Regex::new(r"\*\*(.*?)\*\*").unwrap();

    // Bold date lines take priority over anything else in the window
    for line in content.lines().take(DATE_SCAN_LINES) {
        let line = line.trim();
        if line.starts_with("**") && line.ends_with("**") && four_digits.is_match(line) {
            if let Some(caps) = bold_span.captures(line) {
                return caps[1].trim().to_string();
            }
        }
    }

    let patterns = [
        Regex::new(r"(\w{3}\s+\d{1,2},\s+\d{4})").unwrap(),
        Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").unwrap(),
        Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap(),
    ];

    for line in content.lines().take(DATE_SCAN_LINES) {
        for pattern in &patterns {
            if let Some(caps) = pattern.captures(line) {
                return caps[1].to_string();
            }
        }
    }

    match modified {
        Some(mtime) => mtime.format("%b %-d, %Y").to_string(),
        None => DATE_NOT_FOUND.to_string(),
    }
}

/// Parse a displayed date string back into a calendar date.
///
/// Used by the sort comparator; any string that fails every format is
/// treated as unparseable rather than an error.
pub fn parse_display_date(date: &str) -> Option<NaiveDate> {
    let formats = ["%b %d, %Y", "%B %d, %Y", "%m/%d/%Y", "%Y-%m-%d"];
    let date = date.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
}
