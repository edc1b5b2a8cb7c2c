use crate::date;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One essay's worth of index metadata, as persisted in essays-data.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssayRecord {
    pub title: String,
    pub subtitle: String,
    pub like_count: String,
    pub date: String,
    pub file_link: String,
    pub html_link: String,
}

const TITLE_SCAN_LINES: usize = 10;
const SUBTITLE_SCAN_LINES: usize = 20;

/// Extract an essay's metadata from its text and filename.
///
/// The title comes from the first `#` or `##` heading in the first ten
/// lines, falling back to a title-cased form of the filename. The subtitle
/// is the first `###` heading in the first twenty lines, if any. `modified`
/// is the file modification time, used only as the date fallback.
pub fn extract_metadata(
    content: &str,
    filename: &str,
    modified: Option<DateTime<Utc>>,
) -> EssayRecord {
    let mut title = String::new();
    for line in content.lines().take(TITLE_SCAN_LINES) {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("# ") {
            title = rest.trim().to_string();
            break;
        } else if let Some(rest) = line.strip_prefix("## ") {
            title = rest.trim().to_string();
            break;
        }
    }
    if title.is_empty() {
        title = title_from_filename(filename);
    }

    let mut subtitle = String::new();
    for line in content.lines().take(SUBTITLE_SCAN_LINES) {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("### ") {
            subtitle = rest.trim().to_string();
            break;
        }
    }

    EssayRecord {
        title,
        subtitle,
        like_count: "0".to_string(),
        date: date::extract_date(content, modified),
        file_link: filename.to_string(),
        html_link: html_link(filename),
    }
}

/// Derive a display title from a filename: drop the extension, turn
/// hyphens into spaces, uppercase the first letter of each word.
fn title_from_filename(filename: &str) -> String {
    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    stem.replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn html_link(filename: &str) -> String {
    match filename.strip_suffix(".md") {
        Some(stem) => format!("{}.html", stem),
        None => filename.to_string(),
    }
}
