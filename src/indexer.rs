use crate::config::Config;
use crate::date;
use crate::metadata::{self, EssayRecord};
use crate::upload;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub const ESSAYS_DATA_FILE: &str = "essays-data.json";
pub const FILE_LIST_FILE: &str = "file-list.json";

/// A per-document failure, recorded without aborting the batch.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentError {
    pub filename: String,
    pub error: String,
}

/// One discovered source document, read outcome included.
#[derive(Debug)]
pub struct Document {
    pub filename: String,
    pub modified: Option<DateTime<Utc>>,
    pub text: Result<String>,
}

/// The indexing result: the date-sorted essay records, the alphabetical
/// file list, and whatever failed along the way.
#[derive(Debug)]
pub struct IndexOutput {
    pub essays: Vec<EssayRecord>,
    pub file_list: Vec<String>,
    pub errors: Vec<DocumentError>,
}

/// End-of-run report, also usable programmatically.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub essays_count: usize,
    pub files_count: usize,
    pub errors_count: usize,
    pub errors: Vec<DocumentError>,
    pub newest_essay: Option<EssayRecord>,
    pub oldest_essay: Option<EssayRecord>,
    pub generated_files: Vec<String>,
    pub uploaded_to_s3: bool,
}

/// Newest first. A side that fails calendar parsing compares Equal, so the
/// stable sort leaves unparseable-date records in their original relative
/// position rather than pushing them to either end.
pub fn compare_by_date_desc(a: &EssayRecord, b: &EssayRecord) -> Ordering {
    match (
        date::parse_display_date(&a.date),
        date::parse_display_date(&b.date),
    ) {
        (Some(date_a), Some(date_b)) => date_b.cmp(&date_a),
        _ => Ordering::Equal,
    }
}

pub fn sort_essays(essays: &mut [EssayRecord]) {
    essays.sort_by(compare_by_date_desc);
}

/// Build the corpus index and file list from a batch of documents.
///
/// Read failures land in `errors` and the batch continues. Records whose
/// title contains "test" (case-insensitive) are dropped from the index but
/// their filenames stay in the file list, which covers every input.
pub fn index_documents(documents: Vec<Document>) -> IndexOutput {
    let mut essays = Vec::new();
    let mut errors = Vec::new();
    let mut file_list: Vec<String> = documents.iter().map(|d| d.filename.clone()).collect();

    for document in documents {
        match document.text {
            Ok(content) => {
                let record =
                    metadata::extract_metadata(&content, &document.filename, document.modified);
                if record.title.to_lowercase().contains("test") {
                    println!(
                        "{}",
                        format!(
                            "Skipping test essay: {} (from {})",
                            record.title, document.filename
                        )
                        .yellow()
                    );
                    continue;
                }
                println!("  {} Processed: {}", "✓".green(), document.filename);
                essays.push(record);
            }
            Err(e) => {
                eprintln!(
                    "  {} Error processing {}: {}",
                    "✗".red(),
                    document.filename,
                    e
                );
                errors.push(DocumentError {
                    filename: document.filename,
                    error: e.to_string(),
                });
            }
        }
    }

    sort_essays(&mut essays);
    file_list.sort();

    IndexOutput {
        essays,
        file_list,
        errors,
    }
}

#[derive(Debug)]
pub struct Indexer {
    config: Config,
}

impl Indexer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the whole pipeline: discover, extract, sort, write the two JSON
    /// artifacts, copy sources into the output directory, and optionally
    /// upload. Only a failure to enumerate the essays directory is fatal.
    pub async fn generate(&self) -> Result<RunSummary> {
        println!("{}", "Generating essay index...".cyan());

        let files = self.discover_files()?;
        println!(
            "{}",
            format!("Found {} markdown files", files.len()).blue()
        );

        let documents = self.read_documents(&files);
        let output = index_documents(documents);

        fs::create_dir_all(&self.config.output_dir)
            .context("Failed to create output directory")?;

        let essays_json = serde_json::to_string_pretty(&output.essays)
            .context("Failed to serialize essay index")?;
        let file_list_json = serde_json::to_string_pretty(&output.file_list)
            .context("Failed to serialize file list")?;

        // Each artifact write stands alone; one failing does not stop the other
        let output_dir = Path::new(&self.config.output_dir);
        match fs::write(output_dir.join(ESSAYS_DATA_FILE), &essays_json) {
            Ok(()) => println!(
                "{}",
                format!(
                    "✓ Generated {} with {} essays",
                    ESSAYS_DATA_FILE,
                    output.essays.len()
                )
                .green()
            ),
            Err(e) => eprintln!(
                "{}",
                format!("✗ Error writing {}: {}", ESSAYS_DATA_FILE, e).red()
            ),
        }
        match fs::write(output_dir.join(FILE_LIST_FILE), &file_list_json) {
            Ok(()) => println!(
                "{}",
                format!(
                    "✓ Generated {} with {} files",
                    FILE_LIST_FILE,
                    output.file_list.len()
                )
                .green()
            ),
            Err(e) => eprintln!(
                "{}",
                format!("✗ Error writing {}: {}", FILE_LIST_FILE, e).red()
            ),
        }

        self.copy_sources(&files);

        let uploaded = self.config.upload_to_s3;
        if uploaded {
            match upload::upload_artifacts(&self.config, &essays_json, &file_list_json).await {
                Ok(()) => println!("{}", "✓ Uploaded artifacts to S3".green()),
                Err(e) => eprintln!("{}", format!("✗ Error uploading to S3: {}", e).red()),
            }
        }

        let summary = RunSummary {
            success: true,
            essays_count: output.essays.len(),
            files_count: output.file_list.len(),
            errors_count: output.errors.len(),
            errors: output.errors,
            newest_essay: output.essays.first().cloned(),
            oldest_essay: output.essays.last().cloned(),
            generated_files: vec![ESSAYS_DATA_FILE.to_string(), FILE_LIST_FILE.to_string()],
            uploaded_to_s3: uploaded,
        };
        self.report(&summary, &output.essays, &output.file_list);

        Ok(summary)
    }

    /// Depth-1 listing of the essays directory: markdown files only, no
    /// README.md, no dotfiles, no filenames containing "test".
    fn discover_files(&self) -> Result<Vec<String>> {
        let dir = Path::new(&self.config.essays_dir);
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).max_depth(1) {
            let entry = entry.with_context(|| {
                format!("Failed to read essays directory '{}'", dir.display())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".md")
                || name == "README.md"
                || name.starts_with('.')
                || name.to_lowercase().contains("test")
            {
                continue;
            }
            files.push(name);
        }

        Ok(files)
    }

    fn read_documents(&self, files: &[String]) -> Vec<Document> {
        let dir = Path::new(&self.config.essays_dir);
        files
            .iter()
            .map(|filename| {
                let path = dir.join(filename);
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()));
                Document {
                    filename: filename.clone(),
                    modified,
                    text,
                }
            })
            .collect()
    }

    /// The output directory serves the essays themselves alongside the
    /// index, so it stays self-contained.
    fn copy_sources(&self, files: &[String]) {
        let essays_dir = Path::new(&self.config.essays_dir);
        let output_dir = Path::new(&self.config.output_dir);
        for filename in files {
            if let Err(e) = fs::copy(essays_dir.join(filename), output_dir.join(filename)) {
                eprintln!(
                    "{}",
                    format!("✗ Error copying {} to output: {}", filename, e).yellow()
                );
            }
        }
    }

    fn report(&self, summary: &RunSummary, essays: &[EssayRecord], file_list: &[String]) {
        println!();
        println!("{}", "Run summary".white().bold());
        println!("  Essays indexed: {}", summary.essays_count);
        println!("  Files listed: {}", summary.files_count);
        println!("  Errors: {}", summary.errors_count);

        if !summary.errors.is_empty() {
            println!("{}", "Processing errors:".yellow());
            for err in &summary.errors {
                println!("  - {}: {}", err.filename, err.error);
            }
        }

        if !essays.is_empty() {
            println!("{}", "Sample entries:".white());
            for (i, essay) in essays.iter().take(5).enumerate() {
                println!("  {}. {} ({})", i + 1, essay.title, essay.date);
            }
        }

        let mut valid_dates: Vec<_> = essays
            .iter()
            .filter_map(|e| date::parse_display_date(&e.date))
            .collect();
        valid_dates.sort();
        if let (Some(oldest), Some(newest)) = (valid_dates.first(), valid_dates.last()) {
            println!(
                "  Date range: {} to {}",
                oldest.format("%b %-d, %Y"),
                newest.format("%b %-d, %Y")
            );
        }

        if !file_list.is_empty() {
            println!("{}", "Sample file list entries:".white());
            for (i, file) in file_list.iter().take(5).enumerate() {
                println!("  {}. {}", i + 1, file);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn doc(filename: &str, content: &str) -> Document {
        Document {
            filename: filename.to_string(),
            modified: None,
            text: Ok(content.to_string()),
        }
    }

    fn record_with_date(date: &str) -> EssayRecord {
        EssayRecord {
            title: format!("Essay dated {}", date),
            subtitle: String::new(),
            like_count: "0".to_string(),
            date: date.to_string(),
            file_link: "a.md".to_string(),
            html_link: "a.html".to_string(),
        }
    }

    #[test]
    fn test_sort_descending_by_date() {
        let mut essays = vec![
            record_with_date("2023-06-15"),
            record_with_date("2024-01-01"),
        ];
        sort_essays(&mut essays);
        assert_eq!(essays[0].date, "2024-01-01");
        assert_eq!(essays[1].date, "2023-06-15");
    }

    #[test]
    fn test_sort_keeps_unparseable_dates_in_place() {
        // The unparseable middle entry compares Equal to both neighbors, so
        // the stable sort leaves all three exactly where they were.
        let mut essays = vec![
            record_with_date("2024-01-01"),
            record_with_date("not a date"),
            record_with_date("2023-06-15"),
        ];
        sort_essays(&mut essays);
        let dates: Vec<_> = essays.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "not a date", "2023-06-15"]);
    }

    #[test]
    fn test_file_list_alphabetical_and_independent_of_title_filter() {
        let output = index_documents(vec![
            doc("b.md", "# B Essay\n"),
            doc("a.md", "# A Essay\n"),
            doc("c-test.md", "# Test\n"),
        ]);
        assert_eq!(output.file_list, vec!["a.md", "b.md", "c-test.md"]);
        let titles: Vec<_> = output.essays.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["B Essay", "A Essay"]);
    }

    #[test]
    fn test_test_titled_records_filtered_from_index() {
        let output = index_documents(vec![doc("t.md", "# Test Article\n")]);
        assert!(output.essays.is_empty());
        assert_eq!(output.file_list, vec!["t.md"]);
    }

    #[test]
    fn test_read_failure_recorded_without_aborting() {
        let output = index_documents(vec![
            Document {
                filename: "broken.md".to_string(),
                modified: None,
                text: Err(anyhow!("permission denied")),
            },
            doc("fine.md", "# Fine\n"),
        ]);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].filename, "broken.md");
        assert_eq!(output.essays.len(), 1);
        assert_eq!(output.file_list, vec!["broken.md", "fine.md"]);
    }

    #[tokio::test]
    async fn test_generate_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let essays_dir = dir.path().join("essays");
        let output_dir = dir.path().join("dist");
        fs::create_dir_all(&essays_dir).unwrap();
        fs::write(
            essays_dir.join("alpha.md"),
            "# Alpha\n\n### First of all\n\n**May 10, 2025**\n\nBody.\n",
        )
        .unwrap();
        fs::write(essays_dir.join("beta.md"), "# Beta\n\n**Jan 2, 2024**\n").unwrap();
        // All of these are excluded by the discovery rules
        fs::write(essays_dir.join("README.md"), "# Readme\n").unwrap();
        fs::write(essays_dir.join(".draft.md"), "# Draft\n").unwrap();
        fs::write(essays_dir.join("my-test-notes.md"), "# Notes\n").unwrap();
        fs::write(essays_dir.join("plain.txt"), "not markdown\n").unwrap();

        let config = Config {
            essays_dir: essays_dir.to_string_lossy().to_string(),
            output_dir: output_dir.to_string_lossy().to_string(),
            ..Config::default()
        };
        let summary = Indexer::new(config).generate().await.unwrap();

        assert!(summary.success);
        assert_eq!(summary.essays_count, 2);
        assert_eq!(summary.files_count, 2);
        assert_eq!(summary.errors_count, 0);
        assert_eq!(summary.newest_essay.as_ref().unwrap().title, "Alpha");
        assert_eq!(summary.oldest_essay.as_ref().unwrap().title, "Beta");
        assert!(!summary.uploaded_to_s3);

        let essays_json = fs::read_to_string(output_dir.join(ESSAYS_DATA_FILE)).unwrap();
        let essays: Vec<EssayRecord> = serde_json::from_str(&essays_json).unwrap();
        assert_eq!(essays[0].title, "Alpha");
        assert_eq!(essays[0].date, "May 10, 2025");
        assert_eq!(essays[0].subtitle, "First of all");
        assert_eq!(essays[0].html_link, "alpha.html");

        let list_json = fs::read_to_string(output_dir.join(FILE_LIST_FILE)).unwrap();
        let list: Vec<String> = serde_json::from_str(&list_json).unwrap();
        assert_eq!(list, vec!["alpha.md", "beta.md"]);

        // Sources are copied alongside the artifacts
        assert!(output_dir.join("alpha.md").exists());
        assert!(output_dir.join("beta.md").exists());
    }

    #[tokio::test]
    async fn test_generate_fails_on_missing_essays_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            essays_dir: dir
                .path()
                .join("nowhere")
                .to_string_lossy()
                .to_string(),
            output_dir: dir.path().join("dist").to_string_lossy().to_string(),
            ..Config::default()
        };
        assert!(Indexer::new(config).generate().await.is_err());
    }
}
