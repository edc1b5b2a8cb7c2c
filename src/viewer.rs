use crate::indexer::{self, ESSAYS_DATA_FILE};
use crate::metadata::EssayRecord;
use crate::renderer;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Placeholder records the reader never shows.
const HIDDEN_TITLES: [&str; 2] = ["Page not found", "Coming Soon"];

const LOADING_HTML: &str = "<div id=\"loading\">Loading article...</div>";
const ARTICLE_ERROR_HTML: &str =
    "<div class=\"error\">Error loading article. Please try again.</div>";
pub const INDEX_ERROR_HTML: &str =
    "<div class=\"error\">Error loading essays. Please try refreshing the page.</div>";

/// Where the reader gets its index and documents from.
pub enum Source {
    Http {
        client: reqwest::Client,
        base_url: String,
    },
    Dir {
        root: PathBuf,
    },
}

impl Source {
    pub fn http(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Source::Http {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn dir(root: impl Into<PathBuf>) -> Self {
        Source::Dir { root: root.into() }
    }

    pub async fn fetch(&self, name: &str) -> Result<String> {
        match self {
            Source::Http { client, base_url } => {
                let url = format!("{}/{}", base_url, name);
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .with_context(|| format!("Failed to fetch {}", url))?;
                let status = response.status();
                if !status.is_success() {
                    anyhow::bail!("Failed to fetch {}: {}", url, status);
                }
                Ok(response.text().await?)
            }
            Source::Dir { root } => {
                let path = root.join(name);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Listing,
    Viewing(EssayRecord),
}

/// A display payload handed to whatever is showing the UI.
#[derive(Debug, Clone)]
pub enum Screen {
    List { html: String, count_label: String },
    Loading { html: String },
    Article { essay: EssayRecord, html: String },
    ArticleError { html: String },
}

/// The list/detail navigation over a loaded essay index.
///
/// The index is fetched once at load time and owned here; document bodies
/// are fetched fresh on every selection. All state lives in this struct,
/// and every transition returns the screen to display.
pub struct Viewer {
    source: Source,
    essays: Vec<EssayRecord>,
    state: ViewState,
}

impl Viewer {
    /// Fetch and parse the essay index, dropping placeholder entries.
    pub async fn load(source: Source) -> Result<Self> {
        let raw = source
            .fetch(ESSAYS_DATA_FILE)
            .await
            .context("Failed to load essays data")?;
        let mut essays: Vec<EssayRecord> =
            serde_json::from_str(&raw).context("Failed to parse essays data")?;
        essays.retain(|e| !HIDDEN_TITLES.contains(&e.title.as_str()));

        Ok(Self {
            source,
            essays,
            state: ViewState::Listing,
        })
    }

    pub fn essays(&self) -> &[EssayRecord] {
        &self.essays
    }

    /// Render the list. The index is re-sorted on every display so the
    /// list always shows the current descending-by-date order; the sort is
    /// idempotent, not cached.
    pub fn list_screen(&mut self) -> Screen {
        self.state = ViewState::Listing;
        indexer::sort_essays(&mut self.essays);
        Screen::List {
            html: list_html(&self.essays),
            count_label: count_label(self.essays.len()),
        }
    }

    /// Shown while a document fetch is outstanding.
    pub fn loading_screen(&self) -> Screen {
        Screen::Loading {
            html: LOADING_HTML.to_string(),
        }
    }

    /// Fetch, render, and display one essay. On fetch failure the inline
    /// error is shown and the state stays in the (degraded) viewing state;
    /// there is no automatic fall back to the list and no retry.
    pub async fn select(&mut self, filename: &str) -> Screen {
        let essay = match self.essays.iter().find(|e| e.file_link == filename) {
            Some(essay) => essay.clone(),
            None => {
                return Screen::ArticleError {
                    html: ARTICLE_ERROR_HTML.to_string(),
                }
            }
        };
        self.state = ViewState::Viewing(essay.clone());

        match self.source.fetch(filename).await {
            Ok(markdown) => {
                let body = renderer::render(&markdown);
                Screen::Article {
                    html: article_html(&essay, &body),
                    essay,
                }
            }
            Err(e) => {
                eprintln!("Error loading article: {}", e);
                Screen::ArticleError {
                    html: ARTICLE_ERROR_HTML.to_string(),
                }
            }
        }
    }

    /// Return to the list, re-rendered from the in-memory index. The index
    /// itself is never re-fetched.
    pub fn back(&mut self) -> Screen {
        self.list_screen()
    }
}

pub fn count_label(count: usize) -> String {
    let noun = if count == 1 { "article" } else { "articles" };
    format!("{} {} published", count, noun)
}

fn essay_item_html(essay: &EssayRecord) -> String {
    let id = renderer::slugify(&essay.title);
    format!(
        r##"<li id="essay-item-{id}" class="essay-item">
    <a href="#" class="essay-link" data-filename="{file}" id="essay-link-{id}" aria-describedby="essay-subtitle-{id} essay-date-{id}">{title}</a>
    <div id="essay-subtitle-{id}" class="subtitle">{subtitle}</div>
    <time id="essay-date-{id}" class="metadata" datetime="{date}">{date}</time>
</li>"##,
        id = id,
        file = essay.file_link,
        title = essay.title,
        subtitle = essay.subtitle,
        date = essay.date,
    )
}

pub fn list_html(essays: &[EssayRecord]) -> String {
    let items: String = essays
        .iter()
        .map(essay_item_html)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<ul id=\"essays-list\" class=\"essays-list\">{}</ul>",
        items
    )
}

pub fn article_html(essay: &EssayRecord, body: &str) -> String {
    let id = renderer::slugify(&essay.title);
    format!(
        r#"<article id="article-{id}" class="article-view">
    <header class="article-header">
        <button class="back-button" aria-label="Return to essays list">← Back to Essays</button>
        <h1 id="article-title-{id}" class="article-title">{title}</h1>
        <div id="article-subtitle-{id}" class="article-subtitle">{subtitle}</div>
        <time id="article-date-{id}" class="article-metadata" datetime="{date}">{date}</time>
    </header>
    <main id="article-content-{id}" class="article-content">{body}</main>
</article>"#,
        id = id,
        title = essay.title,
        subtitle = essay.subtitle,
        date = essay.date,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(title: &str, date: &str, file: &str) -> EssayRecord {
        EssayRecord {
            title: title.to_string(),
            subtitle: String::new(),
            like_count: "0".to_string(),
            date: date.to_string(),
            file_link: file.to_string(),
            html_link: file.replace(".md", ".html"),
        }
    }

    fn write_index(dir: &std::path::Path, essays: &[EssayRecord]) {
        let json = serde_json::to_string_pretty(essays).unwrap();
        fs::write(dir.join(ESSAYS_DATA_FILE), json).unwrap();
    }

    #[tokio::test]
    async fn test_load_filters_placeholder_titles() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            &[
                record("Real Essay", "May 10, 2025", "real.md"),
                record("Page not found", "Date not found", "missing.md"),
                record("Coming Soon", "Date not found", "soon.md"),
            ],
        );

        let viewer = Viewer::load(Source::dir(dir.path())).await.unwrap();
        assert_eq!(viewer.essays().len(), 1);
        assert_eq!(viewer.essays()[0].title, "Real Essay");
        assert_eq!(viewer.state, ViewState::Listing);
    }

    #[tokio::test]
    async fn test_list_screen_sorts_descending_each_render() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            &[
                record("Old", "Jan 2, 2023", "old.md"),
                record("New", "May 10, 2025", "new.md"),
            ],
        );

        let mut viewer = Viewer::load(Source::dir(dir.path())).await.unwrap();
        let first = viewer.list_screen();
        assert_eq!(viewer.essays()[0].title, "New");
        // Re-rendering is idempotent
        let second = viewer.list_screen();
        match (first, second) {
            (Screen::List { html: a, .. }, Screen::List { html: b, .. }) => {
                assert_eq!(a, b);
                assert!(a.contains("id=\"essays-list\""));
                assert!(a.contains("data-filename=\"new.md\""));
                assert!(a.contains("id=\"essay-item-new\""));
            }
            _ => panic!("expected list screens"),
        }
    }

    #[tokio::test]
    async fn test_select_renders_document_and_enters_viewing() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), &[record("Essay", "May 10, 2025", "essay.md")]);
        fs::write(
            dir.path().join("essay.md"),
            "# Essay\n\nSome **bold** prose.\n",
        )
        .unwrap();

        let mut viewer = Viewer::load(Source::dir(dir.path())).await.unwrap();
        let screen = viewer.select("essay.md").await;
        match screen {
            Screen::Article { html, essay } => {
                assert_eq!(essay.title, "Essay");
                assert!(html.contains("<strong class=\"emphasis\">bold</strong>"));
                assert!(html.contains("id=\"article-essay\""));
            }
            _ => panic!("expected article screen"),
        }
        assert!(matches!(&viewer.state, ViewState::Viewing(e) if e.title == "Essay"));
    }

    #[tokio::test]
    async fn test_select_fetch_failure_stays_viewing() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), &[record("Gone", "May 10, 2025", "gone.md")]);
        // gone.md is never written, so the fetch fails

        let mut viewer = Viewer::load(Source::dir(dir.path())).await.unwrap();
        let screen = viewer.select("gone.md").await;
        match screen {
            Screen::ArticleError { html } => {
                assert!(html.contains("Error loading article"));
            }
            _ => panic!("expected article error screen"),
        }
        assert!(matches!(&viewer.state, ViewState::Viewing(_)));
    }

    #[tokio::test]
    async fn test_back_uses_in_memory_index() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), &[record("Essay", "May 10, 2025", "essay.md")]);
        fs::write(dir.path().join("essay.md"), "# Essay\n\nBody.\n").unwrap();

        let mut viewer = Viewer::load(Source::dir(dir.path())).await.unwrap();
        viewer.select("essay.md").await;
        // Deleting the index on disk proves back() never re-fetches it
        fs::remove_file(dir.path().join(ESSAYS_DATA_FILE)).unwrap();

        let screen = viewer.back();
        assert!(matches!(screen, Screen::List { .. }));
        assert_eq!(viewer.state, ViewState::Listing);
    }

    #[test]
    fn test_count_label_pluralization() {
        assert_eq!(count_label(0), "0 articles published");
        assert_eq!(count_label(1), "1 article published");
        assert_eq!(count_label(7), "7 articles published");
    }
}
