//! Saved article texts, one JSON file per article

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VocabError};
use crate::store::write_json_atomic;
use crate::text::WORD_RE;

pub const SOURCE_MANUAL: &str = "manual";
pub const SOURCE_WORKFLOW: &str = "n8n";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";
const TITLE_WORDS: usize = 8;
const TITLE_MAX_CHARS: usize = 60;

static UNSAFE_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid title pattern"));
static UNSAFE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid filename pattern"));

/// Article file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "manual")]
    pub source: String,
    #[serde(default = "unknown")]
    pub created_at: String,
}

fn untitled() -> String {
    "untitled".to_string()
}

fn manual() -> String {
    SOURCE_MANUAL.to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Where a saved article landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedArticle {
    pub filename: String,
    pub path: PathBuf,
    pub title: String,
    pub created_at: String,
    pub source: String,
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub filename: String,
    pub title: String,
    pub source: String,
    pub created_at: String,
    /// Text length in characters.
    pub length: usize,
}

pub struct ArticleStore {
    dir: PathBuf,
}

impl ArticleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArticleStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save an article. A blank title is derived from the opening words.
    pub fn save(&self, title: &str, text: &str, source: Option<&str>) -> Result<SavedArticle> {
        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.save_stamped(title, text, source, stamp)
    }

    fn save_stamped(
        &self,
        title: &str,
        text: &str,
        source: Option<&str>,
        created_at: String,
    ) -> Result<SavedArticle> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VocabError::InvalidInput("empty content".to_string()));
        }
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(SOURCE_MANUAL);
        let title = match title.trim() {
            "" => derive_title(text),
            t => t.to_string(),
        };

        let safe_title = UNSAFE_TITLE_RE.replace_all(&title, "_");
        let filename = format!("{}_{}.json", created_at, safe_title);
        let path = self.dir.join(&filename);

        let article = Article {
            title: title.clone(),
            text: text.to_string(),
            source: source.to_string(),
            created_at: created_at.clone(),
        };
        write_json_atomic(&path, &article)?;
        tracing::info!("Saved article {} ({} chars)", filename, text.chars().count());

        Ok(SavedArticle {
            filename,
            path,
            title,
            created_at,
            source: source.to_string(),
        })
    }

    /// All readable articles, newest first.
    pub fn list(&self) -> Result<Vec<ArticleSummary>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VocabError::storage(&self.dir, e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));

        let summaries = names
            .into_iter()
            .filter_map(|filename| {
                let article = read_article(&self.dir.join(&filename))
                    .map_err(|e| tracing::debug!("Skipping article {}: {}", filename, e))
                    .ok()?;
                Some(ArticleSummary {
                    length: article.text.chars().count(),
                    title: article.title,
                    source: article.source,
                    created_at: article.created_at,
                    filename,
                })
            })
            .collect();
        Ok(summaries)
    }

    /// Load one article by file name. Path components are stripped.
    pub fn load(&self, filename: &str) -> Result<Article> {
        let safe = UNSAFE_NAME_RE.replace_all(filename, "");
        if safe.is_empty() || safe.starts_with('.') {
            return Err(VocabError::InvalidInput(format!(
                "invalid article name: {}",
                filename
            )));
        }

        let path = self.dir.join(safe.as_ref());
        if !path.is_file() {
            return Err(VocabError::NotFound(format!("article {}", safe)));
        }
        read_article(&path)
    }
}

fn read_article(path: &Path) -> Result<Article> {
    let content = fs::read_to_string(path).map_err(|e| VocabError::storage(path, e))?;
    serde_json::from_str(&content).map_err(|e| VocabError::storage(path, e))
}

fn derive_title(text: &str) -> String {
    let words: Vec<&str> = WORD_RE
        .find_iter(text)
        .take(TITLE_WORDS)
        .map(|m| m.as_str())
        .collect();
    if words.is_empty() {
        return untitled();
    }
    words.join(" ").chars().take(TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_writes_named_file() {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path().join("articles"));
        let saved = store
            .save_stamped("Cats & Dogs!", "  Some text.  ", None, "2024-05-01_120000".to_string())
            .unwrap();

        assert_eq!(saved.filename, "2024-05-01_120000_Cats_Dogs_.json");
        assert_eq!(saved.source, SOURCE_MANUAL);
        assert!(saved.path.is_file());

        let article = store.load(&saved.filename).unwrap();
        assert_eq!(article.text, "Some text.");
        assert_eq!(article.title, "Cats & Dogs!");
    }

    #[test]
    fn test_blank_title_is_derived() {
        assert_eq!(
            derive_title("One two three four five six seven eight nine ten"),
            "One two three four five six seven eight"
        );
        assert_eq!(derive_title("123 456"), "untitled");
        let long = "Supercalifragilisticexpialidocious ".repeat(4);
        assert_eq!(derive_title(&long).chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_empty_text_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path());
        assert!(matches!(
            store.save("title", "   ", None),
            Err(VocabError::InvalidInput(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_newest_first_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path());
        store
            .save_stamped("old", "first", Some(SOURCE_WORKFLOW), "2024-01-01_000000".to_string())
            .unwrap();
        store
            .save_stamped("new", "second one", None, "2024-02-01_000000".to_string())
            .unwrap();
        fs::write(dir.path().join("2025-broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "new");
        assert_eq!(list[0].length, 10);
        assert_eq!(list[1].source, SOURCE_WORKFLOW);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path().join("nope"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path().join("articles"));
        fs::write(dir.path().join("secret.json"), r#"{"text": "x"}"#).unwrap();

        assert!(matches!(store.load(".."), Err(VocabError::InvalidInput(_))));
        assert!(matches!(
            store.load("../secret.json"),
            Err(VocabError::InvalidInput(_))
        ));
        assert!(matches!(store.load("missing.json"), Err(VocabError::NotFound(_))));
    }
}
