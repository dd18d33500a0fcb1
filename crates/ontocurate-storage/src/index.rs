//! Text index over curated sheet rows.
//!
//! Documents are keyed by repository and sheet and carry the four content
//! fields of a row plus its reviewer. Two queries matter:
//!
//! - a prefix query on `class_id`, sorted descending, used by identifier
//!   allocation;
//! - a free-text search scoped to one repository, used by the editor.
//!
//! Tokenization is simple and deterministic: split on non-alphanumeric
//! characters, lowercase, drop one-letter tokens and common stopwords.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Hard cap on search hits.
pub const SEARCH_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("index snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("index backend unavailable: {0}")]
    Unavailable(String),

    #[error("index update queue is closed")]
    QueueClosed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub repo: String,
    /// `folder/sheet_name`.
    pub sheet: String,
    pub class_id: Option<String>,
    pub label: Option<String>,
    pub definition: Option<String>,
    pub parent: Option<String>,
    pub reviewer: Option<String>,
}

impl IndexDocument {
    fn content_fields(&self) -> [Option<&str>; 5] {
        [
            self.class_id.as_deref(),
            self.label.as_deref(),
            self.definition.as_deref(),
            self.parent.as_deref(),
            self.reviewer.as_deref(),
        ]
    }
}

/// Repository-scoped free-text search.
///
/// `text` is a small boolean query: whitespace-separated terms must all
/// match, and `OR` separates alternatives (`smoking OR vaping`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub repo: String,
    pub text: Option<String>,
    pub reviewer: Option<String>,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            text: None,
            reviewer: None,
            limit: SEARCH_LIMIT,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = (!text.trim().is_empty()).then_some(text);
        self
    }

    pub fn with_reviewer(mut self, reviewer: impl Into<String>) -> Self {
        let reviewer = reviewer.into();
        self.reviewer = (!reviewer.trim().is_empty()).then_some(reviewer);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn alternatives(&self) -> Vec<Vec<String>> {
        let Some(text) = &self.text else {
            return Vec::new();
        };
        text.split(" OR ")
            .map(tokenize)
            .filter(|terms| !terms.is_empty())
            .collect()
    }
}

/// The query contract the curation core needs from a text index.
pub trait TextIndex: Send + Sync {
    /// Refresh from durable storage.
    fn load(&self) -> Result<(), IndexError>;

    /// Remove every document of one sheet. Returns how many were removed.
    fn delete_sheet(&self, repo: &str, sheet: &str) -> Result<usize, IndexError>;

    fn add(&self, doc: IndexDocument) -> Result<(), IndexError>;

    /// Persist pending changes.
    fn commit(&self) -> Result<(), IndexError>;

    /// Documents whose upper-cased `class_id` starts with `prefix`, sorted
    /// descending by `class_id`.
    fn prefix_query(&self, prefix: &str) -> Result<Vec<IndexDocument>, IndexError>;

    fn search(&self, query: &SearchQuery) -> Result<Vec<IndexDocument>, IndexError>;
}

// ============================================================================
// Tokenization
// ============================================================================

const STOPWORDS: &[&str] = &[
    "an", "and", "as", "at", "by", "for", "in", "is", "of", "on", "or", "the", "to", "with",
];

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn document_tokens(doc: &IndexDocument) -> Vec<String> {
    doc.content_fields()
        .into_iter()
        .flatten()
        .flat_map(tokenize)
        .collect()
}

// ============================================================================
// In-memory index with optional JSON snapshot
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryTextIndex {
    docs: RwLock<Vec<IndexDocument>>,
    snapshot: Option<PathBuf>,
}

impl MemoryTextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index persisted to `path`. A missing file is an empty index.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let index = Self {
            docs: RwLock::new(Vec::new()),
            snapshot: Some(path.into()),
        };
        index.load()?;
        Ok(index)
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn documents(&self) -> Vec<IndexDocument> {
        self.docs.read().clone()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl TextIndex for MemoryTextIndex {
    fn load(&self) -> Result<(), IndexError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no index snapshot yet");
            return Ok(());
        }
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        let docs: Vec<IndexDocument> = serde_json::from_slice(&bytes)?;
        tracing::debug!(path = %path.display(), documents = docs.len(), "loaded index snapshot");
        *self.docs.write() = docs;
        Ok(())
    }

    fn delete_sheet(&self, repo: &str, sheet: &str) -> Result<usize, IndexError> {
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|d| !(d.repo == repo && d.sheet == sheet));
        Ok(before - docs.len())
    }

    fn add(&self, doc: IndexDocument) -> Result<(), IndexError> {
        self.docs.write().push(doc);
        Ok(())
    }

    fn commit(&self) -> Result<(), IndexError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&*self.docs.read())?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        // Write-then-rename so readers never see a torn snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;
        Ok(())
    }

    fn prefix_query(&self, prefix: &str) -> Result<Vec<IndexDocument>, IndexError> {
        let prefix = prefix.trim().to_uppercase();
        let mut hits: Vec<IndexDocument> = self
            .docs
            .read()
            .iter()
            .filter(|d| {
                d.class_id
                    .as_deref()
                    .is_some_and(|id| id.trim().to_uppercase().starts_with(&prefix))
            })
            .cloned()
            .collect();
        hits.sort_by_cached_key(|d| std::cmp::Reverse(d.class_id.as_deref().map(str::to_uppercase)));
        Ok(hits)
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<IndexDocument>, IndexError> {
        let alternatives = query.alternatives();
        let reviewer = query.reviewer.as_deref().map(tokenize).unwrap_or_default();
        let docs = self.docs.read();
        let hits = docs
            .iter()
            .filter(|d| d.repo == query.repo)
            .filter(|d| {
                if reviewer.is_empty() {
                    return true;
                }
                let assigned = d.reviewer.as_deref().map(tokenize).unwrap_or_default();
                reviewer.iter().all(|r| assigned.contains(r))
            })
            .filter(|d| {
                if alternatives.is_empty() {
                    return true;
                }
                let tokens = document_tokens(d);
                alternatives
                    .iter()
                    .any(|terms| terms.iter().all(|t| tokens.contains(t)))
            })
            .take(query.limit.min(SEARCH_LIMIT))
            .cloned()
            .collect();
        Ok(hits)
    }
}
