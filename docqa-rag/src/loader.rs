//! PDF document loading.
//!
//! [`PdfLoader`] reads a fixed list of candidate files and emits one
//! [`DocumentPage`] per physical page. Candidates that do not exist are
//! skipped with a warning; when none exist the load fails with
//! [`RagError::NoDocumentsFound`].

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::config::RagConfig;
use crate::document::DocumentPage;
use crate::error::{RagError, Result};

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0C\u{A0}]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("valid regex"));

/// A source of [`DocumentPage`]s for the knowledge base.
pub trait DocumentLoader: Send + Sync {
    /// Load every available page, in source order then page order.
    fn load(&self) -> Result<Vec<DocumentPage>>;
}

/// Presence of one candidate file, as reported by [`PdfLoader::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStatus {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
}

/// Loads PDF files page by page using `lopdf`.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    base_dir: PathBuf,
    candidates: Vec<String>,
}

impl PdfLoader {
    /// Create a loader for `candidates`, resolved against `base_dir`.
    pub fn new<I, S>(base_dir: impl Into<PathBuf>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_dir: base_dir.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// A loader for the candidate documents listed in `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.document_dir.clone(), config.documents.clone())
    }

    /// Report which candidates currently exist, without parsing them.
    pub fn probe(&self) -> Vec<CandidateStatus> {
        self.candidates
            .iter()
            .map(|name| {
                let path = self.base_dir.join(name);
                let exists = path.is_file();
                CandidateStatus { name: name.clone(), path, exists }
            })
            .collect()
    }

    fn load_file(&self, name: &str, path: &Path) -> Result<Vec<DocumentPage>> {
        let document = lopdf::Document::load(path).map_err(|e| RagError::DocumentLoad {
            file: name.to_string(),
            message: e.to_string(),
        })?;

        let pages = document.get_pages();
        let mut result = Vec::with_capacity(pages.len());
        for &page_number in pages.keys() {
            let text = match document.extract_text(&[page_number]) {
                Ok(text) => normalize_page_text(&text),
                Err(e) => {
                    warn!(file = name, page = page_number, error = %e, "no extractable text");
                    String::new()
                }
            };
            result.push(DocumentPage::new(name, page_number, text));
        }
        Ok(result)
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self) -> Result<Vec<DocumentPage>> {
        let mut pages = Vec::new();
        let mut found = 0usize;
        for candidate in self.probe() {
            if !candidate.exists {
                let path = candidate.path.display();
                warn!(file = %candidate.name, path = %path, "PDF not found, skipping");
                continue;
            }
            info!(file = %candidate.name, "loading PDF");
            let loaded = self.load_file(&candidate.name, &candidate.path)?;
            found += 1;
            info!(file = %candidate.name, page_count = loaded.len(), "loaded PDF");
            pages.extend(loaded);
        }

        if found == 0 {
            return Err(RagError::NoDocumentsFound { candidates: self.candidates.clone() });
        }
        Ok(pages)
    }
}

/// Normalize extracted text: unix line endings, single spaces, at most one blank line.
pub fn normalize_page_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n").trim().to_string()
}
