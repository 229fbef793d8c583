//! JSON bodies of the web API.

use docqa_rag::{Answer, CandidateStatus, KnowledgeBase, RagError, SearchResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// One cited chunk, as displayed under an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceView {
    pub source: String,
    pub page: u32,
    pub snippet: String,
    pub score: f32,
}

impl SourceView {
    pub fn from_result(result: &SearchResult, snippet_chars: usize) -> Self {
        Self {
            source: result.chunk.source.clone(),
            page: result.chunk.page_number,
            snippet: result.chunk.snippet(snippet_chars),
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceView>,
}

impl AskResponse {
    pub fn from_answer(answer: Answer, snippet_chars: usize) -> Self {
        let sources = answer
            .supporting_chunks
            .iter()
            .map(|r| SourceView::from_result(r, snippet_chars))
            .collect();
        Self { question: answer.question, answer: answer.text, sources }
    }
}

/// Lifecycle of the knowledge base as reported by `GET /api/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Building,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStatus {
    pub name: String,
    pub pages: usize,
}

/// Whether one required API key is present in the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialStatus {
    pub name: String,
    pub set: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: ReadyState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub documents: Vec<DocumentStatus>,
    pub chunks: usize,
    pub embedder: String,
    pub generator: String,
    /// Candidate PDFs currently on disk, out of `documents_expected`.
    pub documents_found: usize,
    pub documents_expected: usize,
    pub credentials: Vec<CredentialStatus>,
}

impl StatusResponse {
    pub fn new(
        readiness: Option<Result<std::sync::Arc<KnowledgeBase>, RagError>>,
        embedder: &str,
        generator: &str,
    ) -> Self {
        let mut status = Self {
            state: ReadyState::Building,
            error: None,
            documents: Vec::new(),
            chunks: 0,
            embedder: embedder.to_string(),
            generator: generator.to_string(),
            documents_found: 0,
            documents_expected: 0,
            credentials: Vec::new(),
        };
        match readiness {
            None => {}
            Some(Ok(knowledge_base)) => {
                status.state = ReadyState::Ready;
                status.chunks = knowledge_base.chunk_count();
                status.documents = knowledge_base
                    .sources()
                    .iter()
                    .map(|s| DocumentStatus { name: s.name.clone(), pages: s.page_count })
                    .collect();
            }
            Some(Err(e)) => {
                status.state = ReadyState::Failed;
                status.error = Some(e.to_string());
            }
        }
        status
    }

    /// Attach what is on disk and in the environment right now.
    pub fn with_environment(
        mut self,
        candidates: &[CandidateStatus],
        credentials: &[(&str, bool)],
    ) -> Self {
        self.documents_found = candidates.iter().filter(|c| c.exists).count();
        self.documents_expected = candidates.len();
        self.credentials = credentials
            .iter()
            .map(|(name, set)| CredentialStatus { name: name.to_string(), set: *set })
            .collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
