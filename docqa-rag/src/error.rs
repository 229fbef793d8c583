//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while building the knowledge base or answering a question.
///
/// The type is `Clone` so that a cached build failure can be reported to every
/// caller that asks for the knowledge base afterwards.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RagError {
    /// None of the candidate PDF files exist.
    #[error("No PDF files found (looked for: {})", .candidates.join(", "))]
    NoDocumentsFound {
        /// The filenames that were searched for.
        candidates: Vec<String>,
    },

    /// A PDF file exists but could not be parsed.
    #[error("Failed to load document '{file}': {message}")]
    DocumentLoad {
        /// The file that failed to load.
        file: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The local embedding model could not be initialized.
    #[error("Model load error ({model}): {message}")]
    ModelLoad {
        /// The local model that failed to initialize.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A hosted embedding request failed (network, auth, rate limit, malformed response).
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index rejected an operation, e.g. a dimensionality mismatch.
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// The vector index was queried before any chunk was added.
    #[error("Vector index is empty; the knowledge base has not been built")]
    EmptyIndex,

    /// A generation request failed (missing credential, auth, quota, network, malformed response).
    #[error("Generation service error ({provider}): {message}")]
    GenerationService {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
