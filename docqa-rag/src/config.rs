//! Configuration for the RAG pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The PDF filenames looked up when no explicit document list is configured.
pub const DEFAULT_DOCUMENTS: [&str; 3] = ["doc1.pdf", "doc2.pdf", "doc3.pdf"];

/// Default chat model for the OpenAI generation backend.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Default model for the Gemini generation backend.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Which embedding strategy builds (and queries) the vector index.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStrategy {
    /// A hosted embedding API (OpenAI).
    #[default]
    Hosted,
    /// all-MiniLM-L6-v2 run in process; no credential needed.
    Local,
}

impl fmt::Display for EmbeddingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingStrategy::Hosted => f.write_str("hosted"),
            EmbeddingStrategy::Local => f.write_str("local"),
        }
    }
}

impl FromStr for EmbeddingStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "openai" => Ok(EmbeddingStrategy::Hosted),
            "local" => Ok(EmbeddingStrategy::Local),
            other => Err(RagError::Config(format!(
                "unknown embedding strategy '{other}'; use hosted or local"
            ))),
        }
    }
}

/// Which hosted generation API answers questions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl GenerationBackend {
    /// The model used when none is configured explicitly.
    pub fn default_model(&self) -> &'static str {
        match self {
            GenerationBackend::OpenAi => DEFAULT_OPENAI_MODEL,
            GenerationBackend::Gemini => DEFAULT_GEMINI_MODEL,
        }
    }

    /// The environment variable holding this backend's API key.
    pub fn credential_var(&self) -> &'static str {
        match self {
            GenerationBackend::OpenAi => "OPENAI_API_KEY",
            GenerationBackend::Gemini => "GOOGLE_API_KEY",
        }
    }
}

impl fmt::Display for GenerationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationBackend::OpenAi => f.write_str("openai"),
            GenerationBackend::Gemini => f.write_str("gemini"),
        }
    }
}

impl FromStr for GenerationBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(GenerationBackend::OpenAi),
            "gemini" | "google" => Ok(GenerationBackend::Gemini),
            other => Err(RagError::Config(format!(
                "unknown generation backend '{other}'; use openai or gemini"
            ))),
        }
    }
}

/// Preset provider wirings.
///
/// `OpenAi` pairs hosted embeddings with OpenAI chat; `Gemini` pairs the local
/// embedding model with Gemini, so it only needs a Google API key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    OpenAi,
    Gemini,
}

impl FromStr for Profile {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Profile::OpenAi),
            "gemini" => Ok(Profile::Gemini),
            other => {
                Err(RagError::Config(format!("unknown profile '{other}'; use openai or gemini")))
            }
        }
    }
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps every top-k result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
    /// Embedding strategy for both index build and query embedding.
    pub embedding_strategy: EmbeddingStrategy,
    /// Hosted embedding model override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Where the local embedding model files are cached. `None` uses fastembed's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_cache_dir: Option<PathBuf>,
    /// Hosted generation API.
    pub generation_backend: GenerationBackend,
    /// Generation model override; see [`RagConfig::generation_model`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_model: Option<String>,
    /// Sampling temperature passed to the generation API.
    pub temperature: f32,
    /// Timeout applied to every hosted request, in seconds.
    pub request_timeout_secs: u64,
    /// Candidate PDF filenames, in load order.
    pub documents: Vec<String>,
    /// Directory the candidate filenames are resolved against.
    pub document_dir: PathBuf,
    /// Display length of source snippets. Never affects what is stored or ranked.
    pub snippet_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            similarity_threshold: None,
            embedding_strategy: EmbeddingStrategy::default(),
            embedding_model: None,
            model_cache_dir: None,
            generation_backend: GenerationBackend::default(),
            generation_model: None,
            temperature: 0.0,
            request_timeout_secs: 60,
            documents: DEFAULT_DOCUMENTS.iter().map(|d| d.to_string()).collect(),
            document_dir: PathBuf::from("."),
            snippet_chars: 300,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The generation model to invoke: the explicit override or the backend default.
    pub fn generation_model(&self) -> &str {
        self.generation_model.as_deref().unwrap_or(self.generation_backend.default_model())
    }

    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Environment variables that must be set for the configured providers.
    pub fn required_credentials(&self) -> Vec<&'static str> {
        let mut vars = Vec::new();
        if self.embedding_strategy == EmbeddingStrategy::Hosted {
            vars.push("OPENAI_API_KEY");
        }
        let generation = self.generation_backend.credential_var();
        if !vars.contains(&generation) {
            vars.push(generation);
        }
        vars
    }

    /// Each required credential paired with whether it is set to a non-blank value.
    pub fn credential_status(&self) -> Vec<(&'static str, bool)> {
        self.required_credentials()
            .into_iter()
            .map(|var| (var, std::env::var(var).is_ok_and(|v| !v.trim().is_empty())))
            .collect()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Start from one of the preset provider wirings.
    pub fn profile(mut self, profile: Profile) -> Self {
        match profile {
            Profile::OpenAi => {
                self.config.embedding_strategy = EmbeddingStrategy::Hosted;
                self.config.generation_backend = GenerationBackend::OpenAi;
            }
            Profile::Gemini => {
                self.config.embedding_strategy = EmbeddingStrategy::Local;
                self.config.generation_backend = GenerationBackend::Gemini;
            }
        }
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set a minimum similarity score; results below it are dropped.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the embedding strategy.
    pub fn embedding_strategy(mut self, strategy: EmbeddingStrategy) -> Self {
        self.config.embedding_strategy = strategy;
        self
    }

    /// Override the hosted embedding model.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = Some(model.into());
        self
    }

    /// Cache the local embedding model files under `dir`.
    pub fn model_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.model_cache_dir = Some(dir.into());
        self
    }

    /// Set the generation backend.
    pub fn generation_backend(mut self, backend: GenerationBackend) -> Self {
        self.config.generation_backend = backend;
        self
    }

    /// Override the generation model.
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the hosted request timeout in seconds.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Replace the candidate document list.
    pub fn documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.documents = documents.into_iter().map(Into::into).collect();
        self
    }

    /// Set the directory candidate documents are resolved against.
    pub fn document_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.document_dir = dir.into();
        self
    }

    /// Set the display length of source snippets.
    pub fn snippet_chars(mut self, chars: usize) -> Self {
        self.config.snippet_chars = chars;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `request_timeout_secs == 0`
    /// - the document list is empty
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.config.request_timeout_secs == 0 {
            return Err(RagError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.config.documents.is_empty() {
            return Err(RagError::Config("at least one document must be listed".to_string()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_wiring() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.similarity_threshold, None);
        assert_eq!(config.documents, vec!["doc1.pdf", "doc2.pdf", "doc3.pdf"]);
        assert_eq!(config.generation_model(), "gpt-3.5-turbo");
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn credential_status_lists_each_required_key_once() {
        let openai = RagConfig::builder().build().unwrap();
        let names: Vec<_> = openai.credential_status().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["OPENAI_API_KEY"]);

        let mixed = RagConfig::builder()
            .generation_backend(GenerationBackend::Gemini)
            .build()
            .unwrap();
        let names: Vec<_> = mixed.credential_status().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["OPENAI_API_KEY", "GOOGLE_API_KEY"]);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }

    #[test]
    fn gemini_profile_needs_only_the_google_key() {
        let config = RagConfig::builder().profile(Profile::Gemini).build().unwrap();
        assert_eq!(config.embedding_strategy, EmbeddingStrategy::Local);
        assert_eq!(config.generation_model(), "gemini-2.5-flash");
        assert_eq!(config.required_credentials(), vec!["GOOGLE_API_KEY"]);
    }

    #[test]
    fn openai_profile_shares_one_key() {
        let config = RagConfig::builder().profile(Profile::OpenAi).build().unwrap();
        assert_eq!(config.required_credentials(), vec!["OPENAI_API_KEY"]);
    }

    #[test]
    fn explicit_model_overrides_backend_default() {
        let config = RagConfig::builder()
            .generation_backend(GenerationBackend::Gemini)
            .generation_model("gemini-2.5-pro")
            .build()
            .unwrap();
        assert_eq!(config.generation_model(), "gemini-2.5-pro");
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("LOCAL".parse::<EmbeddingStrategy>().unwrap(), EmbeddingStrategy::Local);
        assert_eq!("Gemini".parse::<GenerationBackend>().unwrap(), GenerationBackend::Gemini);
        assert!("cohere".parse::<GenerationBackend>().is_err());
    }
}
