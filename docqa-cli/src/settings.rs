use std::path::PathBuf;

use clap::Args;
use docqa_rag::{EmbeddingStrategy, GenerationBackend, Profile, RagConfig};

/// Pipeline settings shared by every subcommand.
///
/// Anything left unset keeps the value chosen by `--profile`, or the
/// library default when no profile is given.
#[derive(Args, Debug, Clone, Default)]
pub struct Settings {
    /// Preset provider wiring (openai or gemini)
    #[arg(long, env = "DOCQA_PROFILE", global = true)]
    pub profile: Option<Profile>,

    /// Embedding strategy (hosted or local)
    #[arg(long, env = "DOCQA_EMBEDDING", global = true)]
    pub embedding: Option<EmbeddingStrategy>,

    /// Hosted embedding model
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", global = true)]
    pub embedding_model: Option<String>,

    /// Directory for the local embedding model files
    #[arg(long, env = "DOCQA_MODEL_CACHE_DIR", global = true)]
    pub model_cache_dir: Option<PathBuf>,

    /// Generation backend (openai or gemini)
    #[arg(long, env = "DOCQA_GENERATION", global = true)]
    pub generation: Option<GenerationBackend>,

    /// Generation model; defaults per backend
    #[arg(long, env = "DOCQA_MODEL", global = true)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long, env = "DOCQA_TEMPERATURE", global = true)]
    pub temperature: Option<f32>,

    /// Number of chunks retrieved per question
    #[arg(long, env = "DOCQA_TOP_K", global = true)]
    pub top_k: Option<usize>,

    /// Maximum chunk size in characters
    #[arg(long, env = "DOCQA_CHUNK_SIZE", global = true)]
    pub chunk_size: Option<usize>,

    /// Overlap between consecutive chunks in characters
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", global = true)]
    pub chunk_overlap: Option<usize>,

    /// Drop retrieved chunks scoring below this cosine similarity
    #[arg(long, env = "DOCQA_THRESHOLD", global = true)]
    pub threshold: Option<f32>,

    /// Timeout for hosted API requests, in seconds
    #[arg(long, env = "DOCQA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Comma-separated PDF filenames to load, in order
    #[arg(long, env = "DOCQA_DOCUMENTS", value_delimiter = ',', global = true)]
    pub documents: Vec<String>,

    /// Directory the PDF filenames are resolved against
    #[arg(long, env = "DOCQA_DOC_DIR", global = true)]
    pub doc_dir: Option<PathBuf>,

    /// Characters of each source shown under an answer
    #[arg(long, env = "DOCQA_SNIPPET_CHARS", global = true)]
    pub snippet_chars: Option<usize>,
}

impl Settings {
    pub fn to_config(&self) -> docqa_rag::Result<RagConfig> {
        let mut builder = RagConfig::builder();
        if let Some(profile) = self.profile {
            builder = builder.profile(profile);
        }
        if let Some(strategy) = self.embedding {
            builder = builder.embedding_strategy(strategy);
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model(model);
        }
        if let Some(dir) = &self.model_cache_dir {
            builder = builder.model_cache_dir(dir);
        }
        if let Some(backend) = self.generation {
            builder = builder.generation_backend(backend);
        }
        if let Some(model) = &self.model {
            builder = builder.generation_model(model);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if let Some(size) = self.chunk_size {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = self.chunk_overlap {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(threshold) = self.threshold {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(secs) = self.timeout {
            builder = builder.request_timeout_secs(secs);
        }
        if !self.documents.is_empty() {
            builder = builder.documents(self.documents.iter().map(|d| d.trim()));
        }
        if let Some(dir) = &self.doc_dir {
            builder = builder.document_dir(dir);
        }
        if let Some(chars) = self.snippet_chars {
            builder = builder.snippet_chars(chars);
        }
        builder.build()
    }
}
