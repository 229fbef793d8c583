//! In-memory vector index using cosine similarity.
//!
//! [`InMemoryVectorIndex`] keeps every entry in a `Vec` behind a
//! `tokio::sync::RwLock` and scans it on each search. The knowledge base is a
//! few hundred chunks at most, so an exhaustive scan is exact and fast enough.

use std::cmp::Ordering;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// An exhaustive-scan vector index.
///
/// Entries keep insertion order, and equal scores are ranked by it, so
/// search results are deterministic for a given build.
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    provider: String,
    dimensions: usize,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorIndex {
    /// Create an empty index for vectors of `dimensions` produced by `provider`.
    pub fn new(provider: impl Into<String>, dimensions: usize) -> Self {
        Self { provider: provider.into(), dimensions, entries: RwLock::new(Vec::new()) }
    }

    fn check_dimensions(&self, embedding: &[f32], what: &str) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(RagError::VectorIndex(format!(
                "{what} has {} dimensions but the index built with '{}' expects {}",
                embedding.len(),
                self.provider,
                self.dimensions
            )));
        }
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::VectorIndex(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for embedding in &embeddings {
            self.check_dimensions(embedding, "embedding")?;
        }

        let mut entries = self.entries.write().await;
        entries.extend(
            chunks.into_iter().zip(embeddings).map(|(chunk, embedding)| Entry { chunk, embedding }),
        );
        debug!(provider = %self.provider, total = entries.len(), "added chunks to index");
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let entries = self.entries.read().await;
        if entries.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        self.check_dimensions(embedding, "query embedding")?;

        let mut scored: Vec<SearchResult> = entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        // Stable sort: ties keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider(&self) -> &str {
        &self.provider
    }
}
