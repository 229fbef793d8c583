//! Vector index trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A store of chunk embeddings with nearest-neighbour search.
///
/// An index is bound to one embedding provider and one dimensionality at
/// construction; vectors from anything else are rejected.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new("local:all-MiniLM-L6-v2", 384);
/// index.add(chunks, embeddings).await?;
/// let results = index.search(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add chunks with their embeddings, pairwise and in order.
    async fn add(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<()>;

    /// Return up to `top_k` chunks most similar to `embedding`.
    ///
    /// Results are ordered by descending similarity score.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored chunks.
    async fn len(&self) -> usize;

    /// Whether nothing has been added yet.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Dimensionality every stored vector has.
    fn dimensions(&self) -> usize;

    /// Name of the embedding provider this index was built with.
    fn provider(&self) -> &str;
}
