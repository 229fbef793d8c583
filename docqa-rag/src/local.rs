//! In-process sentence embeddings with `fastembed`.
//!
//! [`LocalEmbeddingProvider`] runs `sentence-transformers/all-MiniLM-L6-v2`
//! (384 dimensions) through ONNX Runtime. It needs no credential; the model
//! files are fetched into the cache directory the first time the model loads.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The sentence-transformers model run by [`LocalEmbeddingProvider`].
pub const LOCAL_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Output width of [`LOCAL_MODEL_NAME`].
pub const LOCAL_DIMENSIONS: usize = 384;

/// Texts per ONNX inference call.
const BATCH_SIZE: usize = 64;

type SharedModel = Arc<Mutex<TextEmbedding>>;

/// An [`EmbeddingProvider`] that runs all-MiniLM-L6-v2 in process.
///
/// The model is loaded on first use and cached for the provider's lifetime;
/// a load failure is cached too and reported as [`RagError::ModelLoad`] on
/// every call. Loading and inference run on the blocking thread pool.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::LocalEmbeddingProvider;
///
/// let provider = LocalEmbeddingProvider::new().with_cache_dir(".fastembed_cache");
/// let embedding = provider.embed("capital requirements").await?;
/// assert_eq!(embedding.len(), 384);
/// ```
pub struct LocalEmbeddingProvider {
    cache_dir: Option<PathBuf>,
    name: String,
    model: OnceCell<Result<SharedModel>>,
}

impl fmt::Debug for LocalEmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEmbeddingProvider")
            .field("name", &self.name)
            .field("cache_dir", &self.cache_dir)
            .field("loaded", &self.model.initialized())
            .finish()
    }
}

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEmbeddingProvider {
    pub fn new() -> Self {
        Self { cache_dir: None, name: format!("local:{LOCAL_MODEL_NAME}"), model: OnceCell::new() }
    }

    /// Keep downloaded model files in `dir` instead of fastembed's default.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    fn load_error(&self, message: impl Into<String>) -> RagError {
        RagError::ModelLoad { model: self.name.clone(), message: message.into() }
    }

    fn service_error(&self, message: impl Into<String>) -> RagError {
        RagError::EmbeddingService { provider: self.name.clone(), message: message.into() }
    }

    async fn load(&self) -> Result<SharedModel> {
        let mut options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        info!(model = %self.name, cache_dir = ?self.cache_dir, "loading local embedding model");
        let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
            .await
            .map_err(|e| self.load_error(format!("model loading task failed: {e}")))?
            .map_err(|e| self.load_error(e.to_string()))?;

        info!(model = %self.name, dimensions = LOCAL_DIMENSIONS, "local embedding model ready");
        Ok(Arc::new(Mutex::new(model)))
    }

    async fn model(&self) -> Result<SharedModel> {
        self.model
            .get_or_init(|| async {
                self.load().await.inspect_err(|e| {
                    error!(model = %self.name, error = %e, "local embedding model failed to load");
                })
            })
            .await
            .clone()
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.model().await?;
        let count = texts.len();

        let embeddings = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| "model lock poisoned by an earlier panic".to_string())?;
            model.embed(texts, Some(BATCH_SIZE)).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| self.service_error(format!("inference task failed: {e}")))?
        .map_err(|message| self.service_error(message))?;

        if embeddings.len() != count {
            return Err(self.service_error(format!(
                "model returned {} embeddings for {count} inputs",
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = %self.name, text_len = text.len(), "embedding single text");
        let mut embeddings = self.run(vec![text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| self.service_error("model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = %self.name, batch_size = texts.len(), "embedding batch");
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimensions(&self) -> usize {
        LOCAL_DIMENSIONS
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::cosine_similarity;

    #[test]
    fn reports_the_model_without_loading_it() {
        let provider = LocalEmbeddingProvider::new();
        assert_eq!(provider.name(), "local:all-MiniLM-L6-v2");
        assert_eq!(provider.dimensions(), 384);
        assert!(!provider.model.initialized());
    }

    #[tokio::test]
    async fn empty_batch_does_not_load_the_model() {
        let provider = LocalEmbeddingProvider::new();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
        assert!(!provider.model.initialized());
    }

    #[tokio::test]
    async fn unusable_cache_dir_is_a_cached_model_load_error() {
        // A regular file where the cache directory should be.
        let file = tempfile::NamedTempFile::new().unwrap();
        let provider = LocalEmbeddingProvider::new().with_cache_dir(file.path());

        let err = provider.embed("capital").await.unwrap_err();
        match &err {
            RagError::ModelLoad { model, .. } => assert_eq!(model, "local:all-MiniLM-L6-v2"),
            other => panic!("expected ModelLoad, got {other:?}"),
        }
        assert_eq!(provider.embed_batch(&["again"]).await.unwrap_err(), err);
    }

    #[tokio::test]
    #[ignore = "downloads the all-MiniLM-L6-v2 model files"]
    async fn related_sentences_score_higher() {
        let provider = LocalEmbeddingProvider::new();
        let query = provider.embed("How much capital must banks hold?").await.unwrap();
        let related =
            provider.embed("Banks are required to maintain minimum capital ratios.").await.unwrap();
        let unrelated =
            provider.embed("Photosynthesis converts sunlight into sugar.").await.unwrap();

        assert_eq!(query.len(), LOCAL_DIMENSIONS);
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
        assert_eq!(provider.embed("How much capital must banks hold?").await.unwrap(), query);
    }
}
