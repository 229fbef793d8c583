//! RAG pipeline orchestrator.
//!
//! [`KnowledgeBase::build`] runs the one-time ingest (load → chunk → embed →
//! index). [`RagPipeline`] owns the providers, builds the knowledge base
//! lazily on first use, caches the outcome, and answers questions against it
//! (embed → retrieve → prompt → generate).
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::from_config(RagConfig::default())?;
//! let answer = pipeline.ask("What are the Basel III capital requirements?").await?;
//! for source in &answer.supporting_chunks {
//!     println!("{} p.{}", source.chunk.source, source.chunk.page_number);
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::{EmbeddingStrategy, GenerationBackend, RagConfig};
use crate::document::{Answer, DocumentPage, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::gemini::GeminiProvider;
use crate::generation::{AnswerGenerator, GenerationProvider, PromptTemplate};
use crate::inmemory::InMemoryVectorIndex;
use crate::loader::{DocumentLoader, PdfLoader};
use crate::local::LocalEmbeddingProvider;
use crate::openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
use crate::vectorstore::VectorIndex;

/// Where a single question is in its lifecycle.
///
/// A question moves `Idle → Embedding → Retrieving → PromptBuilding →
/// Generating → Done`, or to `Failed` from any stage. A failure ends that
/// question only; the knowledge base is untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionStage {
    Idle,
    Embedding,
    Retrieving,
    PromptBuilding,
    Generating,
    Done,
    Failed(String),
}

impl fmt::Display for QuestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionStage::Idle => f.write_str("idle"),
            QuestionStage::Embedding => f.write_str("embedding"),
            QuestionStage::Retrieving => f.write_str("retrieving"),
            QuestionStage::PromptBuilding => f.write_str("prompt_building"),
            QuestionStage::Generating => f.write_str("generating"),
            QuestionStage::Done => f.write_str("done"),
            QuestionStage::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Page count of one loaded source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    pub name: String,
    pub page_count: usize,
}

/// The embedded, searchable form of the loaded documents.
///
/// Read-only once built; share it behind an `Arc`.
pub struct KnowledgeBase {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    sources: Vec<LoadedSource>,
    page_count: usize,
    chunk_count: usize,
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("embedder", &self.embedder.name())
            .field("sources", &self.sources)
            .field("page_count", &self.page_count)
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl KnowledgeBase {
    /// Load every available document, chunk it, embed the chunks, and index them.
    ///
    /// The loader runs on the blocking thread pool since PDF parsing is CPU-bound.
    ///
    /// # Errors
    ///
    /// Fails with the loader's error ([`RagError::NoDocumentsFound`],
    /// [`RagError::DocumentLoad`]), the embedder's error
    /// ([`RagError::EmbeddingService`], [`RagError::ModelLoad`]), or
    /// [`RagError::VectorIndex`] if the embedder returns malformed vectors.
    pub async fn build(
        loader: Arc<dyn DocumentLoader>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        info!(embedder = embedder.name(), "building knowledge base");

        let pages = tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| RagError::DocumentLoad {
                file: "<all>".to_string(),
                message: format!("loader task failed: {e}"),
            })??;

        let sources = summarize_sources(&pages);
        let chunks = chunker.chunk_pages(&pages);
        info!(
            documents = sources.len(),
            page_count = pages.len(),
            chunk_count = chunks.len(),
            "chunked documents"
        );
        if chunks.is_empty() {
            warn!("documents contain no extractable text; every question will fail");
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(embedder = embedder.name(), error = %e, "embedding failed during build");
        })?;

        // Providers pointed at an unlisted model only learn its width from the output.
        let dimensions = embeddings.first().map_or(embedder.dimensions(), Vec::len);
        if dimensions != embedder.dimensions() {
            warn!(
                embedder = embedder.name(),
                expected = embedder.dimensions(),
                returned = dimensions,
                "embedder returned a different width than it reports; indexing at the returned width"
            );
        }
        let index = InMemoryVectorIndex::new(embedder.name(), dimensions);
        let chunk_count = chunks.len();
        index.add(chunks, embeddings).await?;
        info!(chunk_count, "knowledge base ready");

        Ok(Self {
            embedder,
            index: Arc::new(index),
            sources,
            page_count: pages.len(),
            chunk_count,
        })
    }

    /// The files that were loaded, in load order.
    pub fn sources(&self) -> &[LoadedSource] {
        &self.sources
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Embed `question` with the build-time embedder and return the `top_k`
    /// closest chunks, dropping any scored below `threshold`.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyIndex`] if nothing was indexed, or the embedder's error.
    pub async fn search(
        &self,
        question: &str,
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        enter(&QuestionStage::Embedding);
        let query =
            self.embedder.embed(question).await.map_err(|e| fail(&QuestionStage::Embedding, e))?;

        enter(&QuestionStage::Retrieving);
        let mut results = self
            .index
            .search(&query, top_k)
            .await
            .map_err(|e| fail(&QuestionStage::Retrieving, e))?;
        if let Some(threshold) = threshold {
            results.retain(|r| r.score >= threshold);
        }
        debug!(
            result_count = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved"
        );
        Ok(results)
    }
}

fn summarize_sources(pages: &[DocumentPage]) -> Vec<LoadedSource> {
    let mut sources: Vec<LoadedSource> = Vec::new();
    for page in pages {
        match sources.last_mut() {
            Some(last) if last.name == page.source => last.page_count += 1,
            _ => sources.push(LoadedSource { name: page.source.clone(), page_count: 1 }),
        }
    }
    sources
}

fn enter(stage: &QuestionStage) {
    debug!(stage = %stage, "question stage");
}

fn fail(stage: &QuestionStage, e: RagError) -> RagError {
    let failed = QuestionStage::Failed(e.to_string());
    error!(stage = %stage, outcome = %failed, "question failed");
    e
}

/// The question-answering pipeline.
///
/// The knowledge base is built at most once, on the first call that needs
/// it; concurrent first callers wait for the same build. Its outcome,
/// success or failure, is cached for the pipeline's lifetime. Construct one
/// via [`RagPipeline::from_config`] or [`RagPipeline::builder`].
pub struct RagPipeline {
    config: RagConfig,
    loader: Arc<dyn DocumentLoader>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
    knowledge_base: OnceCell<Result<Arc<KnowledgeBase>>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Wire providers from `config`: PDF loader, recursive chunker, and the
    /// configured embedding strategy and generation backend.
    ///
    /// # Errors
    ///
    /// A missing credential fails here, before any network call, with
    /// [`RagError::EmbeddingService`] or [`RagError::GenerationService`].
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let embedder = embedding_provider_for(&config)?;
        let generator = generation_provider_for(&config)?;
        Self::builder()
            .config(config)
            .embedding_provider(embedder)
            .generation_provider(generator)
            .build()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    /// Build the knowledge base if needed and return it.
    ///
    /// # Errors
    ///
    /// The (cached) build failure; see [`KnowledgeBase::build`].
    pub async fn knowledge_base(&self) -> Result<Arc<KnowledgeBase>> {
        let outcome = self
            .knowledge_base
            .get_or_init(|| async {
                let (loader, chunker, embedder) =
                    (self.loader.clone(), self.chunker.clone(), self.embedder.clone());
                KnowledgeBase::build(loader, chunker, embedder)
                    .await
                    .map(Arc::new)
                    .inspect_err(|e| error!(error = %e, "knowledge base build failed"))
            })
            .await;
        outcome.clone()
    }

    /// The build outcome if a build has finished, without starting one.
    pub fn readiness(&self) -> Option<Result<Arc<KnowledgeBase>>> {
        self.knowledge_base.get().cloned()
    }

    /// Retrieve the configured `top_k` chunks most relevant to `question`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let knowledge_base = self.knowledge_base().await?;
        knowledge_base.search(question, self.config.top_k, self.config.similarity_threshold).await
    }

    /// Answer `question` with the configured generation provider.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with(&self.generator, question).await
    }

    /// Answer `question` with `generator` instead of the configured one.
    ///
    /// Retrieval still uses this pipeline's knowledge base, so a generation
    /// failure here never affects later questions.
    pub async fn ask_with(&self, generator: &AnswerGenerator, question: &str) -> Result<Answer> {
        debug!(stage = %QuestionStage::Idle, question_len = question.len(), "question received");
        let results = self.retrieve(question).await?;

        enter(&QuestionStage::PromptBuilding);
        enter(&QuestionStage::Generating);
        let answer = generator
            .answer(question, results)
            .await
            .map_err(|e| fail(&QuestionStage::Generating, e))?;

        info!(
            stage = %QuestionStage::Done,
            model = generator.provider().name(),
            sources = answer.supporting_chunks.len(),
            "question answered"
        );
        Ok(answer)
    }
}

fn embedding_provider_for(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match config.embedding_strategy {
        EmbeddingStrategy::Local => {
            let mut provider = LocalEmbeddingProvider::new();
            if let Some(dir) = &config.model_cache_dir {
                provider = provider.with_cache_dir(dir);
            }
            Arc::new(provider)
        }
        EmbeddingStrategy::Hosted => {
            let mut provider =
                OpenAIEmbeddingProvider::from_env()?.with_timeout(config.request_timeout())?;
            if let Some(model) = &config.embedding_model {
                provider = provider.with_model(model);
            }
            Arc::new(provider)
        }
    })
}

fn generation_provider_for(config: &RagConfig) -> Result<Arc<dyn GenerationProvider>> {
    let model = config.generation_model();
    Ok(match config.generation_backend {
        GenerationBackend::OpenAi => Arc::new(
            OpenAIChatProvider::from_env(model)?
                .with_temperature(config.temperature)
                .with_timeout(config.request_timeout())?,
        ),
        GenerationBackend::Gemini => Arc::new(
            GeminiProvider::from_env(model)?
                .with_temperature(config.temperature)
                .with_timeout(config.request_timeout())?,
        ),
    })
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding and generation providers are required. The loader and
/// chunker default to a [`PdfLoader`] and a [`RecursiveChunker`] derived
/// from the config.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(LocalEmbeddingProvider::default()))
///     .generation_provider(Arc::new(GeminiProvider::from_env("gemini-2.5-flash")?))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    loader: Option<Arc<dyn DocumentLoader>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    prompt_template: Option<PromptTemplate>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the PDF loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replace the recursive chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Replace the grounding prompt.
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = Some(template);
        self
    }

    /// Build the [`RagPipeline`]. Does not touch the documents yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required provider is missing or the
    /// chunking parameters are invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedder = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let provider = self
            .generation_provider
            .ok_or_else(|| RagError::Config("generation_provider is required".to_string()))?;
        let loader = match self.loader {
            Some(loader) => loader,
            None => Arc::new(PdfLoader::from_config(&config)),
        };
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };
        let generator = AnswerGenerator::new(provider)
            .with_template(self.prompt_template.unwrap_or_default());

        Ok(RagPipeline {
            config,
            loader,
            chunker,
            embedder,
            generator,
            knowledge_base: OnceCell::new(),
        })
    }
}
