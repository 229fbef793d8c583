//! # docqa-rag
//!
//! Retrieval-augmented question answering over a fixed set of PDF documents.
//!
//! ## Overview
//!
//! The crate loads the configured PDFs page by page, splits each page into
//! overlapping chunks, embeds the chunks, and keeps them in an in-memory
//! vector index. A question is embedded the same way, the closest chunks are
//! retrieved, and a hosted model answers from those chunks only. Every answer
//! carries its supporting chunks with their source file and page.
//!
//! - [`PdfLoader`] - one [`DocumentPage`] per physical page (`lopdf`)
//! - [`RecursiveChunker`] - paragraph → sentence → word splitting with overlap
//! - [`OpenAIEmbeddingProvider`] / [`LocalEmbeddingProvider`] - hosted or in-process embeddings
//! - [`InMemoryVectorIndex`] - exact cosine search
//! - [`OpenAIChatProvider`] / [`GeminiProvider`] - answer generation
//! - [`RagPipeline`] - lazy, cached knowledge base plus `ask`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docqa_rag::{Profile, RagConfig, RagPipeline};
//!
//! let config = RagConfig::builder().profile(Profile::Gemini).build()?;
//! let pipeline = RagPipeline::from_config(config)?;
//! let answer = pipeline.ask("What are the Basel III capital requirements?").await?;
//! println!("{}", answer.text);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod gemini;
pub mod generation;
mod http;
pub mod inmemory;
pub mod loader;
pub mod local;
pub mod openai;
pub mod pipeline;
pub mod vectorstore;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::{
    DEFAULT_DOCUMENTS, EmbeddingStrategy, GenerationBackend, Profile, RagConfig, RagConfigBuilder,
};
pub use document::{Answer, Chunk, DocumentPage, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use gemini::GeminiProvider;
pub use generation::{AnswerGenerator, GenerationProvider, PromptTemplate};
pub use inmemory::InMemoryVectorIndex;
pub use loader::{CandidateStatus, DocumentLoader, PdfLoader};
pub use local::LocalEmbeddingProvider;
pub use openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
pub use pipeline::{KnowledgeBase, LoadedSource, QuestionStage, RagPipeline, RagPipelineBuilder};
pub use vectorstore::VectorIndex;
