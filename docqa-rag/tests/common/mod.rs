//! Shared fixtures: PDF generation and scripted providers.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::{
    DocumentLoader, DocumentPage, EmbeddingProvider, GenerationProvider, RagError, Result,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// Write a PDF with one page per entry of `pages`, each showing that text.
pub fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(50), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => [0, 0, 595, 842].map(Object::Integer).to_vec(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Serves fixed pages and counts how often it was asked to.
pub struct StaticLoader {
    pages: Vec<DocumentPage>,
    pub calls: AtomicUsize,
}

impl StaticLoader {
    pub fn new(pages: Vec<DocumentPage>) -> Arc<Self> {
        Arc::new(Self { pages, calls: AtomicUsize::new(0) })
    }
}

impl DocumentLoader for StaticLoader {
    fn load(&self) -> Result<Vec<DocumentPage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.clone())
    }
}

/// Wraps an embedder and counts batch (index build) and single (query) calls.
pub struct CountingEmbedder<E> {
    inner: E,
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
}

impl<E> CountingEmbedder<E> {
    pub fn new(inner: E) -> Arc<Self> {
        Arc::new(Self {
            inner,
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for CountingEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Deterministic bag-of-features embedder so retrieval tests need no model download.
///
/// Word unigrams, word bigrams and character trigrams are hashed (FNV-1a) into
/// signed buckets and the vector is L2-normalized, so texts sharing
/// vocabulary score close under cosine similarity.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0xcbf2_9ce4_8422_2325, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(0x100_0000_01b3))
}

impl HashingEmbedder {
    fn add(&self, vector: &mut [f32], kind: u8, feature: &str, weight: f32) {
        let mut bytes = vec![kind];
        bytes.extend_from_slice(feature.as_bytes());
        let hash = fnv1a(&bytes);
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[(hash % self.dimensions as u64) as usize] += sign * weight;
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> =
            lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect();

        let mut vector = vec![0.0f32; self.dimensions];
        for token in &tokens {
            self.add(&mut vector, b'w', token, 1.0);
            let padded: Vec<char> = format!("#{token}#").chars().collect();
            for trigram in padded.windows(3) {
                self.add(&mut vector, b'c', &trigram.iter().collect::<String>(), 0.25);
            }
        }
        for pair in tokens.windows(2) {
            self.add(&mut vector, b'b', &format!("{} {}", pair[0], pair[1]), 0.75);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "test:hashing"
    }
}

/// Always fails, like a provider whose quota is exhausted.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingService {
            provider: "stub".into(),
            message: "quota exceeded".into(),
        })
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Replies with a fixed answer and records the prompts it saw.
pub struct CannedGenerator {
    reply: String,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.to_string(), prompts: std::sync::Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationProvider for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// Fails every request with an upstream error.
pub struct FailingGenerator;

#[async_trait]
impl GenerationProvider for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::GenerationService {
            provider: "stub".into(),
            message: "401 invalid api key".into(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}
