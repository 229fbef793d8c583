//! Data types for pages, chunks, search results, and answers.

use serde::{Deserialize, Serialize};

/// The text of one physical PDF page with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentPage {
    /// The filename the page was loaded from, as configured.
    pub source: String,
    /// 1-based physical page number.
    pub page_number: u32,
    /// The extracted page text.
    pub text: String,
}

impl DocumentPage {
    pub fn new(source: impl Into<String>, page_number: u32, text: impl Into<String>) -> Self {
        Self { source: source.into(), page_number, text: text.into() }
    }
}

/// A bounded slice of a [`DocumentPage`]; the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier `{source}:{page_number}:{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Source filename inherited from the page.
    pub source: String,
    /// Page number inherited from the page.
    pub page_number: u32,
    /// Position of this chunk within its page.
    pub chunk_index: usize,
}

impl Chunk {
    /// Create a chunk of `page`, deriving its id from the page provenance.
    pub fn from_page(page: &DocumentPage, chunk_index: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("{}:{}:{chunk_index}", page.source, page.page_number),
            text: text.into(),
            source: page.source.clone(),
            page_number: page.page_number,
            chunk_index,
        }
    }

    /// The first `max_chars` characters of the text, with an ellipsis when cut.
    ///
    /// Display only; retrieval always works on the full text.
    pub fn snippet(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((byte_pos, _)) => format!("{}...", &self.text[..byte_pos]),
            None => self.text.clone(),
        }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The question as asked.
    pub question: String,
    /// The generation model's output, verbatim.
    pub text: String,
    /// The retrieved chunks, in ranking order.
    pub supporting_chunks: Vec<SearchResult>,
}
