//! Page chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits page text hierarchically (paragraphs → lines → sentences → words →
//! characters) and packs the pieces into overlapping windows.

use crate::config::RagConfig;
use crate::document::{Chunk, DocumentPage};
use crate::error::{RagError, Result};

/// Breakpoints in order of preference.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "? ", "! ", " "];

/// A strategy for splitting pages into chunks.
///
/// Every chunk inherits the provenance of the page it came from.
pub trait Chunker: Send + Sync {
    /// Split one page into chunks. Returns an empty `Vec` for blank pages.
    fn chunk(&self, page: &DocumentPage) -> Vec<Chunk>;

    /// Split a sequence of pages, preserving page order.
    fn chunk_pages(&self, pages: &[DocumentPage]) -> Vec<Chunk> {
        pages.iter().flat_map(|page| self.chunk(page)).collect()
    }
}

/// Splits text at natural breakpoints into windows of at most `chunk_size`
/// characters, each starting with up to `chunk_overlap` characters of the
/// previous window.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk_pages(&pages);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split raw text into chunk texts.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        // A piece plus a full overlap tail must always fit in one window.
        let max_piece = self.chunk_size - self.chunk_overlap;
        let mut pieces = Vec::new();
        split_pieces(text, max_piece, &SEPARATORS, &mut pieces);
        pack_windows(&pieces, self.chunk_size, self.chunk_overlap)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, page: &DocumentPage) -> Vec<Chunk> {
        self.split_text(&page.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::from_page(page, i, text))
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into pieces of at most `max_chars` characters, trying each
/// separator in turn before falling back to plain character splits.
fn split_pieces<'a>(text: &'a str, max_chars: usize, separators: &[&str], out: &mut Vec<&'a str>) {
    if char_len(text) <= max_chars {
        out.push(text);
        return;
    }

    let Some((separator, remaining)) = separators.split_first() else {
        split_chars(text, max_chars, out);
        return;
    };

    let segments = split_keeping_separator(text, separator);
    if segments.len() == 1 {
        split_pieces(text, max_chars, remaining, out);
        return;
    }
    for segment in segments {
        split_pieces(segment, max_chars, remaining, out);
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn split_chars<'a>(text: &'a str, max_chars: usize, out: &mut Vec<&'a str>) {
    let mut start = 0;
    let mut count = 0;
    for (pos, _) in text.char_indices() {
        if count == max_chars {
            out.push(&text[start..pos]);
            start = pos;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
}

/// Greedily pack pieces into windows of at most `size` characters.
///
/// Whitespace-only pieces never open a window on their own; when the window
/// is full they are carried forward and squeezed in front of the next piece
/// as far as room allows.
fn pack_windows(pieces: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let mut windows = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0;
    let mut has_content = false;
    let mut pending = String::new();

    for piece in pieces {
        let piece_len = char_len(piece);

        if piece.trim().is_empty() {
            if has_content && buf_len + piece_len <= size {
                buf.push_str(piece);
                buf_len += piece_len;
            } else {
                pending.push_str(piece);
            }
            continue;
        }

        if has_content && buf_len + char_len(&pending) + piece_len > size {
            let tail = overlap_tail(&buf, overlap).to_string();
            windows.push(std::mem::replace(&mut buf, tail));
            buf_len = char_len(&buf);
            has_content = false;
        }

        let mut room = size - buf_len - piece_len;
        if room == 0 && !pending.is_empty() && buf_len > 1 {
            // Give up one overlap character rather than glue two words together.
            let first = buf.chars().next().map_or(0, char::len_utf8);
            buf.replace_range(..first, "");
            buf_len -= 1;
            room = 1;
        }
        buf.extend(pending.chars().take(room));
        pending.clear();
        buf.push_str(piece);
        buf_len = char_len(&buf);
        has_content = true;
    }

    if has_content {
        windows.push(buf);
    }
    windows
}

/// The last `overlap` characters of `text`, moved forward to the next word
/// start when the cut lands inside a word.
fn overlap_tail(text: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let skip = char_len(text).saturating_sub(overlap);
    let start = text.char_indices().nth(skip).map_or(text.len(), |(i, _)| i);
    let tail = &text[start..];

    let mid_word = start > 0 && !text[..start].ends_with(char::is_whitespace);
    if mid_word {
        if let Some(ws) = tail.find(char::is_whitespace) {
            let rest = tail[ws..].trim_start();
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    tail
}
