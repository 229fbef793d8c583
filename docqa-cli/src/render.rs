//! Plain-text rendering for the terminal.

use std::fmt::Write;

use docqa_rag::{Answer, CandidateStatus, RagConfig};

pub fn answer(answer: &Answer, snippet_chars: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Answer:\n{}", answer.text.trim_end());

    if answer.supporting_chunks.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\nSources:");
    for (i, result) in answer.supporting_chunks.iter().enumerate() {
        let chunk = &result.chunk;
        let _ = writeln!(
            out,
            "  [{}] {}, page {} (score {:.3})",
            i + 1,
            chunk.source,
            chunk.page_number,
            result.score
        );
        for line in chunk.snippet(snippet_chars).lines().filter(|l| !l.trim().is_empty()) {
            let _ = writeln!(out, "      {line}");
        }
    }
    out
}

/// Configuration, document and credential diagnostics for `docqa status`.
pub fn status(
    config: &RagConfig,
    candidates: &[CandidateStatus],
    credentials: &[(&str, bool)],
) -> String {
    let mut out = String::new();
    let found = candidates.iter().filter(|c| c.exists).count();
    let _ = writeln!(out, "PDFs found: {found}/{}", candidates.len());
    for candidate in candidates {
        let mark = if candidate.exists { "ok" } else { "missing" };
        let _ = writeln!(out, "  {:<8} {}", mark, candidate.path.display());
    }

    let _ = writeln!(out, "\nEmbeddings: {}", config.embedding_strategy);
    let _ = writeln!(
        out,
        "Generation: {} ({})",
        config.generation_backend,
        config.generation_model()
    );
    let _ = writeln!(
        out,
        "Chunking:   size {} overlap {}, top_k {}",
        config.chunk_size, config.chunk_overlap, config.top_k
    );

    let _ = writeln!(out, "\nCredentials:");
    for (var, set) in credentials {
        let _ = writeln!(out, "  {var}: {}", if *set { "set" } else { "missing" });
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use docqa_rag::{Chunk, DocumentPage, SearchResult};

    use super::*;

    fn result(source: &str, page: u32, text: &str, score: f32) -> SearchResult {
        let page = DocumentPage::new(source, page, text);
        SearchResult { chunk: Chunk::from_page(&page, 0, text), score }
    }

    #[test]
    fn sources_are_numbered_in_ranking_order() {
        let answer = Answer {
            question: "q".into(),
            text: "Banks hold more capital.\n".into(),
            supporting_chunks: vec![
                result("doc2.pdf", 4, "Capital requirements rise under the new rules.", 0.81),
                result("doc1.pdf", 1, "Overview", 0.42),
            ],
        };
        let text = super::answer(&answer, 10);
        assert!(text.starts_with("Answer:\nBanks hold more capital.\n"));
        assert!(text.contains("  [1] doc2.pdf, page 4 (score 0.810)\n      Capital re...\n"));
        assert!(text.contains("  [2] doc1.pdf, page 1 (score 0.420)\n      Overview\n"));
    }

    #[test]
    fn answer_without_sources_has_no_source_section() {
        let answer = Answer { question: "q".into(), text: "I don't know.".into(), supporting_chunks: vec![] };
        assert!(!super::answer(&answer, 300).contains("Sources:"));
    }

    #[test]
    fn status_counts_present_documents() {
        let config = RagConfig::default();
        let candidates = vec![
            CandidateStatus { name: "doc1.pdf".into(), path: PathBuf::from("./doc1.pdf"), exists: true },
            CandidateStatus { name: "doc2.pdf".into(), path: PathBuf::from("./doc2.pdf"), exists: false },
            CandidateStatus { name: "doc3.pdf".into(), path: PathBuf::from("./doc3.pdf"), exists: true },
        ];
        let text = status(&config, &candidates, &[("OPENAI_API_KEY", false)]);
        assert!(text.starts_with("PDFs found: 2/3\n"));
        assert!(text.contains("missing  ./doc2.pdf"));
        assert!(text.contains("Generation: openai (gpt-3.5-turbo)"));
        assert!(text.contains("OPENAI_API_KEY: missing"));
    }
}
