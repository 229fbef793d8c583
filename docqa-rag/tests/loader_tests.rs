//! Integration tests for PDF loading against generated fixtures.

mod common;

use docqa_rag::{DocumentLoader, PdfLoader, RagError};

#[test]
fn one_page_per_physical_page_in_order() {
    let dir = tempfile::tempdir().unwrap();
    common::write_pdf(&dir.path().join("doc1.pdf"), &["Alpha page", "Beta page"]);
    common::write_pdf(&dir.path().join("doc2.pdf"), &["Gamma page"]);

    let loader = PdfLoader::new(dir.path(), ["doc1.pdf", "doc2.pdf"]);
    let pages = loader.load().unwrap();

    let provenance: Vec<_> = pages.iter().map(|p| (p.source.as_str(), p.page_number)).collect();
    assert_eq!(provenance, vec![("doc1.pdf", 1), ("doc1.pdf", 2), ("doc2.pdf", 1)]);
    assert!(pages[0].text.contains("Alpha"));
    assert!(pages[1].text.contains("Beta"));
    assert!(pages[2].text.contains("Gamma"));
}

#[test]
fn missing_candidates_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    common::write_pdf(&dir.path().join("doc2.pdf"), &["Only the second document exists"]);

    let loader = PdfLoader::new(dir.path(), ["doc1.pdf", "doc2.pdf", "doc3.pdf"]);
    let pages = loader.load().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].source, "doc2.pdf");

    let present: Vec<_> = loader.probe().into_iter().map(|c| c.exists).collect();
    assert_eq!(present, vec![false, true, false]);
}

#[test]
fn no_candidates_present_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let loader = PdfLoader::new(dir.path(), ["doc1.pdf", "doc2.pdf", "doc3.pdf"]);
    let err = loader.load().unwrap_err();
    assert!(matches!(err, RagError::NoDocumentsFound { .. }));
    assert_eq!(err.to_string(), "No PDF files found (looked for: doc1.pdf, doc2.pdf, doc3.pdf)");
}

#[test]
fn a_corrupt_file_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    common::write_pdf(&dir.path().join("doc1.pdf"), &["fine"]);
    std::fs::write(dir.path().join("doc2.pdf"), b"%PDF-1.5 truncated").unwrap();

    let loader = PdfLoader::new(dir.path(), ["doc1.pdf", "doc2.pdf"]);
    match loader.load() {
        Err(RagError::DocumentLoad { file, .. }) => assert_eq!(file, "doc2.pdf"),
        other => panic!("expected DocumentLoad, got {other:?}"),
    }
}
