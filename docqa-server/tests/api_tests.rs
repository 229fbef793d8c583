//! Router tests for the web API, driven through `tower::ServiceExt::oneshot`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use docqa_rag::{
    DocumentLoader, DocumentPage, EmbeddingProvider, GenerationProvider, RagConfig, RagError,
    RagPipeline,
};
use docqa_server::{AppState, app_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Pages(Vec<DocumentPage>);

impl DocumentLoader for Pages {
    fn load(&self) -> docqa_rag::Result<Vec<DocumentPage>> {
        Ok(self.0.clone())
    }
}

struct Missing;

impl DocumentLoader for Missing {
    fn load(&self) -> docqa_rag::Result<Vec<DocumentPage>> {
        Err(RagError::NoDocumentsFound { candidates: vec!["doc1.pdf".into()] })
    }
}

/// Word counts hashed into a small vector; enough to rank these fixtures.
struct WordEmbedder;

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; 64];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(usize::from(b)));
            vector[hash % 64] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        64
    }

    fn name(&self) -> &str {
        "stub:words"
    }
}

struct Reply(Option<&'static str>);

#[async_trait]
impl GenerationProvider for Reply {
    async fn generate(&self, _prompt: &str) -> docqa_rag::Result<String> {
        self.0.map(str::to_string).ok_or_else(|| RagError::GenerationService {
            provider: "stub".into(),
            message: "quota exhausted".into(),
        })
    }

    fn name(&self) -> &str {
        "stub-model"
    }
}

fn pipeline_in(
    dir: &Path,
    loader: Arc<dyn DocumentLoader>,
    reply: Option<&'static str>,
) -> Arc<RagPipeline> {
    let config = RagConfig::builder().snippet_chars(12).document_dir(dir).build().unwrap();
    Arc::new(
        RagPipeline::builder()
            .config(config)
            .loader(loader)
            .embedding_provider(Arc::new(WordEmbedder))
            .generation_provider(Arc::new(Reply(reply)))
            .build()
            .unwrap(),
    )
}

fn pipeline(loader: Arc<dyn DocumentLoader>, reply: Option<&'static str>) -> Arc<RagPipeline> {
    let dir = tempfile::tempdir().unwrap();
    pipeline_in(dir.path(), loader, reply)
}

fn loaded() -> Arc<dyn DocumentLoader> {
    Arc::new(Pages(vec![
        DocumentPage::new("doc1.pdf", 1, "Capital buffers absorb losses during periods of stress."),
        DocumentPage::new("doc3.pdf", 2, "Leverage ratios limit the build up of excessive leverage."),
    ]))
}

async fn send(pipeline: &Arc<RagPipeline>, request: Request<Body>) -> (StatusCode, Value) {
    let app = app_router(AppState::new(pipeline.clone()));
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn ask(question: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/ask")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "question": question }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn index_serves_the_question_page() {
    let app = app_router(AppState::new(pipeline(loaded(), Some("ok"))));
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("Ask the documents"));
}

#[tokio::test]
async fn status_moves_from_building_to_ready() {
    let pipeline = pipeline(loaded(), Some("ok"));

    let (status, body) = send(&pipeline, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "building");

    pipeline.knowledge_base().await.unwrap();
    let (_, body) = send(&pipeline, get("/api/status")).await;
    assert_eq!(body["state"], "ready");
    assert_eq!(body["chunks"], 2);
    assert_eq!(body["documents"], json!([{"name": "doc1.pdf", "pages": 1}, {"name": "doc3.pdf", "pages": 1}]));
    assert_eq!(body["embedder"], "stub:words");
    assert_eq!(body["generator"], "stub-model");
}

#[tokio::test]
async fn status_reports_documents_on_disk_and_credentials() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doc1.pdf"), b"%PDF-1.5").unwrap();
    std::fs::write(dir.path().join("doc3.pdf"), b"%PDF-1.5").unwrap();
    let pipeline = pipeline_in(dir.path(), loaded(), Some("ok"));

    let (_, body) = send(&pipeline, get("/api/status")).await;
    assert_eq!(body["documents_found"], 2);
    assert_eq!(body["documents_expected"], 3);
    let credentials = body["credentials"].as_array().unwrap();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0]["name"], "OPENAI_API_KEY");
    assert!(credentials[0]["set"].is_boolean());
}

#[tokio::test]
async fn questions_are_refused_until_the_build_finishes() {
    let pipeline = pipeline(loaded(), Some("ok"));
    let (status, body) = send(&pipeline, ask("What do capital buffers do?")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("still being built"));
}

#[tokio::test]
async fn answer_comes_with_truncated_sources() {
    let pipeline = pipeline(loaded(), Some("They absorb losses."));
    pipeline.knowledge_base().await.unwrap();

    let (status, body) = send(&pipeline, ask("  What do capital buffers do?  ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "What do capital buffers do?");
    assert_eq!(body["answer"], "They absorb losses.");

    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["source"], "doc1.pdf");
    assert_eq!(sources[0]["page"], 1);
    assert_eq!(sources[0]["snippet"], "Capital buff...");
}

#[tokio::test]
async fn blank_question_is_a_bad_request() {
    let pipeline = pipeline(loaded(), Some("ok"));
    pipeline.knowledge_base().await.unwrap();
    let (status, _) = send(&pipeline, ask("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generation_failure_is_a_bad_gateway_and_not_fatal() {
    let pipeline = pipeline(loaded(), None);
    pipeline.knowledge_base().await.unwrap();

    let (status, body) = send(&pipeline, ask("What limits leverage?")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("quota exhausted"));

    let (_, body) = send(&pipeline, get("/api/status")).await;
    assert_eq!(body["state"], "ready");
}

#[tokio::test]
async fn missing_documents_are_reported_and_block_questions() {
    let pipeline = pipeline(Arc::new(Missing), Some("ok"));
    assert!(pipeline.knowledge_base().await.is_err());

    let (_, body) = send(&pipeline, get("/api/status")).await;
    assert_eq!(body["state"], "failed");
    assert!(body["error"].as_str().unwrap().starts_with("No PDF files found"));

    let (status, _) = send(&pipeline, ask("Anything?")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
