use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use docqa_rag::{PdfLoader, RagError, RagPipeline};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::protocol::{AskRequest, AskResponse, ErrorResponse, StatusResponse};

/// Shared handle to the pipeline; the knowledge base inside is built once.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/ask", post(ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the UI, building the knowledge base in the background.
///
/// The listener comes up immediately; until the build finishes `/api/status`
/// reports `building`, and a failed build is reported there instead of
/// taking the server down.
pub async fn run_server(config: ServerConfig, pipeline: Arc<RagPipeline>) -> anyhow::Result<()> {
    let warm = pipeline.clone();
    tokio::spawn(async move {
        match warm.knowledge_base().await {
            Ok(kb) => info!(chunk_count = kb.chunk_count(), "knowledge base ready for questions"),
            Err(e) => error!(error = %e, "knowledge base unavailable; questions will be refused"),
        }
    });

    let app = app_router(AppState::new(pipeline));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docqa server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docqa listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"docqa"}))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let pipeline = &state.pipeline;
    let config = pipeline.config();
    let candidates = PdfLoader::from_config(config).probe();
    Json(
        StatusResponse::new(
            pipeline.readiness(),
            pipeline.embedding_provider().name(),
            pipeline.generator().provider().name(),
        )
        .with_environment(&candidates, &config.credential_status()),
    )
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn status_for(error: &RagError) -> StatusCode {
    match error {
        RagError::EmbeddingService { .. } | RagError::GenerationService { .. } => {
            StatusCode::BAD_GATEWAY
        }
        RagError::NoDocumentsFound { .. }
        | RagError::DocumentLoad { .. }
        | RagError::ModelLoad { .. }
        | RagError::EmptyIndex => StatusCode::SERVICE_UNAVAILABLE,
        RagError::Config(_) | RagError::VectorIndex(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "question must not be empty"));
    }

    match state.pipeline.readiness() {
        None => {
            return Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "the knowledge base is still being built; try again shortly",
            ));
        }
        Some(Err(e)) => return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
        Some(Ok(_)) => {}
    }

    let answer = state.pipeline.ask(question).await.map_err(|e| {
        warn!(error = %e, "question failed");
        api_error(status_for(&e), e.to_string())
    })?;

    let snippet_chars = state.pipeline.config().snippet_chars;
    Ok(Json(AskResponse::from_answer(answer, snippet_chars)))
}
