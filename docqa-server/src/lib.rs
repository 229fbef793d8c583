//! `docqa-server` serves a small web UI and JSON API over a [`docqa_rag::RagPipeline`].
//!
//! - `GET /` - the question page
//! - `GET /api/status` - knowledge base state (`building`, `ready` or `failed`)
//! - `POST /api/ask` - `{"question": "..."}` → answer plus cited sources

pub mod protocol;
pub mod server;

pub use server::{AppState, ServerConfig, app_router, run_server};
