//! Shared `reqwest` plumbing for the hosted providers.

use std::time::Duration;

use serde::Deserialize;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn build_client(timeout: Duration) -> std::result::Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

/// Turn a non-success response into a readable message, preferring the API's own error text.
///
/// OpenAI and Gemini both wrap errors as `{"error": {"message": ...}}`.
pub(crate) async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

pub(crate) fn request_failure(e: &reqwest::Error) -> String {
    if e.is_timeout() { format!("request timed out: {e}") } else { format!("request failed: {e}") }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}
