//! Gemini generation provider over the Generative Language REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::http::{DEFAULT_TIMEOUT, build_client, error_detail, request_failure};

/// The default Generative Language API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A [`GenerationProvider`] backed by Gemini `generateContent`.
///
/// The API key is sent in the `x-goog-api-key` header. The text parts of the
/// first candidate are concatenated and returned verbatim.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiProvider;
///
/// let provider = GeminiProvider::from_env("gemini-2.5-flash")?;
/// let text = provider.generate("Say hello").await?;
/// ```
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiProvider {
    /// Create a provider for `model` with the given API key.
    ///
    /// An empty key is rejected here, so no request is ever sent without one.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Self::service_error("GOOGLE_API_KEY is not set"));
        }
        let client = build_client(DEFAULT_TIMEOUT).map_err(Self::service_error)?;
        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            model: model.into(),
            temperature: 0.0,
        })
    }

    /// Create a provider using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Self::service_error("GOOGLE_API_KEY environment variable not set"))?;
        Self::new(api_key, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Point the provider at a different endpoint (a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout).map_err(Self::service_error)?;
        Ok(self)
    }

    fn service_error(message: impl Into<String>) -> RagError {
        RagError::GenerationService { provider: "Gemini".into(), message: message.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Gemini", model = %self.model, prompt_len = prompt.len(), "generating");

        let body = GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "generateContent request failed");
                Self::service_error(request_failure(&e))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "Gemini", %message, "generateContent API error");
            return Err(Self::service_error(message));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "failed to parse generateContent response");
            Self::service_error(format!("failed to parse response: {e}"))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Self::service_error("response contained no candidate text"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
