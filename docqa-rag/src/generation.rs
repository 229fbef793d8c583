//! Answer generation: the provider trait, the grounding prompt, and the
//! [`AnswerGenerator`] that ties them to retrieved chunks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::{Answer, SearchResult};
use crate::error::{RagError, Result};

/// A hosted generative model that turns a prompt into text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Run the prompt and return the model's text output.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// The model identifier, for logs and diagnostics.
    fn name(&self) -> &str;
}

const DEFAULT_INSTRUCTION: &str = "Answer the question using only the context below, \
taken from the loaded documents. If the context does not contain the answer, say that \
you don't know instead of making one up. Answer accurately and concisely.";

/// Builds the grounding prompt sent to the generation model.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    instruction: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { instruction: DEFAULT_INSTRUCTION.to_string() }
    }
}

impl PromptTemplate {
    /// Replace the grounding instruction placed before the context.
    pub fn with_instruction(instruction: impl Into<String>) -> Self {
        Self { instruction: instruction.into() }
    }

    /// Render the prompt: instruction, labeled context, then the literal question.
    pub fn render(&self, question: &str, results: &[SearchResult]) -> String {
        let context =
            results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
        format!("{}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:", self.instruction)
    }
}

/// Produces an [`Answer`] from a question and its retrieved chunks.
#[derive(Clone)]
pub struct AnswerGenerator {
    provider: Arc<dyn GenerationProvider>,
    template: PromptTemplate,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider, template: PromptTemplate::default() }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    /// Generate an answer grounded on `results`.
    ///
    /// The model output is returned verbatim; the results are passed through
    /// unchanged as the answer's supporting chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationService`] if the provider fails or
    /// returns an empty answer. There is no retry and no partial answer.
    pub async fn answer(&self, question: &str, results: Vec<SearchResult>) -> Result<Answer> {
        let prompt = self.template.render(question, &results);
        debug!(model = self.provider.name(), prompt_len = prompt.len(), "prompt built");

        let text = self.provider.generate(&prompt).await.map_err(|e| {
            error!(model = self.provider.name(), error = %e, "generation failed");
            match e {
                RagError::GenerationService { .. } => e,
                other => RagError::GenerationService {
                    provider: self.provider.name().to_string(),
                    message: other.to_string(),
                },
            }
        })?;

        if text.trim().is_empty() {
            return Err(RagError::GenerationService {
                provider: self.provider.name().to_string(),
                message: "model returned an empty answer".to_string(),
            });
        }

        Ok(Answer { question: question.to_string(), text, supporting_chunks: results })
    }
}
