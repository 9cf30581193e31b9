/// LLM Client - the single point of entry for all generative text calls in Accord.
///
/// ARCHITECTURAL RULE: No other module may talk to the provider directly.
/// Workflow code goes through `LlmClient::call`, which owns the retry budget.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub mod gemini;
pub mod prompts;
#[cfg(test)]
pub mod stub;

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    #[error("API call blocked. Reason: {0}")]
    Blocked(String),

    #[error("API returned an empty response after {attempts} attempts")]
    EmptyResponse { attempts: u32 },

    #[error("An error occurred during the API call: {0}")]
    CallFailed(String),
}

/// Terminal outcome of one provider round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Text(String),
    /// The provider refused the prompt on content-safety grounds.
    Blocked(String),
    /// No content and no block signal.
    Empty,
}

/// The provider boundary: "generate content for prompt".
///
/// Transport or provider exceptions are reported as `LlmError::CallFailed`.
/// Carried as `Arc<dyn TextGenerator>` so tests can swap in a scripted stub.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, LlmError>;
}

/// The single LLM client used by the workflow.
/// Wraps a provider with the empty-response retry budget.
#[derive(Clone)]
pub struct LlmClient {
    generator: Arc<dyn TextGenerator>,
    empty_retries: u32,
}

impl LlmClient {
    pub fn new(generator: Arc<dyn TextGenerator>, empty_retries: u32) -> Self {
        Self {
            generator,
            empty_retries,
        }
    }

    /// Submits a prompt with the configured retry budget.
    pub async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        self.submit(prompt, self.empty_retries).await
    }

    /// Submits a prompt, retrying the identical prompt up to `retries` times
    /// while the provider answers with no content.
    ///
    /// Blocks and call failures are returned immediately and never retried.
    pub async fn submit(&self, prompt: &str, retries: u32) -> Result<String, LlmError> {
        let max_attempts = retries + 1;

        for attempt in 1..=max_attempts {
            match self.generator.generate(prompt).await? {
                Generation::Text(text) => {
                    debug!(attempt, chars = text.len(), "LLM call succeeded");
                    return Ok(text);
                }
                Generation::Blocked(reason) => {
                    warn!("LLM call blocked: {reason}");
                    return Err(LlmError::Blocked(reason));
                }
                Generation::Empty if attempt < max_attempts => {
                    warn!(
                        "LLM returned an empty response (attempt {attempt}/{max_attempts}), retrying..."
                    );
                }
                Generation::Empty => {}
            }
        }

        Err(LlmError::EmptyResponse {
            attempts: max_attempts,
        })
    }
}
