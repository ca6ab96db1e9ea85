//! External question generation.

/// Gemini `generateContent` backend.
#[cfg(feature = "gemini-source")]
pub mod gemini;
/// Parsing of generated question lists.
pub mod response;

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::{GenerationBudget, SourceConfig},
    state::room::{Citation, PacingConfig, Question},
};

/// Convenient result alias returning [`SourceError`] failures.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures of a question source. Never papered over with placeholder content.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No backend is configured.
    #[error("question source unavailable: {0}")]
    Unavailable(String),
    /// The request could not be sent or timed out.
    #[error("question source request failed: {0}")]
    Request(String),
    /// The backend answered with a non-success status.
    #[error("question source returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// The response did not contain a usable question array.
    #[error("malformed question source response: {0}")]
    Malformed(String),
    /// The response parsed but held no usable question.
    #[error("question source returned no usable questions")]
    Empty,
    /// A bounded generation gave up.
    #[error("generation gave up after {attempts} attempts")]
    BudgetExhausted {
        /// Attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last: Box<SourceError>,
    },
}

/// What to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Subject of the questions.
    pub topic: String,
    /// Number of questions wanted.
    pub count: usize,
    /// Difficulty, 1 to 10.
    pub difficulty: u8,
    /// Optional genre hint; empty for none.
    pub genre: String,
    /// Ground generation on web search.
    pub grounding: bool,
}

impl GenerationRequest {
    /// Request `count` questions following a room configuration.
    pub fn from_config(config: &PacingConfig, count: usize) -> Self {
        Self {
            topic: config.topic.clone(),
            count,
            difficulty: config.difficulty,
            genre: config.genre.clone(),
            grounding: config.grounding,
        }
    }
}

/// Question produced by a source, answer already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    /// Question text.
    pub text: String,
    /// Normalized canonical answer.
    pub answer: String,
    /// Grounding citations.
    pub sources: Vec<Citation>,
}

impl GeneratedQuestion {
    /// Assign an identifier and turn into a pool entry.
    pub fn into_question(self) -> Question {
        Question {
            id: Uuid::new_v4().to_string(),
            text: self.text,
            answer: self.answer,
            sources: self.sources,
        }
    }
}

/// Abstraction over the content generator feeding room pools.
pub trait QuestionSource: Send + Sync {
    /// Single generation attempt.
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, SourceResult<Vec<GeneratedQuestion>>>;

    /// Whether the source can succeed at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Source installed when no backend is configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredSource;

impl QuestionSource for UnconfiguredSource {
    fn generate(
        &self,
        _request: GenerationRequest,
    ) -> BoxFuture<'static, SourceResult<Vec<GeneratedQuestion>>> {
        Box::pin(async { Err(SourceError::Unavailable("no API key configured".into())) })
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Pick the source matching the configuration.
pub fn from_config(config: &SourceConfig) -> Arc<dyn QuestionSource> {
    #[cfg(feature = "gemini-source")]
    {
        if let Some(api_key) = config.api_key.clone() {
            match gemini::GeminiSource::new(&config.endpoint, &config.model, api_key) {
                Ok(source) => {
                    info!(model = %config.model, "using Gemini question source");
                    return Arc::new(source);
                }
                Err(err) => warn!(error = %err, "failed to build Gemini client"),
            }
        }
    }
    #[cfg(not(feature = "gemini-source"))]
    let _ = config;

    warn!("question source not configured; generation disabled (degraded mode)");
    Arc::new(UnconfiguredSource)
}

/// Call `source` until it yields questions or the budget runs out.
///
/// Used where a caller waits on the outcome; the background refill loop retries on its own.
pub async fn generate_with_budget(
    source: &dyn QuestionSource,
    request: GenerationRequest,
    budget: &GenerationBudget,
) -> SourceResult<Vec<GeneratedQuestion>> {
    if !source.is_available() {
        return Err(SourceError::Unavailable("no API key configured".into()));
    }

    let started = Instant::now();
    let mut attempt = 0;
    let mut last = SourceError::Empty;

    while attempt < budget.max_attempts && started.elapsed() < budget.total {
        attempt += 1;
        match source.generate(request.clone()).await {
            Ok(questions) if !questions.is_empty() => return Ok(questions),
            Ok(_) => last = SourceError::Empty,
            Err(err) => last = err,
        }
        if attempt >= budget.max_attempts {
            break;
        }
        let delay = budget.backoff.delay(attempt);
        warn!(attempt, error = %last, delay_ms = delay.as_millis() as u64, "generation attempt failed");
        sleep(delay).await;
    }

    Err(SourceError::BudgetExhausted {
        attempts: attempt,
        last: Box::new(last),
    })
}
