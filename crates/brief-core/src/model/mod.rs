mod disabled;
mod gemini;
#[cfg(any(test, feature = "testing"))]
mod scripted;

pub use disabled::DisabledModel;
pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedModel;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::ExtractionFailure;

/// Per-call generation budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl GenerationConfig {
    /// Low temperature for stable JSON.
    pub fn extraction() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }

    /// Higher temperature for varied question phrasing.
    pub fn questions() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn summary() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no text")]
    EmptyResponse,
}

impl ModelError {
    /// How an extraction that hit this error is classified on its degrade path.
    pub fn as_failure(&self) -> ExtractionFailure {
        match self {
            ModelError::Unavailable(_) => ExtractionFailure::ModelUnavailable,
            ModelError::Timeout(_) => ExtractionFailure::ModelTimeout,
            ModelError::Transport(_) | ModelError::Api { .. } => ExtractionFailure::Transport,
            ModelError::EmptyResponse => ExtractionFailure::MalformedOutput,
        }
    }
}

/// A generative text model. Implementations must honour `config.timeout`.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier (used in logs and metrics labels).
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError>;
}
