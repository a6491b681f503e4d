use super::{GenerationConfig, ModelError, TextModel};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed queue of replies. Once the queue is drained every call
/// returns `Unavailable`. Prompts and configs are recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<(String, GenerationConfig)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn fail(self, error: ModelError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, reply: Result<String, ModelError>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default()
    }

    pub fn configs(&self) -> Vec<GenerationConfig> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(_, cfg)| *cfg).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.to_string(), *config));
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(ModelError::Unavailable("script exhausted".into())))
    }
}
