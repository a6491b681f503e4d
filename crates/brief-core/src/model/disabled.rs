use super::{GenerationConfig, ModelError, TextModel};
use async_trait::async_trait;

/// Stand-in used when no API key is configured. Every call is `Unavailable`,
/// so extraction degrades and the planner falls back to its static bank.
#[derive(Debug, Clone, Default)]
pub struct DisabledModel {
    reason: String,
}

impl DisabledModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextModel for DisabledModel {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, ModelError> {
        Err(ModelError::Unavailable(self.reason.clone()))
    }
}
