use std::sync::Arc;

use crate::error::Result;
use crate::model::{GenerationConfig, TextModel};
use crate::prompt::project_summary_prompt;
use crate::types::{BriefingState, Project};

/// Writes a short prose summary of a project. Model failures are returned
/// as errors; there is no degrade path here.
pub struct ProjectSummarizer {
    model: Arc<dyn TextModel>,
    config: GenerationConfig,
}

impl ProjectSummarizer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            config: GenerationConfig::summary(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn summarize(&self, project: &Project, state: &BriefingState) -> Result<String> {
        let prompt = project_summary_prompt(project, state);
        let text = self.model.generate(&prompt, &self.config).await?;
        Ok(text.trim().to_string())
    }
}
