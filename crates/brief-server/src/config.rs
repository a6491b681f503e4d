use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use brief_core::channel::{WebsiteFetcher, DEFAULT_USER_AGENT};
use brief_core::model::{
    DisabledModel, GeminiClient, GeminiConfig, GenerationConfig, TextModel, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL,
};
use brief_core::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Contents of `brief.toml`. Every section and key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: String,
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// "gemini" or "disabled".
    pub provider: String,
    pub model: String,
    /// Falls back to `GEMINI_API_KEY` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub extraction_timeout_secs: u64,
    pub question_timeout_secs: u64,
    pub summary_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            extraction_timeout_secs: 60,
            question_timeout_secs: 30,
            summary_timeout_secs: 30,
        }
    }
}

impl ModelConfig {
    /// Key from the file, else from `GEMINI_API_KEY`. Blank values count as unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub website_timeout_secs: u64,
    pub user_agent: String,
    /// Conversation turns loaded for each chat message.
    pub history_window: usize,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            website_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            history_window: 40,
        }
    }
}

impl BriefConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Human-readable problems; empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "[server] http_addr '{}' is not a valid socket address",
                self.server.http_addr
            ));
        }
        match self.model.provider.as_str() {
            "gemini" | "disabled" => {}
            other => errors.push(format!(
                "[model] provider '{}' is unknown (expected 'gemini' or 'disabled')",
                other
            )),
        }
        if self.model.model.trim().is_empty() {
            errors.push("[model] model must not be empty".to_string());
        }
        for (key, secs) in [
            ("extraction_timeout_secs", self.model.extraction_timeout_secs),
            ("question_timeout_secs", self.model.question_timeout_secs),
            ("summary_timeout_secs", self.model.summary_timeout_secs),
        ] {
            if secs == 0 {
                errors.push(format!("[model] {} must be greater than 0", key));
            }
        }
        if self.channels.website_timeout_secs == 0 {
            errors.push("[channels] website_timeout_secs must be greater than 0".to_string());
        }
        if self.channels.history_window == 0 {
            errors.push("[channels] history_window must be greater than 0".to_string());
        }
        errors
    }

    pub fn http_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .http_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid [server] http_addr '{}': {}", self.server.http_addr, e))
    }

    pub fn db_path(&self) -> PathBuf {
        self.server.data_dir.join("brief.redb")
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            extraction: GenerationConfig::extraction()
                .with_timeout(Duration::from_secs(self.model.extraction_timeout_secs)),
            questions: GenerationConfig::questions()
                .with_timeout(Duration::from_secs(self.model.question_timeout_secs)),
            summary: GenerationConfig::summary()
                .with_timeout(Duration::from_secs(self.model.summary_timeout_secs)),
            history_window: self.channels.history_window,
        }
    }

    /// The configured model client. Without a usable key the server still
    /// runs; every extraction degrades and questions come from the fallback bank.
    pub fn text_model(&self) -> Arc<dyn TextModel> {
        if self.model.provider == "disabled" {
            return Arc::new(DisabledModel::new("model provider disabled in config"));
        }
        let Some(key) = self.model.resolved_api_key() else {
            warn!("No Gemini API key configured (set GEMINI_API_KEY); model calls are disabled");
            return Arc::new(DisabledModel::new("no API key configured"));
        };
        let gemini = GeminiConfig::new(key)
            .with_model(self.model.model.clone())
            .with_base_url(self.model.base_url.clone());
        match GeminiClient::new(gemini) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!("Gemini client unavailable: {}", e);
                Arc::new(DisabledModel::new(e.to_string()))
            }
        }
    }

    pub fn website_fetcher(&self) -> anyhow::Result<WebsiteFetcher> {
        Ok(WebsiteFetcher::new(
            Duration::from_secs(self.channels.website_timeout_secs),
            &self.channels.user_agent,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = BriefConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.db_path(), PathBuf::from("./data/brief.redb"));
        assert_eq!(config.http_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhttp_addr = \"127.0.0.1:9000\"\n\n[channels]\nwebsite_timeout_secs = 5"
        )
        .unwrap();

        let config = BriefConfig::load(file.path()).unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert_eq!(config.server.data_dir, PathBuf::from("./data"));
        assert_eq!(config.channels.website_timeout_secs, 5);
        assert_eq!(config.channels.history_window, 40);
        assert_eq!(config.model.provider, "gemini");
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let mut config = BriefConfig::default();
        config.server.http_addr = "not-an-addr".into();
        config.model.provider = "openai".into();
        config.channels.website_timeout_secs = 0;

        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("http_addr"));
        assert!(errors[1].contains("openai"));
        assert!(errors[2].contains("website_timeout_secs"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = BriefConfig::load_or_default(Path::new("/nonexistent/brief.toml"));
        assert_eq!(config.channels.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_disabled_provider_builds_disabled_model() {
        let mut config = BriefConfig::default();
        config.model.provider = "disabled".into();
        assert_eq!(config.text_model().name(), "disabled");
    }

    #[test]
    fn test_pipeline_config_applies_timeouts() {
        let mut config = BriefConfig::default();
        config.model.extraction_timeout_secs = 5;
        config.channels.history_window = 12;

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.extraction.timeout, Duration::from_secs(5));
        assert_eq!(pipeline.extraction.temperature, 0.2);
        assert_eq!(pipeline.history_window, 12);
    }
}
