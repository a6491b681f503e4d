pub mod types;
pub mod error;
pub mod score;
pub mod reconcile;
pub mod model;
pub mod prompt;
pub mod extract;
pub mod channel;
pub mod render;
pub mod planner;
pub mod storage;
pub mod summarizer;
pub mod pipeline;

pub use error::{BriefError, Result};
pub use types::*;
pub use score::{completion_score, is_qualifying, Criteria};
pub use reconcile::reconcile;
pub use model::{
    DisabledModel, GeminiClient, GeminiConfig, GenerationConfig, ModelError, TextModel,
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
};
#[cfg(any(test, feature = "testing"))]
pub use model::ScriptedModel;
pub use extract::{parse_extraction, ExtractionAdapter, ExtractionRequest};
pub use channel::{AcquisitionError, Channel, WebsiteFetcher, DEFAULT_USER_AGENT};
pub use planner::{missing_topics, MissingTopic, QuestionPlan, QuestionPlanner, QuestionSource};
pub use storage::{BriefingStore, MemoryStore, RedbStore, CURRENT_SCHEMA_VERSION};
pub use summarizer::ProjectSummarizer;
pub use pipeline::{BriefingPipeline, PipelineConfig, PipelineOutcome, ProjectLocks};
