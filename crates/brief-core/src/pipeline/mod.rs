//! End-to-end processing of one inbound message, document or link.
//!
//! Every run follows the same sequence: record the user turn, acquire text,
//! then under the project lock load, extract, reconcile, refresh and save.
//! Questions are planned and the reply composed after the lock is released.

mod locks;


pub use locks::ProjectLocks;

use std::sync::Arc;

use serde::Serialize;

use crate::channel::{declared_media_type, decode_document, AcquisitionError, Channel, WebsiteFetcher};
use crate::error::{BriefError, Result};
use crate::extract::{ExtractionAdapter, ExtractionRequest};
use crate::model::{GenerationConfig, TextModel};
use crate::planner::{QuestionPlanner, QuestionSource};
use crate::reconcile::reconcile;
use crate::render;
use crate::storage::BriefingStore;
use crate::summarizer::ProjectSummarizer;
use crate::types::{
    BriefingPatch, BriefingState, ConversationTurn, ExtractionFailure, Project, ProjectId, StoredTurn,
};

/// Tunables for a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub extraction: GenerationConfig,
    pub questions: GenerationConfig,
    pub summary: GenerationConfig,
    /// Turns loaded for chat runs. Extraction sees the last eight of these;
    /// the planner scans all of them for questions already asked.
    pub history_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extraction: GenerationConfig::extraction(),
            questions: GenerationConfig::questions(),
            summary: GenerationConfig::summary(),
            history_window: 40,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub channel: Channel,
    /// The briefing after this run (unchanged when acquisition failed).
    pub state: BriefingState,
    pub questions: Vec<String>,
    /// Assistant reply, also recorded in the conversation.
    pub reply: String,
    pub extraction_succeeded: bool,
    pub extraction_failure: Option<ExtractionFailure>,
    /// `None` when the run stopped at acquisition.
    pub question_source: Option<QuestionSource>,
    #[serde(skip)]
    pub acquisition_error: Option<AcquisitionError>,
}

impl PipelineOutcome {
    pub fn acquisition_failed(&self) -> bool {
        self.acquisition_error.is_some()
    }
}

pub struct BriefingPipeline<S: BriefingStore> {
    store: Arc<S>,
    extractor: ExtractionAdapter,
    planner: QuestionPlanner,
    summarizer: ProjectSummarizer,
    fetcher: WebsiteFetcher,
    locks: ProjectLocks,
    history_window: usize,
}

impl<S: BriefingStore> BriefingPipeline<S> {
    pub fn new(store: Arc<S>, model: Arc<dyn TextModel>, fetcher: WebsiteFetcher) -> Self {
        Self::with_config(store, model, fetcher, PipelineConfig::default())
    }

    pub fn with_config(
        store: Arc<S>,
        model: Arc<dyn TextModel>,
        fetcher: WebsiteFetcher,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            extractor: ExtractionAdapter::new(model.clone()).with_config(config.extraction),
            planner: QuestionPlanner::new(model.clone()).with_config(config.questions),
            summarizer: ProjectSummarizer::new(model).with_config(config.summary),
            fetcher,
            locks: ProjectLocks::new(),
            history_window: config.history_window,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn model_name(&self) -> &str {
        self.extractor.model_name()
    }

    // === Projects ===

    pub fn create_project(&self, name: &str, description: Option<String>) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BriefError::Validation("Project name must not be empty".into()));
        }
        let project = Project::new(name, description.filter(|d| !d.trim().is_empty()));
        self.store.create_project(&project)?;
        log::info!("created project {} ({})", project.id, project.name);
        Ok(project)
    }

    pub fn project(&self, id: ProjectId) -> Result<Project> {
        self.store.get_project(id)?.ok_or(BriefError::ProjectNotFound(id))
    }

    pub async fn delete_project(&self, id: ProjectId) -> Result<()> {
        {
            let _guard = self.locks.lock(id).await;
            self.store.delete_project(id)?;
        }
        self.locks.forget(id);
        log::info!("deleted project {}", id);
        Ok(())
    }

    pub fn briefing(&self, id: ProjectId) -> Result<BriefingState> {
        self.store.load(id)?.ok_or(BriefError::ProjectNotFound(id))
    }

    pub fn history(&self, id: ProjectId, limit: usize) -> Result<Vec<StoredTurn>> {
        self.project(id)?;
        self.store.recent_turns(id, limit)
    }

    // === Channels ===

    pub async fn chat(&self, project: ProjectId, message: &str) -> Result<PipelineOutcome> {
        self.project(project)?;
        let history: Vec<ConversationTurn> = self
            .store
            .recent_turns(project, self.history_window)?
            .iter()
            .map(StoredTurn::as_turn)
            .collect();

        self.record(project, ConversationTurn::user(message))?;

        let text = message.trim();
        if text.is_empty() {
            return self.acquisition_failure(project, Channel::Chat, AcquisitionError::EmptyMessage);
        }
        self.run(project, Channel::Chat, text, &history).await
    }

    /// Process an uploaded document (`data:` URL or bare base64).
    pub async fn document(&self, project: ProjectId, payload: &str) -> Result<PipelineOutcome> {
        self.project(project)?;
        let label = declared_media_type(payload).unwrap_or_else(|| "document".to_string());
        self.record(project, ConversationTurn::user(format!("Uploaded a file of type {}", label)))?;

        match decode_document(payload) {
            Ok(doc) => self.run(project, Channel::Document, &doc.text, &[]).await,
            Err(e) => self.acquisition_failure(project, Channel::Document, e),
        }
    }

    /// Fetch a web page and process its text.
    pub async fn website(&self, project: ProjectId, url: &str) -> Result<PipelineOutcome> {
        self.project(project)?;
        self.record(project, ConversationTurn::user(format!("Website link: {}", url.trim())))?;

        match self.fetcher.fetch(url).await {
            Ok(text) => self.run(project, Channel::Website, &text, &[]).await,
            Err(e) => self.acquisition_failure(project, Channel::Website, e),
        }
    }

    /// Replace the whole briefing. The state is validated and its derived
    /// fields recomputed before it is stored.
    pub async fn overwrite(&self, project: ProjectId, state: BriefingState) -> Result<BriefingState> {
        let state = state.normalized();
        let _guard = self.locks.lock(project).await;
        self.store.save(project, &state)?;
        Ok(state)
    }

    /// Overwrite only the supplied top-level keys.
    pub async fn patch(&self, project: ProjectId, patch: BriefingPatch) -> Result<BriefingState> {
        let _guard = self.locks.lock(project).await;
        self.store.patch(project, patch)
    }

    pub async fn summarize(&self, project: ProjectId) -> Result<String> {
        let meta = self.project(project)?;
        let state = self.briefing(project)?;
        self.summarizer.summarize(&meta, &state).await
    }

    // === Internals ===

    async fn run(
        &self,
        project: ProjectId,
        channel: Channel,
        text: &str,
        history: &[ConversationTurn],
    ) -> Result<PipelineOutcome> {
        let (state, extraction) = {
            let _guard = self.locks.lock(project).await;
            let current = self.briefing(project)?;

            let request = ExtractionRequest::new(channel, text)
                .with_prior(&current)
                .with_history(history);
            let extraction = self.extractor.extract(request).await;

            let merged = reconcile(&current, &extraction).refreshed();
            self.store.save(project, &merged).map_err(|e| match e {
                BriefError::ProjectNotFound(id) => BriefError::ProjectNotFound(id),
                other => BriefError::Persistence {
                    project,
                    reason: other.to_string(),
                },
            })?;
            (merged, extraction)
        };

        let plan = self.planner.plan(&state, history).await;

        let reply = if !extraction.succeeded {
            render::degraded_reply(channel, &plan.questions)
        } else if channel == Channel::Chat {
            render::chat_reply(&state, &plan.questions)
        } else {
            render::ingest_reply(channel, &state, &plan.questions)
        };
        self.record(project, ConversationTurn::assistant(reply.clone()))?;

        log::info!(
            "{} run for {}: score={} extraction_ok={} questions={}",
            channel,
            project,
            state.completion_percentage,
            extraction.succeeded,
            plan.source.as_str()
        );

        Ok(PipelineOutcome {
            channel,
            state,
            questions: plan.questions,
            reply,
            extraction_succeeded: extraction.succeeded,
            extraction_failure: extraction.failure,
            question_source: Some(plan.source),
            acquisition_error: None,
        })
    }

    fn acquisition_failure(
        &self,
        project: ProjectId,
        channel: Channel,
        error: AcquisitionError,
    ) -> Result<PipelineOutcome> {
        log::warn!("{} acquisition failed for {}: {}", channel, project, error);
        let state = self.briefing(project)?;
        let reply = render::acquisition_failure_reply(channel, &error);
        self.record(project, ConversationTurn::assistant(reply.clone()))?;

        Ok(PipelineOutcome {
            channel,
            state,
            questions: Vec::new(),
            reply,
            extraction_succeeded: false,
            extraction_failure: None,
            question_source: None,
            acquisition_error: Some(error),
        })
    }

    fn record(&self, project: ProjectId, turn: ConversationTurn) -> Result<()> {
        self.store.append_turn(&StoredTurn::new(project, turn))
    }
}
