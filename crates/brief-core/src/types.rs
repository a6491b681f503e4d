use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::render;
use crate::score::completion_score;

/// Type alias for project identifiers
pub type ProjectId = Uuid;

/// Type alias for conversation turn identifiers
pub type TurnId = Uuid;

/// Name of the stage synthesised when a state has content but no funnel.
pub const DEFAULT_STAGE_NAME: &str = "Primary contact";

/// Description of the synthesised default stage.
pub const DEFAULT_STAGE_DESCRIPTION: &str = "First interaction between the client and the offering";

/// The persistent, progressively filled profile of one project.
///
/// `completion_percentage` and `stage_summary` are derived fields. They are
/// recomputed by [`BriefingState::refresh`] after every mutation and are never
/// read back as a source of truth.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BriefingState {
    /// Unique value proposition.
    /// Example: "Custom CRM rollouts in two weeks, or your money back."
    #[serde(default)]
    pub utp: Option<String>,

    /// What is being sold, which problems it solves, key benefits.
    #[serde(default, alias = "productDescription")]
    pub product_description: Option<String>,

    /// Ordered sales-funnel stages, unique by name.
    #[serde(default, alias = "funnelElements")]
    pub funnel_elements: Vec<FunnelElement>,

    /// Always equal to `completion_score(self)` once refreshed.
    #[serde(default, alias = "completionPercentage")]
    pub completion_percentage: u8,

    /// Human-readable digest, regenerated on every update.
    #[serde(default, alias = "stageSummary")]
    pub stage_summary: Option<String>,
}

impl BriefingState {
    /// Re-derive the score and the cached summary from the content fields.
    pub fn refresh(&mut self) {
        self.completion_percentage = completion_score(self);
        self.stage_summary = Some(render::stage_summary(self));
    }

    /// Consume and return a refreshed copy.
    pub fn refreshed(mut self) -> Self {
        self.refresh();
        self
    }

    /// Boundary validation for states supplied from outside the pipeline
    /// (full overwrite, partial patch). Blank-named stages are dropped,
    /// duplicate names are folded into the first occurrence, and the derived
    /// fields are recomputed.
    pub fn normalized(self) -> Self {
        let mut elements: Vec<FunnelElement> = Vec::with_capacity(self.funnel_elements.len());
        for element in self.funnel_elements {
            if element.name.trim().is_empty() {
                continue;
            }
            match elements.iter_mut().find(|e| e.name == element.name) {
                Some(existing) => existing.absorb(&element.description),
                None => elements.push(element),
            }
        }
        Self {
            utp: self.utp,
            product_description: self.product_description,
            funnel_elements: elements,
            completion_percentage: 0,
            stage_summary: None,
        }
        .refreshed()
    }

    /// True if either scalar field carries non-blank text.
    pub fn has_scalar_content(&self) -> bool {
        is_filled(self.utp.as_deref()) || is_filled(self.product_description.as_deref())
    }

    /// True if nothing at all has been collected yet.
    pub fn is_empty(&self) -> bool {
        !self.has_scalar_content() && self.funnel_elements.is_empty()
    }

    pub fn element(&self, name: &str) -> Option<&FunnelElement> {
        self.funnel_elements.iter().find(|e| e.name == name)
    }
}

/// One sales-funnel stage. `name` is the merge key (exact, case-sensitive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunnelElement {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl FunnelElement {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// The stage synthesised for states that have content but no funnel.
    pub fn default_stage() -> Self {
        Self::new(DEFAULT_STAGE_NAME, DEFAULT_STAGE_DESCRIPTION)
    }

    /// Fold an incoming description into this one.
    ///
    /// Blank input is ignored and identical text is not repeated. Otherwise
    /// the texts are concatenated with a single space, so detail accumulates
    /// across turns. There is no deduplication of partial overlaps and no
    /// length cap.
    pub fn absorb(&mut self, incoming: &str) {
        if incoming.trim().is_empty() || incoming == self.description {
            return;
        }
        if self.description.trim().is_empty() {
            self.description = incoming.to_string();
        } else {
            self.description = format!("{} {}", self.description, incoming);
        }
    }
}

/// Why an extraction fell back to its degrade path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFailure {
    /// No model client could be obtained.
    ModelUnavailable,
    /// The model call timed out.
    ModelTimeout,
    /// Transport or API-level failure talking to the model.
    Transport,
    /// The reply contained no parseable JSON object.
    MalformedOutput,
}

impl ExtractionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionFailure::ModelUnavailable => "model_unavailable",
            ExtractionFailure::ModelTimeout => "model_timeout",
            ExtractionFailure::Transport => "transport",
            ExtractionFailure::MalformedOutput => "malformed_output",
        }
    }
}

/// One model call's structured, possibly degraded output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionResult {
    pub utp: Option<String>,
    pub product_description: Option<String>,
    pub funnel_elements: Option<Vec<FunnelElement>>,
    /// true = the model produced valid structured output.
    pub succeeded: bool,
    /// Set exactly when `succeeded` is false.
    #[serde(default)]
    pub failure: Option<ExtractionFailure>,
}

impl ExtractionResult {
    pub fn degraded(
        failure: ExtractionFailure,
        utp: Option<String>,
        product_description: Option<String>,
        funnel_elements: Option<Vec<FunnelElement>>,
    ) -> Self {
        Self {
            utp,
            product_description,
            funnel_elements,
            succeeded: false,
            failure: Some(failure),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of the conversation window. Read-only for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation turn as persisted, with identity and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredTurn {
    pub id: TurnId,
    pub project_id: ProjectId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredTurn {
    pub fn new(project_id: ProjectId, turn: ConversationTurn) -> Self {
        Self {
            id: Uuid::now_v7(),
            project_id,
            role: turn.role,
            content: turn.content,
            created_at: Utc::now(),
        }
    }

    pub fn as_turn(&self) -> ConversationTurn {
        ConversationTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A project owns exactly one briefing and one conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// UUIDv7 for time-sortability.
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a briefing: only the supplied top-level keys are
/// overwritten. Derived fields are never accepted from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BriefingPatch {
    #[serde(default)]
    pub utp: Option<String>,
    #[serde(default, alias = "productDescription")]
    pub product_description: Option<String>,
    #[serde(default, alias = "funnelElements")]
    pub funnel_elements: Option<Vec<FunnelElement>>,
}

impl BriefingPatch {
    pub fn apply(self, mut state: BriefingState) -> BriefingState {
        if let Some(utp) = self.utp {
            state.utp = Some(utp);
        }
        if let Some(desc) = self.product_description {
            state.product_description = Some(desc);
        }
        if let Some(elements) = self.funnel_elements {
            state.funnel_elements = elements;
        }
        state.normalized()
    }
}

/// Non-blank check shared by the merge, the scorer and the planner.
pub(crate) fn is_filled(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Length in Unicode scalar values after trimming.
pub(crate) fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_concatenates_distinct_text() {
        let mut e = FunnelElement::new("Intro", "d1");
        e.absorb("d2");
        assert_eq!(e.description, "d1 d2");
    }

    #[test]
    fn test_absorb_ignores_blank_and_identical() {
        let mut e = FunnelElement::new("Intro", "d1");
        e.absorb("   ");
        e.absorb("d1");
        assert_eq!(e.description, "d1");
    }

    #[test]
    fn test_absorb_into_blank_takes_incoming() {
        let mut e = FunnelElement::new("Intro", "");
        e.absorb("webinar");
        assert_eq!(e.description, "webinar");
    }

    #[test]
    fn test_normalized_folds_duplicates_and_drops_blank_names() {
        let state = BriefingState {
            utp: Some("Fast onboarding for clinics".into()),
            funnel_elements: vec![
                FunnelElement::new("Lead", "ad"),
                FunnelElement::new(" ", "ghost"),
                FunnelElement::new("Lead", "landing page"),
            ],
            completion_percentage: 99,
            ..Default::default()
        }
        .normalized();

        assert_eq!(state.funnel_elements, vec![FunnelElement::new("Lead", "ad landing page")]);
        assert_eq!(state.completion_percentage, completion_score(&state));
        assert!(state.stage_summary.is_some());
    }

    #[test]
    fn test_json_shape_uses_snake_case_and_nulls() {
        let json = serde_json::to_value(BriefingState::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "utp": null,
                "product_description": null,
                "funnel_elements": [],
                "completion_percentage": 0,
                "stage_summary": null,
            })
        );
    }

    #[test]
    fn test_deserialize_accepts_camel_case_aliases() {
        let state: BriefingState = serde_json::from_value(serde_json::json!({
            "productDescription": "Online bookkeeping",
            "funnelElements": [{"name": "Trial"}],
        }))
        .unwrap();
        assert_eq!(state.product_description.as_deref(), Some("Online bookkeeping"));
        assert_eq!(state.funnel_elements[0].description, "");
    }

    #[test]
    fn test_patch_overwrites_only_supplied_keys() {
        let state = BriefingState {
            utp: Some("Old".into()),
            product_description: Some("Kept".into()),
            ..Default::default()
        };
        let patched = BriefingPatch {
            utp: Some("New".into()),
            ..Default::default()
        }
        .apply(state);
        assert_eq!(patched.utp.as_deref(), Some("New"));
        assert_eq!(patched.product_description.as_deref(), Some("Kept"));
    }
}
