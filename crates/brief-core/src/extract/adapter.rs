use std::borrow::Cow;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::json::first_json_object;
use crate::channel::{condense_for_extraction, Channel};
use crate::model::{GenerationConfig, TextModel};
use crate::prompt::{extraction_prompt, recent, EXTRACTION_HISTORY_TURNS};
use crate::render::ellipsize;
use crate::types::{BriefingState, ConversationTurn, ExtractionFailure, ExtractionResult, FunnelElement};

/// Characters of the source text used as a synthetic UTP on the degrade path.
pub const SYNTHETIC_UTP_CHARS: usize = 100;

/// Product description written when nothing could be extracted.
pub const PLACEHOLDER_DESCRIPTION: &str = "Additional information required";

/// Input of one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub channel: Channel,
    pub text: &'a str,
    pub prior: Option<&'a BriefingState>,
    pub history: &'a [ConversationTurn],
}

impl<'a> ExtractionRequest<'a> {
    pub fn new(channel: Channel, text: &'a str) -> Self {
        Self {
            channel,
            text,
            prior: None,
            history: &[],
        }
    }

    pub fn with_prior(mut self, prior: &'a BriefingState) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_history(mut self, history: &'a [ConversationTurn]) -> Self {
        self.history = history;
        self
    }

    /// Prior state worth showing to the model or carrying forward.
    fn effective_prior(&self) -> Option<&'a BriefingState> {
        self.prior.filter(|s| !s.is_empty())
    }
}

/// Calls the model with a channel prompt and turns its reply into an
/// [`ExtractionResult`]. Never fails: every model or parse failure takes the
/// degrade path and is reported through `succeeded`/`failure`.
pub struct ExtractionAdapter {
    model: Arc<dyn TextModel>,
    config: GenerationConfig,
}

impl ExtractionAdapter {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            config: GenerationConfig::extraction(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn extract(&self, request: ExtractionRequest<'_>) -> ExtractionResult {
        let text = match request.channel {
            Channel::Document => condense_for_extraction(request.text),
            _ => Cow::Borrowed(request.text),
        };
        let history: &[ConversationTurn] = if request.channel.uses_history() {
            recent(request.history, EXTRACTION_HISTORY_TURNS)
        } else {
            &[]
        };
        let prompt = extraction_prompt(request.channel, &text, request.effective_prior(), history);

        match self.model.generate(&prompt, &self.config).await {
            Ok(raw) => match parse_extraction(&raw) {
                Some(result) => {
                    log::debug!(
                        "extraction ok: channel={} model={} stages={}",
                        request.channel,
                        self.model.name(),
                        result.funnel_elements.as_ref().map(Vec::len).unwrap_or(0)
                    );
                    result
                }
                None => degrade(&request, ExtractionFailure::MalformedOutput),
            },
            Err(e) => {
                log::warn!("extraction model call failed: channel={} error={}", request.channel, e);
                degrade(&request, e.as_failure())
            }
        }
    }
}

#[derive(Deserialize)]
struct RawExtraction {
    #[serde(default, alias = "UTP")]
    utp: Option<String>,
    #[serde(default, alias = "productDescription")]
    product_description: Option<String>,
    #[serde(default, alias = "funnelElements")]
    funnel_elements: Option<Vec<RawElement>>,
}

#[derive(Deserialize)]
struct RawElement {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a model reply. `None` when no JSON object is present or its fields
/// have the wrong types.
pub fn parse_extraction(raw: &str) -> Option<ExtractionResult> {
    let object = first_json_object(raw)?;
    let parsed: RawExtraction = match serde_json::from_value(Value::Object(object)) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("extraction JSON has unexpected shape: {}", e);
            return None;
        }
    };

    let funnel_elements = parsed.funnel_elements.map(|elements| {
        elements
            .into_iter()
            .filter_map(|e| {
                let name = e.name?.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(FunnelElement::new(name, e.description.unwrap_or_default()))
            })
            .collect()
    });

    Some(ExtractionResult {
        utp: parsed.utp,
        product_description: parsed.product_description,
        funnel_elements,
        succeeded: true,
        failure: None,
    })
}

fn degrade(request: &ExtractionRequest<'_>, failure: ExtractionFailure) -> ExtractionResult {
    log::warn!(
        "extraction degraded: channel={} failure={} prior_state={}",
        request.channel,
        failure.as_str(),
        request.effective_prior().is_some()
    );

    match request.effective_prior() {
        Some(prior) => ExtractionResult::degraded(
            failure,
            prior.utp.clone(),
            prior.product_description.clone(),
            Some(prior.funnel_elements.clone()),
        ),
        None => ExtractionResult::degraded(
            failure,
            Some(ellipsize(request.text, SYNTHETIC_UTP_CHARS)),
            Some(PLACEHOLDER_DESCRIPTION.to_string()),
            Some(vec![FunnelElement::default_stage()]),
        ),
    }
}
