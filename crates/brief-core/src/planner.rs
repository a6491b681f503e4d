//! Follow-up question planning.
//!
//! The planner uses its own "done" thresholds, stricter than the scorer's.
//! A briefing can score 100 and still get questions about thin funnel stages.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{GenerationConfig, TextModel};
use crate::prompt::question_prompt;
use crate::types::{trimmed_len, BriefingState, ConversationTurn, Role};

pub const UTP_DONE_CHARS: usize = 15;
pub const PRODUCT_DONE_CHARS: usize = 30;
pub const STAGE_DONE_CHARS: usize = 15;
pub const MIN_DONE_STAGES: usize = 2;

/// Most questions returned by one plan.
pub const MAX_QUESTIONS: usize = 3;

/// Previously asked questions kept for deduplication.
pub const ASKED_WINDOW: usize = 10;

pub const COMPLETE_MESSAGE: &str = "All required fields are already filled! \
You can move to the next stage or add to the existing information.";

pub const GENERIC_QUESTION: &str =
    "Could you tell us more about your business so we can better understand how to help you?";

/// A gap in the briefing, in urgency order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "stage", rename_all = "snake_case")]
pub enum MissingTopic {
    Utp,
    ProductDescription,
    Funnel,
    /// A named stage whose description is too thin.
    StageDetail(String),
}

impl MissingTopic {
    pub fn prompt_label(&self) -> String {
        match self {
            MissingTopic::Utp => "UTP (unique value proposition)".to_string(),
            MissingTopic::ProductDescription => "detailed product/service description".to_string(),
            MissingTopic::Funnel => "sales funnel stages".to_string(),
            MissingTopic::StageDetail(name) => format!("detailed description of stage '{}'", name),
        }
    }

    pub fn fallback_question(&self) -> String {
        match self {
            MissingTopic::Utp => "What makes your product or service unique on the market? \
                What specific benefit does it bring to clients?"
                .to_string(),
            MissingTopic::ProductDescription => "Tell us more about your product or service: \
                what are its main features? Which client problems does it solve?"
                .to_string(),
            MissingTopic::Funnel => "Please describe how a client interacts with your product \
                from first contact to purchase. Which stages does the client go through?"
                .to_string(),
            MissingTopic::StageDetail(name) => format!(
                "Please describe the stage '{}' in more detail: what happens there and what does the client do?",
                name
            ),
        }
    }
}

/// Where a plan's questions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// Phrased by the model.
    Model,
    /// Taken from the static bank after a model failure.
    Fallback,
    /// Nothing missing; the single affirmative message.
    Complete,
}

impl QuestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Model => "model",
            QuestionSource::Fallback => "fallback",
            QuestionSource::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPlan {
    pub questions: Vec<String>,
    pub source: QuestionSource,
}

/// Gaps under the planner's thresholds: utp, product description, funnel
/// size, then one entry per thin stage in funnel order.
pub fn missing_topics(state: &BriefingState) -> Vec<MissingTopic> {
    let mut topics = Vec::new();

    if state.utp.as_deref().map(trimmed_len).unwrap_or(0) < UTP_DONE_CHARS {
        topics.push(MissingTopic::Utp);
    }
    if state.product_description.as_deref().map(trimmed_len).unwrap_or(0) < PRODUCT_DONE_CHARS {
        topics.push(MissingTopic::ProductDescription);
    }
    if state.funnel_elements.len() < MIN_DONE_STAGES {
        topics.push(MissingTopic::Funnel);
    }
    for element in &state.funnel_elements {
        if trimmed_len(&element.description) < STAGE_DONE_CHARS {
            topics.push(MissingTopic::StageDetail(element.name.clone()));
        }
    }
    topics
}

/// Questions the assistant already asked: every sentence ending in `?`
/// inside assistant turns, most recent [`ASKED_WINDOW`] kept, oldest first.
pub fn asked_questions(history: &[ConversationTurn]) -> Vec<String> {
    let mut asked: Vec<String> = history
        .iter()
        .filter(|t| t.role == Role::Assistant)
        .flat_map(|t| question_sentences(&t.content))
        .collect();
    let skip = asked.len().saturating_sub(ASKED_WINDOW);
    asked.split_off(skip)
}

/// Sentences of `text` that end in `?`, trimmed. A line break also ends a
/// sentence, so a lead-in line never swallows the question after it.
fn question_sentences(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut sentence = String::new();
    for c in text.chars() {
        match c {
            '.' | '!' | '\n' => sentence.clear(),
            '?' => {
                sentence.push('?');
                let q = sentence.trim();
                if q.len() > 1 {
                    found.push(q.to_string());
                }
                sentence.clear();
            }
            _ => sentence.push(c),
        }
    }
    found
}

/// Comparison key: case-folded, list markers stripped, whitespace collapsed.
pub fn normalize_question(q: &str) -> String {
    strip_list_marker(q)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips a leading `1.`, `2)`, `-`, `*` or `•` marker. The marker only
/// counts when whitespace follows it, so `1.5 million users?` is kept whole.
fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim();
    let digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let after_marker = if digits.len() < trimmed.len() {
        digits.strip_prefix('.').or_else(|| digits.strip_prefix(')'))
    } else {
        trimmed.strip_prefix(|c: char| matches!(c, '-' | '*' | '•'))
    };
    match after_marker {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => trimmed,
    }
}

/// Plans follow-up questions, phrased by the model when it is available.
pub struct QuestionPlanner {
    model: Arc<dyn TextModel>,
    config: GenerationConfig,
}

impl QuestionPlanner {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            config: GenerationConfig::questions(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn plan(&self, state: &BriefingState, history: &[ConversationTurn]) -> QuestionPlan {
        let topics = missing_topics(state);
        if topics.is_empty() {
            return QuestionPlan {
                questions: vec![COMPLETE_MESSAGE.to_string()],
                source: QuestionSource::Complete,
            };
        }

        let asked = asked_questions(history);
        let mut seen: HashSet<String> = asked.iter().map(|q| normalize_question(q)).collect();

        let prompt = question_prompt(state, history, &asked, &topics);
        match self.model.generate(&prompt, &self.config).await {
            Ok(text) => {
                let questions = select_fresh(
                    text.lines()
                        .filter(|line| line.contains('?'))
                        .map(|line| strip_list_marker(line).to_string()),
                    &mut seen.clone(),
                );
                if !questions.is_empty() {
                    return QuestionPlan {
                        questions,
                        source: QuestionSource::Model,
                    };
                }
                log::warn!("question model returned no usable questions; using fallback bank");
            }
            Err(e) => {
                log::warn!("question model failed ({}); using fallback bank", e);
            }
        }

        let mut questions = select_fresh(topics.iter().map(MissingTopic::fallback_question), &mut seen);
        if questions.is_empty() {
            questions.push(GENERIC_QUESTION.to_string());
        }
        QuestionPlan {
            questions,
            source: QuestionSource::Fallback,
        }
    }
}

/// Up to [`MAX_QUESTIONS`] candidates not yet in `seen`. A candidate is
/// stale when any of its question sentences was already asked.
fn select_fresh(candidates: impl Iterator<Item = String>, seen: &mut HashSet<String>) -> Vec<String> {
    let mut out = Vec::new();
    for candidate in candidates {
        if out.len() == MAX_QUESTIONS {
            break;
        }
        let whole = normalize_question(&candidate);
        if whole.is_empty() {
            continue;
        }
        let mut keys: Vec<String> = question_sentences(&candidate)
            .iter()
            .map(|q| normalize_question(q))
            .collect();
        keys.push(whole);
        if keys.iter().any(|k| seen.contains(k)) {
            continue;
        }
        seen.extend(keys);
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ScriptedModel};
    use crate::render;
    use crate::types::FunnelElement;

    fn planner(model: ScriptedModel) -> (QuestionPlanner, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        (QuestionPlanner::new(model.clone()), model)
    }

    fn done_state() -> BriefingState {
        BriefingState {
            utp: Some("Same-day flower delivery".into()),
            product_description: Some("Bouquets, plants and office subscriptions".into()),
            funnel_elements: vec![
                FunnelElement::new("Ad", "Instagram ads with seasonal bouquets"),
                FunnelElement::new("Order", "Checkout on the website in two clicks"),
            ],
            ..Default::default()
        }
        .refreshed()
    }

    #[test]
    fn test_missing_topics_order() {
        let state = BriefingState {
            utp: Some("Short utp".into()),
            funnel_elements: vec![FunnelElement::new("Call", "brief")],
            ..Default::default()
        };
        assert_eq!(
            missing_topics(&state),
            vec![
                MissingTopic::Utp,
                MissingTopic::ProductDescription,
                MissingTopic::Funnel,
                MissingTopic::StageDetail("Call".into()),
            ]
        );
    }

    #[test]
    fn test_stricter_than_scorer() {
        // 11 chars: enough for the scorer, not for the planner.
        let state = BriefingState {
            utp: Some("Fast bikes!".into()),
            product_description: Some("City bikes for couriers, 24/7 repair".into()),
            funnel_elements: vec![FunnelElement::new("Lead", "Ads in courier chats")],
            ..Default::default()
        }
        .refreshed();
        assert_eq!(state.completion_percentage, 100);
        assert_eq!(missing_topics(&state), vec![MissingTopic::Utp, MissingTopic::Funnel]);
    }

    #[test]
    fn test_asked_questions_extracts_sentences() {
        let history = vec![
            ConversationTurn::user("Is this a question? No."),
            ConversationTurn::assistant("Thanks. 1. What is your price? Great! Who buys it?\n\nOk"),
        ];
        assert_eq!(
            asked_questions(&history),
            vec!["What is your price?".to_string(), "Who buys it?".to_string()]
        );
    }

    #[test]
    fn test_asked_questions_keeps_last_ten() {
        let text: String = (0..15).map(|i| format!("Question {}? ", i)).collect();
        let asked = asked_questions(&[ConversationTurn::assistant(text)]);
        assert_eq!(asked.len(), ASKED_WINDOW);
        assert_eq!(asked[0], "Question 5?");
        assert_eq!(asked[9], "Question 14?");
    }

    #[test]
    fn test_normalize_question() {
        assert_eq!(normalize_question("  2.  What   IS it? "), "what is it?");
        assert_eq!(normalize_question("- What is it?"), "what is it?");
        assert_eq!(normalize_question("3) What is it?"), "what is it?");
        assert_eq!(normalize_question("24/7 support?"), "24/7 support?");
    }

    #[tokio::test]
    async fn test_complete_state_returns_single_affirmative() {
        let (planner, model) = planner(ScriptedModel::new());
        let history = vec![ConversationTurn::assistant(COMPLETE_MESSAGE)];
        let plan = planner.plan(&done_state(), &history).await;
        assert_eq!(plan.questions, vec![COMPLETE_MESSAGE.to_string()]);
        assert_eq!(plan.source, QuestionSource::Complete);
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_model_questions_filtered_and_capped() {
        let (planner, model) = planner(ScriptedModel::new().reply(
            "Here are some questions:\n1. What is your price?\n2. Who are your clients?\n\
             3. How do clients find you?\n4. What happens after purchase?",
        ));
        let history = vec![ConversationTurn::assistant("What is your price?")];
        let plan = planner.plan(&BriefingState::default(), &history).await;

        assert_eq!(plan.source, QuestionSource::Model);
        assert_eq!(
            plan.questions,
            vec![
                "Who are your clients?".to_string(),
                "How do clients find you?".to_string(),
                "What happens after purchase?".to_string(),
            ]
        );
        assert_eq!(model.configs()[0], GenerationConfig::questions());
    }

    #[tokio::test]
    async fn test_model_failure_uses_fallback_bank_in_order() {
        let (planner, _) = planner(ScriptedModel::new().fail(ModelError::Timeout(
            std::time::Duration::from_secs(30),
        )));
        let plan = planner.plan(&BriefingState::default(), &[]).await;
        assert_eq!(plan.source, QuestionSource::Fallback);
        assert_eq!(
            plan.questions,
            vec![
                MissingTopic::Utp.fallback_question(),
                MissingTopic::ProductDescription.fallback_question(),
                MissingTopic::Funnel.fallback_question(),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_skips_already_asked() {
        let (planner, _) = planner(ScriptedModel::new());
        let state = BriefingState {
            product_description: Some("A long enough description of the product".into()),
            funnel_elements: vec![
                FunnelElement::new("Ad", "Instagram ads with seasonal bouquets"),
                FunnelElement::new("Order", "Checkout on the website in two clicks"),
            ],
            ..Default::default()
        };
        let history = vec![ConversationTurn::assistant(MissingTopic::Utp.fallback_question())];
        let plan = planner.plan(&state, &history).await;
        assert_eq!(plan.questions, vec![GENERIC_QUESTION.to_string()]);
    }

    #[tokio::test]
    async fn test_model_reply_without_questions_falls_back() {
        let (planner, _) = planner(ScriptedModel::new().reply("I cannot help with that."));
        let plan = planner.plan(&BriefingState::default(), &[]).await;
        assert_eq!(plan.source, QuestionSource::Fallback);
        assert_eq!(plan.questions.len(), MAX_QUESTIONS);
    }

    #[test]
    fn test_decimal_is_not_a_list_marker() {
        assert_eq!(strip_list_marker("1.5 million users?"), "1.5 million users?");
        assert_eq!(strip_list_marker("2)x?"), "2)x?");
        assert_eq!(strip_list_marker("-5 degrees outside?"), "-5 degrees outside?");
        assert_eq!(strip_list_marker("1. Who buys it?"), "Who buys it?");
    }

    #[test]
    fn test_lead_in_line_does_not_swallow_first_question() {
        let questions = vec!["What exactly do you sell?".to_string(), "Who are your clients?".to_string()];
        let reply = render::chat_reply(&BriefingState::default().refreshed(), &questions);
        let asked = asked_questions(&[ConversationTurn::assistant(reply)]);
        assert_eq!(asked, questions);
    }

    #[tokio::test]
    async fn test_fallback_does_not_repeat_first_question_of_reply() {
        let (planner, _) = planner(ScriptedModel::new());
        let state = BriefingState {
            utp: Some("Same-day flower delivery".into()),
            product_description: Some("Bouquets, plants and office subscriptions".into()),
            funnel_elements: vec![FunnelElement::new("Call", "short")],
            ..Default::default()
        }
        .refreshed();
        assert_eq!(state.completion_percentage, 66);

        let stage_question = MissingTopic::StageDetail("Call".into()).fallback_question();
        let reply = render::chat_reply(&state, &[stage_question.clone()]);
        let plan = planner.plan(&state, &[ConversationTurn::assistant(reply)]).await;

        assert_eq!(plan.source, QuestionSource::Fallback);
        assert_eq!(plan.questions, vec![MissingTopic::Funnel.fallback_question()]);
        assert!(!plan.questions.contains(&stage_question));
    }

    #[tokio::test]
    async fn test_model_does_not_repeat_first_question_of_reply() {
        let (planner, _) = planner(ScriptedModel::new().reply(
            "What exactly do you sell?\nWho are your clients?\nHow do clients find you?",
        ));
        let previous = render::chat_reply(
            &BriefingState::default().refreshed(),
            &["What exactly do you sell?".to_string(), "Who are your clients?".to_string()],
        );
        let plan = planner
            .plan(&BriefingState::default(), &[ConversationTurn::assistant(previous)])
            .await;

        assert_eq!(plan.source, QuestionSource::Model);
        assert_eq!(plan.questions, vec!["How do clients find you?".to_string()]);
    }

    #[tokio::test]
    async fn test_stage_detail_fallback_names_stage() {
        let (planner, _) = planner(ScriptedModel::new());
        let state = BriefingState {
            utp: Some("Same-day flower delivery".into()),
            product_description: Some("Bouquets, plants and office subscriptions".into()),
            funnel_elements: vec![
                FunnelElement::new("Ad", "Instagram ads with seasonal bouquets"),
                FunnelElement::new("Call", "short"),
            ],
            ..Default::default()
        };
        let plan = planner.plan(&state, &[]).await;
        assert_eq!(plan.questions.len(), 1);
        assert!(plan.questions[0].contains("'Call'"));
    }
}
