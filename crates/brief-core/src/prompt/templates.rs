use super::{history_block, recent, state_block, EXTRACTION_HISTORY_TURNS, QUESTION_HISTORY_TURNS};
use crate::channel::Channel;
use crate::planner::MissingTopic;
use crate::types::{is_filled, BriefingState, ConversationTurn, Project};

const FIELD_GUIDE: &str = "\
1. Unique value proposition (utp): what makes the offering unique and which benefit it brings to clients. \
It should be specific, compelling and set the offering apart from competitors.

2. Product/service description (product_description): what is offered, which problems it solves and which \
concrete benefits clients get. Include key features and advantages.

3. Sales funnel stages (funnel_elements): the consecutive steps a client goes through from first contact to \
purchase and beyond. Give each stage a name and a detailed description.";

const OUTPUT_CONTRACT: &str = "\
Return the result ONLY as a JSON object with the fields:
- utp: string
- product_description: string
- funnel_elements: array of objects with fields name (stage name) and description (stage description)

Do not add any explanation before or after the JSON.";

/// Extraction prompt for one channel. History is only rendered for chat and
/// is cut to the last [`EXTRACTION_HISTORY_TURNS`] turns.
pub fn extraction_prompt(
    channel: Channel,
    text: &str,
    state: Option<&BriefingState>,
    history: &[ConversationTurn],
) -> String {
    let context = state
        .map(|s| state_block("Current briefing data", s))
        .unwrap_or_default();

    match channel {
        Channel::Chat => {
            let conversation = history_block(
                "Conversation history (most recent messages)",
                recent(history, EXTRACTION_HISTORY_TURNS),
            );
            format!(
                "You are an assistant collecting information about an expert, their product or service and \
their sales funnel.

{context}
{conversation}
New user message:
{text}

Taking into account the conversation so far, the current briefing data and the new information, extract \
and structure the following data:

{FIELD_GUIDE}

Important:
- If the new message has nothing for a field that is already filled, keep the existing value.
- If the new information complements the existing data, integrate both and keep the most important details.
- If the new message covers only some fields, fill only those fields.

{OUTPUT_CONTRACT}"
            )
        }
        Channel::Document | Channel::Website => {
            let source = if channel == Channel::Website {
                "web page"
            } else {
                "document"
            };
            format!(
                "You are an assistant analysing a {source} and extracting information for a briefing.

{context}
Extract and structure the following data from the {source}:

{FIELD_GUIDE}

Important:
- If the {source} has nothing for a field that is already filled, keep the existing value.
- If the {source} complements the existing data, combine them and keep the most important details.
- If some information cannot be found, use what is already known or leave the field empty.

Content of the {source} to analyse:
{text}

{OUTPUT_CONTRACT}"
            )
        }
    }
}

/// Prompt asking for 2-3 follow-up questions, one per line, most urgent first.
pub fn question_prompt(
    state: &BriefingState,
    history: &[ConversationTurn],
    asked: &[String],
    topics: &[MissingTopic],
) -> String {
    let context = state_block("Current briefing data", state);
    let conversation = history_block("Recent conversation", recent(history, QUESTION_HISTORY_TURNS));

    let mut exclusions = String::new();
    if !asked.is_empty() {
        exclusions.push_str("Questions already asked (do not repeat them):\n");
        for (i, q) in asked.iter().enumerate() {
            exclusions.push_str(&format!("{}. {}\n", i + 1, q));
        }
    }

    let missing: Vec<String> = topics.iter().map(MissingTopic::prompt_label).collect();

    format!(
        "You are an assistant helping to fill in an expert's briefing.

{context}
{conversation}
{exclusions}
Information still needed about: {missing}.

Write 2-3 follow-up questions that will help collect the missing information.

Requirements:
1. Each question targets exactly the information that is missing.
2. Do not repeat questions that were already asked.
3. Ask open questions that invite a detailed answer.
4. Take the conversation and the known information into account.
5. Be friendly and professional.
6. Put the most important question first.

Return ONLY the questions, without explanations or introductions, one question per line.",
        missing = missing.join(", ")
    )
}

/// Prompt for a short prose summary of a whole project.
pub fn project_summary_prompt(project: &Project, state: &BriefingState) -> String {
    let mut context = format!("Project data:\nName: {}\n", project.name);
    if let Some(description) = project.description.as_deref().filter(|d| is_filled(Some(d))) {
        context.push_str(&format!("Description: {}\n", description));
    }
    if !state.is_empty() {
        context.push('\n');
        context.push_str(&state_block("Briefing data", state));
    }

    format!(
        "You are an assistant that writes short, informative project descriptions.

{context}
Based on this data, write a short project summary that:
1. States the essence of the project in 2-3 sentences.
2. Highlights key features and advantages.
3. Briefly describes the target audience and the value for it.
4. Has a professional but friendly tone.

Keep it concise (no more than 300 words) and well structured."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunnelElement;

    #[test]
    fn test_chat_prompt_includes_last_eight_turns_only() {
        let history: Vec<ConversationTurn> = (0..10)
            .map(|i| ConversationTurn::user(format!("turn-{}", i)))
            .collect();
        let prompt = extraction_prompt(Channel::Chat, "We sell bikes", None, &history);
        assert!(!prompt.contains("turn-1\n"));
        assert!(prompt.contains("turn-2"));
        assert!(prompt.contains("turn-9"));
        assert!(prompt.contains("New user message:\nWe sell bikes"));
    }

    #[test]
    fn test_document_prompt_ignores_history_and_names_source() {
        let history = vec![ConversationTurn::user("secret-history")];
        let prompt = extraction_prompt(Channel::Document, "doc body", None, &history);
        assert!(!prompt.contains("secret-history"));
        assert!(prompt.contains("Content of the document to analyse:\ndoc body"));

        let prompt = extraction_prompt(Channel::Website, "page body", None, &[]);
        assert!(prompt.contains("web page"));
    }

    #[test]
    fn test_extraction_prompt_renders_state() {
        let state = BriefingState {
            utp: Some("Bikes for couriers".into()),
            ..Default::default()
        };
        let prompt = extraction_prompt(Channel::Chat, "x", Some(&state), &[]);
        assert!(prompt.contains("UTP: Bikes for couriers"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_question_prompt_lists_exclusions_and_topics() {
        let state = BriefingState {
            funnel_elements: vec![FunnelElement::new("Demo", "call")],
            ..Default::default()
        };
        let prompt = question_prompt(
            &state,
            &[],
            &["What is your price?".to_string()],
            &[MissingTopic::Utp, MissingTopic::StageDetail("Demo".into())],
        );
        assert!(prompt.contains("1. What is your price?"));
        assert!(prompt.contains("Information still needed about: UTP (unique value proposition), detailed description of stage 'Demo'."));
    }

    #[test]
    fn test_project_summary_prompt() {
        let project = Project::new("Bloom", Some("Flower shop".into()));
        let prompt = project_summary_prompt(&project, &BriefingState::default());
        assert!(prompt.contains("Name: Bloom\nDescription: Flower shop\n"));
        assert!(!prompt.contains("Briefing data"));
    }
}
