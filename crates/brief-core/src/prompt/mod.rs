//! Prompt construction for every model call site.

mod templates;

pub use templates::{extraction_prompt, project_summary_prompt, question_prompt};

use crate::types::{is_filled, BriefingState, ConversationTurn, Role};

/// Turns of history included in an extraction prompt.
pub const EXTRACTION_HISTORY_TURNS: usize = 8;

/// Turns of history included in a question prompt.
pub const QUESTION_HISTORY_TURNS: usize = 5;

/// The tail of `history` holding at most `limit` turns.
pub fn recent(history: &[ConversationTurn], limit: usize) -> &[ConversationTurn] {
    &history[history.len().saturating_sub(limit)..]
}

/// Render the current briefing as a context block. Blank fields are shown as
/// "Not filled" so the model can see what is missing.
pub(crate) fn state_block(heading: &str, state: &BriefingState) -> String {
    let mut out = format!("{}:\n", heading);
    out.push_str(&format!("UTP: {}\n", filled_or_missing(state.utp.as_deref())));
    out.push_str(&format!(
        "Product description: {}\n",
        filled_or_missing(state.product_description.as_deref())
    ));
    if state.funnel_elements.is_empty() {
        out.push_str("Sales funnel stages: Not filled\n");
    } else {
        out.push_str("Sales funnel stages:\n");
        for (i, element) in state.funnel_elements.iter().enumerate() {
            out.push_str(&format!("  {}. {}: {}\n", i + 1, element.name, element.description));
        }
    }
    out
}

pub(crate) fn history_block(heading: &str, turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return String::new();
    }
    let mut out = format!("{}:\n\n", heading);
    for turn in turns {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("{}: {}\n\n", speaker, turn.content));
    }
    out
}

fn filled_or_missing(value: Option<&str>) -> &str {
    match value {
        Some(v) if is_filled(Some(v)) => v,
        _ => "Not filled",
    }
}
