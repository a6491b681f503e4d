//! Human-readable text built from a briefing: the cached stage summary and
//! the assistant replies for each channel.

use crate::channel::{AcquisitionError, Channel};
use crate::types::{is_filled, BriefingState};

/// Characters of the product description shown in recaps.
pub const RECAP_PREVIEW_CHARS: usize = 150;

const NOT_DEFINED: &str = "Not defined";

const UPLOAD_HINT: &str =
    "You can also upload a proposal/presentation or share a link to your website for a more accurate analysis.";

const TEXT_FALLBACK_QUESTIONS: &str = "1. What is your product or service?\n\
2. What makes it unique compared to competitors?\n\
3. How does the sales process for your product or service work?";

/// Keep the first `max_chars` characters, appending "..." when anything was cut.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    let mut chars = s.char_indices();
    match chars.nth(max_chars) {
        Some((byte_end, _)) => format!("{}...", &s[..byte_end]),
        None => s.to_string(),
    }
}

/// Digest cached in `BriefingState::stage_summary`.
pub fn stage_summary(state: &BriefingState) -> String {
    let mut out = String::from("Stage summary 'Expert briefing':\n\n");

    out.push_str(&format!("UTP: {}\n\n", filled_or(state.utp.as_deref(), NOT_DEFINED)));
    out.push_str(&format!(
        "Product/service description: {}\n\n",
        filled_or(state.product_description.as_deref(), NOT_DEFINED)
    ));

    out.push_str("Sales funnel stages:\n");
    if state.funnel_elements.is_empty() {
        out.push_str("Funnel stages not defined\n");
    } else {
        for (i, element) in state.funnel_elements.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} - {}\n",
                i + 1,
                element.name,
                filled_or(Some(&element.description), "No description")
            ));
        }
    }
    out
}

/// Assistant reply after a chat message was processed.
pub fn chat_reply(state: &BriefingState, questions: &[String]) -> String {
    let pct = state.completion_percentage;
    if pct >= 100 {
        let mut out = String::from(
            "Excellent! All required data has been collected (100%). You can move on to the next stage.",
        );
        out.push_str("\n\nHere is a short summary of the collected information:\n\n");
        push_scalar_recap(&mut out, state);
        out.push_str("✅ Funnel stages: ");
        if state.funnel_elements.is_empty() {
            out.push_str("not defined");
        } else {
            let names: Vec<&str> = state.funnel_elements.iter().map(|e| e.name.as_str()).collect();
            out.push_str(&names.join(", "));
        }
        return out;
    }

    let mut out = if pct >= 85 {
        format!(
            "We have already collected a substantial part of the information ({}%). \
             You can move on to the next stage or add details by answering these questions:\n\n",
            pct
        )
    } else {
        format!(
            "I analyzed the information and updated the briefing form ({}% complete). \
             To fill the briefing more completely, please answer the following questions:\n\n",
            pct
        )
    };
    out.push_str(&questions.join("\n\n"));
    if pct < 50 {
        out.push_str("\n\n");
        out.push_str(UPLOAD_HINT);
    }
    out
}

/// Assistant reply after a document or a web page was processed.
pub fn ingest_reply(channel: Channel, state: &BriefingState, questions: &[String]) -> String {
    let pct = state.completion_percentage;
    let source = match channel {
        Channel::Website => "the content at your link",
        _ => "your file",
    };

    if pct >= 80 {
        let mut out = format!(
            "I analyzed {} and extracted information for the briefing ({}% complete).\n\n",
            source, pct
        );
        out.push_str(match channel {
            Channel::Website => "Here is what I learned:\n\n",
            _ => "Here is what I learned from your document:\n\n",
        });
        push_scalar_recap(&mut out, state);
        if !state.funnel_elements.is_empty() {
            out.push_str("✅ Funnel stages found\n\n");
        }
        if pct < 100 {
            out.push_str("Is there anything else you would like to add?");
        }
        return out.trim_end().to_string();
    }

    let mut out = format!(
        "I analyzed {} and extracted some information ({}% complete), \
         but more data is needed to complete the briefing.\n\n",
        source, pct
    );
    out.push_str("Please answer the following questions:\n\n");
    out.push_str(&questions.join("\n\n"));
    out
}

/// Reply when extraction fell back to its degrade path.
pub fn degraded_reply(channel: Channel, questions: &[String]) -> String {
    match channel {
        Channel::Chat => {
            let mut out = String::from(
                "I could not analyze your information. \
                 Please provide more details about your product or service.",
            );
            if !questions.is_empty() {
                out.push_str("\n\n");
                out.push_str(&questions.join("\n\n"));
            }
            out.push_str("\n\n");
            out.push_str(UPLOAD_HINT);
            out
        }
        Channel::Document => format!(
            "I could not fully analyze your file. The document format may be unsupported \
             or its contents may be encrypted.\n\n{}",
            text_fallback()
        ),
        Channel::Website => format!(
            "I could not extract useful information from the page at your link. The page may \
             not have enough text, or it may be protected from automated extraction.\n\n{}",
            text_fallback()
        ),
    }
}

/// Reply when the source text could not be acquired. No state was touched.
pub fn acquisition_failure_reply(channel: Channel, err: &AcquisitionError) -> String {
    match channel {
        Channel::Chat => {
            "Your message is empty. Please tell us about your product or service.".to_string()
        }
        Channel::Document => format!(
            "An error occurred while processing your file. Please check the document format \
             and try again, or provide the information as text.\n\nError detail: {}",
            err
        ),
        Channel::Website if err.is_network() => {
            "Could not retrieve the content at the provided link. The site may be unavailable \
             or protected against automated access.\n\n\
             Please try another link or describe your product in text."
                .to_string()
        }
        Channel::Website => format!(
            "Could not process the content at the provided link ({}). The page may not be \
             suitable for automated analysis.\n\n\
             Please try another link or describe your product in text.",
            err
        ),
    }
}

fn text_fallback() -> String {
    format!(
        "Please try describing your product or service as text by answering the following questions:\n\n{}",
        TEXT_FALLBACK_QUESTIONS
    )
}

fn push_scalar_recap(out: &mut String, state: &BriefingState) {
    if let Some(utp) = state.utp.as_deref().filter(|u| is_filled(Some(u))) {
        out.push_str(&format!("✅ UTP: {}\n\n", utp));
    }
    if let Some(desc) = state
        .product_description
        .as_deref()
        .filter(|d| is_filled(Some(d)))
    {
        out.push_str(&format!(
            "✅ Product description: {}\n\n",
            ellipsize(desc, RECAP_PREVIEW_CHARS)
        ));
    }
}

fn filled_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if is_filled(Some(v)) => v,
        _ => fallback,
    }
}
