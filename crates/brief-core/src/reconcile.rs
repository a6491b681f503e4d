//! Fill-not-erase reconciliation of an extraction into the current briefing.
//!
//! `reconcile` is pure: it reads the current state and returns a complete new
//! one. Callers swap the whole value in, so a partially merged state is never
//! observable. Score and summary are left to [`BriefingState::refresh`].

use crate::types::{is_filled, BriefingState, ExtractionResult, FunnelElement};

/// Merge `incoming` into `current`.
///
/// - Scalars: a non-blank incoming value replaces the existing one; anything
///   else keeps the existing value verbatim.
/// - Funnel, keyed by exact name: shared names absorb the incoming
///   description (concatenation, see [`FunnelElement::absorb`]), new names
///   are appended in incoming order, existing-only names are untouched.
/// - A state with scalar content but no stages receives the default stage.
pub fn reconcile(current: &BriefingState, incoming: &ExtractionResult) -> BriefingState {
    let utp = merge_scalar(current.utp.as_ref(), incoming.utp.as_ref());
    let product_description = merge_scalar(
        current.product_description.as_ref(),
        incoming.product_description.as_ref(),
    );

    let mut funnel_elements = current.funnel_elements.clone();
    if let Some(new_elements) = &incoming.funnel_elements {
        merge_funnel(&mut funnel_elements, new_elements);
    }

    let mut merged = BriefingState {
        utp,
        product_description,
        funnel_elements,
        completion_percentage: current.completion_percentage,
        stage_summary: current.stage_summary.clone(),
    };

    if merged.funnel_elements.is_empty() && merged.has_scalar_content() {
        merged.funnel_elements.push(FunnelElement::default_stage());
    }

    merged
}

fn merge_scalar(existing: Option<&String>, incoming: Option<&String>) -> Option<String> {
    match incoming {
        Some(value) if is_filled(Some(value)) => Some(value.clone()),
        _ => existing.cloned(),
    }
}

fn merge_funnel(elements: &mut Vec<FunnelElement>, incoming: &[FunnelElement]) {
    for new in incoming {
        match elements.iter_mut().find(|e| e.name == new.name) {
            Some(existing) => existing.absorb(&new.description),
            None => elements.push(new.clone()),
        }
    }
}
