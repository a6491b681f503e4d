//! Deterministic completeness scoring.
//!
//! Three binary criteria, summed as `floor(satisfied / 3 * 100)`. The result
//! is re-derivable from the state alone; the copy cached on the state is a
//! convenience, refreshed on every mutation.

use crate::types::{trimmed_len, BriefingState, FunnelElement};

/// UTP counts once its trimmed length exceeds this.
pub const UTP_MIN_CHARS: usize = 10;
/// Product description counts once its trimmed length exceeds this.
pub const PRODUCT_MIN_CHARS: usize = 20;
/// A funnel stage qualifies once its trimmed description exceeds this.
pub const STAGE_MIN_CHARS: usize = 10;

const CRITERIA: u32 = 3;

/// Which of the three criteria a state satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Criteria {
    pub utp: bool,
    pub product_description: bool,
    pub funnel: bool,
}

impl Criteria {
    pub fn of(state: &BriefingState) -> Self {
        Self {
            utp: state
                .utp
                .as_deref()
                .map(|v| trimmed_len(v) > UTP_MIN_CHARS)
                .unwrap_or(false),
            product_description: state
                .product_description
                .as_deref()
                .map(|v| trimmed_len(v) > PRODUCT_MIN_CHARS)
                .unwrap_or(false),
            funnel: state.funnel_elements.iter().any(is_qualifying),
        }
    }

    pub fn satisfied(&self) -> u32 {
        [self.utp, self.product_description, self.funnel]
            .iter()
            .filter(|c| **c)
            .count() as u32
    }
}

/// A stage counts toward the funnel criterion only with a non-blank name and
/// a description longer than [`STAGE_MIN_CHARS`].
pub fn is_qualifying(element: &FunnelElement) -> bool {
    !element.name.trim().is_empty() && trimmed_len(&element.description) > STAGE_MIN_CHARS
}

/// 0, 33, 66 or 100. Integer truncation, never rounding.
pub fn completion_score(state: &BriefingState) -> u8 {
    (Criteria::of(state).satisfied() * 100 / CRITERIA) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::types::{ExtractionResult, FunnelElement};
    use proptest::prelude::*;

    #[test]
    fn test_one_criterion_scores_33() {
        let state = BriefingState {
            utp: Some(String::new()),
            product_description: Some("x".repeat(25)),
            funnel_elements: vec![FunnelElement::new("A", "short")],
            ..Default::default()
        };
        assert_eq!(completion_score(&state), 33);
    }

    #[test]
    fn test_all_criteria_score_100() {
        let state = BriefingState {
            utp: Some("Same-day delivery in town".into()),
            product_description: Some("Fresh flowers and bouquets, assembled to order".into()),
            funnel_elements: vec![FunnelElement::new("Order", "Online order via the website form")],
            ..Default::default()
        };
        assert_eq!(completion_score(&state), 100);
    }

    #[test]
    fn test_two_criteria_truncate_to_66() {
        let state = BriefingState {
            utp: Some("Same-day delivery in town".into()),
            product_description: Some("Fresh flowers and bouquets, assembled to order".into()),
            ..Default::default()
        };
        assert_eq!(completion_score(&state), 66);
    }

    #[test]
    fn test_empty_state_scores_zero() {
        assert_eq!(completion_score(&BriefingState::default()), 0);
    }

    #[test]
    fn test_thresholds_are_strict_and_trimmed() {
        // exactly 10 chars after trimming does not count
        let state = BriefingState {
            utp: Some("   0123456789   ".into()),
            ..Default::default()
        };
        assert!(!Criteria::of(&state).utp);

        let state = BriefingState {
            utp: Some("01234567890".into()),
            ..Default::default()
        };
        assert!(Criteria::of(&state).utp);
    }

    #[test]
    fn test_thresholds_count_chars_not_bytes() {
        // 11 Cyrillic letters = 22 bytes
        let state = BriefingState {
            utp: Some("абвгдежзийк".into()),
            product_description: Some("абвгдежзий".into()),
            ..Default::default()
        };
        let c = Criteria::of(&state);
        assert!(c.utp);
        assert!(!c.product_description);
    }

    #[test]
    fn test_blank_named_stage_does_not_qualify() {
        let state = BriefingState {
            funnel_elements: vec![FunnelElement::new("  ", "A long enough description")],
            ..Default::default()
        };
        assert_eq!(completion_score(&state), 0);
    }

    fn arb_text() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), Just("   ".to_string()), "[a-z ]{0,40}"]
    }

    // Non-blank incoming scalars are long enough to meet the scorer's bar: a
    // shorter non-blank value legitimately replaces a longer one.
    fn arb_incoming_scalar() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), Just("   ".to_string()), "[a-z]{21,40}"]
    }

    fn arb_elements() -> impl Strategy<Value = Vec<FunnelElement>> {
        prop::collection::vec(
            ("[A-C]", arb_text()).prop_map(|(n, d)| FunnelElement::new(n, d)),
            0..4,
        )
    }

    proptest! {
        #[test]
        fn prop_merge_never_lowers_score(
            utp in prop::option::of(arb_text()),
            desc in prop::option::of(arb_text()),
            elements in arb_elements(),
            in_utp in prop::option::of(arb_incoming_scalar()),
            in_desc in prop::option::of(arb_incoming_scalar()),
            in_elements in prop::option::of(arb_elements()),
        ) {
            let state = BriefingState {
                utp,
                product_description: desc,
                funnel_elements: elements,
                ..Default::default()
            }
            .normalized();
            let result = ExtractionResult {
                utp: in_utp,
                product_description: in_desc,
                funnel_elements: in_elements,
                succeeded: true,
                failure: None,
            };
            let merged = reconcile(&state, &result).refreshed();
            prop_assert!(merged.completion_percentage >= state.completion_percentage);
        }
    }
}
