//! Property-based tests for ingestion invariants
//!
//! Uses proptest to check that:
//! - status is a pure function of (attempted, succeeded, failed)
//! - truncation never exceeds the budget and never splits a character
//! - whitespace collapsing is idempotent

use proptest::prelude::*;
use trendline_ingest::text::{collapse_whitespace, truncate_chars, TRUNCATION_MARKER};
use trendline_ingest::IngestionStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn status_matches_counts(attempted in any::<bool>(), ok in 0usize..5, failed in 0usize..5) {
        let status = IngestionStatus::from_counts(attempted, ok, failed);
        let expected = if !attempted {
            IngestionStatus::Empty
        } else if ok == 0 {
            IngestionStatus::Failed
        } else if failed == 0 {
            IngestionStatus::Success
        } else {
            IngestionStatus::Partial
        };
        prop_assert_eq!(status, expected);
    }

    #[test]
    fn truncation_respects_budget(text in "\\PC{0,200}", max in 1usize..120) {
        let out = truncate_chars(&text, max);
        let n = text.chars().count();
        if n <= max {
            prop_assert_eq!(out, text);
        } else {
            prop_assert!(out.ends_with(TRUNCATION_MARKER));
            prop_assert!(out.chars().count() <= max + 1);
            let kept: String = out.chars().take(out.chars().count() - 1).collect();
            prop_assert!(text.starts_with(&kept));
        }
    }

    #[test]
    fn collapse_is_idempotent(text in "[ \\t\\na-z数]{0,80}") {
        let once = collapse_whitespace(&text);
        prop_assert_eq!(collapse_whitespace(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert_eq!(once.trim(), once.as_str());
    }
}
