//! Property-based tests for the scene parser.
//!
//! These tests verify invariants hold for arbitrary inputs using proptest.
//!
//! Run with: cargo test -p choicescript-parser --test `property_tests`

use choicescript_parser::{parse_scene, LineIndex, OccurrenceKind};
use proptest::prelude::*;

// ============================================================================
// Arbitrary generators
// ============================================================================

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*create points 0".to_string()),
        Just("*temp name \"Sam\"".to_string()),
        Just("*set points + 1".to_string()),
        Just("*choice".to_string()),
        Just("  #Yes".to_string()),
        Just("    *goto end".to_string()),
        Just("*if (points > 3)".to_string()),
        Just("*else".to_string()),
        Just("*label end".to_string()),
        Just("*goto_scene chapter2".to_string()),
        Just("Hello ${name}, @{flag yes|no}.".to_string()),
        Just("Broken ${interp".to_string()),
        Just("*unknown thing".to_string()),
        "[ \t]{0,6}[a-zA-Z*#${}()\"@|. ]{0,30}",
    ]
}

fn arb_scene_source() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_line(), 0..30).prop_map(|lines| lines.join("\n"))
}

// ============================================================================
// Parser Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Parsing is deterministic.
    #[test]
    fn prop_parse_deterministic(source in arb_scene_source()) {
        prop_assert_eq!(parse_scene(&source), parse_scene(&source));
    }

    /// Parsing never panics, even on arbitrary unicode.
    #[test]
    fn prop_parse_total(source in "\\PC{0,200}") {
        let scene = parse_scene(&source);
        prop_assert_eq!(scene.source(), source.as_str());
    }

    /// Every occurrence and error span lies within the source on char boundaries.
    #[test]
    fn prop_spans_in_bounds(source in arb_scene_source()) {
        let scene = parse_scene(&source);
        for occ in &scene.occurrences {
            prop_assert!(occ.span.end <= source.len());
            prop_assert!(source.get(occ.span.start..occ.span.end).is_some());
            if occ.kind != OccurrenceKind::Text {
                prop_assert!(!occ.span.is_empty());
            }
        }
        for err in &scene.errors {
            prop_assert!(err.span.start <= err.span.end && err.span.end <= source.len());
        }
    }
}

proptest! {
    /// Offset -> position -> offset round trips on char boundaries.
    #[test]
    fn prop_line_index_round_trip(source in "\\PC{0,80}(\n\\PC{0,80}){0,5}") {
        let index = LineIndex::new(&source);
        for (offset, _) in source.char_indices() {
            let (line, col) = index.offset_to_position(offset);
            prop_assert_eq!(index.position_to_offset(line, col), Some(offset));
        }
    }
}
