//! Property-based tests for class name validation and cache key derivation.
//!
//! These tests verify the behavioral contracts of `ClassName`:
//! - Round-trip: valid names parse and display unchanged
//! - Key safety: cache keys never contain the namespace separator
//! - Rejection: malformed names never validate

use classmap_core::ClassName;
use proptest::prelude::*;

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate a single valid name segment
fn segment_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,12}".prop_map(String::from)
}

/// Generate a valid dotted class name with 1 to 4 segments
fn class_name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..=4).prop_map(|segments| segments.join("."))
}

// =============================================================================
// Property Tests: Round-trip and key derivation
// =============================================================================

proptest! {
    /// Contract: every generated valid name passes validation
    #[test]
    fn valid_names_validate(name in class_name_strategy()) {
        prop_assert!(ClassName::new(name).is_ok());
    }

    /// Contract: parsing then displaying a valid name is the identity
    #[test]
    fn names_round_trip_through_display(name in class_name_strategy()) {
        let parsed: ClassName = name.parse().expect("generated name should parse");
        prop_assert_eq!(parsed.to_string(), name);
    }

    /// Contract: cache keys are safe for flat key/value engines
    ///
    /// The namespace separator is flattened, so a key never needs escaping.
    #[test]
    fn cache_keys_contain_no_separator(name in class_name_strategy()) {
        let parsed = ClassName::new(&name).expect("generated name should parse");
        let key = parsed.cache_key();
        prop_assert!(!key.contains('.'));
        prop_assert_eq!(key, name.replace('.', "__"));
    }

    /// Contract: equal names derive equal keys, and the derivation is pure
    #[test]
    fn cache_keys_are_deterministic(name in class_name_strategy()) {
        let a = ClassName::new(&name).expect("generated name should parse");
        let b = ClassName::new(&name).expect("generated name should parse");
        prop_assert_eq!(a.cache_key(), b.cache_key());
    }

    /// Contract: the short name is always the final segment
    #[test]
    fn short_name_is_final_segment(segments in prop::collection::vec(segment_strategy(), 1..=4)) {
        let name = ClassName::new(segments.join(".")).expect("generated name should parse");
        let last = segments.last().expect("at least one segment").as_str();
        prop_assert_eq!(name.short_name(), last);
    }
}

// =============================================================================
// Property Tests: Rejection
// =============================================================================

proptest! {
    /// Contract: a leading digit in any segment fails validation
    #[test]
    fn leading_digit_segments_fail(head in "[0-9]", tail in segment_strategy()) {
        let name = format!("{head}{tail}");
        prop_assert!(ClassName::new(name).is_err());
    }

    /// Contract: whitespace never validates
    #[test]
    fn names_with_spaces_fail(a in segment_strategy(), b in segment_strategy()) {
        let name = format!("{a} {b}");
        prop_assert!(ClassName::new(name).is_err());
    }
}

// =============================================================================
// Behavioral Tests (non-proptest)
// =============================================================================

#[test]
fn empty_and_dot_edge_cases_fail() {
    assert!(ClassName::new("").is_err());
    assert!(ClassName::new(".").is_err());
    assert!(ClassName::new("a..b").is_err());
    assert!(ClassName::new(".a").is_err());
    assert!(ClassName::new("a.").is_err());
}

#[test]
fn known_key_shape() {
    let name = ClassName::new("billing.invoices.Invoice").unwrap();
    assert_eq!(name.cache_key(), "billing__invoices__Invoice");
}
