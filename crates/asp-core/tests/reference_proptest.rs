// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property tests for the reference grammar.

use asp_core::{Selector, SpaceId, SpaceRef};
use proptest::prelude::*;

// ── Arbitrary strategies ────────────────────────────────────────────

fn arb_space_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}(-[a-z0-9]{1,6}){0,3}"
}

fn arb_tag() -> impl Strategy<Value = String> {
    // Avoid strings the priority table claims first: `dev`, 40-hex,
    // bare versions, and `branch/` prefixes are impossible by construction.
    "[a-zA-Z][a-zA-Z0-9._-]{0,10}[a-zA-Z]".prop_filter("reserved word", |s| s != "dev")
}

fn arb_commit() -> impl Strategy<Value = String> {
    "[0-9a-f]{40}"
}

proptest! {
    // Any valid id parses and round-trips through a tag reference.
    #[test]
    fn ids_round_trip(id in arb_space_id()) {
        prop_assert!(SpaceId::new(&id).is_ok(), "{id}");
        let raw = format!("space:{id}@stable");
        let parsed = SpaceRef::parse(&raw).unwrap();
        prop_assert_eq!(parsed.serialize(), raw);
    }

    // Tag selectors survive parse ∘ serialize unchanged.
    #[test]
    fn tags_round_trip(id in arb_space_id(), tag in arb_tag()) {
        let raw = format!("space:{id}@{tag}");
        match SpaceRef::parse(&raw) {
            Ok(parsed) => prop_assert_eq!(parsed.serialize(), raw),
            // A generated tag may happen to spell a bare version; those
            // still round-trip, just under the semver kind.
            Err(e) => prop_assert!(false, "{raw}: {e}"),
        }
    }

    // Commit selectors classify as commits and round-trip.
    #[test]
    fn commits_round_trip(id in arb_space_id(), sha in arb_commit()) {
        let raw = format!("space:{id}@{sha}");
        let parsed = SpaceRef::parse(&raw).unwrap();
        prop_assert!(matches!(parsed.selector, Selector::Commit(_)));
        prop_assert_eq!(parsed.serialize(), raw);
    }

    // Serialization is stable under double round-trip for every parse result.
    #[test]
    fn serialize_is_idempotent(id in arb_space_id(), sel in "[a-zA-Z0-9._^~=<>/ -]{1,16}") {
        let raw = format!("space:{id}@{sel}");
        if let Ok(parsed) = SpaceRef::parse(&raw) {
            let once = parsed.serialize();
            let twice = SpaceRef::parse(&once).unwrap().serialize();
            prop_assert_eq!(once, twice);
        }
    }
}
