//! Property-based tests for core domain types and queue ordering.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use refq::core::types::{Namespace, Oid, RefName, UtcTimestamp};
use refq::queue::{oldest, ordered};
use refq::store::QueueRef;

/// Strategy for generating characters allowed in a queue item name.
fn item_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('_'),
        Just('.'),
        Just('/'),
    ]
}

/// Strategy for generating item names valid under Git's refname rules.
fn valid_item_name() -> impl Strategy<Value = String> {
    prop::collection::vec(item_char(), 1..40).prop_filter_map(
        "must be valid ref component",
        |chars| {
            let name: String = chars.into_iter().collect();
            if name.starts_with('/')
                || name.ends_with('/')
                || name.ends_with('.')
                || name.contains("..")
                || name.contains("//")
                || name.contains("@{")
            {
                return None;
            }
            if name
                .split('/')
                .any(|c| c.starts_with('.') || c.ends_with(".lock"))
            {
                return None;
            }
            Some(name)
        },
    )
}

/// Strategy for generating valid hex OIDs.
fn valid_oid_string() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
        ]),
        40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for generating arbitrary timestamps (epoch to year 2100).
fn arb_timestamp() -> impl Strategy<Value = UtcTimestamp> {
    (0i64..4_102_444_800i64, 0u32..1_000_000_000u32).prop_map(|(secs, nanos)| {
        UtcTimestamp::from_datetime(
            chrono::DateTime::from_timestamp(secs, nanos).expect("in-range timestamp"),
        )
    })
}

/// Strategy for a queue listing with distinct ref names.
fn arb_queue_refs() -> impl Strategy<Value = Vec<QueueRef>> {
    let ns = Namespace::new("refs/queue/").unwrap();
    prop::collection::btree_map(valid_item_name(), (valid_oid_string(), arb_timestamp()), 0..16)
        .prop_map(move |entries| {
            entries
                .into_iter()
                .map(|(item, (oid, created_at))| QueueRef {
                    name: ns.item_ref(&item).unwrap(),
                    target: Oid::new(oid).unwrap(),
                    created_at,
                })
                .collect()
        })
}

proptest! {
    /// Any valid OID round-trips through serde.
    #[test]
    fn oid_serde_roundtrip(oid_str in valid_oid_string()) {
        let oid = Oid::new(&oid_str).unwrap();
        let json = serde_json::to_string(&oid).unwrap();
        let parsed: Oid = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(oid, parsed);
    }

    /// OIDs are normalized to lowercase regardless of input case.
    #[test]
    fn oid_normalizes_to_lowercase(oid_str in valid_oid_string()) {
        let upper = oid_str.to_uppercase();
        let oid = Oid::new(&upper).unwrap();
        prop_assert_eq!(oid.as_str(), oid_str.as_str());
    }

    /// Abbreviation is always a prefix of the full OID.
    #[test]
    fn oid_short_is_prefix(oid_str in valid_oid_string(), len in 0usize..50) {
        let oid = Oid::new(&oid_str).unwrap();
        let short = oid.short(len);
        prop_assert!(oid.as_str().starts_with(short));
        prop_assert_eq!(short.len(), len.min(oid_str.len()));
    }

    /// Item refs built from a namespace validate and strip back to the
    /// original item name.
    #[test]
    fn namespace_item_refs_roundtrip(item in valid_item_name()) {
        let ns = Namespace::new("refs/queue/").unwrap();
        let name = ns.item_ref(&item).unwrap();
        prop_assert!(ns.contains(&name));
        prop_assert_eq!(name.strip_prefix(ns.as_str()), Some(item.as_str()));
    }

    /// Any constructed item ref round-trips through serde.
    #[test]
    fn ref_name_serde_roundtrip(item in valid_item_name()) {
        let name = Namespace::new("refs/queue/").unwrap().item_ref(&item).unwrap();
        let json = serde_json::to_string(&name).unwrap();
        let parsed: RefName = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(name, parsed);
    }
}

proptest! {
    /// Ordering is a permutation: nothing added, nothing dropped.
    #[test]
    fn ordered_preserves_elements(refs in arb_queue_refs()) {
        let sorted = ordered(refs.clone());
        prop_assert_eq!(sorted.len(), refs.len());

        let mut expected: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        expected.sort_unstable();
        let mut actual: Vec<_> = sorted.iter().map(|r| r.name.as_str()).collect();
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);
    }

    /// Adjacent pairs respect the (timestamp, name) key.
    #[test]
    fn ordered_is_sorted_by_time_then_name(refs in arb_queue_refs()) {
        let sorted = ordered(refs);
        for pair in sorted.windows(2) {
            let lhs = (&pair[0].created_at, pair[0].name.as_str());
            let rhs = (&pair[1].created_at, pair[1].name.as_str());
            prop_assert!(lhs <= rhs);
        }
    }

    /// The result does not depend on the input permutation.
    #[test]
    fn ordered_is_permutation_invariant(refs in arb_queue_refs()) {
        let mut reversed = refs.clone();
        reversed.reverse();
        prop_assert_eq!(ordered(refs), ordered(reversed));
    }

    /// Sorting an already sorted listing changes nothing.
    #[test]
    fn ordered_is_idempotent(refs in arb_queue_refs()) {
        let once = ordered(refs);
        prop_assert_eq!(ordered(once.clone()), once);
    }

    /// `oldest` always agrees with the head of the full ordering.
    #[test]
    fn oldest_matches_ordered_head(refs in arb_queue_refs()) {
        let head = oldest(&refs).cloned();
        prop_assert_eq!(head, ordered(refs).into_iter().next());
    }
}
