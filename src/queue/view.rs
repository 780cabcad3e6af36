//! queue::view
//!
//! Deterministic FIFO ordering over listed refs.
//!
//! Pure functions only: no I/O, no store handle. Consumers list a
//! namespace through the store, order the result here, and claim the
//! head.

use crate::store::QueueRef;

/// Order refs oldest-first (FIFO by creation time).
///
/// The sort is stable with a deterministic tie-break: refs sharing a
/// timestamp are ordered by name, so repeated listings of the same
/// state always produce the same sequence. Timestamp resolution is
/// whatever the replica's filesystem provides; at worst, whole
/// seconds.
pub fn ordered(mut refs: Vec<QueueRef>) -> Vec<QueueRef> {
    refs.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.as_str().cmp(b.name.as_str()))
    });
    refs
}

/// The oldest ref in an unordered listing, if any.
///
/// Equivalent to `ordered(refs).first()` without sorting the rest.
/// Uses the same `(created_at, name)` key, so the answer matches the
/// head of the ordered view.
pub fn oldest(refs: &[QueueRef]) -> Option<&QueueRef> {
    refs.iter()
        .min_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.as_str().cmp(b.name.as_str()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::types::{Oid, RefName, UtcTimestamp};

    fn ts(rfc3339: &str) -> UtcTimestamp {
        UtcTimestamp::from_datetime(
            chrono::DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&chrono::Utc),
        )
    }

    fn item(name: &str, stamp: &str) -> QueueRef {
        QueueRef {
            name: RefName::new(name).unwrap(),
            target: Oid::new("abc123def4567890abc123def4567890abc12345").unwrap(),
            created_at: ts(stamp),
        }
    }

    #[test]
    fn orders_by_creation_time() {
        let refs = vec![
            item("refs/q/c", "2024-01-01T00:00:03Z"),
            item("refs/q/a", "2024-01-01T00:00:01Z"),
            item("refs/q/b", "2024-01-01T00:00:02Z"),
        ];

        let names: Vec<_> = ordered(refs)
            .into_iter()
            .map(|r| r.name.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["refs/q/a", "refs/q/b", "refs/q/c"]);
    }

    #[test]
    fn ties_break_by_name() {
        let refs = vec![
            item("refs/q/zulu", "2024-01-01T00:00:01Z"),
            item("refs/q/alpha", "2024-01-01T00:00:01Z"),
            item("refs/q/mike", "2024-01-01T00:00:01Z"),
        ];

        let names: Vec<_> = ordered(refs)
            .into_iter()
            .map(|r| r.name.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["refs/q/alpha", "refs/q/mike", "refs/q/zulu"]);
    }

    #[test]
    fn ordering_is_reproducible() {
        let refs = vec![
            item("refs/q/b", "2024-01-01T00:00:01Z"),
            item("refs/q/a", "2024-01-01T00:00:01Z"),
            item("refs/q/c", "2024-01-01T00:00:02Z"),
        ];

        let first = ordered(refs.clone());
        let second = ordered({
            let mut reversed = refs;
            reversed.reverse();
            reversed
        });
        assert_eq!(first, second);
    }

    #[test]
    fn oldest_matches_ordered_head() {
        let refs = vec![
            item("refs/q/b", "2024-01-01T00:00:02Z"),
            item("refs/q/a", "2024-01-01T00:00:01Z"),
        ];

        let head = oldest(&refs).unwrap().clone();
        assert_eq!(ordered(refs).first(), Some(&head));
    }

    #[test]
    fn oldest_of_empty_is_none() {
        assert!(oldest(&[]).is_none());
    }
}
