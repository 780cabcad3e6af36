//! queue::claim
//!
//! The claim protocol: publishing items and popping the oldest one.
//!
//! "List then claim" is a check-then-act race by design. Two consumers
//! may both list the same oldest ref and both try to delete it; the
//! backing store guarantees exactly one deletion succeeds. The loser
//! observes `RefNotFound`, which is not an error to surface but the
//! signal to relist and try the next item. This loop is the only retry
//! in the crate; every other failure propagates immediately.

use tracing::debug;

use crate::core::cancel::CancelToken;
use crate::core::types::{Namespace, Oid, RefName};
use crate::store::{Store, StoreError};

use super::view::oldest;

/// An item successfully claimed from a queue.
///
/// The ref named here has been deleted from the local replica; the
/// payload remains stored under `target` (content-addressed objects are
/// never deleted by this crate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedItem {
    /// The ref that was claimed (and deleted)
    pub name: RefName,
    /// The content hash the ref pointed to
    pub target: Oid,
    /// The payload bytes
    pub payload: Vec<u8>,
}

/// Deposit a payload and publish it under a ref in one step.
///
/// The producer half of the queue: writes the payload to the object
/// store, then atomically creates (or repoints) the ref. Returns the
/// payload's content hash.
///
/// Publication becomes visible to other nodes once the namespace is
/// pushed.
pub fn publish(store: &Store, name: &RefName, payload: &[u8]) -> Result<Oid, StoreError> {
    let oid = store.write_object(payload)?;
    store.set_ref(name, &oid)?;
    debug!(refname = %name, target = %oid.short(7), "item published");
    Ok(oid)
}

/// Claim the oldest item in a namespace.
///
/// Lists the namespace, takes the oldest ref, reads its payload, and
/// deletes the ref as the claim step. Losing the deletion race to
/// another consumer triggers a relist, repeatedly, until an item is
/// claimed, the namespace is observed empty (`Ok(None)`), or the caller
/// cancels.
///
/// There is no backoff: the relist itself is the arbiter, and callers
/// wanting pacing wrap this call. Cancellation is checked before every
/// relist, so a flipped token aborts the loop promptly.
///
/// # Errors
///
/// - [`StoreError::Cancelled`] if `cancel` flips before a claim lands
/// - Any listing/read failure, unchanged: the loop only absorbs
///   `RefNotFound` from its own claim step
pub fn claim_next(
    store: &Store,
    namespace: &Namespace,
    cancel: &CancelToken,
) -> Result<Option<ClaimedItem>, StoreError> {
    loop {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let refs = store.list_refs(namespace)?;
        let Some(head) = oldest(&refs).cloned() else {
            return Ok(None);
        };

        let payload = store.read_object(&head.target)?;

        match store.remove_ref(&head.name) {
            Ok(()) => {
                debug!(refname = %head.name, "item claimed");
                return Ok(Some(ClaimedItem {
                    name: head.name,
                    target: head.target,
                    payload,
                }));
            }
            Err(StoreError::RefNotFound { .. }) => {
                // Another consumer claimed it first; relist.
                debug!(refname = %head.name, "lost claim race, relisting");
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}
