//! queue
//!
//! FIFO semantics layered over the ref registry.
//!
//! # Modules
//!
//! - [`view`] - Pure, deterministic FIFO ordering of listed refs
//! - [`claim`] - Publish and claim-next, including the one retry loop
//!
//! # Protocol
//!
//! A producer deposits a payload in the object store and registers the
//! resulting hash under a namespaced ref. A consumer lists the
//! namespace, takes the oldest ref, reads its payload, and deletes the
//! ref to claim the item. Deletion is the claim: the backing store
//! guarantees exactly one of several racing deleters succeeds, and the
//! losers relist.
//!
//! # Example
//!
//! ```ignore
//! use refq::core::cancel::CancelToken;
//! use refq::core::types::Namespace;
//! use refq::queue::{claim_next, publish};
//!
//! let ns = Namespace::new("refs/queue/")?;
//! publish(&store, &ns.item_ref("task-1")?, b"do the thing")?;
//!
//! let cancel = CancelToken::new();
//! if let Some(item) = claim_next(&store, &ns, &cancel)? {
//!     println!("claimed {}: {} bytes", item.name, item.payload.len());
//! }
//! ```

pub mod claim;
pub mod view;

pub use claim::{claim_next, publish, ClaimedItem};
pub use view::{oldest, ordered};
