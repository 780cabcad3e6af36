//! refq - Distributed queue primitives over git refs
//!
//! refq is a coordination library built on a content-addressed object
//! store and a timestamp-ordered set of named pointers (refs),
//! replicated between nodes over push/fetch. Independent processes
//! deposit opaque payloads, discover them in creation order, and
//! atomically claim, release, or delete them. That is enough to build
//! distributed queues, leases, and locks on a shared git remote instead
//! of a dedicated server.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Validated domain types and the cancellation token
//! - [`store`] - Single interface to the git replica: objects, refs,
//!   and remote synchronization
//! - [`queue`] - FIFO ordering and the publish/claim protocol
//!
//! # Correctness Invariants
//!
//! refq maintains the following invariants:
//!
//! 1. Every atomicity guarantee comes from git's per-ref atomic update;
//!    the crate holds no locks of its own
//! 2. Every listed ref carries a usable ordering timestamp, or the
//!    listing fails with a typed error
//! 3. Losing a claim race is a retry signal, never a surfaced error
//! 4. A cancelled transfer leaves the local replica in its previous
//!    consistent state

pub mod core;
pub mod queue;
pub mod store;
