//! store
//!
//! Single interface for the git-backed replica.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to the backing store. All object
//! writes/reads, ref mutations, and remote synchronization flow through
//! this interface. No other module imports `git2`, and no code outside
//! this module parses git-internal files.
//!
//! # Responsibilities
//!
//! - Replica opening, creation, and bootstrap from a remote
//! - Object operations (content-addressed write, read by hash)
//! - Ref operations (set, remove, list with timestamps)
//! - Remote synchronization (fetch, push with optional prune)
//!
//! # Invariants
//!
//! - All atomicity comes from git's per-ref atomic update; the store
//!   holds no in-process locks, because a mutex here could not protect
//!   against the other processes and nodes sharing the replica
//! - Every listed ref carries a usable timestamp, or listing fails
//!   with `CorruptState`
//! - All operations return strong types (Oid, RefName, Namespace)
//!
//! # Example
//!
//! ```ignore
//! use refq::core::cancel::CancelToken;
//! use refq::core::types::Namespace;
//! use refq::store::Store;
//!
//! let ns = Namespace::new("refs/queue/")?;
//! let cancel = CancelToken::new();
//!
//! // Join a shared queue
//! let store = Store::bootstrap("ssh://host/queue.git", path, &cancel)?;
//!
//! // Deposit an item and publish it
//! let oid = store.write_object(b"task payload")?;
//! store.set_ref(&ns.item_ref("task-1")?, &oid)?;
//! store.push("ssh://host/queue.git", &ns, false, &cancel)?;
//! ```

mod interface;
mod remote;

pub use interface::{QueueRef, Store, StoreError};
pub use remote::{PruneRejection, PushOutcome};
