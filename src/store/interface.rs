//! store::interface
//!
//! Backing-store interface implementation using git2.
//!
//! This module provides the **single doorway** to the git replica that
//! backs every queue. All object and ref operations flow through this
//! interface, which provides structured results and normalizes errors
//! into typed failure categories.
//!
//! # Architecture
//!
//! The [`Store`] struct is the only way to interact with a replica.
//! No other module should import `git2` directly (the remote
//! synchronizer in [`super::remote`] is part of this doorway). This
//! ensures:
//!
//! - Consistent error handling across all backing-store operations
//! - Strong type guarantees at the boundary
//! - A swappable seam: callers never see git2 types
//!
//! # Atomicity
//!
//! The store performs no in-process locking. Every atomicity guarantee
//! comes from git's per-ref atomic update: `set_ref` and `remove_ref`
//! are each a single atomic operation at the refdb level, and there is
//! no multi-ref transaction. Concurrent writers to the same name are
//! serialized by the refdb, not by this crate.
//!
//! # Example
//!
//! ```ignore
//! use refq::core::types::Namespace;
//! use refq::store::Store;
//!
//! let store = Store::open(Path::new("/var/lib/worker/queue.git"))?;
//! let ns = Namespace::new("refs/queue/")?;
//!
//! let oid = store.write_object(b"task-1")?;
//! store.set_ref(&ns.item_ref("a")?, &oid)?;
//!
//! for item in store.list_refs(&ns)? {
//!     println!("{} -> {} ({})", item.name, item.target.short(7), item.created_at);
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::types::{Namespace, Oid, RefName, TypeError, UtcTimestamp};

/// Errors from backing-store operations.
///
/// These error types cover all categories of failures that callers need
/// to handle distinctly. The categorization enables the claim protocol:
/// a consumer losing the claim race observes [`StoreError::RefNotFound`]
/// and retries, while every other variant surfaces to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The path does not contain a queue replica.
    #[error("not a queue replica: {path}")]
    NotAStore {
        /// The path that was probed
        path: PathBuf,
    },

    /// The replica exists but could not be opened or created.
    #[error("replica unavailable at {path}: {message}")]
    Unavailable {
        /// The replica path
        path: PathBuf,
        /// Backing-library diagnostic text
        message: String,
    },

    /// Requested ref does not exist.
    ///
    /// On `remove_ref` this is the lost-race signal: another consumer
    /// claimed the item first.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// No object with the given hash exists in the replica.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The content hash that was not found
        oid: String,
    },

    /// A listed ref is missing its ordering key or target.
    ///
    /// The registry must never hand out a ref without a usable
    /// timestamp; when it would have to, the listing fails with this
    /// error instead of terminating the process.
    #[error("corrupt ref state for {refname}: {message}")]
    CorruptState {
        /// The ref whose state is corrupt
        refname: String,
        /// What was missing or malformed
        message: String,
    },

    /// The remote could not be reached or refused the connection.
    #[error("remote unavailable: {remote}: {message}")]
    RemoteUnavailable {
        /// The remote location
        remote: String,
        /// Transport diagnostic text
        message: String,
    },

    /// The remote refused a ref update during push.
    ///
    /// Prune deletions refused by the remote are reported in
    /// [`PushOutcome`](super::PushOutcome) instead; this variant is
    /// reserved for refused uploads, which fail the push as a whole.
    #[error("push rejected for {refname}: {message}")]
    PushRejected {
        /// The ref the remote refused
        refname: String,
        /// The remote's reason
        message: String,
    },

    /// The caller's cancellation token was flipped mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Byte stream to or from the backing store failed.
    #[error("i/o failure: {message}")]
    Io {
        /// Description of the failure
        message: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name or namespace format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Uncategorized backing-library error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl StoreError {
    /// Categorize a git2::Error, attaching operation context.
    ///
    /// `NotFound` is deliberately absent here: call sites map it to
    /// [`StoreError::RefNotFound`] or [`StoreError::ObjectNotFound`]
    /// themselves, because only they know which kind of entity was
    /// being looked up.
    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        use git2::{ErrorClass, ErrorCode};

        match (err.code(), err.class()) {
            // Our transfer callbacks abort with a user error when the
            // cancellation token flips.
            (ErrorCode::User, _) => StoreError::Cancelled,
            (_, ErrorClass::Net) | (_, ErrorClass::Http) | (_, ErrorClass::Ssh) => {
                StoreError::RemoteUnavailable {
                    remote: context.to_string(),
                    message: err.message().to_string(),
                }
            }
            (_, ErrorClass::Os) | (_, ErrorClass::Filesystem) => StoreError::Io {
                message: format!("{}: {}", context, err.message()),
            },
            (ErrorCode::InvalidSpec, _) => StoreError::InvalidRefName {
                message: format!("{}: {}", context, err.message()),
            },
            _ => StoreError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => StoreError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => StoreError::InvalidRefName { message: msg },
            TypeError::InvalidNamespace(msg) => StoreError::InvalidRefName { message: msg },
        }
    }
}

/// A queue ref: named pointer, content hash target, and ordering key.
///
/// The timestamp is assigned by the backing store when the ref is
/// created or repointed; callers never supply it. Refs with identical
/// timestamps are ordered by name, so repeated listings are
/// reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRef {
    /// The full ref name
    pub name: RefName,
    /// The content hash the ref points to
    pub target: Oid,
    /// When the backing store created or last repointed the ref
    pub created_at: UtcTimestamp,
}

/// The backing-store interface.
///
/// This is the **single point of interaction** with the git replica.
/// All object writes/reads and ref mutations flow through this
/// interface.
///
/// # Replica shape
///
/// Queue replicas are bare repositories: no working tree is ever
/// materialized, because queue payloads live as loose objects addressed
/// by refs, never as checked-out files. `open` accepts non-bare
/// repositories too, so a queue can piggyback on an existing clone.
///
/// # Example
///
/// ```ignore
/// let store = Store::init(Path::new("/var/lib/worker/queue.git"))?;
///
/// let oid = store.write_object(b"payload")?;
/// store.set_ref(&name, &oid)?;
/// assert_eq!(store.read_object(&oid)?, b"payload");
/// store.remove_ref(&name)?;
/// ```
pub struct Store {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Store {
    // =========================================================================
    // Opening and Creation
    // =========================================================================

    /// Open an existing replica at the given path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotAStore`] if no replica exists at `path`
    /// - [`StoreError::Unavailable`] if it exists but cannot be opened
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let repo = git2::Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                StoreError::NotAStore {
                    path: path.to_path_buf(),
                }
            } else {
                StoreError::Unavailable {
                    path: path.to_path_buf(),
                    message: e.message().to_string(),
                }
            }
        })?;

        Ok(Self { repo })
    }

    /// Create a fresh, empty bare replica at the given path.
    ///
    /// Used when starting a queue that has no remote yet. To join an
    /// existing queue, use [`Store::bootstrap`](Self::bootstrap)
    /// instead.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`] if the replica cannot be created
    pub fn init(path: &Path) -> Result<Self, StoreError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.bare(true);

        let repo = git2::Repository::init_opts(path, &opts).map_err(|e| {
            StoreError::Unavailable {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            }
        })?;

        debug!(path = %path.display(), "replica initialized");
        Ok(Self { repo })
    }

    /// Check whether a path holds an openable replica.
    ///
    /// Callers use this to decide between `open` and `bootstrap` when
    /// joining a queue.
    pub fn is_store(path: &Path) -> bool {
        git2::Repository::open(path).is_ok()
    }

    /// Path of the replica's git directory.
    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    /// Access to the underlying repository, for the remote synchronizer.
    pub(crate) fn repo(&self) -> &git2::Repository {
        &self.repo
    }

    /// Wrap an already-opened repository (bootstrap hands one over).
    pub(crate) fn from_repo(repo: git2::Repository) -> Self {
        Self { repo }
    }

    // =========================================================================
    // Object Store
    // =========================================================================

    /// Persist a payload and return its content hash.
    ///
    /// Idempotent: writing identical bytes twice yields the same hash,
    /// and storage is deduplicated by content. Objects are immutable
    /// once written; there is no delete (garbage collection of
    /// unreferenced payloads is a store-level concern outside this
    /// crate).
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the payload cannot be persisted
    pub fn write_object(&self, payload: &[u8]) -> Result<Oid, StoreError> {
        let oid = self
            .repo
            .blob(payload)
            .map_err(|e| StoreError::from_git2(e, "write object"))?;

        let oid = Oid::new(oid.to_string())?;
        debug!(oid = %oid.short(7), bytes = payload.len(), "object written");
        Ok(oid)
    }

    /// Read a payload back by its content hash.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ObjectNotFound`] if no object with that hash exists
    pub fn read_object(&self, oid: &Oid) -> Result<Vec<u8>, StoreError> {
        let git_oid = git2::Oid::from_str(oid.as_str()).map_err(|_| StoreError::InvalidOid {
            oid: oid.to_string(),
        })?;

        let blob = match self.repo.find_blob(git_oid) {
            Ok(b) => b,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(StoreError::ObjectNotFound {
                    oid: oid.to_string(),
                });
            }
            Err(e) => return Err(StoreError::from_git2(e, oid.as_str())),
        };

        Ok(blob.content().to_vec())
    }

    // =========================================================================
    // Ref Registry
    // =========================================================================

    /// Atomically create the ref or repoint an existing one.
    ///
    /// This is the compare-free, unconditional update used for
    /// enqueueing: if the name already exists its target and observed
    /// timestamp are replaced in one atomic step, and at no instant do
    /// two refs with the same name exist.
    pub fn set_ref(&self, name: &RefName, target: &Oid) -> Result<(), StoreError> {
        let oid = git2::Oid::from_str(target.as_str()).map_err(|_| StoreError::InvalidOid {
            oid: target.to_string(),
        })?;

        self.repo
            .reference(name.as_str(), oid, true, "refq: set ref")
            .map_err(|e| StoreError::from_git2(e, name.as_str()))?;

        debug!(refname = %name, target = %target.short(7), "ref set");
        Ok(())
    }

    /// Atomically delete a ref.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RefNotFound`] if the ref does not exist at call
    ///   time. In the claim protocol this means another consumer
    ///   deleted it first: the caller lost the race and should relist,
    ///   not surface the error.
    pub fn remove_ref(&self, name: &RefName) -> Result<(), StoreError> {
        let mut reference = match self.repo.find_reference(name.as_str()) {
            Ok(r) => r,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(StoreError::RefNotFound {
                    refname: name.to_string(),
                });
            }
            Err(e) => return Err(StoreError::from_git2(e, name.as_str())),
        };

        match reference.delete() {
            Ok(()) => {
                debug!(refname = %name, "ref removed");
                Ok(())
            }
            // Raced with a concurrent deleter between find and delete
            Err(e) if e.code() == git2::ErrorCode::NotFound => Err(StoreError::RefNotFound {
                refname: name.to_string(),
            }),
            Err(e) => Err(StoreError::from_git2(e, name.as_str())),
        }
    }

    /// Resolve a ref to its direct target, or `None` if it doesn't exist.
    ///
    /// Queue refs point straight at payload blobs, so this never peels.
    pub fn try_resolve_ref(&self, name: &RefName) -> Result<Option<Oid>, StoreError> {
        match self.repo.find_reference(name.as_str()) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                let oid = resolved.target().ok_or_else(|| StoreError::CorruptState {
                    refname: name.to_string(),
                    message: "ref has no direct target".to_string(),
                })?;
                Ok(Some(Oid::new(oid.to_string())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(StoreError::from_git2(e, name.as_str())),
        }
    }

    /// List every ref in a namespace, each annotated with its
    /// creation/modification timestamp.
    ///
    /// The returned order is unspecified; pass the result through
    /// [`queue::ordered`](crate::queue::ordered) for the FIFO view.
    ///
    /// # Errors
    ///
    /// - [`StoreError::CorruptState`] if a matching ref has no
    ///   retrievable timestamp or no direct target. A ref without an
    ///   ordering key must never be silently tolerated.
    pub fn list_refs(&self, namespace: &Namespace) -> Result<Vec<QueueRef>, StoreError> {
        let pattern = namespace.glob();
        let refs = self
            .repo
            .references_glob(&pattern)
            .map_err(|e| StoreError::from_git2(e, &pattern))?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference.map_err(|e| StoreError::from_git2(e, &pattern))?;

            // Refs with non-UTF8 names cannot have been written through
            // this interface; skip them.
            let name = match reference.name() {
                Some(n) => n.to_string(),
                None => continue,
            };

            let target = reference.target().ok_or_else(|| StoreError::CorruptState {
                refname: name.clone(),
                message: "symbolic ref in queue namespace".to_string(),
            })?;

            let created_at = self.ref_timestamp(&name)?;

            entries.push(QueueRef {
                name: RefName::new(&name)?,
                target: Oid::new(target.to_string())?,
                created_at,
            });
        }

        debug!(namespace = %namespace, count = entries.len(), "refs listed");
        Ok(entries)
    }

    /// Timestamp of a ref's loose storage location.
    ///
    /// libgit2 writes a loose ref file for every ref it creates or
    /// receives, and never packs refs on its own, so the file's mtime is
    /// the ref's creation/update time at filesystem resolution. A
    /// matching ref without loose storage violates that precondition and
    /// is reported as corrupt state rather than crashing the process.
    fn ref_timestamp(&self, refname: &str) -> Result<UtcTimestamp, StoreError> {
        let path = self.repo.path().join(refname);
        let metadata = std::fs::metadata(&path).map_err(|e| StoreError::CorruptState {
            refname: refname.to_string(),
            message: format!("no loose storage to timestamp: {e}"),
        })?;

        let mtime = metadata.modified().map_err(|e| StoreError::Io {
            message: format!("mtime of {refname}: {e}"),
        })?;

        Ok(UtcTimestamp::from_system_time(mtime))
    }
}
