//! store::remote
//!
//! Remote synchronization: mirroring refs and objects between the local
//! replica and a shared remote.
//!
//! Three coarse-grained, synchronous operations:
//!
//! - [`Store::bootstrap`] - join a queue by creating a fresh local
//!   replica from the remote (depth-1, bare, no checkout)
//! - [`Store::fetch`] - pull ref/object updates for one namespace
//! - [`Store::push`] - push matching local refs, optionally pruning
//!   remote refs that no longer exist locally (how claims and deletes
//!   propagate outward)
//!
//! Each invocation fails atomically: a transfer error surfaces as a
//! single [`StoreError`] with the transport's diagnostic text, never as
//! a silently partial state. The one exception is deliberate: prune
//! deletions the remote refuses are collected into [`PushOutcome`]
//! instead of failing the push, because a claim already applied locally
//! must not be un-claimed by an unrelated remote refusal.
//!
//! All three operations honor the caller's [`CancelToken`]. A cancelled
//! fetch or bootstrap aborts the transfer before any ref update is
//! applied, leaving the replica in its previous state; push never
//! mutates local state at all.

use std::cell::RefCell;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::cancel::CancelToken;
use crate::core::types::{Namespace, RefName};

use super::interface::{Store, StoreError};

/// Report of a completed push.
///
/// Updates that the remote refuses fail the whole push with
/// [`StoreError::PushRejected`]; refused prune deletions land in
/// `rejected` here (best-effort-with-report).
#[derive(Debug, Clone, Default)]
pub struct PushOutcome {
    /// Remote refs deleted because they no longer exist locally
    pub pruned: Vec<RefName>,
    /// Prune deletions the remote refused, with its reason
    pub rejected: Vec<PruneRejection>,
}

impl PushOutcome {
    /// True when nothing was refused by the remote.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A prune deletion the remote refused.
#[derive(Debug, Clone)]
pub struct PruneRejection {
    /// The remote ref that could not be deleted
    pub refname: RefName,
    /// The remote's reason
    pub reason: String,
}

impl Store {
    // =========================================================================
    // Remote Synchronizer
    // =========================================================================

    /// Create a fresh local replica from a remote.
    ///
    /// Performs a minimal transfer: history depth 1, bare, no working
    /// checkout materialized. This is how a node joins an existing
    /// queue without downloading the remote's full history.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RemoteUnavailable`] if the remote cannot be reached
    /// - [`StoreError::Cancelled`] if the token flips mid-transfer; the
    ///   target path is left without a usable replica
    pub fn bootstrap(
        remote: &str,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<Self, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(cancel));
        fetch_options.depth(1);

        let repo = git2::build::RepoBuilder::new()
            .bare(true)
            .fetch_options(fetch_options)
            .clone(remote, path)
            .map_err(|e| remote_error(e, remote))?;

        debug!(remote, path = %path.display(), "replica bootstrapped");
        Ok(Store::from_repo(repo))
    }

    /// Pull ref and object updates for one namespace from the remote.
    ///
    /// Local refs outside the namespace are untouched. Updates inside
    /// it follow last-writer-wins: a ref repointed on the remote
    /// replaces the local ref even though blob targets never
    /// fast-forward.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RemoteUnavailable`] if the remote cannot be reached
    /// - [`StoreError::Cancelled`] if the token flips mid-transfer; no
    ///   partial ref update is observable afterwards
    pub fn fetch(
        &self,
        remote: &str,
        namespace: &Namespace,
        cancel: &CancelToken,
    ) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut anon = self
            .repo()
            .remote_anonymous(remote)
            .map_err(|e| remote_error(e, remote))?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(cancel));

        let refspec = namespace.refspec();
        anon.fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| remote_error(e, remote))?;

        debug!(remote, namespace = %namespace, "fetch complete");
        Ok(())
    }

    /// Push matching local refs (and their objects) to the remote.
    ///
    /// With `prune` set, remote refs in the namespace that no longer
    /// exist locally are deleted in the same push; this is how a claim
    /// performed on this node propagates to every other node.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RemoteUnavailable`] if the remote cannot be reached
    /// - [`StoreError::PushRejected`] if the remote refuses a ref
    ///   *update* (refused prune deletions are reported in the
    ///   returned [`PushOutcome`] instead)
    /// - [`StoreError::Cancelled`] if the token was already flipped
    pub fn push(
        &self,
        remote: &str,
        namespace: &Namespace,
        prune: bool,
        cancel: &CancelToken,
    ) -> Result<PushOutcome, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut anon = self
            .repo()
            .remote_anonymous(remote)
            .map_err(|e| remote_error(e, remote))?;

        let mut refspecs = vec![namespace.refspec()];
        let mut prune_targets: Vec<String> = Vec::new();

        if prune {
            // Ask the remote what it has in the namespace; anything it
            // advertises that no longer exists locally gets a delete
            // refspec appended to the same push.
            let connection = anon
                .connect_auth(git2::Direction::Push, Some(remote_callbacks(cancel)), None)
                .map_err(|e| remote_error(e, remote))?;

            for head in connection.list().map_err(|e| remote_error(e, remote))? {
                let name = head.name();
                if !namespace.contains_str(name) {
                    continue;
                }
                if self.repo().find_reference(name).is_err() {
                    prune_targets.push(name.to_string());
                }
            }
            // Connection drops here; the push below reconnects.
        }

        refspecs.extend(prune_targets.iter().map(|name| format!(":{name}")));

        // Per-ref status reported by the remote after the transfer.
        let statuses: RefCell<Vec<(String, Option<String>)>> = RefCell::new(Vec::new());
        {
            let mut callbacks = remote_callbacks(cancel);
            callbacks.push_update_reference(|refname, status| {
                statuses
                    .borrow_mut()
                    .push((refname.to_string(), status.map(String::from)));
                Ok(())
            });

            let mut push_options = git2::PushOptions::new();
            push_options.remote_callbacks(callbacks);

            let specs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
            anon.push(&specs, Some(&mut push_options))
                .map_err(|e| remote_error(e, remote))?;
        }

        let outcome = classify_push_statuses(statuses.into_inner(), &prune_targets)?;

        debug!(
            remote,
            namespace = %namespace,
            pruned = outcome.pruned.len(),
            rejected = outcome.rejected.len(),
            "push complete"
        );
        Ok(outcome)
    }
}

/// Partition per-ref push statuses into a [`PushOutcome`].
///
/// `None` status means the remote accepted the update. A refused prune
/// deletion is collected into `rejected`; a refused *update* fails the
/// whole push, because the caller's publication did not land.
fn classify_push_statuses(
    statuses: Vec<(String, Option<String>)>,
    prune_targets: &[String],
) -> Result<PushOutcome, StoreError> {
    let mut outcome = PushOutcome::default();
    for (name, status) in statuses {
        let was_prune = prune_targets.iter().any(|t| t == &name);
        match status {
            None => {
                if was_prune {
                    match RefName::new(&name) {
                        Ok(refname) => outcome.pruned.push(refname),
                        Err(_) => warn!(refname = %name, "pruned ref has unusable name"),
                    }
                }
            }
            Some(reason) if was_prune => match RefName::new(&name) {
                Ok(refname) => outcome.rejected.push(PruneRejection { refname, reason }),
                Err(_) => warn!(refname = %name, reason, "prune rejected for unusable name"),
            },
            Some(reason) => {
                return Err(StoreError::PushRejected {
                    refname: name,
                    message: reason,
                });
            }
        }
    }
    Ok(outcome)
}

/// Callbacks shared by every remote operation: credential resolution
/// and cancellation polling.
///
/// Credentials are tried in order: ssh-agent for ssh remotes, then the
/// configured git credential helper, then libgit2's default (covers
/// anonymous file:// and https:// remotes).
fn remote_callbacks<'cb>(cancel: &CancelToken) -> git2::RemoteCallbacks<'cb> {
    let mut callbacks = git2::RemoteCallbacks::new();

    let config = git2::Config::open_default().ok();
    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key() {
            if let Some(user) = username_from_url {
                return git2::Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.is_user_pass_plaintext() {
            if let Some(ref config) = config {
                if let Ok(cred) = git2::Cred::credential_helper(config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }
        git2::Cred::default()
    });

    // Returning false aborts the transfer; libgit2 surfaces it as a
    // user error, which maps to StoreError::Cancelled.
    let cancel = cancel.clone();
    callbacks.transfer_progress(move |_| !cancel.is_cancelled());

    callbacks
}

/// Map a git2 error from a remote operation, attaching the remote
/// location as context.
///
/// A remote that cannot be found (bad path, bad URL) is reported as
/// unavailable rather than internal, since from the caller's view the
/// two are the same condition.
fn remote_error(err: git2::Error, remote: &str) -> StoreError {
    if err.code() == git2::ErrorCode::NotFound {
        return StoreError::RemoteUnavailable {
            remote: remote.to_string(),
            message: err.message().to_string(),
        };
    }
    StoreError::from_git2(err, remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_default_is_clean() {
        let outcome = PushOutcome::default();
        assert!(outcome.is_clean());
        assert!(outcome.pruned.is_empty());
    }

    #[test]
    fn outcome_with_rejection_is_not_clean() {
        let outcome = PushOutcome {
            pruned: vec![],
            rejected: vec![PruneRejection {
                refname: RefName::new("refs/queue/stuck").unwrap(),
                reason: "hook declined".to_string(),
            }],
        };
        assert!(!outcome.is_clean());
    }

    #[test]
    fn accepted_statuses_classify_clean() {
        let statuses = vec![
            ("refs/queue/a".to_string(), None),
            ("refs/queue/b".to_string(), None),
        ];
        let outcome = classify_push_statuses(statuses, &[]).unwrap();
        assert!(outcome.is_clean());
        assert!(outcome.pruned.is_empty());
    }

    #[test]
    fn accepted_prune_deletion_is_reported_pruned() {
        let prune_targets = vec!["refs/queue/claimed".to_string()];
        let statuses = vec![
            ("refs/queue/kept".to_string(), None),
            ("refs/queue/claimed".to_string(), None),
        ];
        let outcome = classify_push_statuses(statuses, &prune_targets).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(
            outcome.pruned.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            vec!["refs/queue/claimed"]
        );
    }

    #[test]
    fn refused_prune_deletion_is_reported_not_fatal() {
        let prune_targets = vec!["refs/queue/stuck".to_string()];
        let statuses = vec![(
            "refs/queue/stuck".to_string(),
            Some("deletion forbidden by hook".to_string()),
        )];
        let outcome = classify_push_statuses(statuses, &prune_targets).unwrap();
        assert!(!outcome.is_clean());
        assert!(outcome.pruned.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].refname.as_str(), "refs/queue/stuck");
        assert_eq!(outcome.rejected[0].reason, "deletion forbidden by hook");
    }

    #[test]
    fn refused_update_fails_the_push() {
        let statuses = vec![(
            "refs/queue/task".to_string(),
            Some("hook declined".to_string()),
        )];
        let result = classify_push_statuses(statuses, &[]);
        match result {
            Err(StoreError::PushRejected { refname, message }) => {
                assert_eq!(refname, "refs/queue/task");
                assert_eq!(message, "hook declined");
            }
            other => panic!("expected PushRejected, got {other:?}"),
        }
    }

    #[test]
    fn mixed_statuses_partition_correctly() {
        let prune_targets = vec![
            "refs/queue/gone".to_string(),
            "refs/queue/stuck".to_string(),
        ];
        let statuses = vec![
            ("refs/queue/new".to_string(), None),
            ("refs/queue/gone".to_string(), None),
            (
                "refs/queue/stuck".to_string(),
                Some("hook declined".to_string()),
            ),
        ];
        let outcome = classify_push_statuses(statuses, &prune_targets).unwrap();
        assert_eq!(
            outcome.pruned.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            vec!["refs/queue/gone"]
        );
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].refname.as_str(), "refs/queue/stuck");
    }

    #[test]
    fn missing_remote_reported_unavailable() {
        let err = git2::Error::new(
            git2::ErrorCode::NotFound,
            git2::ErrorClass::Repository,
            "repository not found",
        );
        assert!(matches!(
            remote_error(err, "file:///nowhere"),
            StoreError::RemoteUnavailable { .. }
        ));
    }
}
