//! core::cancel
//!
//! Caller-supplied cancellation signal for long-running operations.
//!
//! The core itself has no threads and no timeouts; callers wrap blocking
//! operations with their own deadline logic and flip the token when they
//! give up. Remote transfers poll the token between progress callbacks,
//! and the claim-retry loop checks it before every relist.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable cancellation flag shared between a caller and an operation.
///
/// All clones observe the same flag. Cancelling is one-way: there is no
/// reset, matching the "abort and re-plan" contract of the claim loop.
///
/// # Example
///
/// ```
/// use refq::core::cancel::CancelToken;
///
/// let token = CancelToken::new();
/// let observer = token.clone();
///
/// assert!(!observer.is_cancelled());
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
